pub mod allocation;
pub mod availability;
pub mod config;
pub mod coordinator;
pub mod window;

pub use allocation::AllocationLedger;
pub use availability::AvailabilityLedger;
pub use config::ScheduleConfig;
pub use coordinator::{AppliedMutation, ConsistencyCoordinator, CoordinatorSnapshot, DateProjection};
pub use window::DateWindowManager;
