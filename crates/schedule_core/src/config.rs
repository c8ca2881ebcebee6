use chrono::Weekday;
use shared::domain::{AccessKeys, Role};

pub const DEFAULT_WINDOW_SIZE: usize = 4;
pub const DEFAULT_INTERVAL_DAYS: i64 = 14;

/// Immutable scheduling parameters, built once at process start and passed
/// explicitly into the coordinator. The access keys are carried here for the
/// outer role gate; the coordinator itself does no authorization.
#[derive(Debug, Clone)]
pub struct ScheduleConfig {
    /// Number of active event dates kept in the rolling window.
    pub window_size: usize,
    /// Weekday events fall on.
    pub event_weekday: Weekday,
    /// Days between consecutive event dates.
    pub interval_days: i64,
    /// Role display order used by the per-date projection.
    pub roles: Vec<Role>,
    /// Shared secrets distinguishing volunteers from coordinators.
    pub access_keys: AccessKeys,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            window_size: DEFAULT_WINDOW_SIZE,
            event_weekday: Weekday::Sat,
            interval_days: DEFAULT_INTERVAL_DAYS,
            roles: Role::ALL.to_vec(),
            access_keys: AccessKeys {
                volunteer: "voluntario2025".into(),
                coordinator: "coordenador2025".into(),
            },
        }
    }
}
