pub mod gateway;
pub mod remote;

pub use gateway::{GatewayEvent, SyncGateway, SyncState};
pub use remote::{HttpRemoteStore, MissingRemoteStore, RemoteStore};
