use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use futures::try_join;
use schedule_core::coordinator::{
    AppliedMutation, ConsistencyCoordinator, CoordinatorSnapshot, DateProjection,
};
use shared::{
    domain::{AllocationRecord, Role, Volunteer},
    error::ScheduleError,
    protocol::{group_availability_rows, AllocationWrite},
};
use tokio::{
    sync::{broadcast, Mutex},
    task::JoinHandle,
};
use tracing::{info, warn};

use crate::remote::RemoteStore;

/// Liveness probe cadence against the remote health endpoint.
pub const HEALTH_PROBE_INTERVAL: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    Idle,
    Syncing,
    Success,
    Error,
}

#[derive(Debug, Clone)]
pub enum GatewayEvent {
    ConnectivityChanged {
        online: bool,
    },
    SyncStateChanged {
        state: SyncState,
        last_sync: Option<DateTime<Utc>>,
    },
    /// Local state was replaced wholesale (initial load, manual refresh, or
    /// the full resync after a failed remote write).
    StateRefreshed,
    Error(String),
}

struct GatewayState {
    coordinator: ConsistencyCoordinator,
    online: bool,
    sync_state: SyncState,
    last_sync: Option<DateTime<Utc>>,
}

/// Applies mutations optimistically to the local ledgers, pushes equivalent
/// writes to the remote store, and reconciles by full reload on failure.
///
/// One mutex covers the whole mutate-and-submit section, so no two composite
/// operations interleave: local state is always updated before the remote
/// call is issued, and the remote acknowledgment is the only event that can
/// cause a visible correction.
pub struct SyncGateway {
    remote: Arc<dyn RemoteStore>,
    inner: Mutex<GatewayState>,
    events: broadcast::Sender<GatewayEvent>,
}

impl SyncGateway {
    pub fn new(coordinator: ConsistencyCoordinator, remote: Arc<dyn RemoteStore>) -> Arc<Self> {
        let (events, _) = broadcast::channel(256);
        Arc::new(Self {
            remote,
            inner: Mutex::new(GatewayState {
                coordinator,
                online: false,
                sync_state: SyncState::Idle,
                last_sync: None,
            }),
            events,
        })
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<GatewayEvent> {
        self.events.subscribe()
    }

    pub async fn is_online(&self) -> bool {
        self.inner.lock().await.online
    }

    pub async fn sync_status(&self) -> (SyncState, Option<DateTime<Utc>>) {
        let guard = self.inner.lock().await;
        (guard.sync_state, guard.last_sync)
    }

    pub async fn snapshot(&self) -> CoordinatorSnapshot {
        self.inner.lock().await.coordinator.snapshot()
    }

    pub async fn volunteers(&self) -> Vec<Volunteer> {
        self.inner.lock().await.coordinator.volunteers()
    }

    pub async fn project_date(&self, date: NaiveDate) -> DateProjection {
        self.inner.lock().await.coordinator.project_date(date)
    }

    /// Probes the health endpoint once and records the transition. Offline
    /// gateways apply mutations locally only.
    pub async fn check_connection(&self) -> bool {
        let online = self.remote.health().await.is_ok();
        let mut guard = self.inner.lock().await;
        if guard.online != online {
            guard.online = online;
            info!(online, "gateway: connectivity changed");
            let _ = self
                .events
                .send(GatewayEvent::ConnectivityChanged { online });
        }
        online
    }

    /// Re-probes connectivity every [`HEALTH_PROBE_INTERVAL`].
    pub fn spawn_connectivity_probe(self: &Arc<Self>) -> JoinHandle<()> {
        let gateway = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(HEALTH_PROBE_INTERVAL);
            loop {
                ticker.tick().await;
                gateway.check_connection().await;
            }
        })
    }

    /// Manual full reload of all four collections from the remote store.
    pub async fn refresh(&self) -> Result<(), ScheduleError> {
        let mut guard = self.inner.lock().await;
        if !guard.online {
            return Err(ScheduleError::RemoteUnavailable(
                "cannot refresh while offline".into(),
            ));
        }
        self.set_sync_state(&mut guard, SyncState::Syncing);
        match self.reload_into(&mut guard).await {
            Ok(()) => {
                guard.last_sync = Some(Utc::now());
                self.set_sync_state(&mut guard, SyncState::Success);
                Ok(())
            }
            Err(error) => {
                self.set_sync_state(&mut guard, SyncState::Error);
                Err(ScheduleError::RemoteUnavailable(error.to_string()))
            }
        }
    }

    pub async fn mark_event_complete(&self, date_id: NaiveDate) -> Result<(), ScheduleError> {
        let mut guard = self.inner.lock().await;
        let mutation = guard.coordinator.mark_event_complete(date_id)?;
        self.submit(&mut guard, mutation).await
    }

    pub async fn rename_date(
        &self,
        date_id: NaiveDate,
        new_value: NaiveDate,
    ) -> Result<(), ScheduleError> {
        let mut guard = self.inner.lock().await;
        let mutation = guard.coordinator.rename_date(date_id, new_value)?;
        self.submit(&mut guard, mutation).await
    }

    pub async fn add_volunteer(&self, name: &str) -> Result<(), ScheduleError> {
        let mut guard = self.inner.lock().await;
        let mutation = guard.coordinator.add_volunteer(name)?;
        self.submit(&mut guard, mutation).await
    }

    pub async fn set_availability(
        &self,
        name: &str,
        dates: BTreeSet<NaiveDate>,
    ) -> Result<(), ScheduleError> {
        let mut guard = self.inner.lock().await;
        let mutation = guard.coordinator.set_availability(name, dates)?;
        self.submit(&mut guard, mutation).await
    }

    pub async fn remove_volunteer_availability(
        &self,
        name: &str,
        date: NaiveDate,
    ) -> Result<(), ScheduleError> {
        let mut guard = self.inner.lock().await;
        let mutation = guard.coordinator.remove_volunteer_availability(name, date)?;
        self.submit(&mut guard, mutation).await
    }

    pub async fn allocate(
        &self,
        date: NaiveDate,
        role: Role,
        person: &str,
    ) -> Result<(), ScheduleError> {
        let mut guard = self.inner.lock().await;
        let mutation = guard.coordinator.allocate(date, role, person)?;
        self.submit(&mut guard, mutation).await
    }

    pub async fn deallocate(
        &self,
        date: NaiveDate,
        role: Role,
        person: &str,
    ) -> Result<(), ScheduleError> {
        let mut guard = self.inner.lock().await;
        let mutation = guard.coordinator.deallocate(date, role, person);
        self.submit(&mut guard, mutation).await
    }

    /// Remote half of an apply. The local mutation has already happened; when
    /// offline this is a no-op and the optimistic state stands unsynced.
    async fn submit(
        &self,
        guard: &mut GatewayState,
        mutation: AppliedMutation,
    ) -> Result<(), ScheduleError> {
        if !guard.online {
            return Ok(());
        }

        self.set_sync_state(guard, SyncState::Syncing);
        match self.push_remote(&mutation).await {
            Ok(()) => {
                guard.last_sync = Some(Utc::now());
                self.set_sync_state(guard, SyncState::Success);
                Ok(())
            }
            Err(error) => {
                warn!(%error, "gateway: remote write failed; reloading from remote");
                self.set_sync_state(guard, SyncState::Error);
                if let Err(reload_error) = self.reload_into(guard).await {
                    let _ = self.events.send(GatewayEvent::Error(format!(
                        "full reload after failed write also failed: {reload_error}"
                    )));
                }
                Err(ScheduleError::RemoteWriteFailed(error.to_string()))
            }
        }
    }

    /// Builds the remote write(s) equivalent to an applied mutation.
    async fn push_remote(&self, mutation: &AppliedMutation) -> anyhow::Result<()> {
        let timestamp = Utc::now();
        match mutation {
            AppliedMutation::EventCompleted {
                date_id,
                completed_date,
            } => {
                self.remote
                    .mark_event_complete(*date_id, *completed_date, timestamp)
                    .await
            }
            AppliedMutation::DateRenamed { dates, .. } => {
                self.remote.update_dates(dates).await
            }
            AppliedMutation::VolunteerAdded { volunteer } => {
                self.remote.add_volunteer(volunteer).await
            }
            AppliedMutation::AvailabilitySet {
                volunteer_name,
                dates,
            } => {
                self.remote
                    .update_volunteer_availability(volunteer_name, dates, timestamp)
                    .await
            }
            AppliedMutation::AvailabilityDateRemoved {
                volunteer_name,
                date,
                cascaded_allocations,
            } => {
                self.remote
                    .remove_availability_date(volunteer_name, *date, timestamp)
                    .await?;
                for record in cascaded_allocations {
                    self.remote
                        .deallocate(&allocation_write(record, timestamp))
                        .await?;
                }
                Ok(())
            }
            AppliedMutation::Allocated { record } => {
                self.remote
                    .allocate(&allocation_write(record, timestamp))
                    .await
            }
            AppliedMutation::Deallocated { date, role, person } => {
                self.remote
                    .deallocate(&AllocationWrite {
                        date: *date,
                        role: *role,
                        person: person.clone(),
                        timestamp,
                    })
                    .await
            }
        }
    }

    /// Fetches all four entity collections in parallel and replaces local
    /// state with the authoritative copy.
    async fn reload_into(&self, guard: &mut GatewayState) -> anyhow::Result<()> {
        let (dates, volunteers, availability_rows, allocations) = try_join!(
            self.remote.get_dates(),
            self.remote.get_volunteers(),
            self.remote.get_availability(),
            self.remote.get_allocations(),
        )?;

        guard.coordinator.restore(
            dates,
            &volunteers,
            group_availability_rows(availability_rows),
            allocations,
        );
        let _ = self.events.send(GatewayEvent::StateRefreshed);
        Ok(())
    }

    fn set_sync_state(&self, guard: &mut GatewayState, state: SyncState) {
        guard.sync_state = state;
        let _ = self.events.send(GatewayEvent::SyncStateChanged {
            state,
            last_sync: guard.last_sync,
        });
    }
}

fn allocation_write(record: &AllocationRecord, timestamp: DateTime<Utc>) -> AllocationWrite {
    AllocationWrite {
        date: record.date,
        role: record.role,
        person: record.person.clone(),
        timestamp,
    }
}

#[cfg(test)]
#[path = "tests/gateway_tests.rs"]
mod tests;
