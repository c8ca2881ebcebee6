//! End-to-end acceptance: a gateway backed by the HTTP remote store talking
//! to an in-process server that keeps sheets in memory.

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::{Duration, NaiveDate};
use client_core::{HttpRemoteStore, RemoteStore, SyncGateway};
use schedule_core::{ConsistencyCoordinator, ScheduleConfig};
use shared::{
    domain::{AllocationId, AllocationRecord, EventDate, Role, Volunteer},
    error::ScheduleError,
    protocol::{
        AllocationsResponse, AvailabilityResponse, AvailabilityRow, DatesResponse,
        MarkEventCompleteRequest, UpdateAllocationsRequest, UpdateAvailabilityRequest,
        UpdateDatesRequest, UpdateVolunteersRequest, VolunteersResponse,
    },
};
use tokio::{net::TcpListener, sync::Mutex};

#[derive(Default)]
struct Sheets {
    dates: Vec<EventDate>,
    volunteers: Vec<Volunteer>,
    availability: Vec<AvailabilityRow>,
    allocations: Vec<AllocationRecord>,
}

struct ServerState {
    sheets: Mutex<Sheets>,
    fail_allocation_writes: Mutex<bool>,
}

async fn get_dates(State(state): State<Arc<ServerState>>) -> Json<DatesResponse> {
    Json(DatesResponse {
        data: state.sheets.lock().await.dates.clone(),
    })
}

async fn update_dates(
    State(state): State<Arc<ServerState>>,
    Json(request): Json<UpdateDatesRequest>,
) {
    state.sheets.lock().await.dates = request.dates;
}

async fn mark_event_complete(
    State(state): State<Arc<ServerState>>,
    Json(request): Json<MarkEventCompleteRequest>,
) {
    let mut sheets = state.sheets.lock().await;
    sheets.dates.retain(|entry| entry.id != request.date_id);
    if let Some(last) = sheets.dates.iter().map(|entry| entry.date).max() {
        sheets.dates.push(EventDate::active(last + Duration::days(14)));
    }
    sheets
        .availability
        .retain(|row| row.date != request.completed_date);
    sheets
        .allocations
        .retain(|record| record.date != request.completed_date);
}

async fn get_volunteers(State(state): State<Arc<ServerState>>) -> Json<VolunteersResponse> {
    Json(VolunteersResponse {
        data: state.sheets.lock().await.volunteers.clone(),
    })
}

async fn update_volunteers(
    State(state): State<Arc<ServerState>>,
    Json(request): Json<UpdateVolunteersRequest>,
) {
    if let Some(volunteer) = request.volunteer {
        state.sheets.lock().await.volunteers.push(volunteer);
    }
}

async fn get_availability(State(state): State<Arc<ServerState>>) -> Json<AvailabilityResponse> {
    Json(AvailabilityResponse {
        data: state.sheets.lock().await.availability.clone(),
    })
}

async fn update_availability(
    State(state): State<Arc<ServerState>>,
    Json(request): Json<UpdateAvailabilityRequest>,
) {
    let mut sheets = state.sheets.lock().await;
    match request {
        UpdateAvailabilityRequest::UpdateVolunteer {
            volunteer_name,
            dates,
            ..
        } => {
            let volunteer_id = sheets
                .volunteers
                .iter()
                .find(|volunteer| volunteer.name == volunteer_name)
                .map(|volunteer| volunteer.id)
                .unwrap_or_else(shared::domain::VolunteerId::fresh);
            sheets
                .availability
                .retain(|row| row.volunteer_name != volunteer_name);
            for date in dates {
                sheets.availability.push(AvailabilityRow {
                    volunteer_id,
                    volunteer_name: volunteer_name.clone(),
                    date,
                });
            }
        }
        UpdateAvailabilityRequest::RemoveDate {
            volunteer_name,
            date,
            ..
        } => {
            sheets
                .availability
                .retain(|row| !(row.volunteer_name == volunteer_name && row.date == date));
        }
    }
}

async fn get_allocations(State(state): State<Arc<ServerState>>) -> Json<AllocationsResponse> {
    Json(AllocationsResponse {
        data: state.sheets.lock().await.allocations.clone(),
    })
}

async fn update_allocations(
    State(state): State<Arc<ServerState>>,
    Json(request): Json<UpdateAllocationsRequest>,
) -> StatusCode {
    if *state.fail_allocation_writes.lock().await {
        return StatusCode::INTERNAL_SERVER_ERROR;
    }
    let mut sheets = state.sheets.lock().await;
    match request {
        UpdateAllocationsRequest::Allocate { allocation } => {
            sheets.allocations.push(AllocationRecord {
                id: AllocationId::fresh(),
                date: allocation.date,
                role: allocation.role,
                person: allocation.person,
            });
        }
        UpdateAllocationsRequest::Deallocate { allocation } => {
            sheets.allocations.retain(|record| {
                !(record.date == allocation.date
                    && record.role == allocation.role
                    && record.person == allocation.person)
            });
        }
    }
    StatusCode::OK
}

async fn spawn_server(dates: Vec<EventDate>) -> anyhow::Result<(String, Arc<ServerState>)> {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let state = Arc::new(ServerState {
        sheets: Mutex::new(Sheets {
            dates,
            ..Sheets::default()
        }),
        fail_allocation_writes: Mutex::new(false),
    });

    let app = Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/get-dates", get(get_dates))
        .route("/update-dates", post(update_dates))
        .route("/mark-event-complete", post(mark_event_complete))
        .route("/get-volunteers", get(get_volunteers))
        .route("/update-volunteers", post(update_volunteers))
        .route("/get-availability", get(get_availability))
        .route("/update-availability", post(update_availability))
        .route("/get-allocations", get(get_allocations))
        .route("/update-allocations", post(update_allocations))
        .with_state(Arc::clone(&state));

    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    Ok((format!("http://{addr}"), state))
}

fn date(s: &str) -> NaiveDate {
    s.parse().expect("valid date")
}

async fn online_gateway() -> anyhow::Result<(Arc<SyncGateway>, Arc<ServerState>)> {
    let coordinator = ConsistencyCoordinator::new(ScheduleConfig::default(), date("2025-09-01"));
    let (base_url, state) = spawn_server(coordinator.snapshot().dates).await?;
    let remote: Arc<dyn RemoteStore> = Arc::new(HttpRemoteStore::new(&base_url)?);
    let gateway = SyncGateway::new(coordinator, remote);
    assert!(gateway.check_connection().await);
    Ok((gateway, state))
}

#[tokio::test]
async fn mutations_flow_through_to_the_remote_sheets() -> anyhow::Result<()> {
    let (gateway, state) = online_gateway().await?;
    let s1 = date("2025-09-06");

    gateway.add_volunteer("Maria").await.expect("add volunteer");
    gateway
        .set_availability("Maria", [s1].into_iter().collect())
        .await
        .expect("set availability");
    gateway.allocate(s1, Role::Hall, "Maria").await.expect("allocate");

    let sheets = state.sheets.lock().await;
    assert_eq!(sheets.volunteers.len(), 1);
    assert_eq!(sheets.availability.len(), 1);
    assert_eq!(sheets.allocations.len(), 1);
    assert_eq!(sheets.allocations[0].person, "Maria");
    Ok(())
}

#[tokio::test]
async fn completion_cascades_on_both_sides() -> anyhow::Result<()> {
    let (gateway, state) = online_gateway().await?;
    let s1 = date("2025-09-06");

    gateway
        .set_availability("Maria", [s1].into_iter().collect())
        .await
        .expect("set availability");
    gateway.allocate(s1, Role::Reception, "Maria").await.expect("allocate");
    gateway.mark_event_complete(s1).await.expect("complete");

    let snapshot = gateway.snapshot().await;
    assert_eq!(snapshot.dates.len(), 4);
    assert!(!snapshot.dates.iter().any(|entry| entry.date == s1));
    assert!(snapshot.allocations.is_empty());

    let sheets = state.sheets.lock().await;
    assert_eq!(sheets.dates.len(), 4);
    assert!(sheets.availability.is_empty());
    assert!(sheets.allocations.is_empty());
    Ok(())
}

#[tokio::test]
async fn failed_remote_write_resyncs_from_the_server() -> anyhow::Result<()> {
    let (gateway, state) = online_gateway().await?;
    let s1 = date("2025-09-06");
    *state.fail_allocation_writes.lock().await = true;

    let err = gateway.allocate(s1, Role::Hall, "Maria").await.unwrap_err();
    assert!(matches!(err, ScheduleError::RemoteWriteFailed(_)));

    // The optimistic allocation was discarded by the full reload.
    let snapshot = gateway.snapshot().await;
    assert!(snapshot.allocations.is_empty());
    assert_eq!(snapshot.dates.len(), 4);
    Ok(())
}
