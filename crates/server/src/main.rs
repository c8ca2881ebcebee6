use std::{net::SocketAddr, sync::Arc};

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use schedule_core::config::DEFAULT_INTERVAL_DAYS;
use shared::{
    domain::fold_name,
    error::{ApiError, ErrorCode},
    protocol::{
        AllocationsResponse, AvailabilityResponse, DatesResponse, MarkEventCompleteRequest,
        UpdateAllocationsRequest, UpdateAvailabilityRequest, UpdateDatesRequest,
        UpdateVolunteersRequest, VolunteersAction, VolunteersResponse,
    },
};
use storage::Storage;
use tracing::{error, info};

mod config;

use config::{load_settings, prepare_database_url};

#[derive(Clone)]
struct AppState {
    storage: Storage,
}

type HandlerError = (StatusCode, Json<ApiError>);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let settings = load_settings();
    let database_url = prepare_database_url(&settings.database_url)?;
    let storage = Storage::new(&database_url).await.map_err(|error| {
        error!(
            %database_url,
            %error,
            "failed to open SQLite database; verify parent directory exists and permissions are correct"
        );
        error
    })?;

    let state = AppState { storage };
    let app = build_router(Arc::new(state));

    let addr: SocketAddr = settings.server_bind.parse()?;
    info!(%addr, "remote store listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/get-dates", get(get_dates))
        .route("/update-dates", post(update_dates))
        .route("/mark-event-complete", post(mark_event_complete))
        .route("/get-volunteers", get(get_volunteers))
        .route("/update-volunteers", post(update_volunteers))
        .route("/get-availability", get(get_availability))
        .route("/update-availability", post(update_availability))
        .route("/get-allocations", get(get_allocations))
        .route("/update-allocations", post(update_allocations))
        .with_state(state)
}

async fn health(State(state): State<Arc<AppState>>) -> Result<&'static str, HandlerError> {
    state.storage.health_check().await.map_err(|e| {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ApiError::new(ErrorCode::RemoteUnavailable, e.to_string())),
        )
    })?;
    Ok("ok")
}

async fn get_dates(
    State(state): State<Arc<AppState>>,
) -> Result<Json<DatesResponse>, HandlerError> {
    let data = state.storage.list_dates().await.map_err(internal)?;
    Ok(Json(DatesResponse { data }))
}

async fn update_dates(
    State(state): State<Arc<AppState>>,
    Json(request): Json<UpdateDatesRequest>,
) -> Result<Json<serde_json::Value>, HandlerError> {
    state
        .storage
        .replace_dates(&request.dates)
        .await
        .map_err(internal)?;
    info!(count = request.dates.len(), "dates sheet replaced");
    Ok(success())
}

async fn mark_event_complete(
    State(state): State<Arc<AppState>>,
    Json(request): Json<MarkEventCompleteRequest>,
) -> Result<Json<serde_json::Value>, HandlerError> {
    state
        .storage
        .complete_event(
            request.date_id,
            request.completed_date,
            DEFAULT_INTERVAL_DAYS,
        )
        .await
        .map_err(internal)?;
    info!(date = %request.completed_date, "event completed and rotated");
    Ok(success())
}

async fn get_volunteers(
    State(state): State<Arc<AppState>>,
) -> Result<Json<VolunteersResponse>, HandlerError> {
    let data = state.storage.list_volunteers().await.map_err(internal)?;
    Ok(Json(VolunteersResponse { data }))
}

async fn update_volunteers(
    State(state): State<Arc<AppState>>,
    Json(request): Json<UpdateVolunteersRequest>,
) -> Result<Json<serde_json::Value>, HandlerError> {
    match (request.action, request.volunteer, request.volunteers) {
        (Some(VolunteersAction::Add), Some(volunteer), _) => {
            let existing = state.storage.list_volunteers().await.map_err(internal)?;
            let folded = fold_name(&volunteer.name);
            if existing
                .iter()
                .any(|entry| fold_name(&entry.name) == folded)
            {
                return Err((
                    StatusCode::CONFLICT,
                    Json(ApiError::new(
                        ErrorCode::Duplicate,
                        format!("volunteer '{}' already exists", volunteer.name),
                    )),
                ));
            }
            state
                .storage
                .insert_volunteer(&volunteer)
                .await
                .map_err(internal)?;
            Ok(success())
        }
        (None, _, Some(volunteers)) => {
            state
                .storage
                .replace_volunteers(&volunteers)
                .await
                .map_err(internal)?;
            Ok(success())
        }
        _ => Err((
            StatusCode::BAD_REQUEST,
            Json(ApiError::new(
                ErrorCode::InvalidArgument,
                "request must carry either an add action with a volunteer or a volunteers list",
            )),
        )),
    }
}

async fn get_availability(
    State(state): State<Arc<AppState>>,
) -> Result<Json<AvailabilityResponse>, HandlerError> {
    let data = state
        .storage
        .list_availability_rows()
        .await
        .map_err(internal)?;
    Ok(Json(AvailabilityResponse { data }))
}

async fn update_availability(
    State(state): State<Arc<AppState>>,
    Json(request): Json<UpdateAvailabilityRequest>,
) -> Result<Json<serde_json::Value>, HandlerError> {
    match request {
        UpdateAvailabilityRequest::UpdateVolunteer {
            volunteer_name,
            dates,
            ..
        } => {
            state
                .storage
                .set_volunteer_availability(&volunteer_name, &dates)
                .await
                .map_err(internal)?;
        }
        UpdateAvailabilityRequest::RemoveDate {
            volunteer_name,
            date,
            ..
        } => {
            state
                .storage
                .remove_availability_date(&volunteer_name, date)
                .await
                .map_err(internal)?;
        }
    }
    Ok(success())
}

async fn get_allocations(
    State(state): State<Arc<AppState>>,
) -> Result<Json<AllocationsResponse>, HandlerError> {
    let data = state.storage.list_allocations().await.map_err(internal)?;
    Ok(Json(AllocationsResponse { data }))
}

async fn update_allocations(
    State(state): State<Arc<AppState>>,
    Json(request): Json<UpdateAllocationsRequest>,
) -> Result<Json<serde_json::Value>, HandlerError> {
    match request {
        UpdateAllocationsRequest::Allocate { allocation } => {
            state
                .storage
                .insert_allocation(&allocation)
                .await
                .map_err(internal)?;
        }
        UpdateAllocationsRequest::Deallocate { allocation } => {
            state
                .storage
                .delete_allocation(&allocation)
                .await
                .map_err(internal)?;
        }
    }
    Ok(success())
}

fn success() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "success": true }))
}

fn internal(err: anyhow::Error) -> HandlerError {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ApiError::new(ErrorCode::Internal, err.to_string())),
    )
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
