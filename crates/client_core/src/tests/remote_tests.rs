use super::*;
use std::sync::Arc;

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use chrono::TimeZone;
use shared::domain::{EventDate, Role};
use tokio::{net::TcpListener, sync::Mutex};

struct ServerState {
    dates: Vec<EventDate>,
    captured: Mutex<Option<serde_json::Value>>,
}

async fn get_dates(State(state): State<Arc<ServerState>>) -> Json<DatesResponse> {
    Json(DatesResponse {
        data: state.dates.clone(),
    })
}

async fn capture_allocations(
    State(state): State<Arc<ServerState>>,
    Json(body): Json<serde_json::Value>,
) {
    *state.captured.lock().await = Some(body);
}

async fn health() -> &'static str {
    "ok"
}

/// Serves the webhook surface under a path prefix, like the real deployment,
/// so base-url joining is exercised too.
async fn spawn_server(dates: Vec<EventDate>) -> anyhow::Result<(String, Arc<ServerState>)> {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let state = Arc::new(ServerState {
        dates,
        captured: Mutex::new(None),
    });

    let webhook = Router::new()
        .route("/get-dates", get(get_dates))
        .route("/update-allocations", post(capture_allocations))
        .route("/health", get(health))
        .with_state(Arc::clone(&state));
    let app = Router::new().nest("/webhook", webhook);

    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    Ok((format!("http://{addr}/webhook"), state))
}

fn date(s: &str) -> NaiveDate {
    s.parse().expect("valid date")
}

#[tokio::test]
async fn get_dates_unwraps_the_data_envelope() {
    let seeded = vec![
        EventDate::active(date("2025-09-06")),
        EventDate::active(date("2025-09-20")),
    ];
    let (base_url, _state) = spawn_server(seeded.clone()).await.expect("server");

    let store = HttpRemoteStore::new(&base_url).expect("store");
    let dates = store.get_dates().await.expect("get dates");
    assert_eq!(dates, seeded);
}

#[tokio::test]
async fn allocate_posts_the_tagged_action_body() {
    let (base_url, state) = spawn_server(Vec::new()).await.expect("server");
    let store = HttpRemoteStore::new(&base_url).expect("store");

    store
        .allocate(&AllocationWrite {
            date: date("2025-09-06"),
            role: Role::Hall,
            person: "Maria".into(),
            timestamp: Utc.with_ymd_and_hms(2025, 9, 1, 12, 0, 0).single().expect("timestamp"),
        })
        .await
        .expect("allocate");

    let captured = state.captured.lock().await.clone().expect("captured body");
    assert_eq!(captured["action"], "allocate");
    assert_eq!(captured["allocation"]["function"], "Hall");
    assert_eq!(captured["allocation"]["person"], "Maria");
    assert_eq!(captured["allocation"]["date"], "2025-09-06");
}

#[tokio::test]
async fn health_probe_succeeds_against_a_live_server() {
    let (base_url, _state) = spawn_server(Vec::new()).await.expect("server");
    let store = HttpRemoteStore::new(&base_url).expect("store");
    store.health().await.expect("healthy");
}
