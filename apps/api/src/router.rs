use axum::{routing::get, Json, Router};
use chrono::{SecondsFormat, Utc};
use serde_json::{json, Value};

use appointment_cell::router::{appointment_routes, doctor_agenda_routes};
use auth_cell::router::account_routes;
use doctor_cell::router::{doctor_routes, my_availability_routes};
use shared_database::AppState;

async fn ping() -> Json<Value> {
    Json(json!({
        "ok": true,
        "now": Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
    }))
}

pub fn create_router(state: AppState) -> Router {
    let my_routes = my_availability_routes(state.clone()).merge(doctor_agenda_routes(state.clone()));

    Router::new()
        .route("/", get(|| async { "Scheduling API is running!" }))
        .route("/ping", get(ping))
        .merge(account_routes(state.clone()))
        .nest("/doctors", doctor_routes(state.clone()))
        .nest("/appointments", appointment_routes(state.clone()))
        .nest("/my", my_routes)
}
