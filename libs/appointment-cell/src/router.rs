use axum::{
    middleware,
    routing::{delete, get},
    Router,
};

use shared_database::AppState;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

/// Booking routes, nested under `/appointments`. All require a bearer token.
pub fn appointment_routes(state: AppState) -> Router {
    Router::new()
        .route(
            "/",
            get(handlers::list_my_appointments).post(handlers::book_appointment),
        )
        .route("/{appointment_id}", delete(handlers::cancel_appointment))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .with_state(state)
}

/// Doctor agenda, nested under `/my`.
pub fn doctor_agenda_routes(state: AppState) -> Router {
    Router::new()
        .route("/appointments", get(handlers::doctor_agenda))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .with_state(state)
}
