use axum::{
    middleware,
    routing::{delete, get},
    Router,
};

use shared_database::AppState;
use shared_utils::extractor::auth_middleware;

use crate::handlers;

/// Public doctor routes, nested under `/doctors`.
pub fn doctor_routes(state: AppState) -> Router {
    Router::new()
        .route("/{doctor_id}/availability", get(handlers::get_doctor_availability))
        .with_state(state)
}

/// Doctor self-service routes, nested under `/my`. Doctor or admin role required.
pub fn my_availability_routes(state: AppState) -> Router {
    Router::new()
        .route(
            "/availability",
            get(handlers::list_my_availability).post(handlers::create_my_availability),
        )
        .route("/availability/{availability_id}", delete(handlers::delete_my_availability))
        .route(
            "/unavailability",
            get(handlers::list_my_unavailability).post(handlers::create_my_unavailability),
        )
        .route("/unavailability/{unavailability_id}", delete(handlers::delete_my_unavailability))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .with_state(state)
}
