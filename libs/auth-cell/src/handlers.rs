use axum::{
    body::Body,
    extract::State,
    http::Request,
    Json,
};
use serde_json::{json, Value};
use tracing::debug;

use shared_database::AppState;
use shared_models::error::AppError;
use shared_utils::extractor::extract_user;

use crate::services::roles::RoleResolver;

/// Local account of the caller, or the bare identity when no account row
/// exists yet (patients get one on their first booking).
pub async fn me(
    State(state): State<AppState>,
    request: Request<Body>,
) -> Result<Json<Value>, AppError> {
    let user = extract_user(&request)?;
    debug!("Resolving account for {}", user.id);

    let resolver = RoleResolver::new(state.store.clone());
    match resolver.resolve(&user).await? {
        Some(account) => Ok(Json(json!(account))),
        None => Ok(Json(json!({
            "uid": user.id,
            "email": user.email,
        }))),
    }
}
