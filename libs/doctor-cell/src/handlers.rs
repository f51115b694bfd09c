use axum::{
    extract::{rejection::JsonRejection, Extension, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use auth_cell::RoleResolver;
use shared_database::AppState;
use shared_models::auth::{Role, User};
use shared_models::error::AppError;
use shared_models::scheduling::{AvailabilityRule, UnavailabilityException};
use shared_utils::extractor::{json_body, parse_uuid};
use shared_utils::time::parse_instant;

use crate::models::{CreateAvailabilityRequest, CreateUnavailabilityRequest, Slot, SlotQuery};
use crate::services::AvailabilityService;

async fn own_doctor_id(state: &AppState, user: &User) -> Result<Uuid, AppError> {
    RoleResolver::new(state.store.clone())
        .require(user, Role::Doctor)
        .await?
        .require_doctor_id()
}

// Public

#[axum::debug_handler]
pub async fn get_doctor_availability(
    State(state): State<AppState>,
    Path(doctor_id): Path<String>,
    Query(query): Query<SlotQuery>,
) -> Result<Json<Vec<Slot>>, AppError> {
    let doctor_id = parse_uuid(&doctor_id, "doctor id")?;

    let (from, to) = match (query.from.as_deref(), query.to.as_deref()) {
        (Some(from), Some(to)) => (from, to),
        _ => return Err(AppError::BadRequest("from & to required (ISO)".to_string())),
    };
    let from = parse_instant(from).ok_or_else(|| AppError::BadRequest("from must be an ISO-8601 timestamp".to_string()))?;
    let to = parse_instant(to).ok_or_else(|| AppError::BadRequest("to must be an ISO-8601 timestamp".to_string()))?;

    let slots = AvailabilityService::new(state.store.clone())
        .list_slots(doctor_id, from, to)
        .await?;

    Ok(Json(slots))
}

// Doctor self-service

pub async fn list_my_availability(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
) -> Result<Json<Vec<AvailabilityRule>>, AppError> {
    let doctor_id = own_doctor_id(&state, &user).await?;
    let rules = AvailabilityService::new(state.store.clone()).list_rules(doctor_id).await?;
    Ok(Json(rules))
}

pub async fn create_my_availability(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    payload: Result<Json<CreateAvailabilityRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<AvailabilityRule>), AppError> {
    let doctor_id = own_doctor_id(&state, &user).await?;
    let request = json_body(payload)?;

    let rule = AvailabilityService::new(state.store.clone())
        .create_rule(doctor_id, request)
        .await?;

    Ok((StatusCode::CREATED, Json(rule)))
}

pub async fn delete_my_availability(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(rule_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let doctor_id = own_doctor_id(&state, &user).await?;
    let rule_id = parse_uuid(&rule_id, "availability id")?;

    AvailabilityService::new(state.store.clone())
        .delete_rule(doctor_id, rule_id)
        .await?;

    Ok(Json(json!({ "ok": true })))
}

pub async fn list_my_unavailability(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
) -> Result<Json<Vec<UnavailabilityException>>, AppError> {
    let doctor_id = own_doctor_id(&state, &user).await?;
    let exceptions = AvailabilityService::new(state.store.clone())
        .list_exceptions(doctor_id)
        .await?;
    Ok(Json(exceptions))
}

pub async fn create_my_unavailability(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    payload: Result<Json<CreateUnavailabilityRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<UnavailabilityException>), AppError> {
    let doctor_id = own_doctor_id(&state, &user).await?;
    let request = json_body(payload)?;

    let exception = AvailabilityService::new(state.store.clone())
        .create_exception(doctor_id, request)
        .await?;

    Ok((StatusCode::CREATED, Json(exception)))
}

pub async fn delete_my_unavailability(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(exception_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let doctor_id = own_doctor_id(&state, &user).await?;
    let exception_id = parse_uuid(&exception_id, "unavailability id")?;

    AvailabilityService::new(state.store.clone())
        .delete_exception(doctor_id, exception_id)
        .await?;

    Ok(Json(json!({ "ok": true })))
}
