use axum::{
    extract::{rejection::JsonRejection, Extension, Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};

use auth_cell::RoleResolver;
use shared_database::AppState;
use shared_models::auth::{Role, User};
use shared_models::error::AppError;
use shared_models::scheduling::Appointment;
use shared_utils::extractor::{json_body, parse_uuid};
use shared_utils::time::parse_instant;

use crate::models::BookAppointmentRequest;
use crate::services::BookingService;

#[axum::debug_handler]
pub async fn book_appointment(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    payload: Result<Json<BookAppointmentRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Appointment>), AppError> {
    let request = json_body(payload)?;

    let (doctor_id, starts_at) = match (request.doctor_id.as_deref(), request.starts_at.as_deref()) {
        (Some(doctor_id), Some(starts_at)) => (doctor_id, starts_at),
        _ => return Err(AppError::BadRequest("doctor_id & starts_at required".to_string())),
    };
    let doctor_id = parse_uuid(doctor_id, "doctor_id")?;
    let starts_at = parse_instant(starts_at)
        .ok_or_else(|| AppError::BadRequest("starts_at must be ISO date".to_string()))?;

    let appointment = BookingService::new(state.store.clone())
        .book(&user, doctor_id, starts_at)
        .await?;

    Ok((StatusCode::CREATED, Json(appointment)))
}

pub async fn cancel_appointment(
    State(state): State<AppState>,
    Path(appointment_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let appointment_id = parse_uuid(&appointment_id, "appointment id")?;

    BookingService::new(state.store.clone())
        .cancel(appointment_id)
        .await?;

    Ok(Json(json!({ "ok": true })))
}

pub async fn list_my_appointments(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
) -> Result<Json<Vec<Appointment>>, AppError> {
    let appointments = BookingService::new(state.store.clone())
        .list_for_user(&user)
        .await?;
    Ok(Json(appointments))
}

/// Agenda of the calling doctor.
pub async fn doctor_agenda(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
) -> Result<Json<Vec<Appointment>>, AppError> {
    let doctor_id = RoleResolver::new(state.store.clone())
        .require(&user, Role::Doctor)
        .await?
        .require_doctor_id()?;

    let appointments = BookingService::new(state.store.clone())
        .agenda(doctor_id)
        .await?;
    Ok(Json(appointments))
}
