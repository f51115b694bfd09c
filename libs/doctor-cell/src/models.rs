use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use shared_database::DbError;
use shared_models::error::AppError;

/// A bookable interval offered to patients. Derived on every request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Slot {
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct SlotQuery {
    pub from: Option<String>,
    pub to: Option<String>,
}

/// Body of `POST /my/availability`. Times are `HH:MM` or `HH:MM:SS` in UTC.
#[derive(Debug, Deserialize)]
pub struct CreateAvailabilityRequest {
    pub weekday: Option<i64>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub slot_minutes: Option<i64>,
}

/// Body of `POST /my/unavailability`.
#[derive(Debug, Deserialize)]
pub struct CreateUnavailabilityRequest {
    pub starts_at: Option<String>,
    pub ends_at: Option<String>,
}

#[derive(Debug, Error)]
pub enum DoctorError {
    #[error("Doctor not found")]
    NotFound,

    #[error("{0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(#[from] DbError),
}

impl From<DoctorError> for AppError {
    fn from(err: DoctorError) -> Self {
        match err {
            DoctorError::NotFound => AppError::NotFound(err.to_string()),
            DoctorError::Validation(msg) => AppError::BadRequest(msg),
            DoctorError::Database(db) => AppError::Internal(db.to_string()),
        }
    }
}
