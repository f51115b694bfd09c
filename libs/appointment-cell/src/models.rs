use serde::Deserialize;
use thiserror::Error;

use shared_database::DbError;
use shared_models::error::AppError;

/// Body of `POST /appointments`.
#[derive(Debug, Deserialize)]
pub struct BookAppointmentRequest {
    pub doctor_id: Option<String>,
    pub starts_at: Option<String>,
}

#[derive(Debug, Error)]
pub enum AppointmentError {
    #[error("Doctor not found")]
    DoctorNotFound,

    #[error("{0}")]
    InvalidSlot(String),

    #[error("Slot already booked")]
    SlotConflict,

    #[error("Database error: {0}")]
    Database(DbError),
}

impl From<DbError> for AppointmentError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::UniqueViolation(_) => AppointmentError::SlotConflict,
            // The doctor row vanished between the existence check and the insert.
            DbError::ForeignKeyViolation(_) => AppointmentError::DoctorNotFound,
            other => AppointmentError::Database(other),
        }
    }
}

impl From<AppointmentError> for AppError {
    fn from(err: AppointmentError) -> Self {
        match err {
            AppointmentError::DoctorNotFound => AppError::NotFound(err.to_string()),
            AppointmentError::InvalidSlot(msg) => AppError::InvalidSlot(msg),
            AppointmentError::SlotConflict => AppError::SlotConflict(err.to_string()),
            AppointmentError::Database(db) => AppError::Internal(db.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_store_errors_are_classified() {
        assert_matches!(
            AppointmentError::from(DbError::UniqueViolation("appointments_doctor_slot".to_string())),
            AppointmentError::SlotConflict
        );
        assert_matches!(
            AppointmentError::from(DbError::ForeignKeyViolation("doctor_id".to_string())),
            AppointmentError::DoctorNotFound
        );
        assert_matches!(
            AppointmentError::from(DbError::Auth("expired".to_string())),
            AppointmentError::Database(_)
        );
    }

    #[test]
    fn test_http_mapping() {
        let conflict: AppError = AppointmentError::SlotConflict.into();
        assert_eq!(conflict.code(), "slot_conflict");

        let invalid: AppError = AppointmentError::InvalidSlot("Chosen time not in doctor availability".to_string()).into();
        assert_eq!(invalid.code(), "invalid_slot");

        let missing: AppError = AppointmentError::DoctorNotFound.into();
        assert_eq!(missing.code(), "not_found");
    }
}
