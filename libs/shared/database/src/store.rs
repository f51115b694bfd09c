use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use shared_models::auth::Account;
use shared_models::scheduling::{
    Appointment, AvailabilityRule, Doctor, UnavailabilityException,
};

use crate::error::DbError;

/// Relational store behind the scheduling engine. Plain methods are
/// independent statements; anything that must be all-or-nothing goes through
/// [`SchedulingStore::begin`].
#[async_trait]
pub trait SchedulingStore: Send + Sync {
    async fn doctor_exists(&self, doctor_id: Uuid) -> Result<bool, DbError>;

    async fn find_doctor_by_account(&self, account_id: Uuid) -> Result<Option<Doctor>, DbError>;

    async fn find_account_by_external_id(&self, external_id: &str) -> Result<Option<Account>, DbError>;

    async fn rules_for_doctor(&self, doctor_id: Uuid) -> Result<Vec<AvailabilityRule>, DbError>;

    async fn insert_rule(&self, rule: AvailabilityRule) -> Result<AvailabilityRule, DbError>;

    /// Removes a rule only when it belongs to `doctor_id`. Missing rows are not an error.
    async fn delete_rule(&self, doctor_id: Uuid, rule_id: Uuid) -> Result<(), DbError>;

    async fn exceptions_for_doctor(&self, doctor_id: Uuid) -> Result<Vec<UnavailabilityException>, DbError>;

    async fn insert_exception(&self, exception: UnavailabilityException) -> Result<UnavailabilityException, DbError>;

    async fn delete_exception(&self, doctor_id: Uuid, exception_id: Uuid) -> Result<(), DbError>;

    /// Start instants of non-cancelled appointments with `starts_at` in `[from, to)`.
    async fn taken_starts(
        &self,
        doctor_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<DateTime<Utc>>, DbError>;

    async fn appointments_for_patient(&self, patient_id: Uuid) -> Result<Vec<Appointment>, DbError>;

    async fn appointments_for_doctor(&self, doctor_id: Uuid) -> Result<Vec<Appointment>, DbError>;

    /// Marks an appointment cancelled. Unknown ids are not an error.
    async fn cancel_appointment(&self, appointment_id: Uuid) -> Result<(), DbError>;

    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, DbError>;
}

/// Atomic unit of work. Nothing written through it is visible to others until
/// [`UnitOfWork::commit`] succeeds; dropping it without committing discards
/// every staged write.
#[async_trait]
pub trait UnitOfWork: Send {
    async fn find_account_by_external_id(&mut self, external_id: &str) -> Result<Option<Account>, DbError>;

    async fn insert_account(&mut self, account: Account) -> Result<Account, DbError>;

    async fn rules_for_weekday(&mut self, doctor_id: Uuid, weekday: u8) -> Result<Vec<AvailabilityRule>, DbError>;

    async fn exceptions_for_doctor(&mut self, doctor_id: Uuid) -> Result<Vec<UnavailabilityException>, DbError>;

    /// Fails with [`DbError::UniqueViolation`] when a non-cancelled appointment
    /// already holds `(doctor_id, starts_at)`. Depending on the backend the
    /// violation may only surface from `commit`.
    async fn insert_appointment(&mut self, appointment: Appointment) -> Result<Appointment, DbError>;

    async fn commit(&mut self) -> Result<(), DbError>;

    async fn rollback(&mut self) -> Result<(), DbError>;
}
