use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveTime, Utc};
use tracing::{debug, info};
use uuid::Uuid;

use shared_database::SchedulingStore;
use shared_models::scheduling::{AvailabilityRule, UnavailabilityException};
use shared_utils::time::{parse_instant, parse_time_of_day};

use crate::models::{CreateAvailabilityRequest, CreateUnavailabilityRequest, DoctorError, Slot};
use crate::services::slots::SlotGenerator;

/// Longest `[from, to)` span a slot listing may cover.
pub const MAX_SLOT_SPAN_DAYS: i64 = 366;

pub struct AvailabilityService {
    store: Arc<dyn SchedulingStore>,
}

impl AvailabilityService {
    pub fn new(store: Arc<dyn SchedulingStore>) -> Self {
        Self { store }
    }

    /// Bookable slots of a doctor with `starts_at` in `[from, to)`.
    ///
    /// Unknown doctors simply have no rules, so the result is empty. Spans
    /// longer than [`MAX_SLOT_SPAN_DAYS`] are rejected.
    pub async fn list_slots(
        &self,
        doctor_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Slot>, DoctorError> {
        if from >= to {
            return Ok(Vec::new());
        }
        if to - from > Duration::days(MAX_SLOT_SPAN_DAYS) {
            return Err(DoctorError::Validation(format!(
                "Range must not exceed {} days",
                MAX_SLOT_SPAN_DAYS
            )));
        }

        let rules = self.store.rules_for_doctor(doctor_id).await?;
        if rules.is_empty() {
            debug!("Doctor {} has no availability rules", doctor_id);
            return Ok(Vec::new());
        }

        let exceptions = self.store.exceptions_for_doctor(doctor_id).await?;
        let taken = self.store.taken_starts(doctor_id, from, to).await?;

        let slots: Vec<Slot> = SlotGenerator::new(rules, exceptions, taken).slots(from, to).collect();
        debug!("Generated {} slots for doctor {} in [{}, {})", slots.len(), doctor_id, from, to);
        Ok(slots)
    }

    pub async fn list_rules(&self, doctor_id: Uuid) -> Result<Vec<AvailabilityRule>, DoctorError> {
        Ok(self.store.rules_for_doctor(doctor_id).await?)
    }

    pub async fn create_rule(
        &self,
        doctor_id: Uuid,
        request: CreateAvailabilityRequest,
    ) -> Result<AvailabilityRule, DoctorError> {
        let rule = validate_rule(doctor_id, request)?;
        let rule = self.store.insert_rule(rule).await?;
        info!(
            "Doctor {} added availability weekday={} {}-{} every {} min",
            doctor_id, rule.weekday, rule.start_time, rule.end_time, rule.slot_minutes
        );
        Ok(rule)
    }

    pub async fn delete_rule(&self, doctor_id: Uuid, rule_id: Uuid) -> Result<(), DoctorError> {
        self.store.delete_rule(doctor_id, rule_id).await?;
        info!("Doctor {} removed availability {}", doctor_id, rule_id);
        Ok(())
    }

    pub async fn list_exceptions(&self, doctor_id: Uuid) -> Result<Vec<UnavailabilityException>, DoctorError> {
        Ok(self.store.exceptions_for_doctor(doctor_id).await?)
    }

    pub async fn create_exception(
        &self,
        doctor_id: Uuid,
        request: CreateUnavailabilityRequest,
    ) -> Result<UnavailabilityException, DoctorError> {
        let starts_at = required_instant(request.starts_at.as_deref(), "starts_at")?;
        let ends_at = required_instant(request.ends_at.as_deref(), "ends_at")?;
        if starts_at >= ends_at {
            return Err(DoctorError::Validation("starts_at must be before ends_at".to_string()));
        }

        let exception = self
            .store
            .insert_exception(UnavailabilityException {
                id: Uuid::new_v4(),
                doctor_id,
                starts_at,
                ends_at,
            })
            .await?;
        info!("Doctor {} unavailable from {} to {}", doctor_id, starts_at, ends_at);
        Ok(exception)
    }

    pub async fn delete_exception(&self, doctor_id: Uuid, exception_id: Uuid) -> Result<(), DoctorError> {
        self.store.delete_exception(doctor_id, exception_id).await?;
        info!("Doctor {} removed unavailability {}", doctor_id, exception_id);
        Ok(())
    }
}

fn validate_rule(doctor_id: Uuid, request: CreateAvailabilityRequest) -> Result<AvailabilityRule, DoctorError> {
    let weekday = request
        .weekday
        .filter(|day| (0..=6).contains(day))
        .ok_or_else(|| DoctorError::Validation("weekday must be between 0 (Sunday) and 6 (Saturday)".to_string()))?;

    let start_time = required_time(request.start_time.as_deref(), "start_time")?;
    let end_time = required_time(request.end_time.as_deref(), "end_time")?;
    if start_time >= end_time {
        return Err(DoctorError::Validation("start_time must be before end_time".to_string()));
    }

    let slot_minutes = request
        .slot_minutes
        .filter(|minutes| *minutes > 0)
        .and_then(|minutes| i32::try_from(minutes).ok())
        .ok_or_else(|| DoctorError::Validation("slot_minutes must be a positive number".to_string()))?;

    Ok(AvailabilityRule {
        id: Uuid::new_v4(),
        doctor_id,
        weekday: weekday as u8,
        start_time,
        end_time,
        slot_minutes,
    })
}

fn required_time(value: Option<&str>, field: &str) -> Result<NaiveTime, DoctorError> {
    value
        .and_then(parse_time_of_day)
        .ok_or_else(|| DoctorError::Validation(format!("{} must be a time of day (HH:MM)", field)))
}

fn required_instant(value: Option<&str>, field: &str) -> Result<DateTime<Utc>, DoctorError> {
    value
        .and_then(parse_instant)
        .ok_or_else(|| DoctorError::Validation(format!("{} must be an ISO-8601 timestamp", field)))
}
