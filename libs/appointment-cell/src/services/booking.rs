use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use doctor_cell::services::interval::contains;
use doctor_cell::services::slots::{blocked_by, on_grid, rule_window, slot_length, weekday_index};
use shared_database::{SchedulingStore, UnitOfWork};
use shared_models::auth::{Account, User};
use shared_models::scheduling::Appointment;

use crate::models::AppointmentError;

pub struct BookingService {
    store: Arc<dyn SchedulingStore>,
}

impl BookingService {
    pub fn new(store: Arc<dyn SchedulingStore>) -> Self {
        Self { store }
    }

    /// Books `starts_at` with `doctor_id` for the caller.
    ///
    /// Provisioning the caller's patient account, validating the slot and
    /// inserting the appointment form one unit of work. Nothing is kept when
    /// any step fails.
    pub async fn book(
        &self,
        user: &User,
        doctor_id: Uuid,
        starts_at: DateTime<Utc>,
    ) -> Result<Appointment, AppointmentError> {
        if !self.store.doctor_exists(doctor_id).await? {
            return Err(AppointmentError::DoctorNotFound);
        }

        let mut unit = self.store.begin().await?;

        let outcome = match Self::stage(unit.as_mut(), user, doctor_id, starts_at).await {
            Ok(appointment) => unit
                .commit()
                .await
                .map(|_| appointment)
                .map_err(AppointmentError::from),
            Err(err) => Err(err),
        };

        match outcome {
            Ok(appointment) => {
                info!(
                    "Booked appointment {} with doctor {} at {}",
                    appointment.id, doctor_id, starts_at
                );
                Ok(appointment)
            }
            Err(err) => {
                if let Err(rollback_err) = unit.rollback().await {
                    warn!("Rollback after failed booking also failed: {}", rollback_err);
                }
                warn!("Booking with doctor {} at {} rejected: {}", doctor_id, starts_at, err);
                Err(err)
            }
        }
    }

    async fn stage(
        unit: &mut dyn UnitOfWork,
        user: &User,
        doctor_id: Uuid,
        starts_at: DateTime<Utc>,
    ) -> Result<Appointment, AppointmentError> {
        let patient = match unit.find_account_by_external_id(&user.id).await? {
            Some(account) => account,
            None => {
                let account = unit.insert_account(Account::new_patient(user)).await?;
                debug!("Provisioning patient account {} for {}", account.id, user.id);
                account
            }
        };

        let date = starts_at.date_naive();
        let mut rules = unit.rules_for_weekday(doctor_id, weekday_index(date)).await?;
        rules.sort_by_key(|rule| rule.start_time);

        // On-grid rules first, in the order the slot listing uses.
        let mut candidates: Vec<(bool, DateTime<Utc>)> = rules
            .iter()
            .filter_map(|rule| {
                let ends_at = starts_at + slot_length(rule)?;
                let (window_start, window_end) = rule_window(rule, date);
                contains(&window_start, &window_end, &starts_at, &ends_at)
                    .then(|| (on_grid(rule, date, starts_at), ends_at))
            })
            .collect();
        candidates.sort_by_key(|(aligned, _)| !aligned);
        let candidate_ends: Vec<DateTime<Utc>> = candidates.into_iter().map(|(_, ends_at)| ends_at).collect();

        if candidate_ends.is_empty() {
            return Err(AppointmentError::InvalidSlot(
                "Chosen time not in doctor availability".to_string(),
            ));
        }

        let exceptions = unit.exceptions_for_doctor(doctor_id).await?;
        let ends_at = candidate_ends
            .into_iter()
            .find(|ends_at| !blocked_by(&exceptions, starts_at, *ends_at))
            .ok_or_else(|| {
                AppointmentError::InvalidSlot("Chosen time overlaps doctor unavailability".to_string())
            })?;

        let appointment = Appointment::scheduled(patient.id, doctor_id, starts_at, ends_at);
        Ok(unit.insert_appointment(appointment).await?)
    }

    /// Marks an appointment cancelled. Unknown and already-cancelled ids succeed.
    pub async fn cancel(&self, appointment_id: Uuid) -> Result<(), AppointmentError> {
        self.store.cancel_appointment(appointment_id).await?;
        info!("Cancelled appointment {}", appointment_id);
        Ok(())
    }

    /// The caller's appointments as a patient, earliest first.
    pub async fn list_for_user(&self, user: &User) -> Result<Vec<Appointment>, AppointmentError> {
        match self.store.find_account_by_external_id(&user.id).await? {
            Some(account) => Ok(self.store.appointments_for_patient(account.id).await?),
            None => Ok(Vec::new()),
        }
    }

    pub async fn agenda(&self, doctor_id: Uuid) -> Result<Vec<Appointment>, AppointmentError> {
        Ok(self.store.appointments_for_doctor(doctor_id).await?)
    }
}
