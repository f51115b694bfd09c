use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;
use uuid::Uuid;

use shared_models::auth::Account;
use shared_models::scheduling::{
    Appointment, AppointmentStatus, AvailabilityRule, Doctor, UnavailabilityException,
};

use crate::error::DbError;
use crate::store::{SchedulingStore, UnitOfWork};

#[derive(Debug, Default)]
struct MemoryState {
    accounts: HashMap<Uuid, Account>,
    doctors: HashMap<Uuid, Doctor>,
    rules: Vec<AvailabilityRule>,
    exceptions: Vec<UnavailabilityException>,
    appointments: Vec<Appointment>,
}

impl MemoryState {
    fn account_by_external_id(&self, external_id: &str) -> Option<&Account> {
        self.accounts.values().find(|a| a.external_id == external_id)
    }

    fn slot_taken(&self, doctor_id: Uuid, starts_at: DateTime<Utc>) -> bool {
        self.appointments
            .iter()
            .any(|a| a.is_active() && a.doctor_id == doctor_id && a.starts_at == starts_at)
    }
}

/// In-process store with the same constraints as the SQL schema: unique
/// external ids, foreign keys from appointments, and the partial unique index
/// on `(doctor_id, starts_at)` for non-cancelled rows. A unit of work holds
/// the store lock until it is committed or dropped, so units are serializable.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_account(&self, account: Account) -> Account {
        let mut state = self.state.lock().await;
        state.accounts.insert(account.id, account.clone());
        account
    }

    pub async fn add_doctor(&self, account: Account) -> Doctor {
        let mut state = self.state.lock().await;
        let doctor = Doctor {
            id: Uuid::new_v4(),
            account_id: account.id,
        };
        state.accounts.insert(account.id, account);
        state.doctors.insert(doctor.id, doctor.clone());
        doctor
    }

    /// Loads an existing appointment row as-is, bypassing booking validation.
    pub async fn seed_appointment(&self, appointment: Appointment) {
        self.state.lock().await.appointments.push(appointment);
    }

    pub async fn account_count(&self) -> usize {
        self.state.lock().await.accounts.len()
    }

    pub async fn appointment(&self, appointment_id: Uuid) -> Option<Appointment> {
        self.state
            .lock()
            .await
            .appointments
            .iter()
            .find(|a| a.id == appointment_id)
            .cloned()
    }
}

#[async_trait]
impl SchedulingStore for MemoryStore {
    async fn doctor_exists(&self, doctor_id: Uuid) -> Result<bool, DbError> {
        Ok(self.state.lock().await.doctors.contains_key(&doctor_id))
    }

    async fn find_doctor_by_account(&self, account_id: Uuid) -> Result<Option<Doctor>, DbError> {
        let state = self.state.lock().await;
        Ok(state.doctors.values().find(|d| d.account_id == account_id).cloned())
    }

    async fn find_account_by_external_id(&self, external_id: &str) -> Result<Option<Account>, DbError> {
        Ok(self.state.lock().await.account_by_external_id(external_id).cloned())
    }

    async fn rules_for_doctor(&self, doctor_id: Uuid) -> Result<Vec<AvailabilityRule>, DbError> {
        let state = self.state.lock().await;
        let mut rules: Vec<_> = state
            .rules
            .iter()
            .filter(|r| r.doctor_id == doctor_id)
            .cloned()
            .collect();
        rules.sort_by_key(|r| (r.weekday, r.start_time));
        Ok(rules)
    }

    async fn insert_rule(&self, rule: AvailabilityRule) -> Result<AvailabilityRule, DbError> {
        let mut state = self.state.lock().await;
        if !state.doctors.contains_key(&rule.doctor_id) {
            return Err(DbError::ForeignKeyViolation(format!("doctor {} does not exist", rule.doctor_id)));
        }
        state.rules.push(rule.clone());
        Ok(rule)
    }

    async fn delete_rule(&self, doctor_id: Uuid, rule_id: Uuid) -> Result<(), DbError> {
        let mut state = self.state.lock().await;
        state.rules.retain(|r| !(r.id == rule_id && r.doctor_id == doctor_id));
        Ok(())
    }

    async fn exceptions_for_doctor(&self, doctor_id: Uuid) -> Result<Vec<UnavailabilityException>, DbError> {
        let state = self.state.lock().await;
        let mut exceptions: Vec<_> = state
            .exceptions
            .iter()
            .filter(|e| e.doctor_id == doctor_id)
            .cloned()
            .collect();
        exceptions.sort_by_key(|e| e.starts_at);
        Ok(exceptions)
    }

    async fn insert_exception(&self, exception: UnavailabilityException) -> Result<UnavailabilityException, DbError> {
        let mut state = self.state.lock().await;
        if !state.doctors.contains_key(&exception.doctor_id) {
            return Err(DbError::ForeignKeyViolation(format!(
                "doctor {} does not exist",
                exception.doctor_id
            )));
        }
        state.exceptions.push(exception.clone());
        Ok(exception)
    }

    async fn delete_exception(&self, doctor_id: Uuid, exception_id: Uuid) -> Result<(), DbError> {
        let mut state = self.state.lock().await;
        state
            .exceptions
            .retain(|e| !(e.id == exception_id && e.doctor_id == doctor_id));
        Ok(())
    }

    async fn taken_starts(
        &self,
        doctor_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<DateTime<Utc>>, DbError> {
        let state = self.state.lock().await;
        Ok(state
            .appointments
            .iter()
            .filter(|a| a.is_active() && a.doctor_id == doctor_id && a.starts_at >= from && a.starts_at < to)
            .map(|a| a.starts_at)
            .collect())
    }

    async fn appointments_for_patient(&self, patient_id: Uuid) -> Result<Vec<Appointment>, DbError> {
        let state = self.state.lock().await;
        let mut appointments: Vec<_> = state
            .appointments
            .iter()
            .filter(|a| a.patient_id == patient_id)
            .cloned()
            .collect();
        appointments.sort_by_key(|a| a.starts_at);
        Ok(appointments)
    }

    async fn appointments_for_doctor(&self, doctor_id: Uuid) -> Result<Vec<Appointment>, DbError> {
        let state = self.state.lock().await;
        let mut appointments: Vec<_> = state
            .appointments
            .iter()
            .filter(|a| a.doctor_id == doctor_id)
            .cloned()
            .collect();
        appointments.sort_by_key(|a| a.starts_at);
        Ok(appointments)
    }

    async fn cancel_appointment(&self, appointment_id: Uuid) -> Result<(), DbError> {
        let mut state = self.state.lock().await;
        if let Some(appointment) = state.appointments.iter_mut().find(|a| a.id == appointment_id) {
            appointment.status = AppointmentStatus::Cancelled;
        }
        Ok(())
    }

    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, DbError> {
        let guard = Arc::clone(&self.state).lock_owned().await;
        debug!("Memory unit of work started");
        Ok(Box::new(MemoryUnit {
            state: guard,
            staged_accounts: Vec::new(),
            staged_appointments: Vec::new(),
        }))
    }
}

struct MemoryUnit {
    state: OwnedMutexGuard<MemoryState>,
    staged_accounts: Vec<Account>,
    staged_appointments: Vec<Appointment>,
}

#[async_trait]
impl UnitOfWork for MemoryUnit {
    async fn find_account_by_external_id(&mut self, external_id: &str) -> Result<Option<Account>, DbError> {
        let staged = self.staged_accounts.iter().find(|a| a.external_id == external_id);
        Ok(staged
            .or_else(|| self.state.account_by_external_id(external_id))
            .cloned())
    }

    async fn insert_account(&mut self, account: Account) -> Result<Account, DbError> {
        let duplicate = self.state.account_by_external_id(&account.external_id).is_some()
            || self.staged_accounts.iter().any(|a| a.external_id == account.external_id);
        if duplicate {
            return Err(DbError::UniqueViolation(format!(
                "account for {} already exists",
                account.external_id
            )));
        }
        self.staged_accounts.push(account.clone());
        Ok(account)
    }

    async fn rules_for_weekday(&mut self, doctor_id: Uuid, weekday: u8) -> Result<Vec<AvailabilityRule>, DbError> {
        let mut rules: Vec<_> = self
            .state
            .rules
            .iter()
            .filter(|r| r.doctor_id == doctor_id && r.weekday == weekday)
            .cloned()
            .collect();
        rules.sort_by_key(|r| r.start_time);
        Ok(rules)
    }

    async fn exceptions_for_doctor(&mut self, doctor_id: Uuid) -> Result<Vec<UnavailabilityException>, DbError> {
        Ok(self
            .state
            .exceptions
            .iter()
            .filter(|e| e.doctor_id == doctor_id)
            .cloned()
            .collect())
    }

    async fn insert_appointment(&mut self, appointment: Appointment) -> Result<Appointment, DbError> {
        if !self.state.doctors.contains_key(&appointment.doctor_id) {
            return Err(DbError::ForeignKeyViolation(format!(
                "doctor {} does not exist",
                appointment.doctor_id
            )));
        }

        let patient_known = self.state.accounts.contains_key(&appointment.patient_id)
            || self.staged_accounts.iter().any(|a| a.id == appointment.patient_id);
        if !patient_known {
            return Err(DbError::ForeignKeyViolation(format!(
                "account {} does not exist",
                appointment.patient_id
            )));
        }

        let taken = self.state.slot_taken(appointment.doctor_id, appointment.starts_at)
            || self.staged_appointments.iter().any(|a| {
                a.is_active() && a.doctor_id == appointment.doctor_id && a.starts_at == appointment.starts_at
            });
        if taken {
            return Err(DbError::UniqueViolation(format!(
                "doctor {} already booked at {}",
                appointment.doctor_id, appointment.starts_at
            )));
        }

        self.staged_appointments.push(appointment.clone());
        Ok(appointment)
    }

    async fn commit(&mut self) -> Result<(), DbError> {
        let accounts = std::mem::take(&mut self.staged_accounts);
        let appointments = std::mem::take(&mut self.staged_appointments);
        debug!(
            "Committing {} account(s) and {} appointment(s)",
            accounts.len(),
            appointments.len()
        );

        for account in accounts {
            self.state.accounts.insert(account.id, account);
        }
        self.state.appointments.extend(appointments);
        Ok(())
    }

    async fn rollback(&mut self) -> Result<(), DbError> {
        self.staged_accounts.clear();
        self.staged_appointments.clear();
        Ok(())
    }
}
