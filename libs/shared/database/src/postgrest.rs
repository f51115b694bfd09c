use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::{
    header::{HeaderMap, HeaderValue},
    Method,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::Account;
use shared_models::scheduling::{
    Appointment, AvailabilityRule, Doctor, UnavailabilityException,
};

use crate::error::DbError;
use crate::store::{SchedulingStore, UnitOfWork};
use crate::supabase::SupabaseClient;

/// Postgres function that applies a staged booking in one transaction.
/// Defined in `migrations/0001_scheduling.sql`.
const BOOK_APPOINTMENT_FN: &str = "book_appointment";

#[derive(Debug, Deserialize)]
struct TakenRow {
    starts_at: DateTime<Utc>,
}

fn timestamp_param(instant: DateTime<Utc>) -> String {
    urlencoding::encode(&instant.to_rfc3339_opts(SecondsFormat::Micros, true)).into_owned()
}

fn representation_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert("Prefer", HeaderValue::from_static("return=representation"));
    headers
}

fn first_row<T>(rows: Vec<T>, what: &str) -> Result<T, DbError> {
    rows.into_iter()
        .next()
        .ok_or_else(|| DbError::Api {
            status: 200,
            message: format!("insert into {} returned no row", what),
        })
}

/// Store backed by Supabase's PostgREST API.
#[derive(Clone)]
pub struct PostgrestStore {
    supabase: Arc<SupabaseClient>,
}

impl PostgrestStore {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: Arc::new(SupabaseClient::new(config)),
        }
    }

    async fn account_by_external_id(
        supabase: &SupabaseClient,
        external_id: &str,
    ) -> Result<Option<Account>, DbError> {
        let path = format!(
            "/rest/v1/users?external_id=eq.{}&select=id,external_id,role,full_name,email&limit=1",
            urlencoding::encode(external_id)
        );
        let rows: Vec<Account> = supabase.request(Method::GET, &path, None, None).await?;
        Ok(rows.into_iter().next())
    }

    async fn doctor_rules(
        supabase: &SupabaseClient,
        doctor_id: Uuid,
        weekday: Option<u8>,
    ) -> Result<Vec<AvailabilityRule>, DbError> {
        let mut path = format!("/rest/v1/doctor_availability?doctor_id=eq.{}", doctor_id);
        if let Some(day) = weekday {
            path.push_str(&format!("&weekday=eq.{}", day));
        }
        path.push_str("&order=weekday.asc,start_time.asc");

        supabase.request(Method::GET, &path, None, None).await
    }

    async fn doctor_exceptions(
        supabase: &SupabaseClient,
        doctor_id: Uuid,
    ) -> Result<Vec<UnavailabilityException>, DbError> {
        let path = format!(
            "/rest/v1/doctor_unavailability?doctor_id=eq.{}&order=starts_at.asc",
            doctor_id
        );
        supabase.request(Method::GET, &path, None, None).await
    }
}

#[async_trait]
impl SchedulingStore for PostgrestStore {
    async fn doctor_exists(&self, doctor_id: Uuid) -> Result<bool, DbError> {
        let path = format!("/rest/v1/doctors?id=eq.{}&select=id", doctor_id);
        let rows: Vec<Value> = self.supabase.request(Method::GET, &path, None, None).await?;
        Ok(!rows.is_empty())
    }

    async fn find_doctor_by_account(&self, account_id: Uuid) -> Result<Option<Doctor>, DbError> {
        let path = format!(
            "/rest/v1/doctors?account_id=eq.{}&select=id,account_id&limit=1",
            account_id
        );
        let rows: Vec<Doctor> = self.supabase.request(Method::GET, &path, None, None).await?;
        Ok(rows.into_iter().next())
    }

    async fn find_account_by_external_id(&self, external_id: &str) -> Result<Option<Account>, DbError> {
        Self::account_by_external_id(&self.supabase, external_id).await
    }

    async fn rules_for_doctor(&self, doctor_id: Uuid) -> Result<Vec<AvailabilityRule>, DbError> {
        Self::doctor_rules(&self.supabase, doctor_id, None).await
    }

    async fn insert_rule(&self, rule: AvailabilityRule) -> Result<AvailabilityRule, DbError> {
        let rows: Vec<AvailabilityRule> = self
            .supabase
            .request_with_headers(
                Method::POST,
                "/rest/v1/doctor_availability",
                None,
                Some(serde_json::to_value(&rule)?),
                Some(representation_headers()),
            )
            .await?;
        first_row(rows, "doctor_availability")
    }

    async fn delete_rule(&self, doctor_id: Uuid, rule_id: Uuid) -> Result<(), DbError> {
        let path = format!(
            "/rest/v1/doctor_availability?id=eq.{}&doctor_id=eq.{}",
            rule_id, doctor_id
        );
        self.supabase.execute(Method::DELETE, &path, None, None).await
    }

    async fn exceptions_for_doctor(&self, doctor_id: Uuid) -> Result<Vec<UnavailabilityException>, DbError> {
        Self::doctor_exceptions(&self.supabase, doctor_id).await
    }

    async fn insert_exception(&self, exception: UnavailabilityException) -> Result<UnavailabilityException, DbError> {
        let rows: Vec<UnavailabilityException> = self
            .supabase
            .request_with_headers(
                Method::POST,
                "/rest/v1/doctor_unavailability",
                None,
                Some(serde_json::to_value(&exception)?),
                Some(representation_headers()),
            )
            .await?;
        first_row(rows, "doctor_unavailability")
    }

    async fn delete_exception(&self, doctor_id: Uuid, exception_id: Uuid) -> Result<(), DbError> {
        let path = format!(
            "/rest/v1/doctor_unavailability?id=eq.{}&doctor_id=eq.{}",
            exception_id, doctor_id
        );
        self.supabase.execute(Method::DELETE, &path, None, None).await
    }

    async fn taken_starts(
        &self,
        doctor_id: Uuid,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<DateTime<Utc>>, DbError> {
        let path = format!(
            "/rest/v1/appointments?doctor_id=eq.{}&status=neq.cancelled&starts_at=gte.{}&starts_at=lt.{}&select=starts_at",
            doctor_id,
            timestamp_param(from),
            timestamp_param(to)
        );
        let rows: Vec<TakenRow> = self.supabase.request(Method::GET, &path, None, None).await?;
        Ok(rows.into_iter().map(|r| r.starts_at).collect())
    }

    async fn appointments_for_patient(&self, patient_id: Uuid) -> Result<Vec<Appointment>, DbError> {
        let path = format!(
            "/rest/v1/appointments?patient_id=eq.{}&order=starts_at.asc",
            patient_id
        );
        self.supabase.request(Method::GET, &path, None, None).await
    }

    async fn appointments_for_doctor(&self, doctor_id: Uuid) -> Result<Vec<Appointment>, DbError> {
        let path = format!(
            "/rest/v1/appointments?doctor_id=eq.{}&order=starts_at.asc",
            doctor_id
        );
        self.supabase.request(Method::GET, &path, None, None).await
    }

    async fn cancel_appointment(&self, appointment_id: Uuid) -> Result<(), DbError> {
        let path = format!("/rest/v1/appointments?id=eq.{}", appointment_id);
        self.supabase
            .execute(Method::PATCH, &path, None, Some(json!({ "status": "cancelled" })))
            .await
    }

    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, DbError> {
        Ok(Box::new(PostgrestUnit {
            supabase: Arc::clone(&self.supabase),
            staged_accounts: Vec::new(),
            staged_appointments: Vec::new(),
        }))
    }
}

/// Reads go straight to PostgREST; writes are staged and shipped to
/// `book_appointment` in a single call on commit, where Postgres applies them
/// in one transaction and enforces the unique index.
struct PostgrestUnit {
    supabase: Arc<SupabaseClient>,
    staged_accounts: Vec<Account>,
    staged_appointments: Vec<Appointment>,
}

#[async_trait]
impl UnitOfWork for PostgrestUnit {
    async fn find_account_by_external_id(&mut self, external_id: &str) -> Result<Option<Account>, DbError> {
        if let Some(staged) = self.staged_accounts.iter().find(|a| a.external_id == external_id) {
            return Ok(Some(staged.clone()));
        }
        PostgrestStore::account_by_external_id(&self.supabase, external_id).await
    }

    async fn insert_account(&mut self, account: Account) -> Result<Account, DbError> {
        self.staged_accounts.push(account.clone());
        Ok(account)
    }

    async fn rules_for_weekday(&mut self, doctor_id: Uuid, weekday: u8) -> Result<Vec<AvailabilityRule>, DbError> {
        PostgrestStore::doctor_rules(&self.supabase, doctor_id, Some(weekday)).await
    }

    async fn exceptions_for_doctor(&mut self, doctor_id: Uuid) -> Result<Vec<UnavailabilityException>, DbError> {
        PostgrestStore::doctor_exceptions(&self.supabase, doctor_id).await
    }

    async fn insert_appointment(&mut self, appointment: Appointment) -> Result<Appointment, DbError> {
        self.staged_appointments.push(appointment.clone());
        Ok(appointment)
    }

    async fn commit(&mut self) -> Result<(), DbError> {
        if self.staged_accounts.is_empty() && self.staged_appointments.is_empty() {
            return Ok(());
        }

        let args = json!({
            "p_accounts": std::mem::take(&mut self.staged_accounts),
            "p_appointments": std::mem::take(&mut self.staged_appointments),
        });
        debug!("Committing staged booking through rpc/{}", BOOK_APPOINTMENT_FN);

        self.supabase.rpc(BOOK_APPOINTMENT_FN, args).await?;
        info!("Booking transaction committed");
        Ok(())
    }

    async fn rollback(&mut self) -> Result<(), DbError> {
        self.staged_accounts.clear();
        self.staged_appointments.clear();
        Ok(())
    }
}
