use assert_matches::assert_matches;
use chrono::{TimeZone, Utc};
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use shared_config::{AppConfig, StoreBackend};
use shared_database::{DbError, PostgrestStore, SchedulingStore};
use shared_models::auth::{Account, Role};
use shared_models::scheduling::Appointment;

fn config_for(server: &MockServer) -> AppConfig {
    AppConfig {
        supabase_url: server.uri(),
        supabase_anon_key: "anon-key".to_string(),
        supabase_service_key: Some("service-key".to_string()),
        supabase_jwt_secret: "jwt-secret".to_string(),
        store_backend: StoreBackend::Supabase,
        port: 0,
    }
}

#[tokio::test]
async fn test_taken_starts_queries_half_open_window() {
    let server = MockServer::start().await;
    let doctor_id = Uuid::new_v4();
    let from = Utc.with_ymd_and_hms(2025, 1, 6, 0, 0, 0).unwrap();
    let to = Utc.with_ymd_and_hms(2025, 1, 7, 0, 0, 0).unwrap();

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("doctor_id", format!("eq.{}", doctor_id)))
        .and(query_param("status", "neq.cancelled"))
        .and(query_param("starts_at", "gte.2025-01-06T00:00:00.000000Z"))
        .and(query_param("starts_at", "lt.2025-01-07T00:00:00.000000Z"))
        .and(header("apikey", "service-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "starts_at": "2025-01-06T09:00:00+00:00" }
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let store = PostgrestStore::new(&config_for(&server));
    let taken = store.taken_starts(doctor_id, from, to).await.unwrap();

    assert_eq!(taken, vec![Utc.with_ymd_and_hms(2025, 1, 6, 9, 0, 0).unwrap()]);
}

#[tokio::test]
async fn test_rules_are_decoded() {
    let server = MockServer::start().await;
    let doctor_id = Uuid::new_v4();
    let rule_id = Uuid::new_v4();

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctor_availability"))
        .and(query_param("order", "weekday.asc,start_time.asc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "id": rule_id,
            "doctor_id": doctor_id,
            "weekday": 1,
            "start_time": "09:00:00",
            "end_time": "10:00:00",
            "slot_minutes": 30
        }])))
        .mount(&server)
        .await;

    let store = PostgrestStore::new(&config_for(&server));
    let rules = store.rules_for_doctor(doctor_id).await.unwrap();

    assert_eq!(rules.len(), 1);
    assert_eq!(rules[0].id, rule_id);
    assert_eq!(rules[0].slot_minutes, 30);
}

#[tokio::test]
async fn test_commit_ships_staged_rows_in_one_call() {
    let server = MockServer::start().await;
    let account = Account {
        id: Uuid::new_v4(),
        external_id: "ext-1".to_string(),
        role: Role::Patient,
        full_name: "Patient".to_string(),
        email: None,
    };
    let appointment = Appointment::scheduled(
        account.id,
        Uuid::new_v4(),
        Utc.with_ymd_and_hms(2025, 1, 6, 9, 0, 0).unwrap(),
        Utc.with_ymd_and_hms(2025, 1, 6, 9, 30, 0).unwrap(),
    );

    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/book_appointment"))
        .and(body_json(json!({
            "p_accounts": [account.clone()],
            "p_appointments": [appointment.clone()],
        })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let store = PostgrestStore::new(&config_for(&server));
    let mut unit = store.begin().await.unwrap();
    unit.insert_account(account.clone()).await.unwrap();
    unit.insert_appointment(appointment.clone()).await.unwrap();

    // Staged accounts are visible to later reads in the same unit.
    let found = unit.find_account_by_external_id("ext-1").await.unwrap();
    assert_eq!(found, Some(account));

    unit.commit().await.unwrap();
}

#[tokio::test]
async fn test_commit_conflict_is_unique_violation() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/book_appointment"))
        .respond_with(ResponseTemplate::new(409).set_body_json(json!({
            "code": "23505",
            "message": "duplicate key value violates unique constraint \"appointments_doctor_slot_live\""
        })))
        .mount(&server)
        .await;

    let store = PostgrestStore::new(&config_for(&server));
    let mut unit = store.begin().await.unwrap();
    unit.insert_appointment(Appointment::scheduled(
        Uuid::new_v4(),
        Uuid::new_v4(),
        Utc.with_ymd_and_hms(2025, 1, 6, 9, 0, 0).unwrap(),
        Utc.with_ymd_and_hms(2025, 1, 6, 9, 30, 0).unwrap(),
    ))
    .await
    .unwrap();

    assert_matches!(unit.commit().await, Err(DbError::UniqueViolation(_)));
}

#[tokio::test]
async fn test_rollback_sends_nothing() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/book_appointment"))
        .respond_with(ResponseTemplate::new(204))
        .expect(0)
        .mount(&server)
        .await;

    let store = PostgrestStore::new(&config_for(&server));
    let mut unit = store.begin().await.unwrap();
    unit.insert_appointment(Appointment::scheduled(
        Uuid::new_v4(),
        Uuid::new_v4(),
        Utc.with_ymd_and_hms(2025, 1, 6, 9, 0, 0).unwrap(),
        Utc.with_ymd_and_hms(2025, 1, 6, 9, 30, 0).unwrap(),
    ))
    .await
    .unwrap();

    unit.rollback().await.unwrap();
    unit.commit().await.unwrap();
}

#[tokio::test]
async fn test_cancel_patches_status() {
    let server = MockServer::start().await;
    let appointment_id = Uuid::new_v4();

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/appointments"))
        .and(query_param("id", format!("eq.{}", appointment_id)))
        .and(body_json(json!({ "status": "cancelled" })))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let store = PostgrestStore::new(&config_for(&server));
    store.cancel_appointment(appointment_id).await.unwrap();
}

#[tokio::test]
async fn test_unknown_doctor() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/doctors"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let store = PostgrestStore::new(&config_for(&server));
    assert!(!store.doctor_exists(Uuid::new_v4()).await.unwrap());
}
