use axum::{
    body::{to_bytes, Body},
    http::{header::AUTHORIZATION, header::CONTENT_TYPE, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use doctor_cell::router::{doctor_routes, my_availability_routes};
use shared_utils::test_utils::{JwtTestUtils, SchedulingFixture, TestConfig, TestUser};

async fn send(app: Router, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(AUTHORIZATION, format!("Bearer {}", token));
    }
    let body = match body {
        Some(value) => {
            builder = builder.header(CONTENT_TYPE, "application/json");
            Body::from(value.to_string())
        }
        None => Body::empty(),
    };

    let response = app.oneshot(builder.body(body).unwrap()).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

#[tokio::test]
async fn test_public_availability_lists_slots() {
    let config = TestConfig::default();
    let fixture = SchedulingFixture::new().await;
    fixture.add_rule(1, "09:00", "10:00", 30).await;
    let app = doctor_routes(config.state_with(fixture.store.clone()));

    let uri = format!(
        "/{}/availability?from=2025-01-06T00:00:00Z&to=2025-01-07T00:00:00Z",
        fixture.doctor.id
    );
    let (status, body) = send(app, Method::GET, &uri, None, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!([
            { "startsAt": "2025-01-06T09:00:00Z", "endsAt": "2025-01-06T09:30:00Z" },
            { "startsAt": "2025-01-06T09:30:00Z", "endsAt": "2025-01-06T10:00:00Z" }
        ])
    );
}

#[tokio::test]
async fn test_public_availability_requires_range() {
    let config = TestConfig::default();
    let fixture = SchedulingFixture::new().await;
    let app = doctor_routes(config.state_with(fixture.store.clone()));

    let uri = format!("/{}/availability?from=2025-01-06T00:00:00Z", fixture.doctor.id);
    let (status, body) = send(app.clone(), Method::GET, &uri, None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "from & to required (ISO)");

    let uri = format!("/{}/availability?from=yesterday&to=2025-01-06T00:00:00Z", fixture.doctor.id);
    let (status, body) = send(app.clone(), Method::GET, &uri, None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "bad_request");

    let (status, _) = send(app.clone(), Method::GET, "/not-a-uuid/availability?from=2025-01-06&to=2025-01-07", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let uri = format!("/{}/availability?from=0001-01-01&to=9999-12-31", fixture.doctor.id);
    let (status, body) = send(app, Method::GET, &uri, None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Range must not exceed 366 days");
}

#[tokio::test]
async fn test_my_routes_require_authentication() {
    let config = TestConfig::default();
    let fixture = SchedulingFixture::new().await;
    let app = my_availability_routes(config.state_with(fixture.store.clone()));

    let (status, body) = send(app, Method::GET, "/availability", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "unauthenticated");
}

#[tokio::test]
async fn test_patient_is_forbidden_from_doctor_routes() {
    let config = TestConfig::default();
    let fixture = SchedulingFixture::new().await;
    let patient = TestUser::patient("patient@example.com");
    fixture.store.add_account(patient.to_account()).await;
    let token = JwtTestUtils::create_test_token(&patient, &config.jwt_secret, None);
    let app = my_availability_routes(config.state_with(fixture.store.clone()));

    let (status, body) = send(app, Method::GET, "/availability", Some(&token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["code"], "forbidden");
}

#[tokio::test]
async fn test_admin_without_profile_gets_not_found() {
    let config = TestConfig::default();
    let fixture = SchedulingFixture::new().await;
    let admin = TestUser::admin("admin@example.com");
    fixture.store.add_account(admin.to_account()).await;
    let token = JwtTestUtils::create_test_token(&admin, &config.jwt_secret, None);
    let app = my_availability_routes(config.state_with(fixture.store.clone()));

    let (status, body) = send(app, Method::GET, "/availability", Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Doctor profile missing");
}

#[tokio::test]
async fn test_doctor_manages_availability() {
    let config = TestConfig::default();
    let fixture = SchedulingFixture::new().await;
    let token = JwtTestUtils::create_test_token(&fixture.doctor_user, &config.jwt_secret, None);
    let app = my_availability_routes(config.state_with(fixture.store.clone()));

    let (status, created) = send(
        app.clone(),
        Method::POST,
        "/availability",
        Some(&token),
        Some(json!({ "weekday": 1, "start_time": "09:00", "end_time": "12:00", "slot_minutes": 30 })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["start_time"], "09:00:00");
    assert_eq!(created["doctor_id"], fixture.doctor.id.to_string());

    let (status, listed) = send(app.clone(), Method::GET, "/availability", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed.as_array().map(Vec::len), Some(1));

    let rule_id = created["id"].as_str().unwrap();
    let (status, body) = send(app.clone(), Method::DELETE, &format!("/availability/{}", rule_id), Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "ok": true }));

    let (_, listed) = send(app, Method::GET, "/availability", Some(&token), None).await;
    assert_eq!(listed, json!([]));
}

#[tokio::test]
async fn test_invalid_rule_is_bad_request() {
    let config = TestConfig::default();
    let fixture = SchedulingFixture::new().await;
    let token = JwtTestUtils::create_test_token(&fixture.doctor_user, &config.jwt_secret, None);
    let app = my_availability_routes(config.state_with(fixture.store.clone()));

    let (status, body) = send(
        app.clone(),
        Method::POST,
        "/availability",
        Some(&token),
        Some(json!({ "weekday": 9, "start_time": "09:00", "end_time": "12:00", "slot_minutes": 30 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "bad_request");

    let (status, _) = send(
        app,
        Method::POST,
        "/availability",
        Some(&token),
        Some(json!({ "weekday": "monday" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_doctor_manages_unavailability() {
    let config = TestConfig::default();
    let fixture = SchedulingFixture::new().await;
    let token = JwtTestUtils::create_test_token(&fixture.doctor_user, &config.jwt_secret, None);
    let app = my_availability_routes(config.state_with(fixture.store.clone()));

    let (status, created) = send(
        app.clone(),
        Method::POST,
        "/unavailability",
        Some(&token),
        Some(json!({ "starts_at": "2025-01-06T09:00:00Z", "ends_at": "2025-01-06T12:00:00Z" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, listed) = send(app.clone(), Method::GET, "/unavailability", Some(&token), None).await;
    assert_eq!(listed.as_array().map(Vec::len), Some(1));

    let exception_id = created["id"].as_str().unwrap();
    let (status, _) = send(
        app.clone(),
        Method::DELETE,
        &format!("/unavailability/{}", exception_id),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, listed) = send(app, Method::GET, "/unavailability", Some(&token), None).await;
    assert_eq!(listed, json!([]));
}
