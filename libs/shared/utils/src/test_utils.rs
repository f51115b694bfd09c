use std::sync::Arc;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{Duration, NaiveTime, Utc};
use hmac::{Hmac, Mac};
use serde_json::{json, Value};
use sha2::Sha256;
use uuid::Uuid;

use shared_config::{AppConfig, StoreBackend};
use shared_database::{AppState, MemoryStore};
use shared_models::auth::{Account, Role, User};
use shared_models::scheduling::{AvailabilityRule, Doctor};

/// Config for router tests: memory store, fixed signing secret.
pub struct TestConfig {
    pub jwt_secret: String,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "test-secret-key-for-jwt-validation-must-be-long-enough".to_string(),
        }
    }
}

impl TestConfig {
    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            supabase_url: String::new(),
            supabase_anon_key: String::new(),
            supabase_service_key: None,
            supabase_jwt_secret: self.jwt_secret.clone(),
            store_backend: StoreBackend::Memory,
            port: 0,
        }
    }

    pub fn state_with(&self, store: MemoryStore) -> AppState {
        AppState::new(Arc::new(self.to_app_config()), Arc::new(store))
    }
}

/// An identity at the provider plus the role its local account would carry.
pub struct TestUser {
    pub id: String,
    pub email: String,
    pub role: Role,
}

impl TestUser {
    fn with_role(email: &str, role: Role) -> Self {
        Self {
            id: format!("ext-{}", Uuid::new_v4().simple()),
            email: email.to_string(),
            role,
        }
    }

    pub fn doctor(email: &str) -> Self {
        Self::with_role(email, Role::Doctor)
    }

    pub fn patient(email: &str) -> Self {
        Self::with_role(email, Role::Patient)
    }

    pub fn admin(email: &str) -> Self {
        Self::with_role(email, Role::Admin)
    }

    /// Identity as the authenticator would hand it to a handler.
    pub fn to_user(&self) -> User {
        User {
            id: self.id.clone(),
            email: Some(self.email.clone()),
            metadata: None,
            created_at: Some(Utc::now()),
        }
    }

    /// Local account row linked to this identity.
    pub fn to_account(&self) -> Account {
        Account {
            id: Uuid::new_v4(),
            external_id: self.id.clone(),
            role: self.role,
            full_name: self.email.clone(),
            email: Some(self.email.clone()),
        }
    }
}

/// Mints HS256 tokens shaped like the identity provider's.
pub struct JwtTestUtils;

impl JwtTestUtils {
    fn sign(claims: &Value, secret: &str) -> String {
        let encode = |value: &Value| URL_SAFE_NO_PAD.encode(value.to_string());
        let signing_input = format!(
            "{}.{}",
            encode(&json!({ "alg": "HS256", "typ": "JWT" })),
            encode(claims)
        );

        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).expect("hmac accepts any key length");
        mac.update(signing_input.as_bytes());

        format!("{}.{}", signing_input, URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes()))
    }

    /// Token for `user` valid for `exp_hours` (default one day). Negative
    /// hours produce an already-expired token.
    pub fn create_test_token(user: &TestUser, secret: &str, exp_hours: Option<i64>) -> String {
        let issued = Utc::now();
        let expires = issued + Duration::hours(exp_hours.unwrap_or(24));

        Self::sign(
            &json!({
                "sub": user.id,
                "email": user.email,
                "aud": "authenticated",
                "iat": issued.timestamp(),
                "exp": expires.timestamp(),
            }),
            secret,
        )
    }

    pub fn create_expired_token(user: &TestUser, secret: &str) -> String {
        Self::create_test_token(user, secret, Some(-1))
    }

    pub fn create_invalid_signature_token(user: &TestUser) -> String {
        Self::create_test_token(user, "not-the-configured-secret", None)
    }
}

/// A memory store seeded with one doctor, for cell tests.
pub struct SchedulingFixture {
    pub store: MemoryStore,
    pub doctor: Doctor,
    pub doctor_user: TestUser,
}

impl SchedulingFixture {
    pub async fn new() -> Self {
        let store = MemoryStore::new();
        let doctor_user = TestUser::doctor("doctor@example.com");
        let doctor = store.add_doctor(doctor_user.to_account()).await;

        Self {
            store,
            doctor,
            doctor_user,
        }
    }

    /// Adds a weekly rule for the fixture doctor. Times are `HH:MM`.
    pub async fn add_rule(&self, weekday: u8, start: &str, end: &str, slot_minutes: i32) -> AvailabilityRule {
        use shared_database::SchedulingStore;

        let rule = AvailabilityRule {
            id: Uuid::new_v4(),
            doctor_id: self.doctor.id,
            weekday,
            start_time: NaiveTime::parse_from_str(start, "%H:%M").expect("fixture time"),
            end_time: NaiveTime::parse_from_str(end, "%H:%M").expect("fixture time"),
            slot_minutes,
        };
        self.store.insert_rule(rule).await.expect("fixture rule")
    }
}
