use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize)]
pub struct JwtClaims {
    pub sub: String,
    pub exp: Option<u64>,
    pub email: Option<String>,
    pub role: Option<String>,
    pub user_metadata: Option<serde_json::Value>,
    pub aud: Option<String>,
    pub iat: Option<u64>,
}

/// Verified identity produced by the authenticator. `id` is the external
/// identity provider's subject, not a local account id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: Option<String>,
    pub metadata: Option<serde_json::Value>,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Patient,
    Doctor,
    Admin,
}

impl Role {
    /// Admins pass every gate, doctors pass doctor and patient gates.
    pub fn satisfies(&self, required: Role) -> bool {
        match required {
            Role::Admin => *self == Role::Admin,
            Role::Doctor => matches!(self, Role::Doctor | Role::Admin),
            Role::Patient => true,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Patient => write!(f, "patient"),
            Role::Doctor => write!(f, "doctor"),
            Role::Admin => write!(f, "admin"),
        }
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "patient" => Ok(Role::Patient),
            "doctor" => Ok(Role::Doctor),
            "admin" => Ok(Role::Admin),
            other => Err(format!("unknown role '{}'", other)),
        }
    }
}

/// Local account row, linked to the external identity by `external_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: Uuid,
    pub external_id: String,
    pub role: Role,
    pub full_name: String,
    pub email: Option<String>,
}

impl Account {
    /// Profile provisioned on a patient's first booking.
    pub fn new_patient(user: &User) -> Self {
        Self {
            id: Uuid::new_v4(),
            external_id: user.id.clone(),
            role: Role::Patient,
            full_name: user.email.clone().unwrap_or_else(|| "Patient".to_string()),
            email: user.email.clone(),
        }
    }
}
