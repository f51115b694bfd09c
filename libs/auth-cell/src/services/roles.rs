use std::sync::Arc;

use tracing::{debug, warn};
use uuid::Uuid;

use shared_database::{DbError, SchedulingStore};
use shared_models::auth::{Account, Role, User};
use shared_models::error::AppError;

/// Local account of the caller plus the doctor row it owns, if any.
#[derive(Debug, Clone)]
pub struct RoleContext {
    pub account: Account,
    pub doctor_id: Option<Uuid>,
}

impl RoleContext {
    /// Doctor id for doctor-only routes. Admins without a doctor row have none.
    pub fn require_doctor_id(&self) -> Result<Uuid, AppError> {
        self.doctor_id
            .ok_or_else(|| AppError::NotFound("Doctor profile missing".to_string()))
    }
}

/// Maps a verified identity onto its local account and enforces role gates.
#[derive(Clone)]
pub struct RoleResolver {
    store: Arc<dyn SchedulingStore>,
}

impl RoleResolver {
    pub fn new(store: Arc<dyn SchedulingStore>) -> Self {
        Self { store }
    }

    pub async fn resolve(&self, user: &User) -> Result<Option<Account>, AppError> {
        self.store
            .find_account_by_external_id(&user.id)
            .await
            .map_err(store_error)
    }

    pub async fn require(&self, user: &User, required: Role) -> Result<RoleContext, AppError> {
        let account = self
            .resolve(user)
            .await?
            .ok_or_else(|| AppError::Forbidden("User not found in DB".to_string()))?;

        if !account.role.satisfies(required) {
            debug!(
                "Account {} with role {} rejected for {} route",
                account.id, account.role, required
            );
            return Err(AppError::Forbidden(format!("Forbidden: role '{}' required", required)));
        }

        let doctor_id = match account.role {
            Role::Doctor | Role::Admin => self
                .store
                .find_doctor_by_account(account.id)
                .await
                .map_err(store_error)?
                .map(|doctor| doctor.id),
            Role::Patient => None,
        };

        Ok(RoleContext { account, doctor_id })
    }
}

fn store_error(err: DbError) -> AppError {
    warn!("Account lookup failed: {}", err);
    AppError::Internal(err.to_string())
}
