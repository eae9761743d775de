//! User accounts: registration, profile reads and edits, cascading delete.
//!
//! DESIGN
//! ======
//! Users are keyed by email. The stored record carries the password hash and
//! the list of owned check ids; neither the hash nor anything derived from it
//! is ever returned to a caller (`PublicUser` is the only outward shape).
//!
//! ERROR HANDLING
//! ==============
//! Deletion cascades to owned checks before the user record goes. If a check
//! cannot be removed, the user's list is rewritten to the checks that remain
//! and the user is kept, so the list never names deleted records.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use tracing::{error, info, warn};

use super::validate;
use crate::error::ApiError;
use crate::state::AppState;
use crate::store::{self, Collection, StoreError};

/// Stored user record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    /// Hex SHA-256 of the password and the configured secret.
    pub password: String,
    pub tos: bool,
    pub phone: String,
    /// Ids of checks this user owns.
    #[serde(default)]
    pub checks: Vec<String>,
}

/// User as returned over the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub tos: bool,
    pub phone: String,
    pub checks: Vec<String>,
}

impl From<User> for PublicUser {
    fn from(u: User) -> Self {
        Self {
            first_name: u.first_name,
            last_name: u.last_name,
            email: u.email,
            tos: u.tos,
            phone: u.phone,
            checks: u.checks,
        }
    }
}

/// Payload returned by `delete`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Deleted {
    pub msg: &'static str,
    pub email: String,
    pub deleted_checks: Vec<String>,
}

/// Hex SHA-256 of `secret` followed by `password`. The secret is one
/// server-wide pepper; there is no per-user salt.
#[must_use]
pub fn hash_password(secret: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    hasher.update(password.as_bytes());
    let bytes = hasher.finalize();
    bytes.iter().map(|b| format!("{b:02x}")).collect::<String>()
}

fn email_param(raw: Option<&str>) -> Result<&str, ApiError> {
    validate::present(raw)
        .map(validate::strip_wrapping_quotes)
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("missing required field: email"))
}

// =============================================================================
// OPERATIONS
// =============================================================================

/// Create an account.
///
/// # Errors
///
/// `BadRequest` if any field is missing or `tos` is not `true`, `Conflict`
/// if the email is taken, `Storage` if the write fails.
pub async fn register(state: &AppState, body: &Value) -> Result<PublicUser, ApiError> {
    let fields = (
        validate::non_empty_str(body, "firstName"),
        validate::non_empty_str(body, "lastName"),
        validate::non_empty_str(body, "phone"),
        validate::non_empty_str(body, "email"),
        validate::non_empty_str(body, "password"),
        validate::boolean(body, "tos"),
    );
    let (Some(first_name), Some(last_name), Some(phone), Some(email), Some(password), Some(true)) = fields else {
        return Err(ApiError::bad_request("missing required fields"));
    };
    store::validate_key(email)?;

    if store::find::<User>(state.store.as_ref(), Collection::Users, email).await?.is_some() {
        return Err(ApiError::Conflict("email already exists".into()));
    }

    let account = User {
        first_name: first_name.to_owned(),
        last_name: last_name.to_owned(),
        email: email.to_owned(),
        password: hash_password(&state.config.password_secret, password),
        tos: true,
        phone: phone.to_owned(),
        checks: Vec::new(),
    };

    match store::insert(state.store.as_ref(), Collection::Users, email, &account).await {
        Ok(()) => {}
        Err(StoreError::AlreadyExists { .. }) => return Err(ApiError::Conflict("email already exists".into())),
        Err(e) => return Err(ApiError::Storage(e.to_string())),
    }

    info!(%email, "user registered");
    Ok(account.into())
}

/// Read a user's public profile.
///
/// # Errors
///
/// `BadRequest` if no email is given, `NotFound` if the user does not exist.
pub async fn fetch(state: &AppState, email: Option<&str>) -> Result<PublicUser, ApiError> {
    let email = email_param(email)?;
    store::find::<User>(state.store.as_ref(), Collection::Users, email)
        .await?
        .map(PublicUser::from)
        .ok_or_else(|| ApiError::not_found("user not found"))
}

/// Overwrite any of `firstName`, `lastName`, `password` on an existing user.
///
/// # Errors
///
/// `BadRequest` if the email or every updatable field is missing,
/// `NotFound` if the user does not exist, `Storage` if the write fails.
pub async fn update(state: &AppState, body: &Value) -> Result<PublicUser, ApiError> {
    let first_name = validate::non_empty_str(body, "firstName");
    let last_name = validate::non_empty_str(body, "lastName");
    let password = validate::non_empty_str(body, "password");
    if first_name.is_none() && last_name.is_none() && password.is_none() {
        return Err(ApiError::bad_request("missing required fields"));
    }
    let email = validate::non_empty_str(body, "email")
        .ok_or_else(|| ApiError::bad_request("missing required field: email"))?;

    let _guard = state.locks.lock(Collection::Users, email).await;

    let mut account: User = store::find(state.store.as_ref(), Collection::Users, email)
        .await?
        .ok_or_else(|| ApiError::not_found("user not found"))?;

    if let Some(v) = first_name {
        v.clone_into(&mut account.first_name);
    }
    if let Some(v) = last_name {
        v.clone_into(&mut account.last_name);
    }
    if let Some(v) = password {
        account.password = hash_password(&state.config.password_secret, v);
    }

    store::put(state.store.as_ref(), Collection::Users, email, &account)
        .await
        .map_err(|e| ApiError::Storage(e.to_string()))?;

    info!(%email, "user updated");
    Ok(account.into())
}

/// Delete a user and every check they own.
///
/// # Errors
///
/// `BadRequest` if no email is given, `NotFound` if the user does not exist,
/// `Storage` if a check or the user record cannot be removed.
pub async fn delete(state: &AppState, email: Option<&str>) -> Result<Deleted, ApiError> {
    let email = email_param(email)?;

    let _guard = state.locks.lock(Collection::Users, email).await;

    let mut account: User = store::find(state.store.as_ref(), Collection::Users, email)
        .await?
        .ok_or_else(|| ApiError::not_found("user not found"))?;

    // Phase 1: children.
    let mut removed = Vec::with_capacity(account.checks.len());
    let mut failure = None;
    for check_id in &account.checks {
        match state.store.delete(Collection::Checks, check_id).await {
            Ok(()) => removed.push(check_id.clone()),
            Err(e) if e.is_not_found() => {
                warn!(%email, %check_id, "owned check already missing");
                removed.push(check_id.clone());
            }
            Err(e) => {
                failure = Some(e);
                break;
            }
        }
    }

    if let Some(e) = failure {
        prune_checks(state, &mut account, &removed).await;
        return Err(ApiError::Storage(e.to_string()));
    }

    // Phase 2: parent.
    match state.store.delete(Collection::Users, email).await {
        Ok(()) => {}
        Err(e) if e.is_not_found() => return Err(ApiError::not_found("user not found")),
        Err(e) => {
            prune_checks(state, &mut account, &removed).await;
            return Err(ApiError::Storage(e.to_string()));
        }
    }

    info!(%email, checks = removed.len(), "user deleted");
    Ok(Deleted { msg: "user deleted successfully", email: email.to_owned(), deleted_checks: removed })
}

/// Compensation for an interrupted cascade: drop already-deleted ids from the list.
async fn prune_checks(state: &AppState, account: &mut User, removed: &[String]) {
    account.checks.retain(|id| !removed.contains(id));
    warn!(
        email = %account.email,
        removed = removed.len(),
        remaining = account.checks.len(),
        "cascade interrupted; pruning check list"
    );
    if let Err(e) = store::put(state.store.as_ref(), Collection::Users, &account.email, &*account).await {
        error!(email = %account.email, error = %e, "failed to prune check list after interrupted cascade");
    }
}

#[cfg(test)]
#[path = "user_test.rs"]
mod tests;
