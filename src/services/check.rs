//! Check service: monitor definitions owned by users.
//!
//! DESIGN
//! ======
//! Every operation is a short linear pipeline: validate, authorize against the
//! owner's token, then one or more dependent store calls. Mutations that touch
//! both a check and its owner's `checks` list hold the owner's record lock for
//! the whole sequence, so quota checks and list edits cannot interleave.
//!
//! ERROR HANDLING
//! ==============
//! Create and delete write two records. If the second write (the owner's list)
//! fails, the first is compensated: a fresh check is deleted again, a deleted
//! check is restored. The caller still sees `Storage`.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, info, warn};

use super::token::{self, generate_id};
use super::user::User;
use super::validate;
use crate::error::ApiError;
use crate::state::AppState;
use crate::store::{self, Collection};

pub const CHECK_ID_LEN: usize = 20;
pub const MAX_TIMEOUT_SECONDS: i64 = 5;

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Http,
    Https,
}

impl Protocol {
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "http" => Some(Self::Http),
            "https" => Some(Self::Https),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "GET" => Some(Self::Get),
            "POST" => Some(Self::Post),
            "PUT" => Some(Self::Put),
            "DELETE" => Some(Self::Delete),
            _ => None,
        }
    }
}

/// Stored check record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Check {
    pub id: String,
    pub user_email: String,
    pub protocol: Protocol,
    pub url: String,
    pub method: HttpMethod,
    pub success_codes: Vec<u16>,
    pub time_out_seconds: u8,
}

/// Payload returned by `delete`.
#[derive(Debug, Serialize)]
pub struct Deleted {
    pub msg: &'static str,
    pub id: String,
}

/// The editable fields of a check, each present only if supplied and valid.
#[derive(Debug, Default, PartialEq, Eq)]
pub(crate) struct CheckFields {
    pub(crate) protocol: Option<Protocol>,
    pub(crate) url: Option<String>,
    pub(crate) method: Option<HttpMethod>,
    pub(crate) success_codes: Option<Vec<u16>>,
    pub(crate) time_out_seconds: Option<u8>,
}

impl CheckFields {
    pub(crate) fn parse(body: &Value) -> Self {
        Self {
            protocol: validate::non_empty_str(body, "protocol").and_then(Protocol::parse),
            url: validate::non_empty_str(body, "url").map(str::to_owned),
            method: validate::non_empty_str(body, "method").and_then(HttpMethod::parse),
            success_codes: validate::status_codes(body, "successCodes"),
            time_out_seconds: validate::int_in_range(body, "timeOutSeconds", 0..=MAX_TIMEOUT_SECONDS)
                .and_then(|n| u8::try_from(n).ok()),
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.protocol.is_none()
            && self.url.is_none()
            && self.method.is_none()
            && self.success_codes.is_none()
            && self.time_out_seconds.is_none()
    }

    fn into_check(self, id: String, user_email: String) -> Option<Check> {
        Some(Check {
            id,
            user_email,
            protocol: self.protocol?,
            url: self.url?,
            method: self.method?,
            success_codes: self.success_codes?,
            time_out_seconds: self.time_out_seconds?,
        })
    }

    fn is_complete(&self) -> bool {
        self.protocol.is_some()
            && self.url.is_some()
            && self.method.is_some()
            && self.success_codes.is_some()
            && self.time_out_seconds.is_some()
    }

    fn apply(self, check: &mut Check) {
        if let Some(v) = self.protocol {
            check.protocol = v;
        }
        if let Some(v) = self.url {
            check.url = v;
        }
        if let Some(v) = self.method {
            check.method = v;
        }
        if let Some(v) = self.success_codes {
            check.success_codes = v;
        }
        if let Some(v) = self.time_out_seconds {
            check.time_out_seconds = v;
        }
    }
}

fn check_id(raw: Option<&str>) -> Result<&str, ApiError> {
    validate::present(raw).ok_or_else(|| ApiError::bad_request("invalid request"))
}

async fn load_check(state: &AppState, id: &str) -> Result<Check, ApiError> {
    store::find(state.store.as_ref(), Collection::Checks, id)
        .await?
        .ok_or_else(|| ApiError::not_found("check not found"))
}

async fn authorize(state: &AppState, token_id: Option<&str>, owner: &str) -> Result<(), ApiError> {
    if token::verify(state, token_id, owner).await {
        Ok(())
    } else {
        Err(ApiError::forbidden())
    }
}

// =============================================================================
// OPERATIONS
// =============================================================================

/// Register a new check for the token holder.
///
/// # Errors
///
/// `BadRequest` for invalid fields, `Forbidden` for a missing, unknown, or
/// expired token or a missing owner, `QuotaExceeded` at the per-user limit,
/// `Storage` if either write fails.
pub async fn create(state: &AppState, body: &Value, token_id: Option<&str>) -> Result<Check, ApiError> {
    let fields = CheckFields::parse(body);
    if !fields.is_complete() {
        return Err(ApiError::bad_request("invalid request"));
    }

    let owner = token::lookup(state, token_id).await.ok_or_else(ApiError::forbidden)?.email;

    let _guard = state.locks.lock(Collection::Users, &owner).await;

    let Some(mut account) = store::find::<User>(state.store.as_ref(), Collection::Users, &owner).await? else {
        return Err(ApiError::Forbidden("user not found".into()));
    };
    authorize(state, token_id, &owner).await?;

    let limit = state.config.max_checks_per_user;
    if account.checks.len() >= limit {
        return Err(ApiError::QuotaExceeded { limit });
    }

    let id = generate_id(CHECK_ID_LEN);
    let check = fields
        .into_check(id.clone(), owner.clone())
        .ok_or_else(|| ApiError::bad_request("invalid request"))?;
    store::insert(state.store.as_ref(), Collection::Checks, &id, &check)
        .await
        .map_err(|e| ApiError::Storage(e.to_string()))?;

    account.checks.push(id.clone());
    if let Err(e) = store::put(state.store.as_ref(), Collection::Users, &owner, &account).await {
        warn!(email = %owner, check_id = %id, error = %e, "owner update failed; removing new check");
        if let Err(undo) = state.store.delete(Collection::Checks, &id).await {
            error!(check_id = %id, error = %undo, "compensating delete failed; check is orphaned");
        }
        return Err(ApiError::Storage(e.to_string()));
    }

    info!(email = %owner, check_id = %id, "check created");
    Ok(check)
}

/// Read a check the token holder owns.
///
/// # Errors
///
/// `BadRequest` without an id, `NotFound` for an unknown check, `Forbidden`
/// unless the token belongs to the owner and is live.
pub async fn fetch(state: &AppState, id: Option<&str>, token_id: Option<&str>) -> Result<Check, ApiError> {
    let id = check_id(id)?;
    let check = load_check(state, id).await?;
    authorize(state, token_id, &check.user_email).await?;
    Ok(check)
}

/// Overwrite the supplied fields of an existing check.
///
/// # Errors
///
/// `BadRequest` without an id or without any valid field, `NotFound` for an
/// unknown check, `Forbidden` for a bad token, `Storage` if the write fails.
pub async fn update(state: &AppState, body: &Value, token_id: Option<&str>) -> Result<Check, ApiError> {
    let id = check_id(body.get("id").and_then(Value::as_str))?;
    let fields = CheckFields::parse(body);
    if fields.is_empty() {
        return Err(ApiError::bad_request("invalid update request"));
    }

    let owner = load_check(state, id).await?.user_email;
    authorize(state, token_id, &owner).await?;

    let _guard = state.locks.lock(Collection::Users, &owner).await;

    // Re-read under the lock; the check may have changed or gone meanwhile.
    let mut check = load_check(state, id).await?;
    fields.apply(&mut check);
    store::put(state.store.as_ref(), Collection::Checks, id, &check)
        .await
        .map_err(|e| ApiError::Storage(e.to_string()))?;

    info!(email = %owner, check_id = %id, "check updated");
    Ok(check)
}

/// Delete a check and unlink it from its owner.
///
/// # Errors
///
/// `BadRequest` without an id, `NotFound` for an unknown check, `Forbidden`
/// for a bad token, `Storage` if the check or the owner cannot be written.
pub async fn delete(state: &AppState, id: Option<&str>, token_id: Option<&str>) -> Result<Deleted, ApiError> {
    let id = check_id(id)?;

    let owner = load_check(state, id).await?.user_email;
    authorize(state, token_id, &owner).await?;

    let _guard = state.locks.lock(Collection::Users, &owner).await;

    let check = load_check(state, id).await?;
    match state.store.delete(Collection::Checks, id).await {
        Ok(()) => {}
        Err(e) if e.is_not_found() => return Err(ApiError::not_found("check not found")),
        Err(e) => return Err(ApiError::Storage(e.to_string())),
    }

    if let Err(e) = unlink_from_owner(state, &owner, id).await {
        warn!(email = %owner, check_id = %id, error = %e, "owner update failed; restoring check");
        if let Err(undo) = store::insert(state.store.as_ref(), Collection::Checks, id, &check).await {
            error!(check_id = %id, error = %undo, "compensating restore failed; owner list is stale");
        }
        return Err(e);
    }

    info!(email = %owner, check_id = %id, "check deleted");
    Ok(Deleted { msg: "check deleted successfully", id: id.to_owned() })
}

async fn unlink_from_owner(state: &AppState, owner: &str, id: &str) -> Result<(), ApiError> {
    let Some(mut account) = store::find::<User>(state.store.as_ref(), Collection::Users, owner)
        .await
        .map_err(|e| ApiError::Storage(e.to_string()))?
    else {
        warn!(email = %owner, check_id = %id, "owner missing; nothing to unlink");
        return Ok(());
    };

    account.checks.retain(|c| c != id);
    store::put(state.store.as_ref(), Collection::Users, owner, &account)
        .await
        .map_err(|e| ApiError::Storage(e.to_string()))
}

#[cfg(test)]
#[path = "check_test.rs"]
mod tests;
