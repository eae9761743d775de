//! Bearer token issue, lookup, extension, revocation, and verification.
//!
//! ARCHITECTURE
//! ============
//! A token is a stored record `{email, token, expires}` keyed by its 50-char
//! id. There is no reaper: expiry is checked lazily whenever a token is
//! verified or extended. A user may hold any number of live tokens.
//!
//! `verify` is the capability the user and check services consume. It never
//! fails; an unknown, mismatched, or expired token is simply `false`.

use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;
use tracing::{debug, info, warn};

use super::user::{self, User};
use super::validate;
use crate::error::ApiError;
use crate::state::AppState;
use crate::store::{self, Collection};

pub const TOKEN_ID_LEN: usize = 50;
const ID_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Stored token record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    /// Email of the user the token authenticates.
    pub email: String,
    /// Token id; also the record key.
    pub token: String,
    /// Expiry as milliseconds since the Unix epoch.
    pub expires: i64,
}

impl Token {
    #[must_use]
    pub fn is_live_at(&self, now_ms: i64) -> bool {
        now_ms < self.expires
    }
}

/// Payload returned by `revoke`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Revoked {
    pub msg: &'static str,
    pub token_info: Token,
}

/// Generate a random alphanumeric id from the thread-local CSPRNG.
#[must_use]
pub fn generate_id(len: usize) -> String {
    let mut rng = rand::rng();
    (0..len)
        .map(|_| {
            let idx = rng.random_range(0..ID_ALPHABET.len());
            ID_ALPHABET[idx] as char
        })
        .collect()
}

/// Current time as milliseconds since the Unix epoch.
#[must_use]
pub fn now_millis() -> i64 {
    i64::try_from(OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000).unwrap_or(i64::MAX)
}

fn expiry_from(state: &AppState, now_ms: i64) -> i64 {
    let ttl_ms = i64::try_from(state.config.token_ttl.as_millis()).unwrap_or(i64::MAX);
    now_ms.saturating_add(ttl_ms)
}

fn token_id(raw: Option<&str>) -> Result<&str, ApiError> {
    validate::exact_len_str(raw, TOKEN_ID_LEN).ok_or_else(|| ApiError::bad_request("invalid token"))
}

// =============================================================================
// OPERATIONS
// =============================================================================

/// Exchange `{email, password}` for a fresh token.
///
/// # Errors
///
/// `BadRequest` if either field is missing, `NotFound` if the user cannot be
/// read, `InvalidCredentials` on a password mismatch, `Storage` if the token
/// cannot be written.
pub async fn issue(state: &AppState, body: &Value) -> Result<Token, ApiError> {
    let (Some(email), Some(password)) =
        (validate::non_empty_str(body, "email"), validate::non_empty_str(body, "password"))
    else {
        return Err(ApiError::bad_request("missing required fields"));
    };

    let account: User = match store::find(state.store.as_ref(), Collection::Users, email).await {
        Ok(Some(u)) => u,
        Ok(None) => return Err(ApiError::not_found("user not found")),
        Err(e) => {
            warn!(error = %e, %email, "user lookup failed during token issue");
            return Err(ApiError::not_found("user not found"));
        }
    };

    if user::hash_password(&state.config.password_secret, password) != account.password {
        debug!(%email, "token issue rejected: password mismatch");
        return Err(ApiError::InvalidCredentials);
    }

    let token = Token {
        email: account.email,
        token: generate_id(TOKEN_ID_LEN),
        expires: expiry_from(state, now_millis()),
    };
    store::insert(state.store.as_ref(), Collection::Tokens, &token.token, &token)
        .await
        .map_err(|e| ApiError::Storage(e.to_string()))?;

    info!(email = %token.email, "token issued");
    Ok(token)
}

/// Look up a token by its 50-char id.
///
/// # Errors
///
/// `BadRequest` for a malformed id, `NotFound` if no such token exists.
pub async fn fetch(state: &AppState, id: Option<&str>) -> Result<Token, ApiError> {
    let id = token_id(id)?;
    store::find(state.store.as_ref(), Collection::Tokens, id)
        .await?
        .ok_or_else(|| ApiError::not_found("token not found"))
}

/// Push a live token's expiry out by one TTL from now.
///
/// # Errors
///
/// `BadRequest` unless `id` is well formed and `extend` is `true`, and when
/// the token is missing or already expired. `Storage` if the write fails.
pub async fn extend(state: &AppState, body: &Value) -> Result<Token, ApiError> {
    let id = token_id(body.get("id").and_then(Value::as_str))?;
    if validate::boolean(body, "extend") != Some(true) {
        return Err(ApiError::bad_request("invalid token"));
    }

    let _guard = state.locks.lock(Collection::Tokens, id).await;

    let mut token: Token = store::find(state.store.as_ref(), Collection::Tokens, id)
        .await?
        .ok_or_else(|| ApiError::bad_request("token not found"))?;

    let now = now_millis();
    if !token.is_live_at(now) {
        return Err(ApiError::bad_request("token expired"));
    }

    token.expires = expiry_from(state, now);
    match store::put(state.store.as_ref(), Collection::Tokens, id, &token).await {
        Ok(()) => {}
        Err(e) if e.is_not_found() => return Err(ApiError::bad_request("token not found")),
        Err(e) => return Err(ApiError::Storage(e.to_string())),
    }

    debug!(email = %token.email, "token extended");
    Ok(token)
}

/// Delete a token, returning what it held.
///
/// # Errors
///
/// `BadRequest` for a malformed or unknown id, `Storage` if the delete fails.
pub async fn revoke(state: &AppState, id: Option<&str>) -> Result<Revoked, ApiError> {
    let id = token_id(id)?;

    let _guard = state.locks.lock(Collection::Tokens, id).await;

    let token: Token = store::find(state.store.as_ref(), Collection::Tokens, id)
        .await?
        .ok_or_else(|| ApiError::bad_request("token not found"))?;

    match state.store.delete(Collection::Tokens, id).await {
        Ok(()) => {}
        Err(e) if e.is_not_found() => return Err(ApiError::bad_request("token not found")),
        Err(e) => return Err(ApiError::Storage(e.to_string())),
    }

    info!(email = %token.email, "token revoked");
    Ok(Revoked { msg: "token deleted successfully", token_info: token })
}

/// Resolve a presented token id to its record, if any. Never fails.
pub async fn lookup(state: &AppState, id: Option<&str>) -> Option<Token> {
    let id = validate::present(id)?;
    match store::find(state.store.as_ref(), Collection::Tokens, id).await {
        Ok(found) => found,
        Err(e) => {
            debug!(error = %e, "token lookup failed");
            None
        }
    }
}

/// True iff the token exists, belongs to `email`, and has not expired.
pub async fn verify(state: &AppState, id: Option<&str>, email: &str) -> bool {
    lookup(state, id)
        .await
        .is_some_and(|t| t.email == email && t.is_live_at(now_millis()))
}

#[cfg(test)]
#[path = "token_test.rs"]
mod tests;
