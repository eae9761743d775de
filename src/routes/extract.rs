//! Request extractors shared by the resource routes.

use std::convert::Infallible;

use axum::body::Bytes;
use axum::extract::{FromRequest, FromRequestParts, Request};
use axum::http::request::Parts;
use serde_json::{Map, Value};

const TOKEN_HEADER: &str = "token";

// =============================================================================
// BODY
// =============================================================================

/// JSON object body that never rejects. A missing, unreadable, or malformed
/// body, or one that is not an object, becomes `{}` so the services report
/// their own validation errors.
#[derive(Debug)]
pub struct JsonBody(pub Value);

impl<S> FromRequest<S> for JsonBody
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let parsed = Bytes::from_request(req, state)
            .await
            .ok()
            .and_then(|bytes| serde_json::from_slice::<Value>(&bytes).ok())
            .filter(Value::is_object)
            .unwrap_or_else(|| Value::Object(Map::new()));
        Ok(Self(parsed))
    }
}

// =============================================================================
// TOKEN
// =============================================================================

/// Raw value of the `token` header, if present and valid UTF-8.
#[derive(Debug)]
pub struct TokenHeader(pub Option<String>);

impl TokenHeader {
    pub fn as_deref(&self) -> Option<&str> {
        self.0.as_deref()
    }
}

impl<S> FromRequestParts<S> for TokenHeader
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(TOKEN_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        Ok(Self(token))
    }
}

#[cfg(test)]
#[path = "extract_test.rs"]
mod tests;
