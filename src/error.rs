//! API error taxonomy and its HTTP rendering.
//!
//! Every failure a request can hit is one of these variants. Rendering always
//! produces the standard envelope with `success: false` and a `data` object
//! carrying a human message and a stable machine code.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use tracing::error;

use crate::store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("user has already reached the maximum of {limit} checks")]
    QuotaExceeded { limit: usize },
    #[error("method not allowed")]
    MethodNotAllowed,
    #[error("storage failure: {0}")]
    Storage(String),
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn forbidden() -> Self {
        Self::Forbidden("invalid token or authentication failed".into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) | Self::InvalidCredentials => StatusCode::BAD_REQUEST,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::QuotaExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Self::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "E_BAD_REQUEST",
            Self::InvalidCredentials => "E_INVALID_CREDENTIALS",
            Self::Forbidden(_) => "E_FORBIDDEN",
            Self::NotFound(_) => "E_NOT_FOUND",
            Self::Conflict(_) => "E_CONFLICT",
            Self::QuotaExceeded { .. } => "E_QUOTA_EXCEEDED",
            Self::MethodNotAllowed => "E_METHOD_NOT_ALLOWED",
            Self::Storage(_) => "E_STORAGE",
        }
    }

    /// Message safe to show the caller. Storage details stay in the logs.
    #[must_use]
    pub fn public_message(&self) -> String {
        match self {
            Self::Storage(_) => "internal storage error".to_owned(),
            other => other.to_string(),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::InvalidKey(id) => Self::BadRequest(format!("invalid identifier: {id:?}")),
            StoreError::NotFound { collection, id } => Self::NotFound(format!("{collection}/{id} not found")),
            other => Self::Storage(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let Self::Storage(detail) = &self {
            error!(error = %detail, "request failed on storage");
        }

        let body = json!({
            "success": false,
            "data": {
                "msg": self.public_message(),
                "code": self.code(),
            },
        });
        (self.status(), Json(body)).into_response()
    }
}

#[cfg(test)]
#[path = "error_test.rs"]
mod tests;
