//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! One Axum router carries the page routes, the three resource routes
//! (`/user`, `/token`, `/check`), and a health probe. Each resource route
//! maps POST/GET/PUT/DELETE onto a service operation; any other method gets
//! the 405 envelope. Unknown paths get the 404 envelope.
//!
//! Outer layers, innermost first: CORS (any origin), the OPTIONS responder
//! that turns every OPTIONS request into an empty 204, request tracing.
//! `service` additionally trims trailing slashes before routing.

pub mod checks;
pub mod extract;
pub mod pages;
pub mod tokens;
pub mod users;

use axum::extract::Request;
use axum::http::header::{CONTENT_LENGTH, CONTENT_TYPE};
use axum::http::{Method, StatusCode, Uri};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{any, get};
use axum::Router;
use serde::Serialize;
use serde_json::json;
use tower::Layer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::normalize_path::{NormalizePath, NormalizePathLayer};
use tower_http::trace::TraceLayer;

use crate::error::ApiError;
use crate::state::AppState;

/// Success envelope shared by every JSON response.
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub success: bool,
    pub data: T,
}

pub(crate) fn ok<T: Serialize>(data: T) -> Json<Envelope<T>> {
    Json(Envelope { success: true, data })
}

/// Route table with all layers except path normalization.
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", any(pages::home))
        .route("/about", any(pages::about))
        .route(
            "/user",
            get(users::fetch)
                .post(users::register)
                .put(users::update)
                .delete(users::delete)
                .fallback(method_not_allowed),
        )
        .route(
            "/token",
            get(tokens::fetch)
                .post(tokens::issue)
                .put(tokens::extend)
                .delete(tokens::revoke)
                .fallback(method_not_allowed),
        )
        .route(
            "/check",
            get(checks::fetch)
                .post(checks::create)
                .put(checks::update)
                .delete(checks::delete)
                .fallback(method_not_allowed),
        )
        .route("/healthz", get(healthz))
        .fallback(not_found)
        .layer(cors)
        .layer(middleware::from_fn(answer_options))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// The served service: `app` behind trailing-slash trimming, so `/user/`
/// routes the same as `/user`.
pub fn service(state: AppState) -> NormalizePath<Router> {
    NormalizePathLayer::trim_trailing_slash().layer(app(state))
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}

async fn method_not_allowed() -> ApiError {
    ApiError::MethodNotAllowed
}

async fn not_found(uri: Uri) -> Response {
    let err = ApiError::not_found("Page not found");
    let body = json!({
        "success": false,
        "data": {
            "msg": err.public_message(),
            "code": err.code(),
            "path": uri.path(),
        },
    });
    (err.status(), Json(body)).into_response()
}

/// Answer every OPTIONS request with an empty 204, keeping the headers the
/// inner layers (CORS in particular) attached.
async fn answer_options(req: Request, next: Next) -> Response {
    if req.method() != Method::OPTIONS {
        return next.run(req).await;
    }

    let inner = next.run(req).await;
    let mut headers = inner.headers().clone();
    headers.remove(CONTENT_TYPE);
    headers.remove(CONTENT_LENGTH);

    let mut res = StatusCode::NO_CONTENT.into_response();
    *res.headers_mut() = headers;
    res
}


#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
