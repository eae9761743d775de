//! Check routes. Every operation requires the owner's token in the `token`
//! header.

use std::collections::HashMap;

use axum::extract::{Query, State};
use axum::response::Json;

use super::extract::{JsonBody, TokenHeader};
use super::{Envelope, ok};
use crate::error::ApiError;
use crate::services::check::{self, Check, Deleted};
use crate::state::AppState;

type Params = Query<HashMap<String, String>>;

/// `POST /check`
pub async fn create(
    State(state): State<AppState>,
    token: TokenHeader,
    JsonBody(body): JsonBody,
) -> Result<Json<Envelope<Check>>, ApiError> {
    check::create(&state, &body, token.as_deref()).await.map(ok)
}

/// `GET /check?id=`
pub async fn fetch(
    State(state): State<AppState>,
    token: TokenHeader,
    Query(params): Params,
) -> Result<Json<Envelope<Check>>, ApiError> {
    check::fetch(&state, params.get("id").map(String::as_str), token.as_deref())
        .await
        .map(ok)
}

/// `PUT /check`: body carries `id` plus the fields to change.
pub async fn update(
    State(state): State<AppState>,
    token: TokenHeader,
    JsonBody(body): JsonBody,
) -> Result<Json<Envelope<Check>>, ApiError> {
    check::update(&state, &body, token.as_deref()).await.map(ok)
}

/// `DELETE /check?id=`
pub async fn delete(
    State(state): State<AppState>,
    token: TokenHeader,
    Query(params): Params,
) -> Result<Json<Envelope<Deleted>>, ApiError> {
    check::delete(&state, params.get("id").map(String::as_str), token.as_deref())
        .await
        .map(ok)
}

#[cfg(test)]
#[path = "checks_test.rs"]
mod tests;
