//! Token routes: sign-in, lookup, extension, sign-out.

use std::collections::HashMap;

use axum::extract::{Query, State};
use axum::response::Json;

use super::extract::JsonBody;
use super::{Envelope, ok};
use crate::error::ApiError;
use crate::services::token::{self, Revoked, Token};
use crate::state::AppState;

type Params = Query<HashMap<String, String>>;

/// `POST /token`: exchange email and password for a token.
pub async fn issue(State(state): State<AppState>, JsonBody(body): JsonBody) -> Result<Json<Envelope<Token>>, ApiError> {
    token::issue(&state, &body).await.map(ok)
}

/// `GET /token?id=`
pub async fn fetch(State(state): State<AppState>, Query(params): Params) -> Result<Json<Envelope<Token>>, ApiError> {
    token::fetch(&state, params.get("id").map(String::as_str)).await.map(ok)
}

/// `PUT /token`: body `{id, extend: true}` pushes the expiry out.
pub async fn extend(State(state): State<AppState>, JsonBody(body): JsonBody) -> Result<Json<Envelope<Token>>, ApiError> {
    token::extend(&state, &body).await.map(ok)
}

/// `DELETE /token?id=`
pub async fn revoke(State(state): State<AppState>, Query(params): Params) -> Result<Json<Envelope<Revoked>>, ApiError> {
    token::revoke(&state, params.get("id").map(String::as_str)).await.map(ok)
}

#[cfg(test)]
#[path = "tokens_test.rs"]
mod tests;
