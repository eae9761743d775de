//! User account routes. Unauthenticated, as registration has to be.

use std::collections::HashMap;

use axum::extract::{Query, State};
use axum::response::Json;

use super::extract::JsonBody;
use super::{Envelope, ok};
use crate::error::ApiError;
use crate::services::user::{self, Deleted, PublicUser};
use crate::state::AppState;

type Params = Query<HashMap<String, String>>;

/// `POST /user`: register a new account.
pub async fn register(
    State(state): State<AppState>,
    JsonBody(body): JsonBody,
) -> Result<Json<Envelope<PublicUser>>, ApiError> {
    user::register(&state, &body).await.map(ok)
}

/// `GET /user?email=`: read an account.
pub async fn fetch(State(state): State<AppState>, Query(params): Params) -> Result<Json<Envelope<PublicUser>>, ApiError> {
    user::fetch(&state, params.get("email").map(String::as_str)).await.map(ok)
}

/// `PUT /user`: edit names or password.
pub async fn update(
    State(state): State<AppState>,
    JsonBody(body): JsonBody,
) -> Result<Json<Envelope<PublicUser>>, ApiError> {
    user::update(&state, &body).await.map(ok)
}

/// `DELETE /user?email=`: remove an account and its checks.
pub async fn delete(State(state): State<AppState>, Query(params): Params) -> Result<Json<Envelope<Deleted>>, ApiError> {
    user::delete(&state, params.get("email").map(String::as_str)).await.map(ok)
}

#[cfg(test)]
#[path = "users_test.rs"]
mod tests;
