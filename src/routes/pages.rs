//! Informational pages at `/` and `/about`. They answer any method.

use std::collections::HashMap;

use axum::extract::Query;
use axum::http::{Method, StatusCode, Uri};
use axum::response::Json;
use serde::Serialize;
use serde_json::{Value, json};

use super::{Envelope, ok};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub message: &'static str,
    pub status_code: u16,
    pub data: Value,
    pub request_details: RequestDetails,
}

/// Echo of the request that produced a page.
#[derive(Debug, Serialize)]
pub struct RequestDetails {
    pub method: String,
    pub path: String,
    pub query: HashMap<String, String>,
}

fn page(message: &'static str, data: Value, method: &Method, uri: &Uri, query: HashMap<String, String>) -> Page {
    Page {
        message,
        status_code: StatusCode::OK.as_u16(),
        data,
        request_details: RequestDetails {
            method: method.as_str().to_ascii_lowercase(),
            path: uri.path().to_owned(),
            query,
        },
    }
}

/// `ANY /`: welcome page.
pub async fn home(method: Method, uri: Uri, Query(query): Query<HashMap<String, String>>) -> Json<Envelope<Page>> {
    ok(page("Welcome to the home page", json!({}), &method, &uri, query))
}

/// `ANY /about`: service description.
pub async fn about(method: Method, uri: Uri, Query(query): Query<HashMap<String, String>>) -> Json<Envelope<Page>> {
    let data = json!({ "info": "This page contains information about our service." });
    ok(page("Welcome to the about page", data, &method, &uri, query))
}
