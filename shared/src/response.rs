use std::time::Instant;

use lambda_http::{http::StatusCode, Body, Response};
use serde::Serialize;
use serde_json::Value;

use crate::error::ApiError;

/// Per-request state: a fresh id and a start instant for latency reporting.
/// Created at the top of the router, dropped at response time.
#[derive(Debug)]
pub struct RequestContext {
    pub request_id: String,
    pub started: Instant,
}

impl RequestContext {
    pub fn new() -> Self {
        Self {
            request_id: uuid::Uuid::new_v4().to_string(),
            started: Instant::now(),
        }
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct Pagination {
    pub limit: usize,
    pub offset: usize,
    pub total: usize,
}

/// A handler's successful outcome before envelope wrapping. Keeping this
/// separate from `Response` leaves the formatter as the single JSON exit.
#[derive(Debug)]
pub struct Handled {
    pub status: StatusCode,
    pub data: Value,
    pub pagination: Option<Pagination>,
}

impl Handled {
    pub fn ok(data: Value) -> Self {
        Self {
            status: StatusCode::OK,
            data,
            pagination: None,
        }
    }

    pub fn created(data: Value) -> Self {
        Self {
            status: StatusCode::CREATED,
            data,
            pagination: None,
        }
    }

    pub fn paged(data: Value, pagination: Pagination) -> Self {
        Self {
            status: StatusCode::OK,
            data,
            pagination: Some(pagination),
        }
    }
}

fn metadata(ctx: &RequestContext) -> Value {
    serde_json::json!({
        "requestId": ctx.request_id,
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "durationMs": ctx.started.elapsed().as_millis() as u64,
    })
}

fn build(status: StatusCode, origin: &str, body: Value) -> Result<Response<Body>, ApiError> {
    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", origin)
        .body(body.to_string().into())
        .map_err(|e| ApiError::internal(format!("failed to build response: {}", e)))
}

/// Wrap a success payload in the uniform envelope.
pub fn success(
    ctx: &RequestContext,
    origin: &str,
    handled: Handled,
) -> Result<Response<Body>, ApiError> {
    let mut body = serde_json::json!({
        "data": handled.data,
        "metadata": metadata(ctx),
    });
    if let Some(pagination) = handled.pagination {
        body["pagination"] = serde_json::to_value(pagination)?;
    }
    build(handled.status, origin, body)
}

/// Wrap an error in the uniform envelope. Internal detail is redacted in
/// production; callers log the specific cause before reaching here.
pub fn failure(
    ctx: &RequestContext,
    origin: &str,
    err: &ApiError,
    production: bool,
) -> Result<Response<Body>, ApiError> {
    let body = serde_json::json!({
        "error": err.client_message(production),
        "metadata": metadata(ctx),
    });
    build(err.status(), origin, body)
}

/// 302 redirect, used by the OAuth callback.
pub fn redirect(origin: &str, location: &str) -> Result<Response<Body>, ApiError> {
    Response::builder()
        .status(StatusCode::FOUND)
        .header("Location", location)
        .header("Access-Control-Allow-Origin", origin)
        .body(Body::Empty)
        .map_err(|e| ApiError::internal(format!("failed to build redirect: {}", e)))
}

/// CORS preflight response.
pub fn preflight(origin: &str) -> Result<Response<Body>, ApiError> {
    Response::builder()
        .status(StatusCode::OK)
        .header("Access-Control-Allow-Origin", origin)
        .header("Access-Control-Allow-Methods", "GET,POST,PUT,DELETE,OPTIONS")
        .header("Access-Control-Allow-Headers", "Content-Type,Authorization")
        .body(Body::Empty)
        .map_err(|e| ApiError::internal(format!("failed to build preflight: {}", e)))
}
