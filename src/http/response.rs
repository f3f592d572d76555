//! Error translation and access logging.
//!
//! # Responsibilities
//! - Log every request on entry and every response on exit
//! - Turn each failure into exactly one structured log record
//! - Render failures as `{ "message": string }` with the kind's status
//!
//! # Design Decisions
//! - Wraps the whole chain; failures arrive as an `ErrorRecord` response extension
//! - Bare error statuses from tower layers (timeouts, 405) are classified and
//!   rendered the same way
//! - Internal detail goes to the log, never into the body

use std::any::Any;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use axum::{
    body::Body,
    extract::{Request, State},
    http::{header, HeaderValue, Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::error::{
    ApiError, ErrorKind, ErrorRecord, AUTH_REQUIRED_MESSAGE, GENERIC_INTERNAL_MESSAGE, NOT_FOUND_MESSAGE,
};
use crate::http::request::{resolve_client_addr, ClientAddr};
use crate::observability::metrics;

/// Wire shape of every failure.
#[derive(Debug, Serialize)]
pub struct ErrorBody<'a> {
    pub message: &'a str,
}

/// Settings for the translator layer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TranslatorState {
    pub trust_forwarded_for: bool,
}

/// Outermost application middleware: access log plus error translation.
pub async fn error_translator(
    State(state): State<TranslatorState>,
    mut request: Request,
    next: Next,
) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let client = resolve_client_addr(&request, state.trust_forwarded_for);
    request.extensions_mut().insert(client);

    tracing::info!(method = %method, path = %path, client = %client, "Request received");

    let response = next.run(request).await;
    let response = translate(response, &method, &path, client);

    let status = response.status();
    tracing::info!(
        status = status.as_u16(),
        duration_ms = start.elapsed().as_millis() as u64,
        "Response sent"
    );
    metrics::record_request(method.as_str(), status.as_u16(), start);
    response
}

/// Log and render a failed response; pass successes through.
pub fn translate(mut response: Response, method: &Method, path: &str, client: ClientAddr) -> Response {
    let status = response.status();
    let record = match response.extensions_mut().remove::<ErrorRecord>() {
        Some(record) => record,
        None if status.is_client_error() || status.is_server_error() => bare_record(status),
        None => return response,
    };

    log_record(&record, method, path, client);
    render(response, &record)
}

fn bare_record(status: StatusCode) -> ErrorRecord {
    let kind = ErrorKind::from_status(status);
    let message = match kind {
        ErrorKind::NotFound => NOT_FOUND_MESSAGE,
        ErrorKind::Unauthenticated => AUTH_REQUIRED_MESSAGE,
        ErrorKind::Internal => GENERIC_INTERNAL_MESSAGE,
        _ => status.canonical_reason().unwrap_or("Request failed"),
    };
    ErrorRecord {
        kind,
        message: message.to_string(),
        detail: Some(format!("unclassified {} response", status)),
    }
}

fn log_record(record: &ErrorRecord, method: &Method, path: &str, client: ClientAddr) {
    let timestamp_ms = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64;
    let status = record.status().as_u16();

    if record.kind == ErrorKind::Internal {
        tracing::error!(
            kind = record.kind.as_str(),
            method = %method,
            path = %path,
            client = %client,
            status,
            message = %record.message,
            detail = record.detail.as_deref().unwrap_or(""),
            timestamp_ms,
            "Request failed"
        );
    } else {
        tracing::warn!(
            kind = record.kind.as_str(),
            method = %method,
            path = %path,
            client = %client,
            status,
            message = %record.message,
            timestamp_ms,
            "Request rejected"
        );
    }
}

fn render(response: Response, record: &ErrorRecord) -> Response {
    let (mut parts, _) = response.into_parts();
    let body = serde_json::to_vec(&ErrorBody { message: &record.message })
        .unwrap_or_else(|_| br#"{"message":"An error occurred on the server"}"#.to_vec());

    parts.status = record.status();
    parts.headers.remove(header::CONTENT_LENGTH);
    parts
        .headers
        .insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
    Response::from_parts(parts, Body::from(body))
}

/// `CatchPanicLayer` handler: a panicking handler becomes an internal error.
pub fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic payload".to_string()
    };
    ApiError::Internal(format!("handler panicked: {}", detail)).into_response()
}
