//! Error taxonomy for the request pipeline.
//!
//! # Responsibilities
//! - Classify every failure into a stable kind with a fixed status code
//! - Carry the failure from its detection site to the error translator
//! - Keep internal detail out of the rendered message
//!
//! # Design Decisions
//! - `ApiError::into_response` never writes a body; it attaches an
//!   `ErrorRecord` that `http::response::error_translator` logs and renders
//! - Unclassified failures keep their detail in the record only

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::validation::ValidationErrors;

/// Message rendered for every unclassified failure.
pub const GENERIC_INTERNAL_MESSAGE: &str = "An error occurred on the server";

/// Message rendered for every failed bearer check.
pub const AUTH_REQUIRED_MESSAGE: &str = "Authorization required";

/// Message rendered by the catch-all route.
pub const NOT_FOUND_MESSAGE: &str = "Requested resource not found";

/// Failure kinds, each bound to one status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    ValidationFailed,
    Unauthenticated,
    Forbidden,
    NotFound,
    Conflict,
    PayloadTooLarge,
    RateLimited,
    Internal,
    /// Produced by a tower layer (timeout, method mismatch) rather than by our code.
    Protocol(StatusCode),
}

impl ErrorKind {
    pub fn status(self) -> StatusCode {
        match self {
            ErrorKind::ValidationFailed => StatusCode::BAD_REQUEST,
            ErrorKind::Unauthenticated => StatusCode::UNAUTHORIZED,
            ErrorKind::Forbidden => StatusCode::FORBIDDEN,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Conflict => StatusCode::CONFLICT,
            ErrorKind::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ErrorKind::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
            ErrorKind::Protocol(status) => status,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::ValidationFailed => "validation_failed",
            ErrorKind::Unauthenticated => "unauthenticated",
            ErrorKind::Forbidden => "forbidden",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Conflict => "conflict",
            ErrorKind::PayloadTooLarge => "payload_too_large",
            ErrorKind::RateLimited => "rate_limited",
            ErrorKind::Internal => "internal",
            ErrorKind::Protocol(_) => "protocol",
        }
    }

    /// Classify a bare error status that reached the translator without a record.
    pub fn from_status(status: StatusCode) -> Self {
        match status {
            StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => ErrorKind::ValidationFailed,
            StatusCode::UNAUTHORIZED => ErrorKind::Unauthenticated,
            StatusCode::FORBIDDEN => ErrorKind::Forbidden,
            StatusCode::NOT_FOUND => ErrorKind::NotFound,
            StatusCode::CONFLICT => ErrorKind::Conflict,
            StatusCode::PAYLOAD_TOO_LARGE => ErrorKind::PayloadTooLarge,
            StatusCode::TOO_MANY_REQUESTS => ErrorKind::RateLimited,
            s if s.is_server_error() => ErrorKind::Internal,
            s => ErrorKind::Protocol(s),
        }
    }
}

/// A failure on its way to the error translator.
///
/// `message` is what the caller sees; `detail` is logged and never rendered.
#[derive(Debug, Clone)]
pub struct ErrorRecord {
    pub kind: ErrorKind,
    pub message: String,
    pub detail: Option<String>,
}

impl ErrorRecord {
    pub fn status(&self) -> StatusCode {
        self.kind.status()
    }
}

/// Application-level error type raised by every pipeline stage and handler.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    ValidationFailed(ValidationErrors),

    #[error("{0}")]
    MalformedBody(String),

    #[error("{0}")]
    Unauthenticated(&'static str),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("request body exceeds {limit} bytes")]
    PayloadTooLarge { limit: usize },

    #[error("Too many requests, please try again later")]
    RateLimited { retry_after_secs: u64 },

    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn internal(err: impl std::fmt::Display) -> Self {
        ApiError::Internal(err.to_string())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::ValidationFailed(_) | ApiError::MalformedBody(_) => ErrorKind::ValidationFailed,
            ApiError::Unauthenticated(_) => ErrorKind::Unauthenticated,
            ApiError::Forbidden(_) => ErrorKind::Forbidden,
            ApiError::NotFound(_) => ErrorKind::NotFound,
            ApiError::Conflict(_) => ErrorKind::Conflict,
            ApiError::PayloadTooLarge { .. } => ErrorKind::PayloadTooLarge,
            ApiError::RateLimited { .. } => ErrorKind::RateLimited,
            ApiError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Convert into the record consumed by the translator.
    pub fn into_record(self) -> ErrorRecord {
        let kind = self.kind();
        match self {
            ApiError::Internal(detail) => ErrorRecord {
                kind,
                message: GENERIC_INTERNAL_MESSAGE.to_string(),
                detail: Some(detail),
            },
            other => ErrorRecord {
                kind,
                message: other.to_string(),
                detail: None,
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let retry_after = match &self {
            ApiError::RateLimited { retry_after_secs } => Some(*retry_after_secs),
            _ => None,
        };

        let record = self.into_record();
        let mut response = record.status().into_response();
        if let Some(secs) = retry_after {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(secs));
        }
        response.extensions_mut().insert(record);
        response
    }
}
