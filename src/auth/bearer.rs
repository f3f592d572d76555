//! Bearer credential authentication.

use axum::http::{header::AUTHORIZATION, HeaderMap};

use crate::auth::identity::CallerIdentity;
use crate::auth::token::TokenVerifier;
use crate::error::{ApiError, AUTH_REQUIRED_MESSAGE};
use crate::observability::metrics;

/// Extract the token from an `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    if token.is_empty() || token.contains(' ') {
        return None;
    }
    Some(token)
}

/// Verify the bearer credential and derive the caller.
///
/// Every failure maps to the same `Unauthenticated` error; the reason is only logged.
pub fn authenticate(
    headers: &HeaderMap,
    verifier: &dyn TokenVerifier,
) -> Result<CallerIdentity, ApiError> {
    let Some(token) = bearer_token(headers) else {
        tracing::debug!("Missing or malformed Authorization header");
        metrics::record_auth_failure("missing");
        return Err(ApiError::Unauthenticated(AUTH_REQUIRED_MESSAGE));
    };

    verifier.verify(token).map_err(|e| {
        tracing::warn!(error = %e, token_length = token.len(), "Credential verification failed");
        metrics::record_auth_failure("rejected");
        ApiError::Unauthenticated(AUTH_REQUIRED_MESSAGE)
    })
}
