//! The verified caller attached to a request.

use axum::{extract::FromRequestParts, http::request::Parts};

use crate::error::{ApiError, AUTH_REQUIRED_MESSAGE};

/// Who is making the call. Created by the authenticator, read by handlers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerIdentity {
    id: String,
    name: Option<String>,
}

impl CallerIdentity {
    pub fn new(id: impl Into<String>, name: Option<String>) -> Self {
        Self {
            id: id.into(),
            name,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

impl<S> FromRequestParts<S> for CallerIdentity
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // Absent only if a protected handler was mounted outside the pipeline.
        parts
            .extensions
            .get::<CallerIdentity>()
            .cloned()
            .ok_or(ApiError::Unauthenticated(AUTH_REQUIRED_MESSAGE))
    }
}
