//! Route handlers behind the pipeline.
//!
//! # Responsibilities
//! - Account creation and sign-in (credential issuance)
//! - Profile read/update and the movies resource, scoped to the caller
//! - Catch-all not-found route
//!
//! # Design Decisions
//! - Handlers receive an already admitted, validated or authenticated request
//! - Failures are returned as `ApiError`; handlers never write error bodies

pub mod movies;
pub mod store;
pub mod users;

use std::sync::Arc;

use axum::{
    extract::{FromRequest, Request},
    routing::{delete, get, post},
    Json, Router,
};
use serde::de::DeserializeOwned;

use crate::auth::TokenIssuer;
use crate::error::{ApiError, NOT_FOUND_MESSAGE};
use crate::routes::store::DocumentStore;

/// State shared by handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<DocumentStore>,
    pub issuer: Arc<dyn TokenIssuer>,
}

/// `Json` whose rejection is a `ValidationFailed` error.
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(ApiJson(value)),
            Err(rejection) => Err(ApiError::MalformedBody(rejection.body_text())),
        }
    }
}

/// All application routes, unguarded. `http::server` wraps them in the pipeline.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/signin", post(users::signin))
        .route("/signup", post(users::signup))
        .route("/users/me", get(users::get_me).patch(users::update_me))
        .route("/movies", get(movies::list).post(movies::create))
        .route("/movies/{id}", delete(movies::remove))
        .fallback(not_found)
        .with_state(state)
}

async fn not_found() -> ApiError {
    ApiError::NotFound(NOT_FOUND_MESSAGE.to_string())
}
