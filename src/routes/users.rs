//! Account handlers: sign-up, sign-in, profile.

use std::sync::OnceLock;

use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{extract::State, http::StatusCode, Json};
use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::auth::CallerIdentity;
use crate::error::ApiError;
use crate::routes::store::UserSummary;
use crate::routes::{ApiJson, AppState};
use crate::validation::{self, schema};

const INVALID_CREDENTIALS: &str = "Incorrect email or password";

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct SigninRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub token: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    pub name: String,
    pub email: String,
}

fn hash_password(password: &str) -> Result<String, ApiError> {
    let mut salt_bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut salt_bytes);
    let salt = SaltString::encode_b64(&salt_bytes).map_err(ApiError::internal)?;
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(ApiError::internal)?;
    Ok(hash.to_string())
}

fn verify_password(password: &str, stored: &str) -> bool {
    match PasswordHash::new(stored) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            tracing::error!(error = %e, "Stored password hash is unreadable");
            false
        }
    }
}

/// Hash checked against when the email is unknown, computed once.
fn dummy_hash() -> Option<&'static str> {
    static DUMMY: OnceLock<Option<String>> = OnceLock::new();
    DUMMY
        .get_or_init(|| hash_password("unknown-account-placeholder").ok())
        .as_deref()
}

/// Run CPU-heavy hashing off the async workers.
async fn blocking<T, F>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f).await.map_err(ApiError::internal)
}

/// `POST /signup`
pub async fn signup(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<SignupRequest>,
) -> Result<(StatusCode, Json<UserSummary>), ApiError> {
    let password = body.password;
    let password_hash = blocking(move || hash_password(&password)).await??;

    let user = state.store.create_user(&body.name, &body.email, password_hash)?;
    tracing::info!(user_id = %user.id, "Account created");
    Ok((StatusCode::CREATED, Json(UserSummary::from(&user))))
}

/// `POST /signin`
pub async fn signin(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<SigninRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    let user = state.store.find_user_by_email(&body.email);
    let stored = user.as_ref().map(|u| u.password_hash.clone());
    let password = body.password;

    // Unknown emails still pay for one argon2 verification.
    let verified = blocking(move || match stored {
        Some(hash) => verify_password(&password, &hash),
        None => {
            if let Some(hash) = dummy_hash() {
                verify_password(&password, hash);
            }
            false
        }
    })
    .await?;

    let user = match user {
        Some(user) if verified => user,
        Some(user) => {
            tracing::debug!(user_id = %user.id, "Password mismatch");
            return Err(ApiError::Unauthenticated(INVALID_CREDENTIALS));
        }
        None => return Err(ApiError::Unauthenticated(INVALID_CREDENTIALS)),
    };

    let token = state
        .issuer
        .issue(&user.id, Some(&user.name))
        .map_err(ApiError::internal)?;
    Ok(Json(TokenResponse { token }))
}

/// `GET /users/me`
pub async fn get_me(
    State(state): State<AppState>,
    caller: CallerIdentity,
) -> Result<Json<UserSummary>, ApiError> {
    let user = state
        .store
        .find_user(caller.id())
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;
    Ok(Json(UserSummary::from(&user)))
}

/// `PATCH /users/me`
pub async fn update_me(
    State(state): State<AppState>,
    caller: CallerIdentity,
    ApiJson(body): ApiJson<serde_json::Value>,
) -> Result<Json<UserSummary>, ApiError> {
    validation::validate(&schema::USER_UPDATE, &body).map_err(ApiError::ValidationFailed)?;
    let update: UpdateUserRequest =
        serde_json::from_value(body).map_err(|e| ApiError::MalformedBody(e.to_string()))?;

    let user = state.store.update_user(caller.id(), &update.name, &update.email)?;
    Ok(Json(UserSummary::from(&user)))
}
