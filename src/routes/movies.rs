//! Movies resource, scoped to the caller.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::auth::CallerIdentity;
use crate::error::ApiError;
use crate::routes::store::{MovieInput, MovieRecord};
use crate::routes::{ApiJson, AppState};
use crate::validation::{self, schema};

/// `GET /movies`
pub async fn list(State(state): State<AppState>, caller: CallerIdentity) -> Json<Vec<MovieRecord>> {
    Json(state.store.movies_of(caller.id()))
}

/// `POST /movies`
pub async fn create(
    State(state): State<AppState>,
    caller: CallerIdentity,
    ApiJson(body): ApiJson<serde_json::Value>,
) -> Result<(StatusCode, Json<MovieRecord>), ApiError> {
    validation::validate(&schema::MOVIE_CREATE, &body).map_err(ApiError::ValidationFailed)?;
    let movie: MovieInput =
        serde_json::from_value(body).map_err(|e| ApiError::MalformedBody(e.to_string()))?;

    let record = state.store.add_movie(caller.id(), movie);
    tracing::debug!(movie_id = %record.id, owner = %record.owner, "Movie saved");
    Ok((StatusCode::CREATED, Json(record)))
}

/// `DELETE /movies/{id}`
pub async fn remove(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<String>,
) -> Result<Json<MovieRecord>, ApiError> {
    let record = state.store.delete_movie(&id, caller.id())?;
    Ok(Json(record))
}
