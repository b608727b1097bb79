use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use tracing::instrument;

use super::{
    dto::{CreateChirpRequest, ListQuery},
    services,
};
use crate::{auth::jwt::AuthUser, error::ApiError, state::AppState, store::Chirp};

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/chirps", get(list_chirps))
        .route("/chirps/:id", get(get_chirp))
}

pub fn write_routes() -> Router<AppState> {
    Router::new()
        .route("/chirps", post(create_chirp))
        .route("/chirps/:id", delete(delete_chirp))
}

#[instrument(skip(state, payload))]
pub async fn create_chirp(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    payload: Result<Json<CreateChirpRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Chirp>), ApiError> {
    let Json(payload) = payload?;
    let chirp = services::create_chirp(&state, &payload.body, user_id).await?;
    Ok((StatusCode::CREATED, Json(chirp)))
}

#[instrument(skip(state))]
pub async fn list_chirps(
    State(state): State<AppState>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> Result<Json<Vec<Chirp>>, ApiError> {
    let Query(q) = query?;
    let chirps = services::list_chirps(&state, q.author_filter(), q.sort).await?;
    Ok(Json(chirps))
}

#[instrument(skip(state))]
pub async fn get_chirp(
    State(state): State<AppState>,
    id: Result<Path<u64>, PathRejection>,
) -> Result<Json<Chirp>, ApiError> {
    let Path(id) = id?;
    Ok(Json(services::get_chirp(&state, id).await?))
}

#[instrument(skip(state))]
pub async fn delete_chirp(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    id: Result<Path<u64>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let Path(id) = id?;
    services::delete_chirp(&state, id, user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
