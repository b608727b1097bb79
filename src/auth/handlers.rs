use axum::{
    extract::{rejection::JsonRejection, State},
    http::{HeaderMap, StatusCode},
    routing::post,
    Json, Router,
};
use tracing::instrument;

use crate::{
    auth::{
        dto::{CredentialsRequest, LoginResponse, PublicUser, RefreshResponse, UpdateUserRequest},
        jwt::{authorization_header, AuthUser},
        services,
    },
    error::ApiError,
    state::AppState,
};

pub fn user_routes() -> Router<AppState> {
    Router::new().route("/users", post(register).put(update_user))
}

pub fn token_routes() -> Router<AppState> {
    Router::new()
        .route("/login", post(login))
        .route("/refresh", post(refresh))
        .route("/revoke", post(revoke))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<CredentialsRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<PublicUser>), ApiError> {
    let Json(payload) = payload?;
    let user = services::register_user(&state, &payload.email, &payload.password).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

#[instrument(skip(state, payload))]
pub async fn update_user(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    payload: Result<Json<UpdateUserRequest>, JsonRejection>,
) -> Result<Json<PublicUser>, ApiError> {
    let Json(payload) = payload?;
    let user = services::update_user(&state, user_id, payload.email, payload.password).await?;
    Ok(Json(user))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<CredentialsRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, ApiError> {
    let Json(payload) = payload?;
    let user = services::authenticate(&state, &payload.email, &payload.password).await?;
    let pair = services::issue_token_pair(&state, user.id)?;
    Ok(Json(LoginResponse {
        user,
        token: pair.access_token,
        refresh_token: pair.refresh_token,
    }))
}

#[instrument(skip_all)]
pub async fn refresh(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<RefreshResponse>, ApiError> {
    let token = services::refresh_access_token(&state, authorization_header(&headers)).await?;
    Ok(Json(RefreshResponse { token }))
}

#[instrument(skip_all)]
pub async fn revoke(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<StatusCode, ApiError> {
    services::revoke_token(&state, authorization_header(&headers)).await?;
    Ok(StatusCode::NO_CONTENT)
}
