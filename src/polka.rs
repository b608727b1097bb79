//! Billing provider webhook. The only event acted on is `user.upgraded`,
//! which sets the user's membership flag.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{HeaderMap, StatusCode},
    routing::post,
    Json, Router,
};
use serde::Deserialize;
use tracing::{info, instrument, warn};

use crate::{auth::jwt::authorization_header, error::ApiError, state::AppState};

const UPGRADE_EVENT: &str = "user.upgraded";

#[derive(Debug, Default, Deserialize)]
pub struct WebhookData {
    pub user_id: Option<u64>,
}

/// Only `event` is required; the payload shape of ignored events is not checked.
#[derive(Debug, Deserialize)]
pub struct WebhookRequest {
    pub event: String,
    #[serde(default)]
    pub data: Option<WebhookData>,
}

impl WebhookRequest {
    fn upgraded_user(&self) -> Option<u64> {
        self.data.as_ref().and_then(|d| d.user_id)
    }
}

pub fn router() -> Router<AppState> {
    Router::new().route("/polka/webhooks", post(webhook))
}

pub async fn set_membership(state: &AppState, user_id: u64) -> Result<(), ApiError> {
    state
        .store
        .with_lock(|db| {
            db.set_membership(user_id)
                .map(|_| ())
                .ok_or_else(|| ApiError::NotFound("User not found".into()))
        })
        .await?;
    info!(user_id, "membership upgraded");
    Ok(())
}

fn check_api_key(expected: Option<&str>, header: Option<&str>) -> Result<(), ApiError> {
    let Some(expected) = expected else {
        return Ok(());
    };
    match header.and_then(|h| h.strip_prefix("ApiKey ")) {
        Some(key) if key.trim() == expected => Ok(()),
        _ => Err(ApiError::Unauthorized("Invalid API key".into())),
    }
}

#[instrument(skip(state, headers))]
pub async fn webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<WebhookRequest>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    check_api_key(state.config.polka_key.as_deref(), authorization_header(&headers)).map_err(|e| {
        warn!("webhook with bad api key");
        e
    })?;
    let Json(payload) = payload?;

    if payload.event != UPGRADE_EVENT {
        return Ok(StatusCode::NO_CONTENT);
    }
    let user_id = payload
        .upgraded_user()
        .ok_or_else(|| ApiError::BadInput("data.user_id is required".into()))?;
    set_membership(&state, user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
