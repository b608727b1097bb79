use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, warn};

use crate::{
    auth::{
        dto::{PublicUser, TokenPair},
        jwt::{AuthError, TokenKind},
    },
    error::ApiError,
    state::AppState,
};

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

fn normalize_email(email: &str) -> Result<String, ApiError> {
    let email = email.trim().to_lowercase();
    if !is_valid_email(&email) {
        return Err(ApiError::BadInput("Invalid email".into()));
    }
    Ok(email)
}

fn non_empty(v: Option<String>) -> Option<String> {
    v.filter(|s| !s.is_empty())
}

pub async fn register_user(
    state: &AppState,
    email: &str,
    password: &str,
) -> Result<PublicUser, ApiError> {
    let email = normalize_email(email)?;
    if password.is_empty() {
        return Err(ApiError::BadInput("Password is required".into()));
    }

    // hash before taking the store lock
    let hash = state.passwords.hash_blocking(password).await?;

    let user = state
        .store
        .with_lock(|db| {
            if db.find_user_by_email(&email).is_some() {
                return Err(ApiError::BadInput("Email already registered".into()));
            }
            Ok(db.add_user(email.clone(), hash))
        })
        .await?;

    info!(user_id = user.id, "user registered");
    Ok(user.into())
}

pub async fn authenticate(
    state: &AppState,
    email: &str,
    password: &str,
) -> Result<PublicUser, ApiError> {
    let email = normalize_email(email)?;
    if password.is_empty() {
        return Err(ApiError::BadInput("Password is required".into()));
    }

    let db = state.store.snapshot().await?;
    let Some(user) = db.find_user_by_email(&email) else {
        warn!("login unknown email");
        return Err(AuthError::InvalidCredentials.into());
    };

    if !state
        .passwords
        .verify_blocking(password, &user.password_hash)
        .await?
    {
        warn!(user_id = user.id, "login invalid password");
        return Err(AuthError::InvalidCredentials.into());
    }

    info!(user_id = user.id, "user logged in");
    Ok(user.clone().into())
}

pub async fn update_user(
    state: &AppState,
    user_id: u64,
    email: Option<String>,
    password: Option<String>,
) -> Result<PublicUser, ApiError> {
    let email = non_empty(email).map(|e| normalize_email(&e)).transpose()?;
    let hash = match non_empty(password) {
        Some(p) => Some(state.passwords.hash_blocking(&p).await?),
        None => None,
    };

    let user = state
        .store
        .with_lock(|db| {
            if let Some(email) = &email {
                if db.find_user_by_email(email).is_some_and(|u| u.id != user_id) {
                    return Err(ApiError::BadInput("Email already registered".into()));
                }
            }
            db.update_user(user_id, email, hash)
                .ok_or_else(|| ApiError::NotFound("User not found".into()))
        })
        .await?;

    info!(user_id, "user updated");
    Ok(user.into())
}

pub fn issue_token_pair(state: &AppState, user_id: u64) -> Result<TokenPair, ApiError> {
    Ok(TokenPair {
        access_token: state.keys.sign_access(user_id)?,
        refresh_token: state.keys.sign_refresh(user_id)?,
    })
}

/// Mints a new access token from a non-revoked refresh token.
pub async fn refresh_access_token(
    state: &AppState,
    authorization: Option<&str>,
) -> Result<String, ApiError> {
    let token = state
        .keys
        .parse_bearer(authorization)?
        .require(TokenKind::Refresh)?;

    let revoked = state.store.snapshot().await?.is_revoked(&token.raw);
    if revoked {
        warn!(user_id = token.user_id, "refresh with revoked token");
        return Err(AuthError::Revoked.into());
    }

    Ok(state.keys.sign_access(token.user_id)?)
}

/// Revokes the exact refresh token presented. Repeating it is a no-op.
pub async fn revoke_token(state: &AppState, authorization: Option<&str>) -> Result<(), ApiError> {
    let token = state
        .keys
        .parse_bearer(authorization)?
        .require(TokenKind::Refresh)?;

    let newly = state
        .store
        .with_lock(|db| Ok::<_, ApiError>(db.revoke_token(&token.raw)))
        .await?;

    info!(user_id = token.user_id, newly, "refresh token revoked");
    Ok(())
}
