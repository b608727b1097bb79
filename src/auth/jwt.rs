use std::time::Duration;

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::{debug, warn};

use crate::{config::JwtConfig, error::ApiError};

const ACCESS_ISSUER: &str = "chirpy-access";
const REFRESH_ISSUER: &str = "chirpy-refresh";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("Missing Authorization header")]
    MissingHeader,

    #[error("Invalid Authorization header")]
    MalformedHeader,

    #[error("Token expired")]
    Expired,

    #[error("Invalid token")]
    InvalidToken,

    #[error("{expected:?} token required")]
    WrongKind { expected: TokenKind },

    #[error("Token has been revoked")]
    Revoked,

    #[error("Invalid credentials")]
    InvalidCredentials,
}

/// Token class. Carried on the wire as the `iss` claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Access,
    Refresh,
}

impl TokenKind {
    pub const fn issuer(self) -> &'static str {
        match self {
            TokenKind::Access => ACCESS_ISSUER,
            TokenKind::Refresh => REFRESH_ISSUER,
        }
    }

    pub fn from_issuer(iss: &str) -> Option<Self> {
        match iss {
            ACCESS_ISSUER => Some(TokenKind::Access),
            REFRESH_ISSUER => Some(TokenKind::Refresh),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,  // user id
    pub iss: String,  // token class
    pub iat: usize,
    pub exp: usize,
}

/// A token whose signature and expiry have been checked.
#[derive(Debug, Clone)]
pub struct VerifiedToken {
    pub raw: String,
    pub user_id: u64,
    pub kind: TokenKind,
    pub expires_at: usize,
}

impl VerifiedToken {
    pub fn require(self, expected: TokenKind) -> Result<Self, AuthError> {
        if self.kind != expected {
            warn!(user_id = self.user_id, kind = ?self.kind, expected = ?expected, "wrong token class");
            return Err(AuthError::WrongKind { expected });
        }
        Ok(self)
    }
}

/// HS256 keys plus the lifetime of each token class.
#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
}

impl JwtKeys {
    pub fn new(cfg: &JwtConfig) -> anyhow::Result<Self> {
        cfg.validate()?;
        Ok(Self {
            encoding: EncodingKey::from_secret(cfg.secret.as_bytes()),
            decoding: DecodingKey::from_secret(cfg.secret.as_bytes()),
            access_ttl: ttl_from_minutes(cfg.ttl_minutes)?,
            refresh_ttl: ttl_from_minutes(cfg.refresh_ttl_minutes)?,
        })
    }

    pub fn sign(&self, user_id: u64, kind: TokenKind) -> anyhow::Result<String> {
        let now = OffsetDateTime::now_utc();
        let ttl = match kind {
            TokenKind::Access => self.access_ttl,
            TokenKind::Refresh => self.refresh_ttl,
        };
        let exp = i64::try_from(ttl.as_secs())
            .ok()
            .and_then(|secs| now.checked_add(TimeDuration::seconds(secs)))
            .ok_or_else(|| anyhow::anyhow!("token expiry out of range"))?;
        let claims = Claims {
            sub: user_id.to_string(),
            iss: kind.issuer().to_string(),
            iat: now.unix_timestamp() as usize,
            exp: exp.unix_timestamp() as usize,
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)?;
        debug!(user_id, kind = ?kind, "jwt signed");
        Ok(token)
    }

    pub fn sign_access(&self, user_id: u64) -> anyhow::Result<String> {
        self.sign(user_id, TokenKind::Access)
    }

    pub fn sign_refresh(&self, user_id: u64) -> anyhow::Result<String> {
        self.sign(user_id, TokenKind::Refresh)
    }

    /// Checks signature, expiry and issuer. Class checks are left to the caller.
    pub fn verify(&self, token: &str) -> Result<VerifiedToken, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[ACCESS_ISSUER, REFRESH_ISSUER]);
        validation.set_required_spec_claims(&["exp", "iss", "sub"]);
        validation.leeway = 0;

        let data = decode::<Claims>(token, &self.decoding, &validation).map_err(|e| {
            debug!(error = %e, "jwt rejected");
            match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::Expired,
                _ => AuthError::InvalidToken,
            }
        })?;
        let claims = data.claims;

        let kind = TokenKind::from_issuer(&claims.iss).ok_or(AuthError::InvalidToken)?;
        let user_id = claims
            .sub
            .parse::<u64>()
            .map_err(|_| AuthError::InvalidToken)?;

        debug!(user_id, kind = ?kind, "jwt verified");
        Ok(VerifiedToken {
            raw: token.to_string(),
            user_id,
            kind,
            expires_at: claims.exp,
        })
    }

    /// Verifies the token carried in an `Authorization: Bearer <token>` value.
    pub fn parse_bearer(&self, header: Option<&str>) -> Result<VerifiedToken, AuthError> {
        let header = header.ok_or(AuthError::MissingHeader)?;
        let token = header
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(AuthError::MalformedHeader)?;
        self.verify(token)
    }
}

fn ttl_from_minutes(minutes: i64) -> anyhow::Result<Duration> {
    u64::try_from(minutes)
        .ok()
        .and_then(|m| m.checked_mul(60))
        .map(Duration::from_secs)
        .ok_or_else(|| anyhow::anyhow!("invalid token ttl: {minutes} minutes"))
}

pub fn authorization_header(headers: &HeaderMap) -> Option<&str> {
    headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok())
}

/// Caller authenticated with an access-class token.
pub struct AuthUser(pub u64);

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let keys = JwtKeys::from_ref(state);
        let token = keys
            .parse_bearer(authorization_header(&parts.headers))
            .and_then(|t| t.require(TokenKind::Access))
            .map_err(|e| {
                warn!(error = %e, "request not authenticated");
                e
            })?;
        Ok(AuthUser(token.user_id))
    }
}
