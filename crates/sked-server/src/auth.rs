//! Password sign-in and signed-token verification.
//!
//! The gate is disabled when no password is configured: every request passes
//! and sign-in hands out a fixed sentinel token.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::{header, HeaderMap};
use axum::middleware::Next;
use axum::response::Response;
use axum_extra::extract::CookieJar;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::ApiError;

/// Token handed out when authentication is disabled.
pub const NO_AUTH_TOKEN: &str = "no_auth";

/// Cookie carrying the token.
pub const TOKEN_COOKIE: &str = "token";

const TOKEN_ISSUER: &str = "sked";
const TOKEN_LOGIN: &str = "todo_user";
const TOKEN_TTL_HOURS: i64 = 8;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("invalid password")]
    InvalidCredentials,
    #[error("authentication required")]
    Unauthorized,
    #[error("failed to sign token: {0}")]
    TokenSign(String),
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    login: String,
    iss: String,
    iat: i64,
    nbf: i64,
    exp: i64,
}

struct Keys {
    password_digest: [u8; 32],
    encoding: EncodingKey,
    decoding: DecodingKey,
}

pub struct AuthGate {
    keys: Option<Keys>,
}

impl AuthGate {
    /// Build a gate from the configured password. `None` or an empty password
    /// disables authentication.
    pub fn new(password: Option<&SecretString>) -> Self {
        let keys = password
            .map(|p| p.expose_secret())
            .filter(|p| !p.is_empty())
            .map(|p| {
                let digest: [u8; 32] = Sha256::digest(p.as_bytes()).into();
                Keys {
                    password_digest: digest,
                    encoding: EncodingKey::from_secret(&digest),
                    decoding: DecodingKey::from_secret(&digest),
                }
            });
        Self { keys }
    }

    pub fn disabled() -> Self {
        Self { keys: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.keys.is_some()
    }

    /// Check `password` and issue a token valid for eight hours.
    pub fn sign_in(&self, password: &str) -> Result<String, AuthError> {
        let Some(keys) = &self.keys else {
            return Ok(NO_AUTH_TOKEN.to_string());
        };
        let submitted: [u8; 32] = Sha256::digest(password.as_bytes()).into();
        if submitted != keys.password_digest {
            return Err(AuthError::InvalidCredentials);
        }
        self.issue_token_at(Utc::now())
    }

    fn issue_token_at(&self, now: DateTime<Utc>) -> Result<String, AuthError> {
        let Some(keys) = &self.keys else {
            return Ok(NO_AUTH_TOKEN.to_string());
        };
        let claims = Claims {
            login: TOKEN_LOGIN.to_string(),
            iss: TOKEN_ISSUER.to_string(),
            iat: now.timestamp(),
            nbf: now.timestamp(),
            exp: (now + Duration::hours(TOKEN_TTL_HOURS)).timestamp(),
        };
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &keys.encoding)
            .map_err(|e| AuthError::TokenSign(e.to_string()))
    }

    /// Verify signature, algorithm, issuer and expiry. Fails closed.
    pub fn verify(&self, token: Option<&str>) -> Result<(), AuthError> {
        let Some(keys) = &self.keys else {
            return Ok(());
        };
        let token = token.filter(|t| !t.is_empty()).ok_or(AuthError::Unauthorized)?;

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_nbf = true;
        validation.set_issuer(&[TOKEN_ISSUER]);

        jsonwebtoken::decode::<Claims>(token, &keys.decoding, &validation)
            .map(|_| ())
            .map_err(|e| {
                tracing::debug!(error = %e, "token rejected");
                AuthError::Unauthorized
            })
    }
}

/// Extract `Authorization: Bearer <token>`.
fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

/// Middleware guarding task routes. The `token` cookie wins over the
/// bearer header.
pub async fn require_auth(
    State(gate): State<Arc<AuthGate>>,
    jar: CookieJar,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if gate.is_enabled() {
        let token = jar
            .get(TOKEN_COOKIE)
            .map(|c| c.value().to_string())
            .filter(|t| !t.is_empty())
            .or_else(|| bearer_token(request.headers()));
        gate.verify(token.as_deref())?;
    }
    Ok(next.run(request).await)
}
