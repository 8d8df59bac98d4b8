//! # Authentication Module
//!
//! Resolves the calling user from an `Authorization: Bearer <jwt>` header.
//! Tokens are HS256-signed by whoever issues them; this service only
//! verifies the signature and expiry and reads the subject and role.

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};
use slotbook_core::{errors::BookingError, identity::Caller, models::user::Role};
use tracing::debug;
use uuid::Uuid;

use crate::{ApiState, middleware::error_handling::AppError};

/// Claims carried by a bearer token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// The user id
    pub sub: Uuid,
    pub role: Role,
    /// Expiry as a unix timestamp
    pub exp: i64,
}

impl From<Claims> for Caller {
    fn from(claims: Claims) -> Self {
        Caller::new(claims.sub, claims.role)
    }
}

/// Verifies `token` against `secret` and returns its claims.
///
/// # Errors
///
/// `BookingError::Authentication` for a bad signature, an expired token or
/// claims that do not match [`Claims`].
pub fn decode_token(token: &str, secret: &str) -> Result<Claims, BookingError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::new(Algorithm::HS256),
    )
    .map(|data| data.claims)
    .map_err(|e| {
        debug!("Rejected bearer token: {}", e);
        BookingError::Authentication("Invalid or expired token".to_string())
    })
}

/// Pulls the token out of an `Authorization` header value.
pub fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

/// The authenticated caller of a request.
///
/// Handlers that take this extractor answer 401 when the header is missing
/// or the token does not verify.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser(pub Caller);

#[async_trait]
impl FromRequestParts<Arc<ApiState>> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<ApiState>,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .ok_or_else(|| BookingError::Authentication("Missing bearer token".to_string()))?
            .to_str()
            .map_err(|_| BookingError::Authentication("Malformed authorization header".to_string()))?;

        let token = bearer_token(header)
            .ok_or_else(|| BookingError::Authentication("Malformed authorization header".to_string()))?;

        let claims = decode_token(token, &state.jwt_secret)?;
        Ok(AuthUser(claims.into()))
    }
}
