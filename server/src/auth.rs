//! # Identity
//!
//! Bearer-token identity gate plus credential hashing.
//!
//! Tokens are HS256 JWTs carrying the user id in `sub`. [`AuthUser`] is an
//! extractor, so a handler states its authentication requirement in its
//! signature and never sees an unauthenticated request. Verification is
//! stateless; nothing is read or written here.

use std::sync::Arc;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use axum::{extract::FromRequestParts, http::header::AUTHORIZATION, http::request::Parts};
use bson::oid::ObjectId;
use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::{error::AppError, state::AppState};

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
}

pub fn mint_token(user_id: ObjectId, secret: &str, ttl_hours: i64) -> Result<String, AppError> {
    let now = Utc::now();
    let claims = Claims {
        sub: user_id.to_hex(),
        iat: now.timestamp(),
        exp: (now + Duration::hours(ttl_hours)).timestamp(),
    };

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(AppError::internal)
}

pub fn verify_token(token: &str, secret: &str) -> Result<ObjectId, AppError> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::new(Algorithm::HS256),
    )
    .map_err(|_| AppError::Unauthorized("invalid or expired token".into()))?;

    ObjectId::parse_str(&data.claims.sub)
        .map_err(|_| AppError::Unauthorized("invalid or expired token".into()))
}

pub fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::internal(e.to_string()))
}

pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    PasswordHash::new(stored_hash)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

/// Authenticated caller, resolved from the `Authorization: Bearer` header.
pub struct AuthUser(pub ObjectId);

impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| AppError::Unauthorized("missing credentials".into()))?;

        let token = header
            .strip_prefix("Bearer ")
            .ok_or_else(|| AppError::Unauthorized("missing credentials".into()))?;

        verify_token(token, &state.config.jwt_secret).map(Self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret";

    #[test]
    fn token_round_trip() {
        let user_id = ObjectId::new();
        let token = mint_token(user_id, SECRET, 1).expect("mint");

        assert_eq!(verify_token(&token, SECRET).expect("verify"), user_id);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = mint_token(ObjectId::new(), SECRET, 1).expect("mint");

        assert!(verify_token(&token, "other-secret").is_err());
    }

    #[test]
    fn expired_token_is_rejected() {
        // Negative ttl puts exp well past the validation leeway.
        let token = mint_token(ObjectId::new(), SECRET, -2).expect("mint");

        assert!(verify_token(&token, SECRET).is_err());
    }

    #[test]
    fn garbage_token_is_rejected() {
        assert!(verify_token("not-a-jwt", SECRET).is_err());
    }

    #[test]
    fn password_round_trip() {
        let hash = hash_password("hunter2").expect("hash");

        assert!(verify_password("hunter2", &hash));
        assert!(!verify_password("hunter3", &hash));
    }

    #[test]
    fn malformed_stored_hash_never_verifies() {
        assert!(!verify_password("hunter2", "plaintext-from-the-old-system"));
    }
}
