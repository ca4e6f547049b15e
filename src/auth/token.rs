// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Local bearer-token validation.
//!
//! Tokens are HS256-signed JWTs issued by the identity service and carry the
//! numeric `user_id` of the caller. Validation is a pure function of the
//! token, the shared secret, and the current time.
//!
//! ## Security
//!
//! - Only HS256 is accepted; any other `alg` in the header is rejected
//!   before the signature is looked at
//! - `exp` is optional, but when present a token is expired as soon as
//!   `exp` is strictly before now (no leeway)

use std::collections::HashSet;

use chrono::Utc;
use jsonwebtoken::{decode, errors::ErrorKind, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

/// The single signing algorithm accepted for user tokens.
pub const EXPECTED_ALGORITHM: Algorithm = Algorithm::HS256;

/// Claims carried by a user token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject (numeric user ID)
    pub user_id: u64,
    /// Expiration timestamp (Unix seconds)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
    /// Issued at timestamp (Unix seconds)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
}

/// Token validation failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    /// Wrong algorithm, bad signature, or malformed token.
    #[error("invalid token: {0}")]
    InvalidToken(String),
    /// Signature is valid but `exp` is in the past.
    #[error("token expired")]
    TokenExpired,
}

/// Validator bound to one shared secret.
#[derive(Clone)]
pub struct TokenValidator {
    key: DecodingKey,
    validation: Validation,
}

impl std::fmt::Debug for TokenValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenValidator")
            .field("algorithm", &EXPECTED_ALGORITHM)
            .finish_non_exhaustive()
    }
}

impl TokenValidator {
    /// Create a validator for tokens signed with `secret`.
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(EXPECTED_ALGORITHM);
        // Expiry is optional and checked by hand against exact time.
        validation.required_spec_claims = HashSet::new();
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;
        validation.leeway = 0;

        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    /// Validate a token and return the embedded user ID.
    pub fn validate(&self, token: &str) -> Result<u64, TokenError> {
        self.validate_at(token, Utc::now().timestamp())
    }

    /// Validate a token against an explicit "now" (Unix seconds).
    pub fn validate_at(&self, token: &str, now: i64) -> Result<u64, TokenError> {
        let data = decode::<TokenClaims>(token, &self.key, &self.validation).map_err(|e| {
            match e.kind() {
                ErrorKind::InvalidAlgorithm => {
                    TokenError::InvalidToken("unexpected signing algorithm".to_string())
                }
                ErrorKind::InvalidSignature => {
                    TokenError::InvalidToken("signature mismatch".to_string())
                }
                _ => TokenError::InvalidToken(e.to_string()),
            }
        })?;

        if let Some(exp) = data.claims.exp {
            if exp < now {
                return Err(TokenError::TokenExpired);
            }
        }

        Ok(data.claims.user_id)
    }
}

/// Validate `token` against `secret` at the current time.
pub fn validate(token: &str, secret: &str) -> Result<u64, TokenError> {
    TokenValidator::new(secret).validate(token)
}
