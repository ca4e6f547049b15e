// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Caller Identity and the `Caller` extractor.
//!
//! The classifier middleware attaches exactly one [`CallerIdentity`] to the
//! request extensions. Handlers read it with the [`Caller`] extractor:
//!
//! ```rust,ignore
//! async fn my_handler(Caller(identity): Caller) -> impl IntoResponse {
//!     if let Some(user_id) = identity.user_id() { /* ... */ }
//! }
//! ```

use axum::{extract::FromRequestParts, http::request::Parts};
use serde::Serialize;
use utoipa::ToSchema;

use super::AuthError;

/// Header mirroring the authenticated user ID for header-based readers.
pub const USER_ID_HEADER: &str = "x-user-id";

/// How the caller authenticated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum CallerKind {
    /// Trusted peer service (shared secret)
    Service,
    /// End user (bearer token)
    User,
}

impl std::fmt::Display for CallerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CallerKind::Service => write!(f, "service"),
            CallerKind::User => write!(f, "user"),
        }
    }
}

/// Resolved identity of the caller.
///
/// Fields are private so the value cannot be altered once the classifier
/// has built it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct CallerIdentity {
    kind: CallerKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    user_id: Option<u64>,
}

impl CallerIdentity {
    /// Identity of an authenticated peer service.
    pub fn service() -> Self {
        Self {
            kind: CallerKind::Service,
            user_id: None,
        }
    }

    /// Identity of an authenticated end user.
    pub fn user(user_id: u64) -> Self {
        Self {
            kind: CallerKind::User,
            user_id: Some(user_id),
        }
    }

    pub fn kind(&self) -> CallerKind {
        self.kind
    }

    pub fn user_id(&self) -> Option<u64> {
        self.user_id
    }

    pub fn is_service(&self) -> bool {
        self.kind == CallerKind::Service
    }
}

/// Extractor for the authenticated caller.
///
/// Rejects with 401 when no classifier ran before the handler.
pub struct Caller(pub CallerIdentity);

impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CallerIdentity>()
            .copied()
            .map(Caller)
            .ok_or(AuthError::IdentityMissing)
    }
}

/// Optional caller extractor for routes reachable without authentication.
pub struct OptionalCaller(pub Option<CallerIdentity>);

impl<S> FromRequestParts<S> for OptionalCaller
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(OptionalCaller(parts.extensions.get::<CallerIdentity>().copied()))
    }
}
