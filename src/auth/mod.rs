// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! Request authentication and authorization for Relational backend services.
//!
//! ## Auth Flow
//!
//! 1. Peer services send `X-Service-ID` / `X-Service-Secret`
//! 2. End users send `Authorization: Bearer <HS256 JWT>`
//! 3. The classifier ([`smart_auth`]):
//!    - Checks the service secret first (services win over users)
//!    - Otherwise validates the bearer token locally
//!    - Attaches a [`CallerIdentity`] to the request
//! 4. [`require_permissions`] asks the authorization service, one permission
//!    at a time, whether the user may proceed
//!
//! ## Security
//!
//! - Tokens must be HS256; any other algorithm is rejected
//! - Expiry is checked with zero leeway
//! - An unreachable authorization service is a 500, never a 403

pub mod error;
pub mod gate;
pub mod identity;
pub mod permissions;
pub mod smart;
pub mod token;

pub use error::AuthError;
pub use gate::{GateError, PermissionChecker, RemotePermissionGate, ACCESS_ROUTE};
pub use identity::{Caller, CallerIdentity, CallerKind, OptionalCaller, USER_ID_HEADER};
pub use permissions::{enforce, require_permissions, RequirePermissions};
pub use smart::{require_service, require_user, smart_auth, AuthConfig};
pub use token::{TokenClaims, TokenError, TokenValidator};
