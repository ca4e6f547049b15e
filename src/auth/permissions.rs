// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Permission enforcement middleware.
//!
//! Runs after the classifier. Service callers pass unconditionally; user
//! callers must hold every listed permission, checked in order through the
//! [`PermissionChecker`]. The first denial or error stops the loop.
//!
//! ```rust,ignore
//! let gate: Arc<dyn PermissionChecker> = Arc::new(RemotePermissionGate::new(client));
//!
//! let app = Router::new()
//!     .route("/orders", post(create_order))
//!     .route_layer(axum::middleware::from_fn_with_state(
//!         RequirePermissions::one(gate, "orders:write"),
//!         require_permissions,
//!     ));
//! ```
//!
//! Note: service callers bypass every permission set. Whether some routes
//! should also constrain peers is an open product question.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use tracing::{debug, error, warn};

use super::gate::PermissionChecker;
use super::identity::{CallerIdentity, CallerKind};
use super::AuthError;
use crate::client::OutboundContext;
use crate::i18n::Locale;

/// Permissions a route requires (all of them).
#[derive(Clone)]
pub struct RequirePermissions {
    gate: Arc<dyn PermissionChecker>,
    permissions: Arc<[String]>,
}

impl RequirePermissions {
    /// Require a single permission.
    pub fn one(gate: Arc<dyn PermissionChecker>, permission: impl Into<String>) -> Self {
        let permission: String = permission.into();
        Self::all(gate, [permission])
    }

    /// Require every permission in `permissions`, checked in order.
    pub fn all<I, P>(gate: Arc<dyn PermissionChecker>, permissions: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<String>,
    {
        Self {
            gate,
            permissions: permissions.into_iter().map(Into::<String>::into).collect(),
        }
    }

    pub fn permissions(&self) -> &[String] {
        &self.permissions
    }
}

/// Decide whether the caller may proceed.
pub async fn enforce(
    identity: Option<&CallerIdentity>,
    ctx: &OutboundContext,
    gate: &dyn PermissionChecker,
    permissions: &[String],
) -> Result<(), AuthError> {
    let identity = identity.ok_or(AuthError::IdentityMissing)?;

    let user_id = match identity.kind() {
        CallerKind::Service => return Ok(()),
        CallerKind::User => identity.user_id().ok_or(AuthError::SubjectMissing)?,
    };

    for permission in permissions {
        match gate.check(ctx, user_id, permission).await {
            Ok(true) => {
                debug!(user_id, permission = %permission, "Permission granted");
            }
            Ok(false) => {
                warn!(user_id, permission = %permission, "Permission denied");
                return Err(AuthError::PermissionDenied(permission.clone()));
            }
            Err(e) => {
                error!(
                    user_id,
                    permission = %permission,
                    error = %e,
                    "Permission check failed"
                );
                return Err(AuthError::PermissionCheckFailed(e.to_string()));
            }
        }
    }

    Ok(())
}

/// Axum middleware enforcing a [`RequirePermissions`] set.
pub async fn require_permissions(
    State(required): State<RequirePermissions>,
    request: Request,
    next: Next,
) -> Response {
    let locale = Locale::from_headers(request.headers());
    let identity = request.extensions().get::<CallerIdentity>().copied();
    let ctx = OutboundContext::from_request(&request);

    match enforce(
        identity.as_ref(),
        &ctx,
        required.gate.as_ref(),
        &required.permissions,
    )
    .await
    {
        Ok(()) => next.run(request).await,
        Err(e) => e.into_localized_response(locale),
    }
}
