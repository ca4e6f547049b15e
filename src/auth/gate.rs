// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Permission Gate: delegates "may user X do Y" to the authorization service.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::client::{OutboundContext, ServiceClient, ServiceClientError};
use crate::models::{AccessData, AccessRequest};

/// Logical route of the authorization service's access check.
pub const ACCESS_ROUTE: &str = "/api/v1/auth/access";

/// Reason a permission could not be determined.
#[derive(Debug, thiserror::Error)]
pub enum GateError {
    #[error(transparent)]
    Client(#[from] ServiceClientError),

    #[error("access response is missing data")]
    MissingData,
}

/// Answers whether a user holds a permission.
///
/// `Ok(false)` is a denial; `Err` means the answer is unknown.
#[async_trait]
pub trait PermissionChecker: Send + Sync {
    async fn check(
        &self,
        ctx: &OutboundContext,
        user_id: u64,
        permission: &str,
    ) -> Result<bool, GateError>;
}

/// Permission checker backed by the remote authorization service.
#[derive(Debug, Clone)]
pub struct RemotePermissionGate {
    client: Arc<ServiceClient>,
}

impl RemotePermissionGate {
    pub fn new(client: Arc<ServiceClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PermissionChecker for RemotePermissionGate {
    async fn check(
        &self,
        ctx: &OutboundContext,
        user_id: u64,
        permission: &str,
    ) -> Result<bool, GateError> {
        let query = AccessRequest {
            user_id,
            permission: permission.to_string(),
        };

        let envelope = self
            .client
            .post::<AccessData, _>(ACCESS_ROUTE, &query, ctx)
            .await?;

        // A well-formed "no" from the authorization service
        if !envelope.success {
            debug!(
                user_id,
                permission,
                message = %envelope.message,
                "Authorization service declined access check"
            );
            return Ok(false);
        }

        let data = envelope.data.ok_or(GateError::MissingData)?;
        Ok(data.allowed)
    }
}
