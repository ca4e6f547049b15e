// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Response Envelope and Wire Models
//!
//! Every Relational backend service answers with the same JSON envelope:
//!
//! ```json
//! { "success": true, "data": { ... }, "message": "Success" }
//! { "success": false, "message": "Insufficient permissions: orders:write" }
//! ```
//!
//! This module also holds the request/response bodies of the authorization
//! service's access-check endpoint.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

// =============================================================================
// Response Envelope
// =============================================================================

/// A single field-level error.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct ErrorItem {
    pub key: String,
    pub value: String,
}

/// Standard success/error envelope.
#[derive(Debug, Clone, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<ErrorItem>,
    pub message: String,
}

impl<T> ApiResponse<T> {
    /// Successful response carrying `data`.
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            errors: Vec::new(),
            message: "Success".to_string(),
        }
    }
}

/// Error body without data: `{"success": false, "message": "..."}`.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ErrorEnvelope {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<ErrorItem>,
}

impl ErrorEnvelope {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            errors: Vec::new(),
        }
    }
}

// =============================================================================
// Authorization Service Access Check
// =============================================================================

/// Body of `POST /api/v1/auth/access`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AccessRequest {
    pub user_id: u64,
    pub permission: String,
}

/// `data` payload of the access-check response.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AccessData {
    #[serde(default)]
    pub allowed: bool,
}
