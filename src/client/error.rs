// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Service client errors.

/// Failure of an outbound service-to-service call.
///
/// `Routing` is raised before any network I/O. Every other variant means
/// the remote side could not give a usable answer; none of them is a denial.
#[derive(Debug, thiserror::Error)]
pub enum ServiceClientError {
    #[error("routing failed: {0}")]
    Routing(String),

    #[error("failed to encode request payload: {0}")]
    Encode(String),

    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("request failed: {0}")]
    Transport(String),

    #[error("service returned error [{status}]: {body}")]
    Status { status: u16, body: String },

    #[error("failed to decode response: {0}")]
    Decode(String),

    #[error("service error: {0}")]
    Rejected(String),

    #[error("request cancelled")]
    Cancelled,
}

impl ServiceClientError {
    pub(crate) fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ServiceClientError::Timeout(err.to_string())
        } else if err.is_builder() {
            ServiceClientError::Encode(err.to_string())
        } else {
            ServiceClientError::Transport(err.to_string())
        }
    }

    /// Whether the failure happened before anything was sent.
    pub fn is_routing(&self) -> bool {
        matches!(self, ServiceClientError::Routing(_))
    }
}
