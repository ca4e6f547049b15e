// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Context headers forwarded on outbound calls.
//!
//! Only a fixed allow-list crosses the service boundary: user ID, request
//! ID, and language preference. Nothing else from the inbound request is
//! copied.

use axum::http::{HeaderMap, Request};

use crate::auth::identity::{CallerIdentity, USER_ID_HEADER};
use crate::context::REQUEST_ID_HEADER;

/// Propagated `Accept-Language` header.
pub const ACCEPT_LANGUAGE_HEADER: &str = "accept-language";

/// Context carried from an inbound request to the calls it triggers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutboundContext {
    pub user_id: Option<String>,
    pub request_id: Option<String>,
    pub accept_language: Option<String>,
}

impl OutboundContext {
    /// Context with nothing to forward (background jobs, startup checks).
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build from inbound headers and the resolved caller.
    ///
    /// The caller's user ID wins over a raw `X-User-ID` header.
    pub fn from_headers(headers: &HeaderMap, identity: Option<&CallerIdentity>) -> Self {
        let user_id = identity
            .and_then(CallerIdentity::user_id)
            .map(|id| id.to_string())
            .or_else(|| header_string(headers, USER_ID_HEADER));

        Self {
            user_id,
            request_id: header_string(headers, REQUEST_ID_HEADER),
            accept_language: header_string(headers, ACCEPT_LANGUAGE_HEADER),
        }
    }

    pub fn from_request<B>(request: &Request<B>) -> Self {
        Self::from_headers(
            request.headers(),
            request.extensions().get::<CallerIdentity>(),
        )
    }

    pub fn with_user_id(mut self, user_id: u64) -> Self {
        self.user_id = Some(user_id.to_string());
        self
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    /// Header name/value pairs to attach to the outbound request.
    pub fn headers(&self) -> impl Iterator<Item = (&'static str, &str)> {
        [
            (USER_ID_HEADER, self.user_id.as_deref()),
            (REQUEST_ID_HEADER, self.request_id.as_deref()),
            (ACCEPT_LANGUAGE_HEADER, self.accept_language.as_deref()),
        ]
        .into_iter()
        .filter_map(|(name, value)| value.map(|v| (name, v)))
    }
}

fn header_string(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
