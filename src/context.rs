// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Inbound request context: request ID and locale.
//!
//! The request ID is generated by [`request_id_layers`] when the caller did
//! not send one, written back onto the request so outbound calls forward
//! it, and echoed on the response.

use axum::{
    extract::{FromRequestParts, Request},
    http::{request::Parts, HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};
use chrono::Utc;
use serde::Serialize;
use tower_http::request_id::{
    MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer,
};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::i18n::Locale;

/// Request correlation header.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Generates IDs of the form `YYYYMMDD-HHMMSS-<uuid v4>`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TimestampedRequestId;

impl TimestampedRequestId {
    pub fn generate() -> String {
        format!("{}-{}", Utc::now().format("%Y%m%d-%H%M%S"), Uuid::new_v4())
    }
}

impl MakeRequestId for TimestampedRequestId {
    fn make_request_id<B>(&mut self, _request: &axum::http::Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&Self::generate())
            .ok()
            .map(RequestId::new)
    }
}

/// Layers that set a missing request ID and echo it on the response.
///
/// Apply the returned `SetRequestIdLayer` outside the `PropagateRequestIdLayer`.
pub fn request_id_layers() -> (
    SetRequestIdLayer<TimestampedRequestId>,
    PropagateRequestIdLayer,
) {
    let header = HeaderName::from_static(REQUEST_ID_HEADER);
    (
        SetRequestIdLayer::new(header.clone(), TimestampedRequestId),
        PropagateRequestIdLayer::new(header),
    )
}

/// Per-request values available to handlers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct RequestContext {
    /// Correlation ID (`X-Request-ID`)
    pub request_id: Option<String>,
    /// Detected response language
    pub locale: Locale,
}

impl RequestContext {
    pub fn from_headers(headers: &axum::http::HeaderMap) -> Self {
        Self {
            request_id: headers
                .get(REQUEST_ID_HEADER)
                .and_then(|v| v.to_str().ok())
                .filter(|v| !v.is_empty())
                .map(str::to_string),
            locale: Locale::from_headers(headers),
        }
    }
}

/// Middleware attaching a [`RequestContext`] extension.
pub async fn request_context(mut request: Request, next: Next) -> Response {
    let context = RequestContext::from_headers(request.headers());
    request.extensions_mut().insert(context);
    next.run(request).await
}

impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts
            .extensions
            .get::<RequestContext>()
            .cloned()
            .unwrap_or_else(|| RequestContext::from_headers(&parts.headers)))
    }
}
