// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Generic HTTP Guards
//!
//! Request filters that run before authentication. Each one rejects with
//! the standard error envelope in the caller's language.
//!
//! | Guard | Rejects with |
//! |-------|--------------|
//! | [`enforce_body_limit`] | 413 when `Content-Length` exceeds the limit |
//! | [`require_json`] | 415 for `POST`/`PUT` without `application/json` |
//! | [`trusted_ips`] | 403 when a trusted list is configured and the client is not on it |
//! | [`api_key`] | 401 when a key is configured and not presented |
//!
//! [`security_headers`] never rejects; it decorates every response.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Request, State},
    http::{
        header::{self, HeaderName},
        HeaderValue, Method, StatusCode,
    },
    middleware::Next,
    response::{IntoResponse, Response},
};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::warn;

use crate::auth::USER_ID_HEADER;
use crate::client::{SERVICE_ID_HEADER, SERVICE_SECRET_HEADER};
use crate::context::REQUEST_ID_HEADER;
use crate::error::ApiError;
use crate::i18n::{Locale, LANGUAGE_HEADER};
use crate::rate_limit::{client_key, peer_addr, TrustedProxies};

/// Header carrying the static API key.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Query parameter alternative to [`API_KEY_HEADER`].
pub const API_KEY_QUERY: &str = "api_key";

/// CORS preflight cache lifetime.
pub const CORS_MAX_AGE: Duration = Duration::from_secs(12 * 60 * 60);

/// Settings shared by the guards.
#[derive(Clone, Default)]
pub struct GuardConfig {
    pub max_body_bytes: usize,
    pub trusted_ips: Arc<[String]>,
    pub trusted_proxies: TrustedProxies,
    pub api_key: Option<Arc<str>>,
}

impl std::fmt::Debug for GuardConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GuardConfig")
            .field("max_body_bytes", &self.max_body_bytes)
            .field("trusted_ips", &self.trusted_ips)
            .field("trusted_proxies", &self.trusted_proxies)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Add standard security headers to every response.
pub async fn security_headers(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();

    headers.insert(
        header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    );
    headers.insert(header::X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
    headers.insert(
        header::X_XSS_PROTECTION,
        HeaderValue::from_static("1; mode=block"),
    );
    headers.insert(
        header::REFERRER_POLICY,
        HeaderValue::from_static("strict-origin-when-cross-origin"),
    );
    headers.insert(
        header::CONTENT_SECURITY_POLICY,
        HeaderValue::from_static("default-src 'self'"),
    );

    response
}

/// Reject requests whose declared body is over the limit.
///
/// Bodies without a `Content-Length` are capped while streaming by the
/// `DefaultBodyLimit` layer installed next to this guard.
pub async fn enforce_body_limit(
    State(config): State<GuardConfig>,
    request: Request,
    next: Next,
) -> Response {
    let declared = request
        .headers()
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok());

    match declared {
        Some(length) if length > config.max_body_bytes as u64 => {
            warn!(
                content_length = length,
                limit = config.max_body_bytes,
                "Request body too large"
            );
            reject(&request, StatusCode::PAYLOAD_TOO_LARGE, "request_too_large")
        }
        _ => next.run(request).await,
    }
}

/// Require a JSON content type on `POST` and `PUT`.
pub async fn require_json(request: Request, next: Next) -> Response {
    if request.method() == Method::POST || request.method() == Method::PUT {
        let is_json = request
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.contains("application/json"));

        if !is_json {
            return reject(
                &request,
                StatusCode::UNSUPPORTED_MEDIA_TYPE,
                "unsupported_content_type",
            );
        }
    }

    next.run(request).await
}

/// Allow only listed client addresses. An empty list allows everyone.
///
/// The address is resolved as for rate limiting, so forwarding headers only
/// count when the peer is a trusted proxy.
pub async fn trusted_ips(
    State(config): State<GuardConfig>,
    request: Request,
    next: Next,
) -> Response {
    if config.trusted_ips.is_empty() {
        return next.run(request).await;
    }

    let client = client_key(
        request.headers(),
        peer_addr(&request),
        &config.trusted_proxies,
    );
    if config.trusted_ips.iter().any(|ip| *ip == client) {
        return next.run(request).await;
    }

    warn!(client_key = %client, "Request from untrusted IP");
    reject(&request, StatusCode::FORBIDDEN, "ip_not_trusted")
}

/// Require the configured API key. No key configured allows everyone.
pub async fn api_key(
    State(config): State<GuardConfig>,
    request: Request,
    next: Next,
) -> Response {
    let Some(expected) = config.api_key.as_deref() else {
        return next.run(request).await;
    };

    let from_header = request
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(str::to_string);

    let provided = from_header.or_else(|| {
        request.uri().query().and_then(|q| {
            url::form_urlencoded::parse(q.as_bytes())
                .find(|(k, _)| k == API_KEY_QUERY)
                .map(|(_, v)| v.into_owned())
        })
    });

    if provided.as_deref() == Some(expected) {
        next.run(request).await
    } else {
        reject(&request, StatusCode::UNAUTHORIZED, "invalid_api_key")
    }
}

/// Build the CORS layer. No configured origins means permissive CORS.
pub fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|o| HeaderValue::from_str(o).ok())
        .collect();

    if origins.is_empty() {
        return CorsLayer::permissive();
    }

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            header::ACCEPT_LANGUAGE,
            HeaderName::from_static(REQUEST_ID_HEADER),
            HeaderName::from_static(LANGUAGE_HEADER),
            HeaderName::from_static(USER_ID_HEADER),
            HeaderName::from_static(SERVICE_ID_HEADER),
            HeaderName::from_static(SERVICE_SECRET_HEADER),
            HeaderName::from_static(API_KEY_HEADER),
        ])
        .allow_credentials(true)
        .max_age(CORS_MAX_AGE)
}

fn reject(request: &Request, status: StatusCode, key: &'static str) -> Response {
    let locale = Locale::from_headers(request.headers());
    ApiError::localized(status, key, locale).into_response()
}
