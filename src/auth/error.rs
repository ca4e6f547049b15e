// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication and authorization errors.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::i18n::{translate, Locale};
use crate::models::ErrorEnvelope;

/// Error raised anywhere in the request auth pipeline.
///
/// Each variant maps to a status code, a stable error code for logs and
/// metrics, and an i18n message key for the response body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Neither service secret nor Authorization header present
    MissingAuthentication,
    /// Service-only route called without the service-secret header
    MissingServiceHeaders,
    /// Service secret header does not match configuration
    InvalidServiceCredentials,
    /// User-only route called without an Authorization header
    MissingAuthHeader,
    /// Authorization header is not `Bearer <token>`
    InvalidAuthHeader,
    /// Bearer token presented but no signing secret is configured
    TokenValidationNotConfigured,
    /// Token failed signature/algorithm/format checks
    InvalidToken,
    /// Token signature valid but expired
    TokenExpired,
    /// No Caller Identity reached the authorization step
    IdentityMissing,
    /// User identity without a subject id
    SubjectMissing,
    /// Remote authorization service said no (carries the permission)
    PermissionDenied(String),
    /// Permission could not be determined (transport, decoding, routing)
    PermissionCheckFailed(String),
    /// Client exceeded its request budget
    RateLimited,
}

impl AuthError {
    /// Get the error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::MissingAuthentication => "missing_authentication",
            AuthError::MissingServiceHeaders => "missing_service_headers",
            AuthError::InvalidServiceCredentials => "invalid_service_credentials",
            AuthError::MissingAuthHeader => "missing_auth_header",
            AuthError::InvalidAuthHeader => "invalid_auth_header",
            AuthError::TokenValidationNotConfigured => "token_validation_not_configured",
            AuthError::InvalidToken => "invalid_token",
            AuthError::TokenExpired => "token_expired",
            AuthError::IdentityMissing => "identity_missing",
            AuthError::SubjectMissing => "subject_missing",
            AuthError::PermissionDenied(_) => "permission_denied",
            AuthError::PermissionCheckFailed(_) => "permission_check_failed",
            AuthError::RateLimited => "rate_limited",
        }
    }

    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::MissingAuthentication
            | AuthError::MissingServiceHeaders
            | AuthError::InvalidServiceCredentials
            | AuthError::MissingAuthHeader
            | AuthError::InvalidAuthHeader
            | AuthError::InvalidToken
            | AuthError::TokenExpired
            | AuthError::IdentityMissing
            | AuthError::SubjectMissing => StatusCode::UNAUTHORIZED,
            AuthError::PermissionDenied(_) => StatusCode::FORBIDDEN,
            AuthError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            AuthError::TokenValidationNotConfigured | AuthError::PermissionCheckFailed(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Message catalog key shown to the caller.
    pub fn message_key(&self) -> &'static str {
        match self {
            AuthError::MissingAuthentication => "missing_authentication",
            AuthError::MissingServiceHeaders => "missing_service_headers",
            AuthError::InvalidServiceCredentials => "invalid_service_credentials",
            AuthError::MissingAuthHeader => "missing_authorization_header",
            AuthError::InvalidAuthHeader => "invalid_authorization_format",
            AuthError::TokenValidationNotConfigured => "jwt_secret_not_configured",
            AuthError::InvalidToken | AuthError::TokenExpired => "invalid_or_expired_token",
            AuthError::IdentityMissing => "authentication_required",
            AuthError::SubjectMissing => "user_id_not_found",
            AuthError::PermissionDenied(_) => "insufficient_permissions",
            AuthError::PermissionCheckFailed(_) => "failed_to_validate_permissions",
            AuthError::RateLimited => "rate_limit_exceeded",
        }
    }

    /// Localized message for the response body.
    ///
    /// Only denials interpolate detail (the denied permission); transport
    /// and configuration causes stay in the logs.
    pub fn message(&self, locale: Locale) -> String {
        let text = translate(self.message_key(), locale);
        match self {
            AuthError::PermissionDenied(permission) => format!("{text}: {permission}"),
            _ => text.to_string(),
        }
    }

    /// Render the standard error envelope in the given locale.
    pub fn into_localized_response(self, locale: Locale) -> Response {
        let status = self.status_code();
        let body = Json(ErrorEnvelope::new(self.message(locale)));
        (status, body).into_response()
    }
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::PermissionDenied(permission) => {
                write!(f, "permission denied: {permission}")
            }
            AuthError::PermissionCheckFailed(cause) => {
                write!(f, "permission check failed: {cause}")
            }
            other => f.write_str(other.error_code()),
        }
    }
}

impl std::error::Error for AuthError {}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        self.into_localized_response(Locale::En)
    }
}
