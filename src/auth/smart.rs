// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Request classification: peer service or end user.
//!
//! ## Decision Order
//!
//! 1. `X-Service-Secret` present → must equal the configured secret →
//!    `Service`. A request carrying both a service secret and a bearer
//!    token is a service call; only trusted peers know the secret.
//! 2. `Authorization` present → must be `Bearer <token>`, a signing
//!    secret must be configured, and the token must validate → `User`.
//!    The user ID is also mirrored into `X-User-ID` for header readers.
//! 3. Otherwise → 401.
//!
//! The resolved [`CallerIdentity`] is attached to the request extensions
//! exactly once, before any handler or permission layer runs.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap, HeaderValue},
    middleware::Next,
    response::Response,
};
use tracing::{debug, error, warn};

use super::identity::{CallerIdentity, CallerKind, USER_ID_HEADER};
use super::token::{TokenError, TokenValidator};
use super::AuthError;
use crate::client::SERVICE_SECRET_HEADER;
use crate::i18n::Locale;

/// Authentication configuration shared by the classifier middlewares.
#[derive(Clone)]
pub struct AuthConfig {
    service_secret: Arc<str>,
    tokens: Option<TokenValidator>,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("service_secret", &"<redacted>")
            .field("local_token_validation", &self.tokens.is_some())
            .finish()
    }
}

impl AuthConfig {
    /// Create a new auth configuration.
    ///
    /// Without a `jwt_secret` the bearer-token path is disabled and every
    /// bearer request fails as misconfigured.
    pub fn new(service_secret: impl Into<String>, jwt_secret: Option<&str>) -> Self {
        Self {
            service_secret: Arc::from(service_secret.into()),
            tokens: jwt_secret
                .filter(|s| !s.is_empty())
                .map(TokenValidator::new),
        }
    }

    /// Whether bearer tokens can be validated locally.
    pub fn local_validation_enabled(&self) -> bool {
        self.tokens.is_some()
    }

    /// Classify a request by its headers.
    pub fn classify(&self, headers: &HeaderMap) -> Result<CallerIdentity, AuthError> {
        if let Some(secret) = non_empty_header(headers, SERVICE_SECRET_HEADER) {
            return self.verify_service_secret(secret);
        }

        match headers.get(AUTHORIZATION).filter(|v| !v.is_empty()) {
            Some(value) => self.verify_bearer(value),
            None => Err(AuthError::MissingAuthentication),
        }
    }

    /// Service-only authentication.
    pub fn authenticate_service(&self, headers: &HeaderMap) -> Result<CallerIdentity, AuthError> {
        let secret = non_empty_header(headers, SERVICE_SECRET_HEADER)
            .ok_or(AuthError::MissingServiceHeaders)?;
        self.verify_service_secret(secret)
    }

    /// User-only authentication.
    pub fn authenticate_user(&self, headers: &HeaderMap) -> Result<CallerIdentity, AuthError> {
        let value = headers
            .get(AUTHORIZATION)
            .filter(|v| !v.is_empty())
            .ok_or(AuthError::MissingAuthHeader)?;
        self.verify_bearer(value)
    }

    fn verify_service_secret(&self, presented: &[u8]) -> Result<CallerIdentity, AuthError> {
        if presented == self.service_secret.as_bytes() {
            Ok(CallerIdentity::service())
        } else {
            Err(AuthError::InvalidServiceCredentials)
        }
    }

    fn verify_bearer(&self, value: &HeaderValue) -> Result<CallerIdentity, AuthError> {
        let token = value
            .to_str()
            .ok()
            .and_then(|v| v.strip_prefix("Bearer "))
            .ok_or(AuthError::InvalidAuthHeader)?;

        let validator = self
            .tokens
            .as_ref()
            .ok_or(AuthError::TokenValidationNotConfigured)?;

        let user_id = validator.validate(token).map_err(|e| match e {
            TokenError::TokenExpired => AuthError::TokenExpired,
            TokenError::InvalidToken(_) => AuthError::InvalidToken,
        })?;

        Ok(CallerIdentity::user(user_id))
    }
}

fn non_empty_header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a [u8]> {
    headers
        .get(name)
        .map(HeaderValue::as_bytes)
        .filter(|v| !v.is_empty())
}

/// Attach the identity and mirror the user ID header.
fn attach(request: &mut Request, identity: CallerIdentity) {
    if let Some(user_id) = identity.user_id() {
        request
            .headers_mut()
            .insert(USER_ID_HEADER, HeaderValue::from(user_id));
    }
    request.extensions_mut().insert(identity);
}

fn log_rejection(error: &AuthError, path: &str) {
    match error {
        AuthError::TokenValidationNotConfigured => {
            error!(path, "Bearer token received but JWT_SECRET is not configured");
        }
        AuthError::InvalidServiceCredentials => {
            warn!(path, "Rejected request with invalid service credentials");
        }
        other => {
            debug!(path, error_code = other.error_code(), "Authentication rejected");
        }
    }
}

async fn authenticate_with(
    mut request: Request,
    next: Next,
    existing_ok: impl Fn(&CallerIdentity) -> Result<(), AuthError>,
    authenticate: impl Fn(&HeaderMap) -> Result<CallerIdentity, AuthError>,
) -> Response {
    let locale = Locale::from_headers(request.headers());

    // Identity is set once; an outer layer already decided.
    if let Some(existing) = request.extensions().get::<CallerIdentity>().copied() {
        return match existing_ok(&existing) {
            Ok(()) => next.run(request).await,
            Err(e) => e.into_localized_response(locale),
        };
    }

    match authenticate(request.headers()) {
        Ok(identity) => {
            debug!(
                kind = %identity.kind(),
                user_id = identity.user_id(),
                "Caller authenticated"
            );
            attach(&mut request, identity);
            next.run(request).await
        }
        Err(e) => {
            log_rejection(&e, request.uri().path());
            e.into_localized_response(locale)
        }
    }
}

/// Classifier middleware accepting either service or user callers.
///
/// ```rust,ignore
/// let app = Router::new()
///     .route("/protected", get(handler))
///     .layer(axum::middleware::from_fn_with_state(auth_config, smart_auth));
/// ```
pub async fn smart_auth(
    State(config): State<AuthConfig>,
    request: Request,
    next: Next,
) -> Response {
    authenticate_with(request, next, |_| Ok(()), |h| config.classify(h)).await
}

/// Middleware accepting only peer services.
pub async fn require_service(
    State(config): State<AuthConfig>,
    request: Request,
    next: Next,
) -> Response {
    authenticate_with(
        request,
        next,
        |existing| match existing.kind() {
            CallerKind::Service => Ok(()),
            CallerKind::User => Err(AuthError::MissingServiceHeaders),
        },
        |h| config.authenticate_service(h),
    )
    .await
}

/// Middleware accepting only bearer-token users.
pub async fn require_user(
    State(config): State<AuthConfig>,
    request: Request,
    next: Next,
) -> Response {
    authenticate_with(
        request,
        next,
        |existing| match existing.kind() {
            CallerKind::User => Ok(()),
            CallerKind::Service => Err(AuthError::MissingAuthHeader),
        },
        |h| config.authenticate_user(h),
    )
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::identity::Caller;
    use crate::auth::token::TokenClaims;
    use axum::{
        body::{to_bytes, Body},
        http::{Request as HttpRequest, StatusCode},
        middleware::{from_fn, from_fn_with_state},
        routing::get,
        Json, Router,
    };
    use chrono::Utc;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    const SERVICE_SECRET: &str = "peer-secret";
    const JWT_SECRET: &str = "jwt-secret";

    fn config() -> AuthConfig {
        AuthConfig::new(SERVICE_SECRET, Some(JWT_SECRET))
    }

    fn token(user_id: u64, exp_offset: i64, secret: &str) -> String {
        let claims = TokenClaims {
            user_id,
            exp: Some(Utc::now().timestamp() + exp_offset),
            iat: Some(Utc::now().timestamp()),
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    fn headers(pairs: &[(&'static str, String)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_str(value).unwrap());
        }
        map
    }

    #[test]
    fn matching_service_secret_is_service() {
        let h = headers(&[("x-service-secret", SERVICE_SECRET.into())]);
        assert_eq!(config().classify(&h), Ok(CallerIdentity::service()));
    }

    #[test]
    fn wrong_service_secret_is_rejected() {
        let h = headers(&[("x-service-secret", "guess".into())]);
        assert_eq!(
            config().classify(&h),
            Err(AuthError::InvalidServiceCredentials)
        );
    }

    #[test]
    fn service_secret_takes_priority_over_bearer() {
        let h = headers(&[
            ("x-service-secret", SERVICE_SECRET.into()),
            ("authorization", format!("Bearer {}", token(42, 3600, JWT_SECRET))),
        ]);
        assert_eq!(config().classify(&h), Ok(CallerIdentity::service()));
    }

    #[test]
    fn wrong_service_secret_is_not_rescued_by_bearer() {
        let h = headers(&[
            ("x-service-secret", "guess".into()),
            ("authorization", format!("Bearer {}", token(42, 3600, JWT_SECRET))),
        ]);
        assert_eq!(
            config().classify(&h),
            Err(AuthError::InvalidServiceCredentials)
        );
    }

    #[test]
    fn valid_bearer_is_user() {
        let h = headers(&[(
            "authorization",
            format!("Bearer {}", token(42, 3600, JWT_SECRET)),
        )]);
        assert_eq!(config().classify(&h), Ok(CallerIdentity::user(42)));
    }

    #[test]
    fn non_bearer_scheme_is_format_error() {
        let h = headers(&[("authorization", "Basic dXNlcjpwYXNz".into())]);
        assert_eq!(config().classify(&h), Err(AuthError::InvalidAuthHeader));
    }

    #[test]
    fn format_is_checked_before_configuration() {
        let config = AuthConfig::new(SERVICE_SECRET, None);
        let h = headers(&[("authorization", "Token abc".into())]);
        assert_eq!(config.classify(&h), Err(AuthError::InvalidAuthHeader));
    }

    #[test]
    fn missing_jwt_secret_is_misconfiguration() {
        let config = AuthConfig::new(SERVICE_SECRET, None);
        assert!(!config.local_validation_enabled());

        let h = headers(&[(
            "authorization",
            format!("Bearer {}", token(42, 3600, JWT_SECRET)),
        )]);
        assert_eq!(
            config.classify(&h),
            Err(AuthError::TokenValidationNotConfigured)
        );
    }

    #[test]
    fn bad_signature_is_invalid_token() {
        let h = headers(&[(
            "authorization",
            format!("Bearer {}", token(42, 3600, "other")),
        )]);
        assert_eq!(config().classify(&h), Err(AuthError::InvalidToken));
    }

    #[test]
    fn expired_token_is_expired() {
        let h = headers(&[(
            "authorization",
            format!("Bearer {}", token(42, -60, JWT_SECRET)),
        )]);
        assert_eq!(config().classify(&h), Err(AuthError::TokenExpired));
    }

    #[test]
    fn nothing_presented_is_missing_authentication() {
        assert_eq!(
            config().classify(&HeaderMap::new()),
            Err(AuthError::MissingAuthentication)
        );
    }

    #[test]
    fn empty_service_header_counts_as_absent() {
        let h = headers(&[("x-service-secret", String::new())]);
        assert_eq!(config().classify(&h), Err(AuthError::MissingAuthentication));
    }

    #[test]
    fn service_only_requires_header() {
        assert_eq!(
            config().authenticate_service(&HeaderMap::new()),
            Err(AuthError::MissingServiceHeaders)
        );
    }

    #[test]
    fn user_only_requires_authorization() {
        let h = headers(&[("x-service-secret", SERVICE_SECRET.into())]);
        assert_eq!(
            config().authenticate_user(&h),
            Err(AuthError::MissingAuthHeader)
        );
    }

    #[derive(Clone, Copy)]
    enum Guard {
        Smart,
        Service,
        User,
    }

    async fn echo(Caller(caller): Caller, headers: HeaderMap) -> Json<Value> {
        Json(json!({
            "kind": caller.kind().to_string(),
            "user_id": caller.user_id(),
            "x_user_id": headers.get(USER_ID_HEADER).and_then(|v| v.to_str().ok()),
        }))
    }

    /// Router behind `guard`, with an outer layer that may already have set
    /// the caller identity.
    fn guarded(guard: Guard, preset: Option<CallerIdentity>) -> Router {
        let routes = Router::new().route("/", get(echo));
        let routes = match guard {
            Guard::Smart => routes.route_layer(from_fn_with_state(config(), smart_auth)),
            Guard::Service => routes.route_layer(from_fn_with_state(config(), require_service)),
            Guard::User => routes.route_layer(from_fn_with_state(config(), require_user)),
        };
        routes.layer(from_fn(move |mut request: Request, next: Next| async move {
            if let Some(identity) = preset {
                request.extensions_mut().insert(identity);
            }
            next.run(request).await
        }))
    }

    async fn call(app: Router, pairs: &[(&'static str, String)]) -> (StatusCode, Value) {
        let mut request = HttpRequest::get("/");
        for (name, value) in pairs {
            request = request.header(*name, value.as_str());
        }
        let response = app
            .oneshot(request.body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn service_only_rejects_existing_user_identity() {
        let app = guarded(Guard::Service, Some(CallerIdentity::user(7)));
        let (status, body) = call(app, &[("x-service-secret", SERVICE_SECRET.into())]).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn service_only_keeps_existing_service_identity() {
        let app = guarded(Guard::Service, Some(CallerIdentity::service()));
        let (status, body) = call(app, &[]).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["kind"], "service");
    }

    #[tokio::test]
    async fn service_only_authenticates_and_keeps_inbound_user_header() {
        let app = guarded(Guard::Service, None);
        let (status, body) = call(
            app,
            &[
                ("x-service-secret", SERVICE_SECRET.into()),
                ("x-user-id", "7".into()),
            ],
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["kind"], "service");
        assert_eq!(body["x_user_id"], "7");
    }

    #[tokio::test]
    async fn user_only_rejects_existing_service_identity() {
        let app = guarded(Guard::User, Some(CallerIdentity::service()));
        let bearer = format!("Bearer {}", token(42, 3600, JWT_SECRET));
        let (status, _) = call(app, &[("authorization", bearer)]).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn user_only_keeps_existing_user_identity() {
        let app = guarded(Guard::User, Some(CallerIdentity::user(9)));
        let (status, body) = call(app, &[]).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["user_id"], 9);
    }

    #[tokio::test]
    async fn user_only_mirrors_subject_into_user_header() {
        let app = guarded(Guard::User, None);
        let bearer = format!("Bearer {}", token(42, 3600, JWT_SECRET));
        let (status, body) = call(
            app,
            &[("authorization", bearer), ("x-user-id", "1".into())],
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["kind"], "user");
        assert_eq!(body["user_id"], 42);
        assert_eq!(body["x_user_id"], "42");
    }

    #[tokio::test]
    async fn classifier_passes_through_existing_identity() {
        let (status, _) = call(guarded(Guard::Smart, None), &[]).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let app = guarded(Guard::Smart, Some(CallerIdentity::user(5)));
        let (status, body) = call(app, &[]).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["user_id"], 5);
    }

    #[test]
    fn debug_redacts_secret() {
        let debug = format!("{:?}", config());
        assert!(!debug.contains(SERVICE_SECRET));
    }
}
