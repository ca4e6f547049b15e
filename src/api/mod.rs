// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    middleware::{from_fn, from_fn_with_state},
    routing::get,
    Router,
};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use utoipa::{
    openapi::security::{ApiKey, ApiKeyValue, HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    auth::{require_permissions, smart_auth, CallerIdentity, CallerKind, RequirePermissions},
    context::{request_context, request_id_layers, RequestContext},
    guards::{api_key, cors_layer, enforce_body_limit, require_json, security_headers, trusted_ips},
    i18n::Locale,
    models::{ErrorEnvelope, ErrorItem},
    rate_limit::rate_limit,
    state::AppState,
};

pub mod health;
pub mod me;

/// Build the service router with the full middleware stack.
///
/// Outermost first: request ID, tracing, CORS, security headers, request
/// context, rate limit, body limit, content type. `/api/v1` routes add the
/// trusted-IP and API-key guards and the caller classifier.
pub fn router(state: AppState) -> Router {
    let v1_routes = protected(
        Router::new().route("/me", get(me::get_me)),
        &state,
        &[],
    )
    .layer(from_fn_with_state(state.guards.clone(), api_key))
    .layer(from_fn_with_state(state.guards.clone(), trusted_ips));

    let health_routes = Router::new()
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness));

    let (set_request_id, propagate_request_id) = request_id_layers();

    Router::new()
        .nest("/api/v1", v1_routes)
        .merge(health_routes)
        .with_state(state.clone())
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(
            ServiceBuilder::new()
                .layer(set_request_id)
                .layer(TraceLayer::new_for_http())
                .layer(propagate_request_id)
                .layer(cors_layer(&state.allowed_origins))
                .layer(from_fn(security_headers))
                .layer(from_fn(request_context))
                .layer(from_fn_with_state(state.limiter.clone(), rate_limit))
                .layer(from_fn_with_state(state.guards.clone(), enforce_body_limit))
                .layer(DefaultBodyLimit::max(state.guards.max_body_bytes))
                .layer(from_fn(require_json)),
        )
}

/// Put routes behind the caller classifier and, optionally, a permission set.
///
/// ```rust,ignore
/// let orders = protected(
///     Router::new().route("/orders", post(create_order)),
///     &state,
///     &["orders:write"],
/// );
/// ```
pub fn protected<S>(routes: Router<S>, state: &AppState, permissions: &[&str]) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    let routes = if permissions.is_empty() {
        routes
    } else {
        routes.route_layer(from_fn_with_state(
            RequirePermissions::all(Arc::clone(&state.gate), permissions.iter().copied()),
            require_permissions,
        ))
    };

    // Added last so it wraps the permission layer
    routes.route_layer(from_fn_with_state(state.auth.clone(), smart_auth))
}

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
            components.add_security_scheme(
                "service_secret",
                SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new("X-Service-Secret"))),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        health::liveness,
        health::readiness,
        me::get_me
    ),
    components(
        schemas(
            health::ReadyResponse,
            health::HealthChecks,
            health::HealthResponse,
            me::MeResponse,
            CallerIdentity,
            CallerKind,
            RequestContext,
            Locale,
            ErrorEnvelope,
            ErrorItem
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Liveness and readiness probes"),
        (name = "Auth", description = "Caller identity")
    )
)]
struct ApiDoc;
