// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Caller introspection endpoint.

use axum::Json;
use serde::Serialize;
use utoipa::ToSchema;

use crate::auth::{Caller, CallerIdentity};
use crate::context::RequestContext;
use crate::models::ApiResponse;

/// Response data for GET /api/v1/me
#[derive(Debug, Serialize, ToSchema)]
pub struct MeResponse {
    pub caller: CallerIdentity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    pub locale: String,
}

/// Get the identity the auth layer resolved for this request.
#[utoipa::path(
    get,
    path = "/api/v1/me",
    tag = "Auth",
    security(("bearer" = []), ("service_secret" = [])),
    responses(
        (status = 200, description = "Resolved caller, wrapped in the standard envelope", body = MeResponse),
        (status = 401, description = "Missing or invalid credentials"),
    )
)]
pub async fn get_me(
    Caller(caller): Caller,
    context: RequestContext,
) -> Json<ApiResponse<MeResponse>> {
    Json(ApiResponse::ok(MeResponse {
        caller,
        request_id: context.request_id,
        locale: context.locale.code().to_string(),
    }))
}
