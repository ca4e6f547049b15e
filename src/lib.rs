// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Relational Service Auth - shared request authentication for backend services
//!
//! Every inbound request is classified as coming from a peer service (shared
//! secret) or an end user (HS256 bearer token). User requests are then
//! checked, permission by permission, against the remote authorization
//! service.
//!
//! ## Modules
//!
//! - `auth` - Token validation, caller classification, permission enforcement
//! - `client` - Service-to-service HTTP client
//! - `rate_limit` - Per-client rate limiting keyed by peer address
//! - `guards` - Security headers, body/content-type limits, IP and API-key filters
//! - `context` / `i18n` - Request ID, locale, localized messages
//! - `api` - Router used by the standalone binary

pub mod api;
pub mod auth;
pub mod client;
pub mod config;
pub mod context;
pub mod error;
pub mod guards;
pub mod i18n;
pub mod logging;
pub mod models;
pub mod rate_limit;
pub mod state;
