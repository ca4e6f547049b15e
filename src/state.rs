// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use crate::auth::{AuthConfig, PermissionChecker, RemotePermissionGate};
use crate::client::{ServiceClient, ServiceClientError};
use crate::config::Config;
use crate::guards::GuardConfig;
use crate::rate_limit::{ClientRateLimiter, TrustedProxies};

/// Process-wide shared components, built once at startup.
#[derive(Clone)]
pub struct AppState {
    pub auth: AuthConfig,
    pub client: Arc<ServiceClient>,
    pub gate: Arc<dyn PermissionChecker>,
    pub limiter: Arc<ClientRateLimiter>,
    pub guards: GuardConfig,
    pub allowed_origins: Arc<[String]>,
}

impl AppState {
    /// Wire every component from configuration.
    pub fn from_config(config: &Config) -> Result<Self, ServiceClientError> {
        let client = Arc::new(ServiceClient::new(config.credentials(), config.routes())?);
        let gate: Arc<dyn PermissionChecker> = Arc::new(RemotePermissionGate::new(client.clone()));
        let proxies = TrustedProxies::new(config.trusted_proxies.iter().copied());

        Ok(Self {
            auth: AuthConfig::new(config.service_secret.clone(), config.jwt_secret.as_deref()),
            client,
            gate,
            limiter: Arc::new(
                ClientRateLimiter::new(config.rate_limit_per_minute)
                    .with_trusted_proxies(proxies.clone()),
            ),
            guards: GuardConfig {
                max_body_bytes: config.max_body_bytes,
                trusted_ips: Arc::from(config.trusted_ips.clone()),
                trusted_proxies: proxies,
                api_key: config.api_key.as_deref().map(Arc::from),
            },
            allowed_origins: Arc::from(config.allowed_origins.clone()),
        })
    }

    /// Replace the permission checker.
    pub fn with_gate(mut self, gate: Arc<dyn PermissionChecker>) -> Self {
        self.gate = gate;
        self
    }

    pub fn with_limiter(mut self, limiter: Arc<ClientRateLimiter>) -> Self {
        self.limiter = limiter;
        self
    }
}
