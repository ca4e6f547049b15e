// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Service route table.
//!
//! Logical routes follow `api/<version>/<service>/...`. The third segment
//! names the target service and is looked up here to find its base URL;
//! the full route (version included) is appended to that host.

use std::collections::HashMap;

use url::Url;

use super::ServiceClientError;

/// Index of the service-name segment in a logical route.
const SERVICE_SEGMENT: usize = 2;

/// Read-only mapping from service name to base URL.
#[derive(Debug, Clone, Default)]
pub struct ServiceRoutes {
    hosts: HashMap<String, Url>,
}

impl ServiceRoutes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a host for a service name.
    pub fn with_host(mut self, service: impl Into<String>, host: Url) -> Self {
        self.hosts.insert(service.into(), host);
        self
    }

    /// Look up the base URL for a service name.
    pub fn host(&self, service: &str) -> Option<&Url> {
        self.hosts.get(service)
    }

    /// Configured service names, sorted.
    pub fn services(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.hosts.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Extract the service name from a logical route.
    pub fn service_name(route: &str) -> Result<&str, ServiceClientError> {
        let trimmed = route.trim_start_matches('/');
        trimmed
            .split('/')
            .nth(SERVICE_SEGMENT)
            .filter(|segment| !segment.is_empty())
            .ok_or_else(|| ServiceClientError::Routing(format!("invalid API route format: {route}")))
    }

    /// Resolve a logical route to an absolute URL.
    pub fn resolve(&self, route: &str) -> Result<Url, ServiceClientError> {
        let service = Self::service_name(route)?;
        let host = self.host(service).ok_or_else(|| {
            ServiceClientError::Routing(format!("no host configured for service: {service}"))
        })?;

        let full = format!(
            "{}/{}",
            host.as_str().trim_end_matches('/'),
            route.trim_start_matches('/')
        );
        Url::parse(&full).map_err(|e| ServiceClientError::Routing(format!("{full}: {e}")))
    }
}
