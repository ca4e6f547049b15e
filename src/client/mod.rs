// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Service-to-Service HTTP Client
//!
//! Outbound transport for calls between Relational backend services.
//!
//! ## Request Flow
//!
//! 1. The logical route (`/api/v1/<service>/...`) is resolved against the
//!    [`ServiceRoutes`] table; a miss fails before any I/O
//! 2. `X-Service-ID` / `X-Service-Secret` identify this service to the peer
//! 3. The [`OutboundContext`] allow-list (user ID, request ID, language) is
//!    forwarded
//! 4. Any status ≥ 400 is an error carrying the response body
//! 5. The body is decoded as the standard [`Envelope`]
//!
//! There are no automatic retries. Every call is bounded by the client
//! timeout, and dropping the returned future cancels the request.

mod context;
mod error;
mod routes;

pub use context::{OutboundContext, ACCEPT_LANGUAGE_HEADER};
pub use error::ServiceClientError;
pub use routes::ServiceRoutes;

use std::time::Duration;

use reqwest::{header::CONTENT_TYPE, Client, Method};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Header carrying the calling service's ID.
pub const SERVICE_ID_HEADER: &str = "x-service-id";

/// Header carrying the shared service secret.
pub const SERVICE_SECRET_HEADER: &str = "x-service-secret";

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Credentials identifying this service to its peers.
#[derive(Clone)]
pub struct ServiceCredentials {
    pub service_id: String,
    pub service_secret: String,
}

impl std::fmt::Debug for ServiceCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceCredentials")
            .field("service_id", &self.service_id)
            .field("service_secret", &"<redacted>")
            .finish()
    }
}

/// Standard response envelope returned by peer services.
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope<T> {
    pub success: bool,
    pub data: Option<T>,
    #[serde(default)]
    pub message: String,
}

impl<T> Envelope<T> {
    /// Unwrap `data`, treating `success == false` as an error.
    pub fn into_data(self) -> Result<Option<T>, ServiceClientError> {
        if self.success {
            Ok(self.data)
        } else {
            Err(ServiceClientError::Rejected(self.message))
        }
    }
}

/// HTTP client for calls to peer services.
#[derive(Debug, Clone)]
pub struct ServiceClient {
    http: Client,
    credentials: ServiceCredentials,
    routes: ServiceRoutes,
}

impl ServiceClient {
    /// Create a client with the default timeout.
    pub fn new(
        credentials: ServiceCredentials,
        routes: ServiceRoutes,
    ) -> Result<Self, ServiceClientError> {
        Self::with_timeout(credentials, routes, DEFAULT_TIMEOUT)
    }

    /// Create a client with a custom timeout.
    pub fn with_timeout(
        credentials: ServiceCredentials,
        routes: ServiceRoutes,
        timeout: Duration,
    ) -> Result<Self, ServiceClientError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ServiceClientError::Transport(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            credentials,
            routes,
        })
    }

    /// Get the route table.
    pub fn routes(&self) -> &ServiceRoutes {
        &self.routes
    }

    /// Send a request to a peer service and decode its envelope.
    pub async fn send<T, P>(
        &self,
        method: Method,
        route: &str,
        payload: Option<&P>,
        ctx: &OutboundContext,
    ) -> Result<Envelope<T>, ServiceClientError>
    where
        T: DeserializeOwned,
        P: Serialize + ?Sized,
    {
        let url = self.routes.resolve(route)?;

        let mut request = self
            .http
            .request(method.clone(), url.clone())
            .header(CONTENT_TYPE, "application/json")
            .header(SERVICE_ID_HEADER, &self.credentials.service_id)
            .header(SERVICE_SECRET_HEADER, &self.credentials.service_secret);

        for (name, value) in ctx.headers() {
            request = request.header(name, value);
        }

        if let Some(payload) = payload {
            let body = serde_json::to_vec(payload)
                .map_err(|e| ServiceClientError::Encode(e.to_string()))?;
            request = request.body(body);
        }

        debug!(
            method = %method,
            url = %url,
            request_id = ctx.request_id.as_deref().unwrap_or("-"),
            "Sending service request"
        );

        let response = request
            .send()
            .await
            .map_err(ServiceClientError::from_reqwest)?;

        let status = response.status();
        if status.as_u16() >= 400 {
            let body = response.text().await.unwrap_or_default();
            warn!(
                method = %method,
                url = %url,
                status = status.as_u16(),
                "Service returned error status"
            );
            return Err(ServiceClientError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(ServiceClientError::from_reqwest)?;

        serde_json::from_slice(&bytes).map_err(|e| ServiceClientError::Decode(e.to_string()))
    }

    /// Like [`send`](Self::send), but gives up as soon as `cancel` fires.
    pub async fn send_cancellable<T, P>(
        &self,
        method: Method,
        route: &str,
        payload: Option<&P>,
        ctx: &OutboundContext,
        cancel: &CancellationToken,
    ) -> Result<Envelope<T>, ServiceClientError>
    where
        T: DeserializeOwned,
        P: Serialize + ?Sized,
    {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(ServiceClientError::Cancelled),
            result = self.send(method, route, payload, ctx) => result,
        }
    }

    pub async fn get<T: DeserializeOwned>(
        &self,
        route: &str,
        ctx: &OutboundContext,
    ) -> Result<Envelope<T>, ServiceClientError> {
        self.send::<T, ()>(Method::GET, route, None, ctx).await
    }

    pub async fn post<T, P>(
        &self,
        route: &str,
        payload: &P,
        ctx: &OutboundContext,
    ) -> Result<Envelope<T>, ServiceClientError>
    where
        T: DeserializeOwned,
        P: Serialize + ?Sized,
    {
        self.send(Method::POST, route, Some(payload), ctx).await
    }

    pub async fn put<T, P>(
        &self,
        route: &str,
        payload: &P,
        ctx: &OutboundContext,
    ) -> Result<Envelope<T>, ServiceClientError>
    where
        T: DeserializeOwned,
        P: Serialize + ?Sized,
    {
        self.send(Method::PUT, route, Some(payload), ctx).await
    }

    pub async fn delete<T: DeserializeOwned>(
        &self,
        route: &str,
        ctx: &OutboundContext,
    ) -> Result<Envelope<T>, ServiceClientError> {
        self.send::<T, ()>(Method::DELETE, route, None, ctx).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> ServiceClient {
        ServiceClient::new(
            ServiceCredentials {
                service_id: "orders".into(),
                service_secret: "s3cret".into(),
            },
            ServiceRoutes::new(),
        )
        .unwrap()
    }

    #[test]
    fn credentials_debug_redacts_secret() {
        let debug = format!("{:?}", client().credentials);
        assert!(debug.contains("orders"));
        assert!(!debug.contains("s3cret"));
    }

    #[tokio::test]
    async fn unknown_service_fails_before_network() {
        let err = client()
            .get::<serde_json::Value>("/api/v1/orders/123", &OutboundContext::empty())
            .await
            .unwrap_err();
        assert!(err.is_routing());
    }

    #[test]
    fn rejected_envelope_into_data() {
        let envelope: Envelope<serde_json::Value> =
            serde_json::from_str(r#"{"success":false,"message":"nope"}"#).unwrap();
        assert!(matches!(
            envelope.into_data(),
            Err(ServiceClientError::Rejected(m)) if m == "nope"
        ));
    }

    #[test]
    fn envelope_tolerates_null_data() {
        let envelope: Envelope<serde_json::Value> =
            serde_json::from_str(r#"{"success":true,"data":null,"message":"ok"}"#).unwrap();
        assert!(envelope.into_data().unwrap().is_none());
    }

    #[derive(Debug, Deserialize)]
    struct Invoice {
        number: u64,
    }

    #[test]
    fn envelope_without_data_decodes_for_any_payload_type() {
        let envelope: Envelope<Invoice> =
            serde_json::from_str(r#"{"success":true,"message":"ok"}"#).unwrap();
        assert_eq!(envelope.message, "ok");
        assert!(envelope.into_data().unwrap().is_none());

        let envelope: Envelope<Invoice> =
            serde_json::from_str(r#"{"success":true,"data":{"number":7}}"#).unwrap();
        assert_eq!(envelope.into_data().unwrap().map(|i| i.number), Some(7));
    }

    #[tokio::test]
    async fn cancelled_token_short_circuits() {
        let cancel = CancellationToken::new();
        cancel.cancel();

        let client = ServiceClient::new(
            ServiceCredentials {
                service_id: "orders".into(),
                service_secret: "s3cret".into(),
            },
            // Unroutable address: if the request were sent it would hang or fail
            ServiceRoutes::new().with_host("auth", url::Url::parse("http://10.255.255.1").unwrap()),
        )
        .unwrap();

        let result = client
            .send_cancellable::<serde_json::Value, ()>(
                Method::GET,
                "/api/v1/auth/ping",
                None,
                &OutboundContext::empty(),
                &cancel,
            )
            .await;
        assert!(matches!(result, Err(ServiceClientError::Cancelled)));
    }
}
