// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Service client behavior against mocked peer services.

use std::time::Duration;

use relational_service_auth::client::{
    OutboundContext, ServiceClient, ServiceClientError, ServiceCredentials, ServiceRoutes,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{body_json, header, header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[derive(Debug, Deserialize, PartialEq)]
struct Order {
    id: u64,
    status: String,
}

#[derive(Serialize)]
struct UpdateOrder<'a> {
    status: &'a str,
}

fn credentials() -> ServiceCredentials {
    ServiceCredentials {
        service_id: "billing-service".into(),
        service_secret: "peer-secret".into(),
    }
}

fn client_for(server: &MockServer) -> ServiceClient {
    let routes = ServiceRoutes::new().with_host("orders", server.uri().parse().unwrap());
    ServiceClient::new(credentials(), routes).unwrap()
}

#[tokio::test]
async fn get_decodes_envelope_data() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/orders/123"))
        .and(header("x-service-id", "billing-service"))
        .and(header("x-service-secret", "peer-secret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": {"id": 123, "status": "paid"},
            "message": "Success"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let order = client_for(&server)
        .get::<Order>("/api/v1/orders/123", &OutboundContext::empty())
        .await
        .unwrap()
        .into_data()
        .unwrap();

    assert_eq!(
        order,
        Some(Order {
            id: 123,
            status: "paid".into()
        })
    );
}

#[tokio::test]
async fn put_sends_json_body_and_context() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/api/v1/orders/5"))
        .and(header("content-type", "application/json"))
        .and(header("x-user-id", "42"))
        .and(header("x-request-id", "req-1"))
        .and(header("accept-language", "ar"))
        .and(body_json(json!({"status": "shipped"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "data": {"id": 5, "status": "shipped"},
            "message": "Success"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let ctx = OutboundContext {
        user_id: Some("42".into()),
        request_id: Some("req-1".into()),
        accept_language: Some("ar".into()),
    };

    let envelope = client_for(&server)
        .put::<Order, _>("/api/v1/orders/5", &UpdateOrder { status: "shipped" }, &ctx)
        .await
        .unwrap();
    assert!(envelope.success);
}

#[tokio::test]
async fn delete_without_context_sends_no_user_header() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/api/v1/orders/9"))
        .and(header_exists("x-user-id"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/v1/orders/9"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"success": true, "message": "deleted"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let envelope = client_for(&server)
        .delete::<serde_json::Value>("/api/v1/orders/9", &OutboundContext::empty())
        .await
        .unwrap();
    assert_eq!(envelope.message, "deleted");
    assert!(envelope.data.is_none());
}

#[tokio::test]
async fn envelope_without_data_decodes_into_typed_payload() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/orders/3/cancel"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"success": true, "message": "ok"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let envelope = client_for(&server)
        .post::<Order, _>(
            "/api/v1/orders/3/cancel",
            &json!({}),
            &OutboundContext::empty(),
        )
        .await
        .unwrap();
    assert_eq!(envelope.message, "ok");
    assert_eq!(envelope.into_data().unwrap(), None);
}

#[tokio::test]
async fn error_status_carries_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404).set_body_string("no such order"))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .get::<Order>("/api/v1/orders/1", &OutboundContext::empty())
        .await
        .unwrap_err();

    match err {
        ServiceClientError::Status { status, body } => {
            assert_eq!(status, 404);
            assert_eq!(body, "no such order");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn rejected_envelope_is_error_through_into_data() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"success": false, "message": "order locked"})),
        )
        .mount(&server)
        .await;

    let err = client_for(&server)
        .get::<Order>("/api/v1/orders/1", &OutboundContext::empty())
        .await
        .unwrap()
        .into_data()
        .unwrap_err();
    assert!(matches!(err, ServiceClientError::Rejected(m) if m == "order locked"));
}

#[tokio::test]
async fn slow_peer_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_secs(2))
                .set_body_json(json!({"success": true, "message": "late"})),
        )
        .mount(&server)
        .await;

    let routes = ServiceRoutes::new().with_host("orders", server.uri().parse().unwrap());
    let client =
        ServiceClient::with_timeout(credentials(), routes, Duration::from_millis(100)).unwrap();

    let err = client
        .get::<serde_json::Value>("/api/v1/orders/1", &OutboundContext::empty())
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceClientError::Timeout(_)));
}

#[tokio::test]
async fn cancellation_abandons_in_flight_call() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_delay(Duration::from_secs(5))
                .set_body_json(json!({"success": true, "message": "late"})),
        )
        .mount(&server)
        .await;

    let client = client_for(&server);
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let result = tokio::time::timeout(
        Duration::from_secs(2),
        client.send_cancellable::<serde_json::Value, ()>(
            reqwest::Method::GET,
            "/api/v1/orders/1",
            None,
            &OutboundContext::empty(),
            &cancel,
        ),
    )
    .await
    .expect("cancellation should win the race");

    assert!(matches!(result, Err(ServiceClientError::Cancelled)));
}

#[tokio::test]
async fn short_route_is_routing_error() {
    let server = MockServer::start().await;
    let err = client_for(&server)
        .get::<serde_json::Value>("/api/v1", &OutboundContext::empty())
        .await
        .unwrap_err();
    assert!(err.is_routing());
}
