// SPDX-FileCopyrightText: 2026 Leadline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP contract tests for the gateway router.

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use leadline_core::{DeliveryStatus, Direction, StorageAdapter};
use leadline_gateway::{GatewayState, router};
use leadline_test_utils::{STATUS_URL, TestHarness, WEBHOOK_URL};
use tower::ServiceExt;

const ADMIN_TOKEN: &str = "operator-token";

fn app(harness: &TestHarness, admin_token: Option<&str>) -> Router {
    app_with_metrics(harness, admin_token, None)
}

fn app_with_metrics(
    harness: &TestHarness,
    admin_token: Option<&str>,
    prometheus_render: Option<Arc<dyn Fn() -> String + Send + Sync>>,
) -> Router {
    let mut config = harness.config.clone();
    config.server.public_base_url = Some("https://leadline.test".to_string());
    config.server.admin_token = admin_token.map(str::to_string);
    let state = GatewayState::new(
        &config,
        harness.pipeline.clone(),
        harness.storage.clone(),
        prometheus_render,
    );
    router(state)
}

fn form_post(path: &str, signature: Option<String>, params: &[(String, String)]) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(path)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
    if let Some(signature) = signature {
        builder = builder.header("X-Provider-Signature", signature);
    }
    builder
        .body(Body::from(serde_urlencoded::to_string(params).unwrap()))
        .unwrap()
}

fn signed_post(harness: &TestHarness, params: &[(String, String)]) -> Request<Body> {
    let signature = leadline_sms::compute_signature(
        &harness.tenant.telephony.auth_token,
        WEBHOOK_URL,
        params,
    );
    form_post("/webhooks/sms", Some(signature), params)
}

async fn body_string(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn signed_inbound_is_acknowledged_and_replied() {
    let harness = TestHarness::builder()
        .with_replies(["Thanks for texting!"])
        .build()
        .await
        .unwrap();

    let params = harness.inbound_params("SM1", "Hi");
    let response = app(&harness, None)
        .oneshot(signed_post(&harness, &params))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "application/xml"
    );
    let body = body_string(response).await;
    assert!(body.contains("<Response></Response>"), "{body}");

    let messages = harness.messages().await.unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[1].body, "Thanks for texting!");
    assert_eq!(messages[1].status, DeliveryStatus::Sent);
}

#[tokio::test]
async fn bad_or_missing_signature_is_forbidden_and_stores_nothing() {
    let harness = TestHarness::builder().build().await.unwrap();
    let params = harness.inbound_params("SM1", "Hi");

    let wrong = leadline_sms::compute_signature("not-the-secret", WEBHOOK_URL, &params);
    let response = app(&harness, None)
        .oneshot(form_post("/webhooks/sms", Some(wrong), &params))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app(&harness, None)
        .oneshot(form_post("/webhooks/sms", None, &params))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    assert!(harness.conversation().await.unwrap().is_none());
    assert_eq!(harness.completion.call_count().await, 0);
}

#[tokio::test]
async fn signature_over_a_different_url_is_forbidden() {
    let harness = TestHarness::builder().build().await.unwrap();
    let params = harness.inbound_params("SM1", "Hi");
    let signature = leadline_sms::compute_signature(
        &harness.tenant.telephony.auth_token,
        "https://attacker.test/webhooks/sms",
        &params,
    );
    let response = app(&harness, None)
        .oneshot(form_post("/webhooks/sms", Some(signature), &params))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn unknown_sender_gets_not_recognized_copy() {
    let harness = TestHarness::builder().build().await.unwrap();
    let mut params = harness.inbound_params("SM1", "Hi");
    for (key, value) in params.iter_mut() {
        if key == "From" {
            *value = "+15550009999".to_string();
        }
    }

    let response = app(&harness, None)
        .oneshot(signed_post(&harness, &params))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_string(response).await;
    assert!(
        body.contains("<Message>Sorry, this number is not recognized.</Message>"),
        "{body}"
    );
    assert!(harness.conversation().await.unwrap().is_none());
}

#[tokio::test]
async fn missing_required_field_is_bad_request() {
    let harness = TestHarness::builder().build().await.unwrap();
    let params: Vec<(String, String)> = harness
        .inbound_params("SM1", "Hi")
        .into_iter()
        .filter(|(k, _)| k != "From")
        .collect();

    let response = app(&harness, None)
        .oneshot(signed_post(&harness, &params))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn redelivery_is_acknowledged_once_stored() {
    let harness = TestHarness::builder().build().await.unwrap();
    let params = harness.inbound_params("SM1", "Hi");

    for _ in 0..2 {
        let response = app(&harness, None)
            .oneshot(signed_post(&harness, &params))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let inbound = harness
        .messages()
        .await
        .unwrap()
        .into_iter()
        .filter(|m| m.direction == Direction::Inbound)
        .count();
    assert_eq!(inbound, 1);
    assert_eq!(harness.transport.attempts().await.len(), 1);
}

#[tokio::test]
async fn persistence_failure_is_the_only_server_error() {
    let harness = TestHarness::builder().build().await.unwrap();
    harness
        .storage
        .database()
        .unwrap()
        .connection()
        .call(|conn| conn.execute_batch("DROP TABLE messages"))
        .await
        .unwrap();

    let params = harness.inbound_params("SM1", "Hi");
    let response = app(&harness, None)
        .oneshot(signed_post(&harness, &params))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_string(response).await, "internal error");
}

#[tokio::test]
async fn failed_status_callback_marks_message_failed() {
    let harness = TestHarness::builder().build().await.unwrap();
    let app = app(&harness, None);
    app.clone()
        .oneshot(signed_post(&harness, &harness.inbound_params("SM1", "Hi")))
        .await
        .unwrap();
    let sent = harness.transport.sent().await;
    let provider_id = sent[0].provider_message_id.clone().unwrap();

    let params: Vec<(String, String)> = vec![
        ("MessageSid".into(), provider_id.clone()),
        ("MessageStatus".into(), "undelivered".into()),
        ("From".into(), harness.tenant.telephony.sending_number.clone()),
        ("To".into(), harness.lead.phone_number.clone()),
        ("ErrorCode".into(), "30006".into()),
    ];
    let signature = leadline_sms::compute_signature(
        &harness.tenant.telephony.auth_token,
        STATUS_URL,
        &params,
    );
    let response = app
        .oneshot(form_post("/webhooks/sms/status", Some(signature), &params))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let outbound = harness
        .storage
        .outbound_by_provider_id(&provider_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(outbound.status, DeliveryStatus::Failed);
    assert_eq!(outbound.error.as_deref(), Some("delivery undelivered (error 30006)"));
}

#[tokio::test]
async fn operator_api_requires_configured_token() {
    let harness = TestHarness::builder().build().await.unwrap();
    harness.deliver("SM1", "Hi").await;
    let conversation = harness.conversation().await.unwrap().unwrap();
    let path = format!("/v1/conversations/{}/messages", conversation.id);

    let get = |token: Option<&str>| {
        let mut builder = Request::builder().uri(path.as_str());
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        builder.body(Body::empty()).unwrap()
    };

    // No token configured: fail closed even with a header.
    let response = app(&harness, None).oneshot(get(Some(ADMIN_TOKEN))).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app(&harness, Some(ADMIN_TOKEN))
        .oneshot(get(Some("wrong")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app(&harness, Some(ADMIN_TOKEN))
        .oneshot(get(Some(ADMIN_TOKEN)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(json["conversation"]["id"], conversation.id.as_str());
    let messages = json["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0]["direction"], "INBOUND");
    assert_eq!(messages[1]["status"], "sent");
}

#[tokio::test]
async fn operator_api_unknown_conversation_is_not_found() {
    let harness = TestHarness::builder().build().await.unwrap();
    let request = Request::builder()
        .uri("/v1/conversations/missing/messages")
        .header(header::AUTHORIZATION, format!("Bearer {ADMIN_TOKEN}"))
        .body(Body::empty())
        .unwrap();
    let response = app(&harness, Some(ADMIN_TOKEN)).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn authenticated_health_reports_storage() {
    let harness = TestHarness::builder().build().await.unwrap();
    let request = Request::builder()
        .uri("/v1/health")
        .header(header::AUTHORIZATION, format!("Bearer {ADMIN_TOKEN}"))
        .body(Body::empty())
        .unwrap();
    let response = app(&harness, Some(ADMIN_TOKEN)).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(json["status"], "healthy");
}

#[tokio::test]
async fn public_health_and_metrics() {
    let harness = TestHarness::builder().build().await.unwrap();

    let response = app(&harness, None)
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(json["status"], "ok");

    let response = app(&harness, None)
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let render: Arc<dyn Fn() -> String + Send + Sync> =
        Arc::new(|| "leadline_webhooks_total{outcome=\"replied\"} 3\n".to_string());
    let response = app_with_metrics(&harness, None, Some(render))
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_string(response).await.contains("leadline_webhooks_total"));
}
