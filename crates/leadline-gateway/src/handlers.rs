// SPDX-FileCopyrightText: 2026 Leadline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP request handlers for the gateway.
//!
//! Webhook handlers adapt raw form posts into [`WebhookRequest`]s and map the
//! pipeline's outcome to a status code. That mapping lives only here: every
//! handled path answers 200 so the provider does not retry, and only a
//! failure to record the inbound message (or resolve its tenant) is a 500.

use axum::{
    Json,
    body::Bytes,
    extract::{OriginalUri, Path, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
};
use leadline_agent::{CallbackOutcome, PipelineOutcome, WebhookRequest};
use leadline_core::{Conversation, HealthStatus, Message};
use leadline_sms::{ack_xml, message_xml};
use serde::Serialize;

use crate::server::{GatewayState, WebhookConfig};

/// Response body for the health endpoints.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Response body for GET /v1/conversations/{id}/messages.
#[derive(Debug, Serialize)]
pub struct ConversationMessagesResponse {
    pub conversation: Conversation,
    pub messages: Vec<Message>,
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// POST /webhooks/sms
pub async fn post_inbound_sms(
    State(state): State<GatewayState>,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let request = match webhook_request(&state.webhook, &uri, &headers, &body) {
        Ok(request) => request,
        Err(response) => return response,
    };
    inbound_response(state.pipeline.handle_inbound(request).await)
}

/// POST /webhooks/sms/status
pub async fn post_status_callback(
    State(state): State<GatewayState>,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let request = match webhook_request(&state.webhook, &uri, &headers, &body) {
        Ok(request) => request,
        Err(response) => return response,
    };
    callback_response(state.pipeline.handle_status_callback(request).await)
}

/// Maps an inbound pipeline outcome to the provider-facing response.
pub fn inbound_response(outcome: PipelineOutcome) -> Response {
    match outcome {
        PipelineOutcome::Handled { .. }
        | PipelineOutcome::Queued { .. }
        | PipelineOutcome::Duplicate { .. }
        | PipelineOutcome::TenantNotFound
        | PipelineOutcome::LeadNotFound { reply: None } => xml(ack_xml()),
        PipelineOutcome::LeadNotFound { reply: Some(text) } => xml(message_xml(&text)),
        PipelineOutcome::AuthFailed => (StatusCode::FORBIDDEN, "forbidden").into_response(),
        PipelineOutcome::BadRequest(reason) => (StatusCode::BAD_REQUEST, reason).into_response(),
        PipelineOutcome::PersistFailed(_) | PipelineOutcome::Internal(_) => {
            (StatusCode::INTERNAL_SERVER_ERROR, "internal error").into_response()
        }
    }
}

/// Maps a status callback outcome to the provider-facing response.
pub fn callback_response(outcome: CallbackOutcome) -> Response {
    match outcome {
        CallbackOutcome::Applied { .. } | CallbackOutcome::Ignored(_) => xml(ack_xml()),
        CallbackOutcome::AuthFailed => (StatusCode::FORBIDDEN, "forbidden").into_response(),
        CallbackOutcome::BadRequest(reason) => (StatusCode::BAD_REQUEST, reason).into_response(),
        CallbackOutcome::Internal(_) => {
            (StatusCode::INTERNAL_SERVER_ERROR, "internal error").into_response()
        }
    }
}

fn xml(body: String) -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/xml")],
        body,
    )
        .into_response()
}

fn webhook_request(
    config: &WebhookConfig,
    uri: &axum::http::Uri,
    headers: &HeaderMap,
    body: &[u8],
) -> Result<WebhookRequest, Response> {
    let params: Vec<(String, String)> = serde_urlencoded::from_bytes(body).map_err(|e| {
        (StatusCode::BAD_REQUEST, format!("malformed form body: {e}")).into_response()
    })?;
    let signature = headers
        .get(config.signature_header.as_str())
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    Ok(WebhookRequest {
        url: signed_url(config, uri, headers),
        signature,
        params,
    })
}

/// Rebuilds the URL the provider called, which is what it signed.
///
/// `public_base_url` wins when configured; otherwise the forwarded headers
/// set by a proxy, then the `Host` header.
pub fn signed_url(config: &WebhookConfig, uri: &axum::http::Uri, headers: &HeaderMap) -> String {
    let path = uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or_else(|| uri.path());

    if let Some(base) = &config.public_base_url {
        return format!("{}{path}", base.trim_end_matches('/'));
    }

    let scheme = first_value(headers, "x-forwarded-proto").unwrap_or("http");
    let host = first_value(headers, "x-forwarded-host")
        .or_else(|| first_value(headers, "host"))
        .unwrap_or("localhost");
    format!("{scheme}://{host}{path}")
}

/// First entry of a possibly comma-separated header.
fn first_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// GET /health
pub async fn get_public_health(State(state): State<GatewayState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.health.start_time.elapsed().as_secs(),
        detail: None,
    })
}

/// GET /metrics
pub async fn get_public_metrics(State(state): State<GatewayState>) -> Response {
    match &state.health.prometheus_render {
        Some(render) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            render(),
        )
            .into_response(),
        None => (StatusCode::NOT_FOUND, "metrics disabled").into_response(),
    }
}

/// GET /v1/health
///
/// Reports the storage backend's health; 503 when it is unhealthy.
pub async fn get_health(State(state): State<GatewayState>) -> Response {
    let uptime_secs = state.health.start_time.elapsed().as_secs();
    let (code, status, detail) = match state.storage.health_check().await {
        Ok(HealthStatus::Healthy) => (StatusCode::OK, "healthy", None),
        Ok(HealthStatus::Degraded(reason)) => (StatusCode::OK, "degraded", Some(reason)),
        Ok(HealthStatus::Unhealthy(reason)) => {
            (StatusCode::SERVICE_UNAVAILABLE, "unhealthy", Some(reason))
        }
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            "unhealthy",
            Some(e.to_string()),
        ),
    };
    (
        code,
        Json(HealthResponse {
            status: status.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_secs,
            detail,
        }),
    )
        .into_response()
}

/// GET /v1/conversations/{id}/messages
///
/// The conversation and its messages in order, including delivery status
/// and error text.
pub async fn get_conversation_messages(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
) -> Response {
    let conversation = match state.storage.get_conversation(&id).await {
        Ok(Some(conversation)) => conversation,
        Ok(None) => {
            return error_response(StatusCode::NOT_FOUND, format!("conversation {id} not found"));
        }
        Err(e) => {
            tracing::error!(conversation_id = id.as_str(), error = %e, "conversation lookup failed");
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "storage error".into());
        }
    };

    match state.storage.list_messages(&conversation.id).await {
        Ok(messages) => Json(ConversationMessagesResponse {
            conversation,
            messages,
        })
        .into_response(),
        Err(e) => {
            tracing::error!(conversation_id = id.as_str(), error = %e, "message listing failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "storage error".into())
        }
    }
}

fn error_response(code: StatusCode, error: String) -> Response {
    (code, Json(ErrorResponse { error })).into_response()
}
