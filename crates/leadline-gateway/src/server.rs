// SPDX-FileCopyrightText: 2026 Leadline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway HTTP server built on axum.
//!
//! Sets up routes, middleware, and shared state for the gateway.

use std::sync::Arc;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware as axum_middleware,
    routing::{get, post},
};
use leadline_agent::WebhookPipeline;
use leadline_config::model::LeadlineConfig;
use leadline_core::{LeadlineError, StorageAdapter};
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;

use crate::auth::{AuthConfig, auth_middleware};
use crate::handlers;

/// Largest form body accepted on webhook routes.
const MAX_WEBHOOK_BODY: usize = 64 * 1024;

/// Health state for unauthenticated health/metrics endpoints.
#[derive(Clone)]
pub struct HealthState {
    /// Process start time for uptime calculation.
    pub start_time: std::time::Instant,
    /// Optional Prometheus metrics render function.
    pub prometheus_render: Option<Arc<dyn Fn() -> String + Send + Sync>>,
}

/// How the gateway reconstructs and authenticates provider webhooks.
#[derive(Debug, Clone)]
pub struct WebhookConfig {
    /// Externally visible scheme and host, e.g. `https://sms.example.com`.
    pub public_base_url: Option<String>,
    /// Header carrying the provider signature.
    pub signature_header: String,
}

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct GatewayState {
    pub pipeline: WebhookPipeline,
    pub storage: Arc<dyn StorageAdapter>,
    pub webhook: WebhookConfig,
    /// Authentication configuration for the operator API.
    pub auth: AuthConfig,
    /// Health state for unauthenticated endpoints.
    pub health: HealthState,
}

impl GatewayState {
    pub fn new(
        config: &LeadlineConfig,
        pipeline: WebhookPipeline,
        storage: Arc<dyn StorageAdapter>,
        prometheus_render: Option<Arc<dyn Fn() -> String + Send + Sync>>,
    ) -> Self {
        Self {
            pipeline,
            storage,
            webhook: WebhookConfig {
                public_base_url: config.server.public_base_url.clone(),
                signature_header: config.telephony.signature_header.clone(),
            },
            auth: AuthConfig {
                bearer_token: config.server.admin_token.clone(),
            },
            health: HealthState {
                start_time: std::time::Instant::now(),
                prometheus_render,
            },
        }
    }
}

/// Gateway server bind address.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Builds the application router.
///
/// - POST /webhooks/sms, POST /webhooks/sms/status (provider signature)
/// - GET /health, GET /metrics (public)
/// - GET /v1/health, GET /v1/conversations/{id}/messages (bearer auth)
pub fn router(state: GatewayState) -> Router {
    let auth_state = state.auth.clone();

    let webhook_routes = Router::new()
        .route("/webhooks/sms", post(handlers::post_inbound_sms))
        .route("/webhooks/sms/status", post(handlers::post_status_callback))
        .layer(DefaultBodyLimit::max(MAX_WEBHOOK_BODY))
        .with_state(state.clone());

    // Unauthenticated public routes (health + metrics for systemd and Prometheus).
    let public_routes = Router::new()
        .route("/health", get(handlers::get_public_health))
        .route("/metrics", get(handlers::get_public_metrics))
        .with_state(state.clone());

    let api_routes = Router::new()
        .route("/v1/health", get(handlers::get_health))
        .route(
            "/v1/conversations/{id}/messages",
            get(handlers::get_conversation_messages),
        )
        .route_layer(axum_middleware::from_fn_with_state(
            auth_state,
            auth_middleware,
        ))
        .with_state(state);

    Router::new()
        .merge(webhook_routes)
        .merge(public_routes)
        .merge(api_routes)
        .layer(TraceLayer::new_for_http())
}

/// Serves the gateway until `shutdown` is cancelled.
///
/// In-flight requests finish before this returns.
pub async fn start_server(
    config: &ServerConfig,
    state: GatewayState,
    shutdown: CancellationToken,
) -> Result<(), LeadlineError> {
    let app = router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| LeadlineError::Transport {
            message: format!("failed to bind gateway to {addr}: {e}"),
            source: Some(Box::new(e)),
        })?;

    tracing::info!("gateway listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .map_err(|e| LeadlineError::Transport {
            message: format!("gateway server error: {e}"),
            source: Some(Box::new(e)),
        })?;

    tracing::info!("gateway stopped accepting requests");
    Ok(())
}
