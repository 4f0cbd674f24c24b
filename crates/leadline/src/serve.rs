// SPDX-FileCopyrightText: 2026 Leadline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `leadline serve` command implementation.
//!
//! Opens SQLite storage, builds the completion client and SMS transport,
//! wires them into the webhook pipeline and serves the gateway until a
//! shutdown signal arrives. Deferred replies still running at shutdown get
//! a bounded drain window before the WAL is checkpointed.

use std::sync::Arc;
use std::time::Duration;

use leadline_agent::{WebhookPipeline, shutdown};
use leadline_anthropic::AnthropicProvider;
use leadline_config::model::LeadlineConfig;
use leadline_core::error::LeadlineError;
use leadline_core::{HealthStatus, PluginAdapter, StorageAdapter};
use leadline_gateway::{GatewayState, ServerConfig, start_server};
use leadline_prometheus::PrometheusAdapter;
use leadline_sms::RestSmsTransport;
use leadline_storage::SqliteStorage;
use tracing::{info, warn};

/// Crates whose events follow `server.log_level`; everything else logs at warn.
const LOG_TARGETS: &[&str] = &[
    "leadline",
    "leadline_agent",
    "leadline_anthropic",
    "leadline_gateway",
    "leadline_prometheus",
    "leadline_sms",
    "leadline_storage",
    "tower_http",
];

/// Runs the `leadline serve` command.
pub async fn run_serve(config: LeadlineConfig) -> Result<(), LeadlineError> {
    init_tracing(&config.server.log_level);

    info!("starting leadline serve");

    let storage = Arc::new(SqliteStorage::new(
        config.storage.database_path.clone(),
        config.storage.wal_mode,
    ));
    storage.initialize().await?;

    let prometheus_render = if config.prometheus.enabled {
        match PrometheusAdapter::new() {
            Ok(adapter) => {
                let render: Arc<dyn Fn() -> String + Send + Sync> =
                    Arc::new(move || adapter.render());
                Some(render)
            }
            Err(e) => {
                warn!(error = %e, "prometheus recorder unavailable, /metrics disabled");
                None
            }
        }
    } else {
        None
    };

    let completion = Arc::new(AnthropicProvider::new(
        &config.completion,
        Duration::from_millis(config.reply.generation_timeout_ms),
    )?);
    if let HealthStatus::Degraded(reason) | HealthStatus::Unhealthy(reason) =
        completion.health_check().await?
    {
        warn!(%reason, "completion provider degraded");
    }

    let transport = Arc::new(RestSmsTransport::new(
        config.telephony.api_base_url.clone(),
        Duration::from_millis(config.telephony.request_timeout_ms),
    )?);

    let pipeline = WebhookPipeline::new(&config, storage.clone(), completion, transport);
    let state = GatewayState::new(&config, pipeline.clone(), storage.clone(), prometheus_render);

    info!(
        mode = ?config.reply.mode,
        history_window = config.reply.history_window,
        "webhook pipeline ready"
    );

    let cancel = shutdown::install_signal_handler();
    let server_config = ServerConfig {
        host: config.server.host.clone(),
        port: config.server.port,
    };
    let served = start_server(&server_config, state, cancel.clone()).await;

    // The server may also stop on a bind or accept error; release signal waiters.
    cancel.cancel();

    let drain_timeout = Duration::from_secs(config.reply.drain_timeout_secs);
    if !pipeline.drain(drain_timeout).await {
        warn!(
            pending = pipeline.pending_replies(),
            "deferred replies still running after drain timeout"
        );
    }

    if let Err(e) = storage.shutdown().await {
        warn!(error = %e, "storage shutdown failed");
    }

    served?;
    info!("leadline serve shutdown complete");
    Ok(())
}

fn filter_directives(log_level: &str) -> String {
    let mut directives: Vec<String> = LOG_TARGETS
        .iter()
        .map(|target| format!("{target}={log_level}"))
        .collect();
    directives.push("warn".to_string());
    directives.join(",")
}

/// Initializes the tracing subscriber. `RUST_LOG` overrides the configured level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directives(log_level)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
