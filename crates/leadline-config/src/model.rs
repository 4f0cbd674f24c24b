// SPDX-FileCopyrightText: 2026 Leadline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for Leadline.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Leadline configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LeadlineConfig {
    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Telephony provider settings.
    #[serde(default)]
    pub telephony: TelephonyConfig,

    /// Completion provider settings.
    #[serde(default)]
    pub completion: CompletionConfig,

    /// Reply generation policy.
    #[serde(default)]
    pub reply: ReplyConfig,

    /// Agent assignment for new conversations.
    #[serde(default)]
    pub agents: AgentsConfig,

    /// Prometheus metrics settings.
    #[serde(default)]
    pub prometheus: PrometheusConfig,
}

/// HTTP server configuration.
#[derive(Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Host address to bind.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Externally visible base URL (scheme + host) used to rebuild the exact
    /// URL the provider signed when running behind a proxy.
    #[serde(default)]
    pub public_base_url: Option<String>,

    /// Bearer token for the operator API. `None` rejects every operator request.
    #[serde(default)]
    pub admin_token: Option<String>,
}

impl std::fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("log_level", &self.log_level)
            .field("public_base_url", &self.public_base_url)
            .field("admin_token", &self.admin_token.as_ref().map(|_| "[redacted]"))
            .finish()
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            log_level: default_log_level(),
            public_base_url: None,
            admin_token: None,
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("leadline").join("leadline.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("leadline.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_wal_mode() -> bool {
    true
}

/// Telephony provider configuration.
///
/// Credentials are per tenant and live in storage, not here.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TelephonyConfig {
    /// Base URL of the provider's REST API.
    #[serde(default = "default_telephony_base_url")]
    pub api_base_url: String,

    /// Header carrying the webhook signature.
    #[serde(default = "default_signature_header")]
    pub signature_header: String,

    /// Timeout for a single send request in milliseconds.
    #[serde(default = "default_telephony_timeout_ms")]
    pub request_timeout_ms: u64,

    /// URL the provider should call back with delivery status updates.
    #[serde(default)]
    pub status_callback_url: Option<String>,
}

impl Default for TelephonyConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_telephony_base_url(),
            signature_header: default_signature_header(),
            request_timeout_ms: default_telephony_timeout_ms(),
            status_callback_url: None,
        }
    }
}

fn default_telephony_base_url() -> String {
    "https://api.twilio.com/2010-04-01".to_string()
}

fn default_signature_header() -> String {
    "X-Provider-Signature".to_string()
}

fn default_telephony_timeout_ms() -> u64 {
    5000
}

/// Completion provider configuration.
#[derive(Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CompletionConfig {
    /// Platform API key used when a tenant has none of its own.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Default model for reply generation.
    #[serde(default = "default_model")]
    pub model: String,

    /// Maximum tokens to generate per reply.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// API version header value.
    #[serde(default = "default_api_version")]
    pub api_version: String,

    /// Messages endpoint URL.
    #[serde(default = "default_completion_base_url")]
    pub base_url: String,
}

impl std::fmt::Debug for CompletionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletionConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "[redacted]"))
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .field("api_version", &self.api_version)
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_model(),
            max_tokens: default_max_tokens(),
            api_version: default_api_version(),
            base_url: default_completion_base_url(),
        }
    }
}

fn default_model() -> String {
    "claude-sonnet-4-20250514".to_string()
}

fn default_max_tokens() -> u32 {
    300
}

fn default_api_version() -> String {
    "2023-06-01".to_string()
}

fn default_completion_base_url() -> String {
    "https://api.anthropic.com/v1/messages".to_string()
}

/// When reply generation and dispatch run relative to the webhook response.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplyMode {
    /// Generate and dispatch before acknowledging the webhook.
    #[default]
    Inline,
    /// Acknowledge once the inbound message is stored; reply in a background task.
    Deferred,
}

/// Reply generation policy.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ReplyConfig {
    /// Inline or deferred reply dispatch.
    #[serde(default)]
    pub mode: ReplyMode,

    /// Upper bound on a single completion call in milliseconds.
    #[serde(default = "default_generation_timeout_ms")]
    pub generation_timeout_ms: u64,

    /// Number of most recent messages sent as history.
    #[serde(default = "default_history_window")]
    pub history_window: usize,

    /// Static reply sent when generation fails. `None` records the inbound only.
    #[serde(default)]
    pub fallback_message: Option<String>,

    /// Copy returned to senders that match no lead. `None` returns an empty acknowledgement.
    #[serde(default = "default_unknown_lead_reply")]
    pub unknown_lead_reply: Option<String>,

    /// How long shutdown waits for deferred replies in flight, in seconds.
    #[serde(default = "default_drain_timeout_secs")]
    pub drain_timeout_secs: u64,
}

impl Default for ReplyConfig {
    fn default() -> Self {
        Self {
            mode: ReplyMode::default(),
            generation_timeout_ms: default_generation_timeout_ms(),
            history_window: default_history_window(),
            fallback_message: None,
            unknown_lead_reply: default_unknown_lead_reply(),
            drain_timeout_secs: default_drain_timeout_secs(),
        }
    }
}

fn default_generation_timeout_ms() -> u64 {
    4000
}

fn default_history_window() -> usize {
    20
}

fn default_unknown_lead_reply() -> Option<String> {
    Some("Sorry, this number is not recognized.".to_string())
}

fn default_drain_timeout_secs() -> u64 {
    10
}

/// Agent assignment configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AgentsConfig {
    /// Agent assigned to new conversations when the tenant has no default.
    #[serde(default = "default_agent_id")]
    pub default_agent_id: String,
}

impl Default for AgentsConfig {
    fn default() -> Self {
        Self {
            default_agent_id: default_agent_id(),
        }
    }
}

fn default_agent_id() -> String {
    "default".to_string()
}

/// Prometheus metrics configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PrometheusConfig {
    /// Install the recorder and expose `/metrics`.
    #[serde(default)]
    pub enabled: bool,
}
