// SPDX-FileCopyrightText: 2026 Leadline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Checks semantic constraints serde cannot express. All failures are
//! collected rather than returned on the first one.

use std::ops::RangeInclusive;

use crate::diagnostic::ConfigError;
use crate::model::LeadlineConfig;

/// Allowed range for `reply.generation_timeout_ms`.
const GENERATION_TIMEOUT_RANGE: RangeInclusive<u64> = 100..=30_000;

/// Validate a deserialized configuration for semantic correctness.
pub fn validate_config(config: &LeadlineConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let mut fail = |message: String| errors.push(ConfigError::Validation { message });

    let host = config.server.host.trim();
    if host.is_empty() {
        fail("server.host must not be empty".to_string());
    } else {
        let is_ip = host.parse::<std::net::IpAddr>().is_ok();
        let is_hostname = host
            .chars()
            .all(|c| c.is_alphanumeric() || c == '.' || c == '-');
        if !is_ip && !is_hostname {
            fail(format!("server.host `{host}` is not a valid IP address or hostname"));
        }
    }

    if config.server.port == 0 {
        fail("server.port must be non-zero".to_string());
    }

    if !matches!(
        config.server.log_level.as_str(),
        "trace" | "debug" | "info" | "warn" | "error"
    ) {
        fail(format!(
            "server.log_level `{}` must be one of trace, debug, info, warn, error",
            config.server.log_level
        ));
    }

    if let Some(url) = &config.server.public_base_url
        && !is_http_url(url)
    {
        fail(format!(
            "server.public_base_url `{url}` must start with http:// or https://"
        ));
    }

    if config
        .server
        .admin_token
        .as_deref()
        .is_some_and(|t| t.trim().is_empty())
    {
        fail("server.admin_token must not be empty when set".to_string());
    }

    if config.storage.database_path.trim().is_empty() {
        fail("storage.database_path must not be empty".to_string());
    }

    if !is_http_url(&config.telephony.api_base_url) {
        fail(format!(
            "telephony.api_base_url `{}` must start with http:// or https://",
            config.telephony.api_base_url
        ));
    }

    if config.telephony.signature_header.trim().is_empty() {
        fail("telephony.signature_header must not be empty".to_string());
    }

    if config.telephony.request_timeout_ms == 0 {
        fail("telephony.request_timeout_ms must be greater than 0".to_string());
    }

    if let Some(url) = &config.telephony.status_callback_url
        && !is_http_url(url)
    {
        fail(format!(
            "telephony.status_callback_url `{url}` must start with http:// or https://"
        ));
    }

    if config.completion.max_tokens == 0 {
        fail("completion.max_tokens must be greater than 0".to_string());
    }

    if !is_http_url(&config.completion.base_url) {
        fail(format!(
            "completion.base_url `{}` must start with http:// or https://",
            config.completion.base_url
        ));
    }

    if !GENERATION_TIMEOUT_RANGE.contains(&config.reply.generation_timeout_ms) {
        fail(format!(
            "reply.generation_timeout_ms must be between {} and {}, got {}",
            GENERATION_TIMEOUT_RANGE.start(),
            GENERATION_TIMEOUT_RANGE.end(),
            config.reply.generation_timeout_ms
        ));
    }

    if config.reply.history_window < 1 {
        fail("reply.history_window must be at least 1".to_string());
    }

    if config
        .reply
        .fallback_message
        .as_deref()
        .is_some_and(|m| m.trim().is_empty())
    {
        fail("reply.fallback_message must not be empty when set".to_string());
    }

    if config.agents.default_agent_id.trim().is_empty() {
        fail("agents.default_agent_id must not be empty".to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn is_http_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}
