// SPDX-FileCopyrightText: 2026 Leadline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Anthropic completion adapter for Leadline.
//!
//! Implements [`CompletionAdapter`] over the Anthropic Messages API. Each
//! request may carry the tenant's own API key; the platform key from config
//! (or `ANTHROPIC_API_KEY`) is used when it does not.

pub mod client;
pub mod types;

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use leadline_config::model::CompletionConfig;
use leadline_core::{
    AdapterType, CompletionAdapter, CompletionRequest, CompletionResponse, HealthStatus,
    LeadlineError, PluginAdapter, TokenUsage,
};

use crate::client::AnthropicClient;
use crate::types::{ApiMessage, MessageRequest};

/// Anthropic provider implementing [`CompletionAdapter`].
pub struct AnthropicProvider {
    client: AnthropicClient,
    platform_key: Option<String>,
    default_model: String,
    max_tokens: u32,
}

impl AnthropicProvider {
    /// Build the provider from the `[completion]` config section.
    ///
    /// A missing platform key is not an error here: tenants may bring their own.
    pub fn new(config: &CompletionConfig, timeout: Duration) -> Result<Self, LeadlineError> {
        let client = AnthropicClient::new(&config.api_version, &config.base_url, timeout)?;
        let platform_key = resolve_platform_key(&config.api_key);
        if platform_key.is_none() {
            debug!("no platform completion key configured; tenant keys required");
        }
        Ok(Self::with_client(
            client,
            platform_key,
            config.model.clone(),
            config.max_tokens,
        ))
    }

    pub fn with_client(
        client: AnthropicClient,
        platform_key: Option<String>,
        default_model: String,
        max_tokens: u32,
    ) -> Self {
        Self {
            client,
            platform_key,
            default_model,
            max_tokens,
        }
    }

    fn to_message_request(&self, request: &CompletionRequest) -> MessageRequest {
        MessageRequest {
            model: request
                .model
                .clone()
                .unwrap_or_else(|| self.default_model.clone()),
            messages: request
                .messages
                .iter()
                .map(|turn| ApiMessage {
                    role: turn.role.to_string(),
                    content: turn.content.clone(),
                })
                .collect(),
            system: Some(request.system_prompt.clone()).filter(|s| !s.trim().is_empty()),
            max_tokens: request.max_tokens.unwrap_or(self.max_tokens),
        }
    }
}

#[async_trait]
impl PluginAdapter for AnthropicProvider {
    fn name(&self) -> &str {
        "anthropic"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Completion
    }

    async fn health_check(&self) -> Result<HealthStatus, LeadlineError> {
        if self.platform_key.is_some() {
            Ok(HealthStatus::Healthy)
        } else {
            Ok(HealthStatus::Degraded(
                "no platform API key; only tenants with their own key can generate".into(),
            ))
        }
    }

    async fn shutdown(&self) -> Result<(), LeadlineError> {
        Ok(())
    }
}

#[async_trait]
impl CompletionAdapter for AnthropicProvider {
    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> Result<CompletionResponse, LeadlineError> {
        let api_key = request
            .api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .or(self.platform_key.as_deref())
            .ok_or_else(|| LeadlineError::Provider {
                message: "no completion API key available for this tenant".into(),
                source: None,
            })?;

        let api_request = self.to_message_request(&request);
        let response = self.client.complete_message(api_key, &api_request).await?;
        let content = response.text();
        if content.trim().is_empty() {
            return Err(LeadlineError::Provider {
                message: "completion returned no text".into(),
                source: None,
            });
        }

        Ok(CompletionResponse {
            id: response.id,
            content,
            model: response.model,
            stop_reason: response.stop_reason,
            usage: TokenUsage {
                input_tokens: response.usage.input_tokens,
                output_tokens: response.usage.output_tokens,
            },
        })
    }
}

/// Platform key from config, falling back to the environment.
fn resolve_platform_key(config_key: &Option<String>) -> Option<String> {
    if let Some(key) = config_key
        && !key.is_empty()
    {
        return Some(key.clone());
    }
    std::env::var("ANTHROPIC_API_KEY")
        .ok()
        .filter(|k| !k.is_empty())
}
