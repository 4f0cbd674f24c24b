// SPDX-FileCopyrightText: 2026 Leadline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! REST client for the provider's send API.
//!
//! Credentials are per tenant and passed on every call, so one client (and
//! its connection pool) serves all tenants. Sends are never retried here;
//! whether to retry is the caller's decision.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use leadline_core::{
    AdapterType, HealthStatus, LeadlineError, OutboundSms, PluginAdapter, SendReceipt,
    SmsTransport, TelephonyCredentials,
};

/// Successful send response.
#[derive(Debug, Deserialize)]
struct MessageResource {
    sid: String,
    #[serde(default)]
    status: Option<String>,
}

/// Error body returned on non-2xx responses.
#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    code: Option<i64>,
    #[serde(default)]
    message: Option<String>,
}

/// SMS transport over the provider's `Accounts/{sid}/Messages.json` endpoint.
#[derive(Debug, Clone)]
pub struct RestSmsTransport {
    client: reqwest::Client,
    base_url: String,
}

impl RestSmsTransport {
    /// Build a transport against `base_url` (e.g. `https://api.twilio.com/2010-04-01`).
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, LeadlineError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LeadlineError::Transport {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn messages_url(&self, account_sid: &str) -> String {
        format!("{}/Accounts/{account_sid}/Messages.json", self.base_url)
    }
}

#[async_trait]
impl PluginAdapter for RestSmsTransport {
    fn name(&self) -> &str {
        "rest-sms"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Transport
    }

    async fn health_check(&self) -> Result<HealthStatus, LeadlineError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), LeadlineError> {
        Ok(())
    }
}

#[async_trait]
impl SmsTransport for RestSmsTransport {
    async fn send(
        &self,
        credentials: &TelephonyCredentials,
        message: OutboundSms,
    ) -> Result<SendReceipt, LeadlineError> {
        let mut form = vec![
            ("To", message.to.as_str()),
            ("From", credentials.sending_number.as_str()),
            ("Body", message.body.as_str()),
        ];
        if let Some(callback) = message.status_callback.as_deref() {
            form.push(("StatusCallback", callback));
        }

        let response = self
            .client
            .post(self.messages_url(&credentials.account_sid))
            .basic_auth(&credentials.account_sid, Some(&credentials.auth_token))
            .form(&form)
            .send()
            .await
            .map_err(|e| LeadlineError::Transport {
                message: if e.is_timeout() {
                    "send request timed out".to_string()
                } else {
                    format!("send request failed: {e}")
                },
                source: Some(Box::new(e)),
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| LeadlineError::Transport {
            message: format!("failed to read send response: {e}"),
            source: Some(Box::new(e)),
        })?;
        debug!(status = %status, "send response received");

        if !status.is_success() {
            let message = match serde_json::from_str::<ApiError>(&body) {
                Ok(ApiError {
                    code: Some(code),
                    message: Some(msg),
                }) => format!("provider rejected send ({status}, code {code}): {msg}"),
                Ok(ApiError {
                    message: Some(msg), ..
                }) => format!("provider rejected send ({status}): {msg}"),
                _ => format!("provider rejected send ({status})"),
            };
            warn!(status = %status, "send rejected by provider");
            return Err(LeadlineError::Transport {
                message,
                source: None,
            });
        }

        let resource: MessageResource =
            serde_json::from_str(&body).map_err(|e| LeadlineError::Transport {
                message: format!("malformed send response: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(SendReceipt {
            provider_message_id: resource.sid,
            status: resource.status.unwrap_or_else(|| "queued".to_string()),
        })
    }
}
