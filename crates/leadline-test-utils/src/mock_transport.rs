// SPDX-FileCopyrightText: 2026 Leadline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock SMS transport that captures sends instead of calling a provider.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use leadline_core::{
    AdapterType, HealthStatus, LeadlineError, OutboundSms, PluginAdapter, SendReceipt,
    SmsTransport, TelephonyCredentials,
};

/// One captured send attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendAttempt {
    pub account_sid: String,
    pub from: String,
    pub to: String,
    pub body: String,
    pub status_callback: Option<String>,
    /// Provider id handed back, `None` when the attempt was made to fail.
    pub provider_message_id: Option<String>,
}

/// An `SmsTransport` that records every attempt.
///
/// Queued failures are consumed one per send; `failing` makes every send fail.
#[derive(Clone, Default)]
pub struct MockTransport {
    attempts: Arc<Mutex<Vec<SendAttempt>>>,
    failures: Arc<Mutex<VecDeque<String>>>,
    always_fail: Option<String>,
    counter: Arc<AtomicUsize>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// A transport whose every send fails with `message`.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            always_fail: Some(message.into()),
            ..Self::default()
        }
    }

    /// Fail the next send with `message`.
    pub async fn push_failure(&self, message: impl Into<String>) {
        self.failures.lock().await.push_back(message.into());
    }

    pub async fn attempts(&self) -> Vec<SendAttempt> {
        self.attempts.lock().await.clone()
    }

    /// Attempts the provider accepted.
    pub async fn sent(&self) -> Vec<SendAttempt> {
        self.attempts
            .lock()
            .await
            .iter()
            .filter(|a| a.provider_message_id.is_some())
            .cloned()
            .collect()
    }
}

#[async_trait]
impl PluginAdapter for MockTransport {
    fn name(&self) -> &str {
        "mock-transport"
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
impl SmsTransport for MockTransport {
    async fn send(
        &self,
        credentials: &TelephonyCredentials,
        sms: OutboundSms,
    ) -> Result<SendReceipt, LeadlineError> {
        let failure = match &self.always_fail {
            Some(message) => Some(message.clone()),
            None => self.failures.lock().await.pop_front(),
        };
        let provider_message_id = match failure {
            Some(_) => None,
            None => {
                let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
                Some(format!("SMmock{n:04}"))
            }
        };

        self.attempts.lock().await.push(SendAttempt {
            account_sid: credentials.account_sid.clone(),
            from: credentials.sending_number.clone(),
            to: sms.to,
            body: sms.body,
            status_callback: sms.status_callback,
            provider_message_id: provider_message_id.clone(),
        });

        match (provider_message_id, failure) {
            (Some(id), _) => Ok(SendReceipt {
                provider_message_id: id,
                status: "queued".to_string(),
            }),
            (None, message) => Err(LeadlineError::Transport {
                message: message.unwrap_or_default(),
                source: None,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn creds() -> TelephonyCredentials {
        TelephonyCredentials {
            account_sid: "AC1".into(),
            auth_token: "tok".into(),
            sending_number: "+15550000000".into(),
        }
    }

    fn sms(body: &str) -> OutboundSms {
        OutboundSms {
            to: "+15551234567".into(),
            body: body.into(),
            status_callback: None,
        }
    }

    #[tokio::test]
    async fn captures_sends_and_injected_failures() {
        let transport = MockTransport::new();
        transport.push_failure("carrier rejected").await;

        let err = transport.send(&creds(), sms("one")).await.unwrap_err();
        assert!(err.to_string().contains("carrier rejected"));
        let receipt = transport.send(&creds(), sms("two")).await.unwrap();
        assert_eq!(receipt.provider_message_id, "SMmock0001");

        assert_eq!(transport.attempts().await.len(), 2);
        let sent = transport.sent().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].body, "two");
        assert_eq!(sent[0].from, "+15550000000");
    }

    #[tokio::test]
    async fn failing_transport_never_accepts() {
        let transport = MockTransport::failing("down");
        assert!(transport.send(&creds(), sms("a")).await.is_err());
        assert!(transport.send(&creds(), sms("b")).await.is_err());
        assert!(transport.sent().await.is_empty());
    }
}
