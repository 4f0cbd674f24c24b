// SPDX-FileCopyrightText: 2026 Leadline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end pipeline testing.
//!
//! `TestHarness` assembles a complete pipeline over a temp SQLite database
//! with mock completion and transport adapters, seeded with one tenant and
//! one lead. `deliver()` drives a signed inbound webhook through it.

use std::sync::Arc;
use std::time::Duration;

use leadline_agent::{PipelineOutcome, WebhookPipeline, WebhookRequest};
use leadline_config::model::{LeadlineConfig, ReplyMode};
use leadline_core::{Conversation, Lead, LeadlineError, Message, StorageAdapter, Tenant};
use leadline_storage::SqliteStorage;

use crate::fixtures;
use crate::mock_completion::MockCompletion;
use crate::mock_transport::MockTransport;

/// URL the harness signs inbound webhooks against.
pub const WEBHOOK_URL: &str = "https://leadline.test/webhooks/sms";

/// URL the harness signs status callbacks against.
pub const STATUS_URL: &str = "https://leadline.test/webhooks/sms/status";

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    replies: Vec<String>,
    completion_delay: Option<Duration>,
    failing_transport: Option<String>,
    config: LeadlineConfig,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        let mut config = LeadlineConfig::default();
        config.telephony.status_callback_url = Some(STATUS_URL.to_string());
        Self {
            replies: Vec::new(),
            completion_delay: None,
            failing_transport: None,
            config,
        }
    }

    /// Queue completion replies, consumed in order.
    pub fn with_replies<S: Into<String>>(mut self, replies: impl IntoIterator<Item = S>) -> Self {
        self.replies = replies.into_iter().map(Into::into).collect();
        self
    }

    /// Delay every completion call.
    pub fn with_completion_delay(mut self, delay: Duration) -> Self {
        self.completion_delay = Some(delay);
        self
    }

    /// Make every send fail with `message`.
    pub fn with_failing_transport(mut self, message: impl Into<String>) -> Self {
        self.failing_transport = Some(message.into());
        self
    }

    pub fn with_reply_mode(mut self, mode: ReplyMode) -> Self {
        self.config.reply.mode = mode;
        self
    }

    pub fn with_fallback_message(mut self, text: impl Into<String>) -> Self {
        self.config.reply.fallback_message = Some(text.into());
        self
    }

    pub fn with_generation_timeout(mut self, timeout: Duration) -> Self {
        self.config.reply.generation_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn with_history_window(mut self, window: usize) -> Self {
        self.config.reply.history_window = window;
        self
    }

    /// Build the harness: temp database, seeded tenant `T` and lead `L`.
    pub async fn build(self) -> Result<TestHarness, LeadlineError> {
        let temp_dir = tempfile::TempDir::new().map_err(LeadlineError::storage)?;
        let db_path = temp_dir.path().join("test.db");

        let storage = SqliteStorage::new(db_path.to_string_lossy(), true);
        storage.initialize().await?;
        let storage = Arc::new(storage);

        let tenant = fixtures::tenant("T", "+15550000000", "s3cr3t");
        let lead = fixtures::lead("L", "T", "+15551234567");
        storage.insert_tenant(&tenant).await?;
        storage.insert_lead(&lead).await?;

        let mut completion = MockCompletion::with_replies(self.replies);
        if let Some(delay) = self.completion_delay {
            completion = completion.with_delay(delay);
        }
        let transport = match self.failing_transport {
            Some(message) => MockTransport::failing(message),
            None => MockTransport::new(),
        };

        let mut config = self.config;
        config.storage.database_path = db_path.to_string_lossy().into_owned();

        let pipeline = WebhookPipeline::new(
            &config,
            storage.clone(),
            Arc::new(completion.clone()),
            Arc::new(transport.clone()),
        );

        Ok(TestHarness {
            storage,
            completion,
            transport,
            pipeline,
            tenant,
            lead,
            config,
            _temp_dir: temp_dir,
        })
    }
}

/// A complete pipeline for end-to-end tests.
pub struct TestHarness {
    pub storage: Arc<SqliteStorage>,
    pub completion: MockCompletion,
    pub transport: MockTransport,
    pub pipeline: WebhookPipeline,
    pub tenant: Tenant,
    pub lead: Lead,
    pub config: LeadlineConfig,
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// Form fields of an inbound SMS from the seeded lead to the seeded tenant.
    pub fn inbound_params(&self, message_sid: &str, body: &str) -> Vec<(String, String)> {
        vec![
            ("MessageSid".to_string(), message_sid.to_string()),
            ("AccountSid".to_string(), self.tenant.telephony.account_sid.clone()),
            ("From".to_string(), self.lead.phone_number.clone()),
            ("To".to_string(), self.tenant.telephony.sending_number.clone()),
            ("Body".to_string(), body.to_string()),
            ("NumMedia".to_string(), "0".to_string()),
        ]
    }

    /// A webhook request signed with the seeded tenant's secret.
    pub fn signed(&self, params: Vec<(String, String)>) -> WebhookRequest {
        sign(&self.tenant.telephony.auth_token, WEBHOOK_URL, params)
    }

    /// Deliver a signed inbound SMS through the pipeline.
    pub async fn deliver(&self, message_sid: &str, body: &str) -> PipelineOutcome {
        let request = self.signed(self.inbound_params(message_sid, body));
        self.pipeline.handle_inbound(request).await
    }

    /// The active conversation between the seeded tenant and lead.
    pub async fn conversation(&self) -> Result<Option<Conversation>, LeadlineError> {
        self.storage.find_active(&self.tenant.id, &self.lead.id).await
    }

    /// All messages of the active conversation, in order.
    pub async fn messages(&self) -> Result<Vec<Message>, LeadlineError> {
        match self.conversation().await? {
            Some(conversation) => self.storage.list_messages(&conversation.id).await,
            None => Ok(Vec::new()),
        }
    }
}

/// Build a request to `url` carrying a valid signature for `auth_token`.
pub fn sign(auth_token: &str, url: &str, params: Vec<(String, String)>) -> WebhookRequest {
    WebhookRequest {
        url: url.to_string(),
        signature: Some(leadline_sms::compute_signature(auth_token, url, &params)),
        params,
    }
}
