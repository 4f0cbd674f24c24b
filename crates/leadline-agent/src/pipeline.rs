// SPDX-FileCopyrightText: 2026 Leadline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The inbound webhook state machine.
//!
//! A delivery moves through
//! `Received → TenantResolved → Authenticated → LeadResolved → MessagePersisted`
//! and then either `ReplyGenerated → Dispatched → Acknowledged` inline, or
//! `Queued → Acknowledged` with the reply produced by a tracked background
//! task. Every state has a short-circuit exit, expressed as a
//! [`PipelineOutcome`] that the HTTP layer maps to exactly one response.

use std::sync::Arc;
use std::time::Duration;

use leadline_config::model::{LeadlineConfig, ReplyMode};
use leadline_core::{
    CompletionAdapter, Lead, LeadlineError, NewMessage, SmsTransport, StorageAdapter, Tenant,
};
use leadline_sms::InboundSms;
use tokio_util::task::TaskTracker;
use tracing::{Instrument, debug, error, info, info_span, warn};

use crate::assignment::assign_agent;
use crate::dispatch::{DispatchOutcome, Dispatcher};
use crate::reply::{ReplyGenerator, ReplyOutcome};
use crate::resolver::{resolve_lead, resolve_tenant};

/// States of one inbound delivery, logged at debug level as it advances.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Received,
    TenantResolved,
    Authenticated,
    LeadResolved,
    MessagePersisted,
    Queued,
    ReplyGenerated,
    Dispatched,
    Acknowledged,
}

/// A webhook as seen by the pipeline, independent of the HTTP framework.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookRequest {
    /// The full URL the provider signed, including any query string.
    pub url: String,
    /// Value of the signature header, if present.
    pub signature: Option<String>,
    /// Decoded form fields in arrival order.
    pub params: Vec<(String, String)>,
}

/// How the reply half of an inline delivery ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyResult {
    /// A reply was accepted by the provider. `fallback` marks the static reply.
    Sent {
        message_id: String,
        provider_message_id: String,
        fallback: bool,
    },
    /// A reply was attempted and the send failed, or could not be recorded.
    DispatchFailed {
        message_id: Option<String>,
        error: String,
    },
    /// Generation failed and no fallback is configured.
    InboundOnly { reason: String },
}

/// Terminal outcome of one inbound webhook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineOutcome {
    /// Inbound stored and the reply attempted inline.
    Handled {
        conversation_id: String,
        reply: ReplyResult,
    },
    /// Inbound stored; the reply runs in the background.
    Queued { conversation_id: String },
    /// The provider message id was already stored; nothing else was done.
    Duplicate { conversation_id: String },
    /// No tenant owns the receiving number.
    TenantNotFound,
    /// The sender is not a lead of the tenant. Carries the copy to send back.
    LeadNotFound { reply: Option<String> },
    /// Missing or invalid signature.
    AuthFailed,
    /// A required field was missing.
    BadRequest(String),
    /// The inbound message could not be stored.
    PersistFailed(String),
    /// Resolution failed for a reason other than not-found.
    Internal(String),
}

impl PipelineOutcome {
    /// Metric label for this outcome.
    pub fn label(&self) -> &'static str {
        match self {
            PipelineOutcome::Handled { reply, .. } => match reply {
                ReplyResult::Sent { fallback: false, .. } => "replied",
                ReplyResult::Sent { fallback: true, .. } => "fallback",
                ReplyResult::DispatchFailed { .. } => "dispatch_failed",
                ReplyResult::InboundOnly { .. } => "inbound_only",
            },
            PipelineOutcome::Queued { .. } => "queued",
            PipelineOutcome::Duplicate { .. } => "duplicate",
            PipelineOutcome::TenantNotFound => "tenant_not_found",
            PipelineOutcome::LeadNotFound { .. } => "lead_not_found",
            PipelineOutcome::AuthFailed => "auth_failed",
            PipelineOutcome::BadRequest(_) => "bad_request",
            PipelineOutcome::PersistFailed(_) => "persist_failed",
            PipelineOutcome::Internal(_) => "internal",
        }
    }
}

/// Reply policy taken from configuration.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub mode: ReplyMode,
    pub fallback_message: Option<String>,
    pub unknown_lead_reply: Option<String>,
    pub default_agent_id: String,
}

impl PipelineSettings {
    pub fn from_config(config: &LeadlineConfig) -> Self {
        Self {
            mode: config.reply.mode,
            fallback_message: config.reply.fallback_message.clone(),
            unknown_lead_reply: config.reply.unknown_lead_reply.clone(),
            default_agent_id: config.agents.default_agent_id.clone(),
        }
    }
}

/// Runs inbound webhooks and status callbacks against storage, the
/// completion provider and the SMS transport.
///
/// Cheap to clone; clones share the background task tracker.
#[derive(Clone)]
pub struct WebhookPipeline {
    pub(crate) storage: Arc<dyn StorageAdapter>,
    generator: Arc<ReplyGenerator>,
    dispatcher: Arc<Dispatcher>,
    settings: Arc<PipelineSettings>,
    tracker: TaskTracker,
}

impl WebhookPipeline {
    /// Builds a pipeline from configuration and the three adapters.
    pub fn new(
        config: &LeadlineConfig,
        storage: Arc<dyn StorageAdapter>,
        completion: Arc<dyn CompletionAdapter>,
        transport: Arc<dyn SmsTransport>,
    ) -> Self {
        let generator = ReplyGenerator::new(
            completion,
            config.reply.history_window,
            Duration::from_millis(config.reply.generation_timeout_ms),
        );
        let dispatcher = Dispatcher::new(
            storage.clone(),
            transport,
            config.telephony.status_callback_url.clone(),
        );
        Self::from_parts(
            storage,
            generator,
            dispatcher,
            PipelineSettings::from_config(config),
        )
    }

    pub fn from_parts(
        storage: Arc<dyn StorageAdapter>,
        generator: ReplyGenerator,
        dispatcher: Dispatcher,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            storage,
            generator: Arc::new(generator),
            dispatcher: Arc::new(dispatcher),
            settings: Arc::new(settings),
            tracker: TaskTracker::new(),
        }
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Handles one inbound SMS webhook.
    pub async fn handle_inbound(&self, request: WebhookRequest) -> PipelineOutcome {
        let outcome = self.run_inbound(request).await;
        leadline_prometheus::record_webhook(outcome.label());
        outcome
    }

    async fn run_inbound(&self, request: WebhookRequest) -> PipelineOutcome {
        let mut state = PipelineState::Received;

        // Without a signature there is nothing to verify against; reject
        // before touching storage.
        let Some(signature) = request.signature.as_deref() else {
            debug!("inbound webhook without signature rejected");
            return PipelineOutcome::AuthFailed;
        };
        let Some(to) = InboundSms::receiving_number(&request.params) else {
            return PipelineOutcome::BadRequest("missing required field `To`".to_string());
        };

        let tenant = match resolve_tenant(self.storage.as_ref(), to).await {
            Ok(tenant) => tenant,
            Err(LeadlineError::NotFound { .. }) => {
                info!(receiving_number = to, "inbound webhook for unknown number");
                return PipelineOutcome::TenantNotFound;
            }
            Err(e) => {
                error!(receiving_number = to, error = %e, "tenant resolution failed");
                return PipelineOutcome::Internal(e.to_string());
            }
        };
        advance(&mut state, PipelineState::TenantResolved);

        if !leadline_sms::verify(
            &tenant.telephony.auth_token,
            signature,
            &request.url,
            &request.params,
        ) {
            debug!(tenant_id = tenant.id.as_str(), "inbound webhook signature mismatch");
            return PipelineOutcome::AuthFailed;
        }
        advance(&mut state, PipelineState::Authenticated);

        let inbound = match InboundSms::from_params(&request.params) {
            Ok(inbound) => inbound,
            Err(e) => return PipelineOutcome::BadRequest(e.to_string()),
        };

        let lead = match resolve_lead(self.storage.as_ref(), &tenant.id, &inbound.from).await {
            Ok(Some(lead)) => lead,
            Ok(None) => {
                info!(
                    tenant_id = tenant.id.as_str(),
                    message_sid = inbound.message_sid.as_str(),
                    "inbound message from unknown sender"
                );
                return PipelineOutcome::LeadNotFound {
                    reply: self.settings.unknown_lead_reply.clone(),
                };
            }
            Err(e) => {
                error!(tenant_id = tenant.id.as_str(), error = %e, "lead resolution failed");
                return PipelineOutcome::Internal(e.to_string());
            }
        };
        advance(&mut state, PipelineState::LeadResolved);

        let agent_id = assign_agent(&tenant, &self.settings.default_agent_id);
        let record = match self
            .storage
            .record_inbound(
                &tenant.id,
                &lead.id,
                agent_id,
                NewMessage::inbound(inbound.body, inbound.message_sid.clone(), inbound.media),
            )
            .await
        {
            Ok(record) => record,
            Err(e) => {
                error!(
                    tenant_id = tenant.id.as_str(),
                    message_sid = inbound.message_sid.as_str(),
                    error = %e,
                    "failed to persist inbound message"
                );
                return PipelineOutcome::PersistFailed(e.to_string());
            }
        };
        let conversation_id = record.conversation.id.clone();

        if record.outcome.is_duplicate() {
            info!(
                tenant_id = tenant.id.as_str(),
                conversation_id = conversation_id.as_str(),
                message_sid = inbound.message_sid.as_str(),
                "duplicate delivery ignored"
            );
            return PipelineOutcome::Duplicate { conversation_id };
        }
        if record.conversation_created {
            info!(
                tenant_id = tenant.id.as_str(),
                conversation_id = conversation_id.as_str(),
                agent_id,
                "conversation started"
            );
        }
        advance(&mut state, PipelineState::MessagePersisted);

        match self.settings.mode {
            ReplyMode::Deferred => {
                advance(&mut state, PipelineState::Queued);
                let pipeline = self.clone();
                let span = info_span!(
                    "deferred_reply",
                    tenant_id = tenant.id.as_str(),
                    conversation_id = conversation_id.as_str()
                );
                let conv = conversation_id.clone();
                self.tracker.spawn(
                    async move {
                        let result = pipeline.reply(&tenant, &lead, &conv).await;
                        debug!(result = ?result, "deferred reply finished");
                    }
                    .instrument(span),
                );
                advance(&mut state, PipelineState::Acknowledged);
                PipelineOutcome::Queued { conversation_id }
            }
            ReplyMode::Inline => {
                let reply = self.reply(&tenant, &lead, &conversation_id).await;
                advance(&mut state, PipelineState::Acknowledged);
                PipelineOutcome::Handled {
                    conversation_id,
                    reply,
                }
            }
        }
    }

    /// Generates and dispatches a reply, applying the fallback policy on
    /// generation failure.
    async fn reply(&self, tenant: &Tenant, lead: &Lead, conversation_id: &str) -> ReplyResult {
        let generated = match self
            .storage
            .recent_messages(conversation_id, self.generator.history_window())
            .await
        {
            Ok(history) => self.generator.generate(&tenant.ai, &history).await,
            Err(e) => ReplyOutcome::Failed {
                reason: format!("failed to load history: {e}"),
            },
        };

        let (body, fallback) = match generated {
            ReplyOutcome::Generated(text) => {
                debug!(state = ?PipelineState::ReplyGenerated, "pipeline state");
                (text, false)
            }
            ReplyOutcome::Failed { reason } => match &self.settings.fallback_message {
                Some(fallback) => {
                    warn!(
                        conversation_id,
                        reason = reason.as_str(),
                        "reply generation failed, sending fallback message"
                    );
                    (fallback.clone(), true)
                }
                None => {
                    warn!(
                        conversation_id,
                        reason = reason.as_str(),
                        "reply generation failed, inbound recorded without reply"
                    );
                    return ReplyResult::InboundOnly { reason };
                }
            },
        };

        match self
            .dispatcher
            .dispatch(tenant, lead, conversation_id, &body)
            .await
        {
            Ok(DispatchOutcome::Sent {
                message_id,
                provider_message_id,
            }) => {
                debug!(state = ?PipelineState::Dispatched, "pipeline state");
                ReplyResult::Sent {
                    message_id,
                    provider_message_id,
                    fallback,
                }
            }
            Ok(DispatchOutcome::Failed { message_id, error }) => ReplyResult::DispatchFailed {
                message_id: Some(message_id),
                error,
            },
            Err(e) => {
                error!(conversation_id, error = %e, "failed to record outbound reply");
                ReplyResult::DispatchFailed {
                    message_id: None,
                    error: e.to_string(),
                }
            }
        }
    }

    /// Number of deferred replies still running.
    pub fn pending_replies(&self) -> usize {
        self.tracker.len()
    }

    /// Waits up to `timeout` for deferred replies to finish.
    ///
    /// Returns `true` when all of them completed in time.
    pub async fn drain(&self, timeout: Duration) -> bool {
        self.tracker.close();
        let pending = self.tracker.len();
        if pending == 0 {
            info!("no deferred replies to drain");
            return true;
        }

        info!(count = pending, "waiting for deferred replies to complete");
        match tokio::time::timeout(timeout, self.tracker.wait()).await {
            Ok(()) => {
                info!("deferred replies drained");
                true
            }
            Err(_) => {
                warn!(
                    remaining = self.tracker.len(),
                    "drain timeout reached, abandoning deferred replies"
                );
                false
            }
        }
    }
}

fn advance(state: &mut PipelineState, next: PipelineState) {
    debug!(from = ?*state, to = ?next, "pipeline state");
    *state = next;
}
