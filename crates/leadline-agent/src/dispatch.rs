// SPDX-FileCopyrightText: 2026 Leadline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Outbound dispatch with outbound-first recording.
//!
//! The OUTBOUND message is stored as `new` before the provider is called and
//! then moved to `sent` or `failed`, so every attempt leaves a record even if
//! the process dies mid-send. The transport never retries.

use std::sync::Arc;
use std::time::Instant;

use leadline_core::{
    Lead, LeadStatus, LeadlineError, NewMessage, OutboundSms, SmsTransport, StatusChange,
    StorageAdapter, Tenant,
};
use tracing::{info, warn};

/// What happened to one outbound reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The provider accepted the message.
    Sent {
        message_id: String,
        provider_message_id: String,
    },
    /// The provider refused or could not be reached. The stored message is `failed`.
    Failed { message_id: String, error: String },
}

/// Sends replies through an [`SmsTransport`] and records them in storage.
pub struct Dispatcher {
    storage: Arc<dyn StorageAdapter>,
    transport: Arc<dyn SmsTransport>,
    status_callback: Option<String>,
}

impl Dispatcher {
    pub fn new(
        storage: Arc<dyn StorageAdapter>,
        transport: Arc<dyn SmsTransport>,
        status_callback: Option<String>,
    ) -> Self {
        Self {
            storage,
            transport,
            status_callback,
        }
    }

    /// Records and sends `body` to `lead` from `tenant`'s number.
    ///
    /// Errors only when the outbound record itself cannot be stored; send
    /// failures are reported as [`DispatchOutcome::Failed`].
    pub async fn dispatch(
        &self,
        tenant: &Tenant,
        lead: &Lead,
        conversation_id: &str,
        body: &str,
    ) -> Result<DispatchOutcome, LeadlineError> {
        let appended = self
            .storage
            .append_message(conversation_id, NewMessage::outbound(body))
            .await?;
        let message_id = appended.message().id.clone();

        let sms = OutboundSms {
            to: lead.phone_number.clone(),
            body: body.to_string(),
            status_callback: self.status_callback.clone(),
        };

        let started = Instant::now();
        let result = self.transport.send(&tenant.telephony, sms).await;
        let latency = started.elapsed();

        match result {
            Ok(receipt) => {
                leadline_prometheus::record_dispatch("sent", latency);
                self.apply(
                    &message_id,
                    StatusChange::sent(receipt.provider_message_id.clone()),
                )
                .await;
                info!(
                    tenant_id = tenant.id.as_str(),
                    conversation_id,
                    provider_message_id = receipt.provider_message_id.as_str(),
                    provider_status = receipt.status.as_str(),
                    "reply dispatched"
                );
                self.mark_contacted(lead).await;
                Ok(DispatchOutcome::Sent {
                    message_id,
                    provider_message_id: receipt.provider_message_id,
                })
            }
            Err(e) => {
                leadline_prometheus::record_dispatch("failed", latency);
                let error = e.to_string();
                warn!(
                    tenant_id = tenant.id.as_str(),
                    conversation_id,
                    error = error.as_str(),
                    "reply dispatch failed"
                );
                self.apply(&message_id, StatusChange::failed(error.clone()))
                    .await;
                Ok(DispatchOutcome::Failed { message_id, error })
            }
        }
    }

    async fn apply(&self, message_id: &str, change: StatusChange) {
        match self.storage.update_message_status(message_id, change).await {
            Ok(true) => {}
            Ok(false) => warn!(message_id, "outbound status change was not applied"),
            Err(e) => warn!(message_id, error = %e, "failed to record outbound status"),
        }
    }

    async fn mark_contacted(&self, lead: &Lead) {
        if lead.status != LeadStatus::New {
            return;
        }
        if let Err(e) = self
            .storage
            .update_lead_status(&lead.id, LeadStatus::Contacted)
            .await
        {
            warn!(lead_id = lead.id.as_str(), error = %e, "failed to mark lead contacted");
        }
    }
}
