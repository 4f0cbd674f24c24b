// SPDX-FileCopyrightText: 2026 Leadline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Delivery status callbacks for messages we sent.
//!
//! The provider reports delivery asynchronously, signed with the same tenant
//! secret as inbound webhooks. The tenant is found by `From`, which for a
//! callback is our own sending number. Only failure statuses change stored
//! state (`sent → failed`); everything else is acknowledged and ignored.

use leadline_core::{LeadlineError, StatusChange};
use leadline_sms::StatusCallback;
use tracing::{debug, error, info, warn};

use crate::pipeline::{WebhookPipeline, WebhookRequest};
use crate::resolver::resolve_tenant;

/// Terminal outcome of one status callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackOutcome {
    /// The message was marked failed.
    Applied { message_id: String },
    /// Acknowledged without a state change, with the reason.
    Ignored(&'static str),
    AuthFailed,
    BadRequest(String),
    Internal(String),
}

impl CallbackOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            CallbackOutcome::Applied { .. } => "applied",
            CallbackOutcome::Ignored(_) => "ignored",
            CallbackOutcome::AuthFailed => "auth_failed",
            CallbackOutcome::BadRequest(_) => "bad_request",
            CallbackOutcome::Internal(_) => "internal",
        }
    }
}

impl WebhookPipeline {
    /// Handles one delivery status callback.
    pub async fn handle_status_callback(&self, request: WebhookRequest) -> CallbackOutcome {
        let outcome = self.run_status_callback(request).await;
        leadline_prometheus::record_status_callback(outcome.label());
        outcome
    }

    async fn run_status_callback(&self, request: WebhookRequest) -> CallbackOutcome {
        let Some(signature) = request.signature.as_deref() else {
            debug!("status callback without signature rejected");
            return CallbackOutcome::AuthFailed;
        };
        let Some(from) = request
            .params
            .iter()
            .find(|(k, _)| k == "From")
            .map(|(_, v)| v.as_str())
            .filter(|v| !v.trim().is_empty())
        else {
            return CallbackOutcome::BadRequest("missing required field `From`".to_string());
        };

        let tenant = match resolve_tenant(self.storage.as_ref(), from).await {
            Ok(tenant) => tenant,
            Err(LeadlineError::NotFound { .. }) => {
                info!(sending_number = from, "status callback for unknown number");
                return CallbackOutcome::Ignored("unknown_tenant");
            }
            Err(e) => {
                error!(sending_number = from, error = %e, "tenant resolution failed");
                return CallbackOutcome::Internal(e.to_string());
            }
        };

        if !leadline_sms::verify(
            &tenant.telephony.auth_token,
            signature,
            &request.url,
            &request.params,
        ) {
            debug!(tenant_id = tenant.id.as_str(), "status callback signature mismatch");
            return CallbackOutcome::AuthFailed;
        }

        let callback = match StatusCallback::from_params(&request.params) {
            Ok(callback) => callback,
            Err(e) => return CallbackOutcome::BadRequest(e.to_string()),
        };
        if !callback.is_failure() {
            debug!(
                message_sid = callback.message_sid.as_str(),
                status = callback.message_status.as_str(),
                "delivery status noted"
            );
            return CallbackOutcome::Ignored("not_a_failure");
        }

        let message = match self
            .storage
            .outbound_by_provider_id(&callback.message_sid)
            .await
        {
            Ok(Some(message)) => message,
            Ok(None) => {
                info!(
                    message_sid = callback.message_sid.as_str(),
                    "status callback for unknown message"
                );
                return CallbackOutcome::Ignored("unknown_message");
            }
            Err(e) => return CallbackOutcome::Internal(e.to_string()),
        };

        match self.storage.get_conversation(&message.conversation_id).await {
            Ok(Some(conversation)) if conversation.tenant_id == tenant.id => {}
            Ok(_) => {
                warn!(
                    tenant_id = tenant.id.as_str(),
                    message_sid = callback.message_sid.as_str(),
                    "status callback names a message of another tenant"
                );
                return CallbackOutcome::Ignored("tenant_mismatch");
            }
            Err(e) => return CallbackOutcome::Internal(e.to_string()),
        }

        let error_text = match &callback.error_code {
            Some(code) => format!("delivery {} (error {code})", callback.message_status),
            None => format!("delivery {}", callback.message_status),
        };
        match self
            .storage
            .update_message_status(&message.id, StatusChange::failed(error_text))
            .await
        {
            Ok(true) => {
                warn!(
                    tenant_id = tenant.id.as_str(),
                    conversation_id = message.conversation_id.as_str(),
                    message_sid = callback.message_sid.as_str(),
                    status = callback.message_status.as_str(),
                    "outbound message reported undelivered"
                );
                CallbackOutcome::Applied {
                    message_id: message.id,
                }
            }
            Ok(false) => CallbackOutcome::Ignored("already_final"),
            Err(e) => CallbackOutcome::Internal(e.to_string()),
        }
    }
}
