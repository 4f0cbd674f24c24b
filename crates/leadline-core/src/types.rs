// SPDX-FileCopyrightText: 2026 Leadline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared across adapter traits and the Leadline pipeline.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the kind of adapter behind a [`PluginAdapter`](crate::PluginAdapter).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Storage,
    Completion,
    Transport,
    Observability,
}

// --- Tenant ---

/// Telephony account credentials for one tenant.
///
/// One tuple per tenant. The sending number is what inbound webhooks carry
/// in their `To` field and is unique across tenants.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TelephonyCredentials {
    /// Provider account identifier.
    pub account_sid: String,
    /// Shared secret used both for REST auth and webhook signatures.
    pub auth_token: String,
    /// E.164 number the tenant sends from and receives on.
    pub sending_number: String,
}

impl std::fmt::Debug for TelephonyCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelephonyCredentials")
            .field("account_sid", &self.account_sid)
            .field("auth_token", &"[redacted]")
            .field("sending_number", &self.sending_number)
            .finish()
    }
}

/// Per-tenant reply generation settings.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AiProfile {
    /// Free-text system prompt.
    pub system_prompt: String,
    /// Free-text preferences appended to the system prompt.
    pub preferences: String,
    /// Tenant's own completion API key. Falls back to the platform key when absent.
    pub api_key: Option<String>,
    /// Model override for this tenant.
    pub model: Option<String>,
}

impl std::fmt::Debug for AiProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AiProfile")
            .field("system_prompt", &self.system_prompt)
            .field("preferences", &self.preferences)
            .field("api_key", &self.api_key.as_ref().map(|_| "[redacted]"))
            .field("model", &self.model)
            .finish()
    }
}

/// A platform customer. Read-only to the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tenant {
    pub id: String,
    pub name: String,
    pub telephony: TelephonyCredentials,
    pub ai: AiProfile,
    /// Agent assigned to new conversations. `None` uses the platform default.
    pub default_agent_id: Option<String>,
    pub created_at: String,
}

// --- Lead ---

/// Qualification status of a lead.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum LeadStatus {
    New,
    Contacted,
    Qualified,
    Unqualified,
}

/// A contact belonging to exactly one tenant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lead {
    pub id: String,
    pub tenant_id: String,
    /// E.164 phone number, unique within the tenant.
    pub phone_number: String,
    pub display_name: String,
    pub status: LeadStatus,
    pub created_at: String,
}

// --- Conversation ---

/// The active thread between a tenant and a lead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub tenant_id: String,
    pub lead_id: String,
    pub agent_id: String,
    pub created_at: String,
    pub updated_at: String,
}

// --- Message ---

/// Who authored a message.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum SenderRole {
    Lead,
    Assistant,
}

/// Which way a message travelled relative to the platform.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    Inbound,
    Outbound,
}

/// Delivery status of a message.
///
/// Inbound messages are recorded as `New` and never move. Outbound messages
/// move `New -> Sent`, `New -> Failed` or `Sent -> Failed`, each at most once.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    New,
    Sent,
    Failed,
}

impl DeliveryStatus {
    /// Returns whether moving from `self` to `next` is a legal transition.
    pub fn can_transition_to(self, next: DeliveryStatus) -> bool {
        matches!(
            (self, next),
            (DeliveryStatus::New, DeliveryStatus::Sent)
                | (DeliveryStatus::New, DeliveryStatus::Failed)
                | (DeliveryStatus::Sent, DeliveryStatus::Failed)
        )
    }
}

/// First media attachment carried by an inbound webhook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaAttachment {
    pub url: String,
    pub content_type: Option<String>,
}

/// A stored message. Immutable apart from its delivery status fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub conversation_id: String,
    /// Per-conversation ordering key, strictly increasing across appends.
    pub sequence: i64,
    pub sender: SenderRole,
    pub direction: Direction,
    pub body: String,
    pub status: DeliveryStatus,
    /// Provider message id: the webhook `MessageSid` for inbound, the send receipt for outbound.
    pub provider_message_id: Option<String>,
    pub media: Option<MediaAttachment>,
    /// Diagnostic text captured when delivery failed.
    pub error: Option<String>,
    pub created_at: String,
}

/// Fields supplied by the caller when appending a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMessage {
    pub sender: SenderRole,
    pub direction: Direction,
    pub body: String,
    pub status: DeliveryStatus,
    pub provider_message_id: Option<String>,
    pub media: Option<MediaAttachment>,
}

impl NewMessage {
    /// An inbound message from a lead, keyed by the provider's message id.
    pub fn inbound(
        body: impl Into<String>,
        provider_message_id: impl Into<String>,
        media: Option<MediaAttachment>,
    ) -> Self {
        Self {
            sender: SenderRole::Lead,
            direction: Direction::Inbound,
            body: body.into(),
            status: DeliveryStatus::New,
            provider_message_id: Some(provider_message_id.into()),
            media,
        }
    }

    /// An outbound assistant reply that has not been handed to the provider yet.
    pub fn outbound(body: impl Into<String>) -> Self {
        Self {
            sender: SenderRole::Assistant,
            direction: Direction::Outbound,
            body: body.into(),
            status: DeliveryStatus::New,
            provider_message_id: None,
            media: None,
        }
    }
}

/// Result of an append that is idempotent on the provider message id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppendOutcome {
    /// The message was stored.
    Appended(Message),
    /// A message with the same provider id already exists in the conversation.
    Duplicate(Message),
}

impl AppendOutcome {
    /// The stored message, whether new or pre-existing.
    pub fn message(&self) -> &Message {
        match self {
            AppendOutcome::Appended(m) | AppendOutcome::Duplicate(m) => m,
        }
    }

    pub fn is_duplicate(&self) -> bool {
        matches!(self, AppendOutcome::Duplicate(_))
    }
}

/// Result of atomically resolving a conversation and appending an inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundRecord {
    pub conversation: Conversation,
    /// Whether the conversation was created by this call.
    pub conversation_created: bool,
    pub outcome: AppendOutcome,
}

/// A requested delivery status change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusChange {
    pub status: DeliveryStatus,
    pub provider_message_id: Option<String>,
    pub error: Option<String>,
}

impl StatusChange {
    /// Mark delivered to the provider, recording its message id.
    pub fn sent(provider_message_id: impl Into<String>) -> Self {
        Self {
            status: DeliveryStatus::Sent,
            provider_message_id: Some(provider_message_id.into()),
            error: None,
        }
    }

    /// Mark failed, recording the error for diagnostics.
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            status: DeliveryStatus::Failed,
            provider_message_id: None,
            error: Some(error.into()),
        }
    }
}

// --- Completion ---

/// Role of a turn in a completion request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

/// A single turn of history sent to the completion provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub content: String,
}

/// A request to a text-completion provider.
#[derive(Clone)]
pub struct CompletionRequest {
    /// Per-tenant API key. `None` lets the adapter use its platform key.
    pub api_key: Option<String>,
    /// Model override. `None` uses the adapter's default.
    pub model: Option<String>,
    pub system_prompt: String,
    pub messages: Vec<ChatTurn>,
    pub max_tokens: Option<u32>,
}

impl std::fmt::Debug for CompletionRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletionRequest")
            .field("api_key", &self.api_key.as_ref().map(|_| "[redacted]"))
            .field("model", &self.model)
            .field("system_prompt", &self.system_prompt)
            .field("messages", &self.messages.len())
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

/// Token usage statistics reported by a completion provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

/// A single completion returned by a provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionResponse {
    pub id: String,
    pub content: String,
    pub model: String,
    pub stop_reason: Option<String>,
    pub usage: TokenUsage,
}

// --- Telephony ---

/// An SMS to hand to the telephony provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundSms {
    pub to: String,
    pub body: String,
    /// URL the provider should POST delivery status updates to.
    pub status_callback: Option<String>,
}

/// Receipt returned by the provider for an accepted send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendReceipt {
    pub provider_message_id: String,
    /// Provider-reported status at acceptance time (e.g. "queued").
    pub status: String,
}
