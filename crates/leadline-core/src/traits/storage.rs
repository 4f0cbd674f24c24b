// SPDX-FileCopyrightText: 2026 Leadline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Storage adapter trait for persistence backends (SQLite, etc.).

use async_trait::async_trait;

use crate::error::LeadlineError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{
    AppendOutcome, Conversation, InboundRecord, Lead, LeadStatus, Message, NewMessage,
    StatusChange, Tenant,
};

/// Adapter for storage and persistence backends.
///
/// Tenants and leads are read-only to the pipeline; the insert methods exist
/// for provisioning tools and tests. Conversations and messages are only ever
/// written through the conversation methods below, which is what keeps the
/// ordering and idempotency invariants local to the backend.
#[async_trait]
pub trait StorageAdapter: PluginAdapter {
    /// Initializes the storage backend (migrations, connection, etc.).
    async fn initialize(&self) -> Result<(), LeadlineError>;

    /// Closes the storage backend, flushing pending writes.
    async fn close(&self) -> Result<(), LeadlineError>;

    // --- Tenants ---

    async fn insert_tenant(&self, tenant: &Tenant) -> Result<(), LeadlineError>;

    async fn get_tenant(&self, id: &str) -> Result<Option<Tenant>, LeadlineError>;

    /// All tenants whose sending number equals `number` exactly.
    ///
    /// More than one result means the provisioning uniqueness rule was broken.
    async fn tenants_by_sending_number(&self, number: &str)
    -> Result<Vec<Tenant>, LeadlineError>;

    // --- Leads ---

    async fn insert_lead(&self, lead: &Lead) -> Result<(), LeadlineError>;

    /// Exact-match lookup of a lead's phone number scoped to one tenant.
    async fn lead_by_phone(
        &self,
        tenant_id: &str,
        phone_number: &str,
    ) -> Result<Option<Lead>, LeadlineError>;

    async fn update_lead_status(&self, lead_id: &str, status: LeadStatus)
    -> Result<(), LeadlineError>;

    // --- Conversations ---

    /// Returns the most recently created conversation for the pair, creating
    /// one assigned to `agent_id` when none exists.
    async fn find_or_create_active(
        &self,
        tenant_id: &str,
        lead_id: &str,
        agent_id: &str,
    ) -> Result<Conversation, LeadlineError>;

    /// Returns the active conversation for the pair without creating one.
    async fn find_active(
        &self,
        tenant_id: &str,
        lead_id: &str,
    ) -> Result<Option<Conversation>, LeadlineError>;

    async fn get_conversation(&self, id: &str) -> Result<Option<Conversation>, LeadlineError>;

    // --- Messages ---

    /// Appends a message with the next ordering key and bumps the
    /// conversation's `updated_at`.
    ///
    /// Inbound messages carrying a provider id already present in the
    /// conversation are not stored again; the existing row is returned as
    /// [`AppendOutcome::Duplicate`].
    async fn append_message(
        &self,
        conversation_id: &str,
        message: NewMessage,
    ) -> Result<AppendOutcome, LeadlineError>;

    /// Resolves the active conversation and appends the inbound message as a
    /// single atomic unit.
    async fn record_inbound(
        &self,
        tenant_id: &str,
        lead_id: &str,
        agent_id: &str,
        message: NewMessage,
    ) -> Result<InboundRecord, LeadlineError>;

    /// Applies a one-way delivery status transition.
    ///
    /// Returns `false` without error when the transition is illegal, the
    /// message does not exist, or `Sent` is requested without a provider id.
    async fn update_message_status(
        &self,
        message_id: &str,
        change: StatusChange,
    ) -> Result<bool, LeadlineError>;

    async fn get_message(&self, id: &str) -> Result<Option<Message>, LeadlineError>;

    /// Looks up an outbound message by the id the provider returned on send.
    async fn outbound_by_provider_id(
        &self,
        provider_message_id: &str,
    ) -> Result<Option<Message>, LeadlineError>;

    /// All messages of a conversation in order.
    async fn list_messages(&self, conversation_id: &str) -> Result<Vec<Message>, LeadlineError>;

    /// The `limit` most recent messages of a conversation, oldest first.
    async fn recent_messages(
        &self,
        conversation_id: &str,
        limit: usize,
    ) -> Result<Vec<Message>, LeadlineError>;
}
