// SPDX-FileCopyrightText: 2026 Leadline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the StorageAdapter trait.

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::debug;

use leadline_core::{
    AdapterType, AppendOutcome, Conversation, HealthStatus, InboundRecord, Lead, LeadStatus,
    LeadlineError, Message, NewMessage, PluginAdapter, StatusChange, StorageAdapter, Tenant,
};

use crate::database::Database;
use crate::queries;

/// SQLite-backed storage adapter.
///
/// Wraps a [`Database`] handle and delegates to the typed query modules.
/// The database is opened on the first call to [`StorageAdapter::initialize`].
pub struct SqliteStorage {
    database_path: String,
    wal_mode: bool,
    db: OnceCell<Database>,
}

impl SqliteStorage {
    /// Create a new SqliteStorage. The file is not opened until [`initialize`](StorageAdapter::initialize).
    pub fn new(database_path: impl Into<String>, wal_mode: bool) -> Self {
        Self {
            database_path: database_path.into(),
            wal_mode,
            db: OnceCell::new(),
        }
    }

    /// Wrap an already-open database, e.g. an in-memory one in tests.
    pub fn from_database(db: Database) -> Self {
        Self {
            database_path: ":memory:".to_string(),
            wal_mode: false,
            db: OnceCell::new_with(Some(db)),
        }
    }

    /// The underlying database, for tooling that needs queries outside the trait.
    pub fn database(&self) -> Result<&Database, LeadlineError> {
        self.db.get().ok_or_else(|| LeadlineError::Storage {
            source: "storage not initialized -- call initialize() first".into(),
        })
    }
}

#[async_trait]
impl PluginAdapter for SqliteStorage {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, LeadlineError> {
        let db = self.database()?;
        db.connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await
            .map_err(crate::database::map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), LeadlineError> {
        if let Some(db) = self.db.get() {
            db.checkpoint().await?;
            debug!("storage shut down");
        }
        Ok(())
    }
}

#[async_trait]
impl StorageAdapter for SqliteStorage {
    async fn initialize(&self) -> Result<(), LeadlineError> {
        let db = Database::open(&self.database_path, self.wal_mode).await?;
        self.db.set(db).map_err(|_| LeadlineError::Storage {
            source: "storage already initialized".into(),
        })?;
        debug!(path = %self.database_path, "SQLite storage initialized");
        Ok(())
    }

    async fn close(&self) -> Result<(), LeadlineError> {
        self.database()?.checkpoint().await
    }

    // --- Tenants ---

    async fn insert_tenant(&self, tenant: &Tenant) -> Result<(), LeadlineError> {
        queries::tenants::insert_tenant(self.database()?, tenant).await
    }

    async fn get_tenant(&self, id: &str) -> Result<Option<Tenant>, LeadlineError> {
        queries::tenants::get_tenant(self.database()?, id).await
    }

    async fn tenants_by_sending_number(
        &self,
        number: &str,
    ) -> Result<Vec<Tenant>, LeadlineError> {
        queries::tenants::tenants_by_sending_number(self.database()?, number).await
    }

    // --- Leads ---

    async fn insert_lead(&self, lead: &Lead) -> Result<(), LeadlineError> {
        queries::leads::insert_lead(self.database()?, lead).await
    }

    async fn lead_by_phone(
        &self,
        tenant_id: &str,
        phone_number: &str,
    ) -> Result<Option<Lead>, LeadlineError> {
        queries::leads::lead_by_phone(self.database()?, tenant_id, phone_number).await
    }

    async fn update_lead_status(
        &self,
        lead_id: &str,
        status: LeadStatus,
    ) -> Result<(), LeadlineError> {
        queries::leads::update_lead_status(self.database()?, lead_id, status).await
    }

    // --- Conversations ---

    async fn find_or_create_active(
        &self,
        tenant_id: &str,
        lead_id: &str,
        agent_id: &str,
    ) -> Result<Conversation, LeadlineError> {
        queries::conversations::find_or_create_active(self.database()?, tenant_id, lead_id, agent_id)
            .await
    }

    async fn find_active(
        &self,
        tenant_id: &str,
        lead_id: &str,
    ) -> Result<Option<Conversation>, LeadlineError> {
        queries::conversations::find_active(self.database()?, tenant_id, lead_id).await
    }

    async fn get_conversation(&self, id: &str) -> Result<Option<Conversation>, LeadlineError> {
        queries::conversations::get_conversation(self.database()?, id).await
    }

    // --- Messages ---

    async fn append_message(
        &self,
        conversation_id: &str,
        message: NewMessage,
    ) -> Result<AppendOutcome, LeadlineError> {
        queries::messages::append_message(self.database()?, conversation_id, message).await
    }

    async fn record_inbound(
        &self,
        tenant_id: &str,
        lead_id: &str,
        agent_id: &str,
        message: NewMessage,
    ) -> Result<InboundRecord, LeadlineError> {
        queries::messages::record_inbound(self.database()?, tenant_id, lead_id, agent_id, message)
            .await
    }

    async fn update_message_status(
        &self,
        message_id: &str,
        change: StatusChange,
    ) -> Result<bool, LeadlineError> {
        queries::messages::update_message_status(self.database()?, message_id, change).await
    }

    async fn get_message(&self, id: &str) -> Result<Option<Message>, LeadlineError> {
        queries::messages::get_message(self.database()?, id).await
    }

    async fn outbound_by_provider_id(
        &self,
        provider_message_id: &str,
    ) -> Result<Option<Message>, LeadlineError> {
        queries::messages::outbound_by_provider_id(self.database()?, provider_message_id).await
    }

    async fn list_messages(&self, conversation_id: &str) -> Result<Vec<Message>, LeadlineError> {
        queries::messages::list_messages(self.database()?, conversation_id).await
    }

    async fn recent_messages(
        &self,
        conversation_id: &str,
        limit: usize,
    ) -> Result<Vec<Message>, LeadlineError> {
        queries::messages::recent_messages(self.database()?, conversation_id, limit).await
    }
}
