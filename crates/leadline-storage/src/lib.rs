// SPDX-FileCopyrightText: 2026 Leadline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence layer for Leadline.
//!
//! Provides WAL-mode SQLite storage with embedded migrations, a single-writer
//! concurrency model via `tokio-rusqlite`, and typed operations for tenants,
//! leads, conversations and the ordered message log.

pub mod adapter;
pub mod database;
pub mod migrations;
pub mod queries;

pub use adapter::SqliteStorage;
pub use database::Database;

#[cfg(test)]
pub(crate) mod test_support {
    use leadline_core::{AiProfile, Lead, LeadStatus, TelephonyCredentials, Tenant};

    use crate::Database;
    use crate::queries::{leads, tenants};

    pub async fn test_db() -> Database {
        Database::open_in_memory().await.unwrap()
    }

    pub fn sample_tenant(id: &str, number: &str) -> Tenant {
        Tenant {
            id: id.to_string(),
            name: format!("Tenant {id}"),
            telephony: TelephonyCredentials {
                account_sid: format!("AC{id}"),
                auth_token: format!("token-{id}"),
                sending_number: number.to_string(),
            },
            ai: AiProfile {
                system_prompt: "You are a friendly assistant.".to_string(),
                preferences: "Keep replies short.".to_string(),
                api_key: None,
                model: None,
            },
            default_agent_id: None,
            created_at: "2026-01-01T00:00:00.000Z".to_string(),
        }
    }

    pub fn sample_lead(id: &str, tenant_id: &str, phone: &str) -> Lead {
        Lead {
            id: id.to_string(),
            tenant_id: tenant_id.to_string(),
            phone_number: phone.to_string(),
            display_name: "Jamie".to_string(),
            status: LeadStatus::New,
            created_at: "2026-01-01T00:00:00.000Z".to_string(),
        }
    }

    /// A database with tenant `t1` and its lead `l1`.
    pub async fn seeded_db() -> Database {
        let db = test_db().await;
        tenants::insert_tenant(&db, &sample_tenant("t1", "+15550001111"))
            .await
            .unwrap();
        leads::insert_lead(&db, &sample_lead("l1", "t1", "+15557770000"))
            .await
            .unwrap();
        db
    }
}
