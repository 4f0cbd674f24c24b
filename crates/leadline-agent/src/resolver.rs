// SPDX-FileCopyrightText: 2026 Leadline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tenant and lead resolution.
//!
//! The tenant is resolved from the untrusted `To` field before the signature
//! is checked, since the tenant's auth token is what the signature is
//! verified against. Nothing else in the payload is trusted until then.

use leadline_core::{Lead, LeadlineError, StorageAdapter, Tenant};

/// Resolves the tenant that owns `receiving_number`.
///
/// Returns [`LeadlineError::NotFound`] when no tenant has the number and
/// [`LeadlineError::Ambiguous`] when more than one does.
pub async fn resolve_tenant(
    storage: &dyn StorageAdapter,
    receiving_number: &str,
) -> Result<Tenant, LeadlineError> {
    let mut matches = storage.tenants_by_sending_number(receiving_number).await?;
    match matches.len() {
        0 => Err(LeadlineError::NotFound {
            entity: "tenant",
            key: receiving_number.to_string(),
        }),
        1 => Ok(matches.remove(0)),
        n => {
            tracing::error!(
                receiving_number,
                count = n,
                "sending number is shared by several tenants"
            );
            Err(LeadlineError::Ambiguous {
                entity: "tenant",
                key: receiving_number.to_string(),
            })
        }
    }
}

/// Resolves the lead with phone number `from` within one tenant.
///
/// An unknown sender is an expected case and returns `Ok(None)`.
pub async fn resolve_lead(
    storage: &dyn StorageAdapter,
    tenant_id: &str,
    from: &str,
) -> Result<Option<Lead>, LeadlineError> {
    storage.lead_by_phone(tenant_id, from).await
}

#[cfg(test)]
mod tests {
    use leadline_storage::{Database, SqliteStorage};
    use leadline_test_utils::fixtures::{lead, tenant};

    use super::*;

    async fn storage() -> SqliteStorage {
        SqliteStorage::from_database(Database::open_in_memory().await.unwrap())
    }

    #[tokio::test]
    async fn resolves_tenant_by_exact_number() {
        let storage = storage().await;
        storage
            .insert_tenant(&tenant("t1", "+15550000000", "s3cr3t"))
            .await
            .unwrap();

        let found = resolve_tenant(&storage, "+15550000000").await.unwrap();
        assert_eq!(found.id, "t1");

        let err = resolve_tenant(&storage, "15550000000").await.unwrap_err();
        assert!(matches!(err, LeadlineError::NotFound { entity: "tenant", .. }));
    }

    #[tokio::test]
    async fn shared_number_is_ambiguous() {
        let db = Database::open_in_memory().await.unwrap();
        let storage = SqliteStorage::from_database(db.clone());
        storage
            .insert_tenant(&tenant("t1", "+15550000000", "a"))
            .await
            .unwrap();
        // Provisioning refuses duplicates, so write the collision directly.
        db.connection()
            .call(|conn| {
                conn.execute(
                    "INSERT INTO tenants (id, name, account_sid, auth_token, sending_number,
                        system_prompt, preferences, created_at)
                     SELECT 't2', name, account_sid, auth_token, sending_number,
                        system_prompt, preferences, created_at FROM tenants WHERE id = 't1'",
                    [],
                )
            })
            .await
            .unwrap();

        let err = resolve_tenant(&storage, "+15550000000").await.unwrap_err();
        assert!(matches!(err, LeadlineError::Ambiguous { entity: "tenant", .. }));
    }

    #[tokio::test]
    async fn lead_lookup_is_scoped_to_tenant() {
        let storage = storage().await;
        storage
            .insert_tenant(&tenant("x", "+15550000001", "a"))
            .await
            .unwrap();
        storage
            .insert_tenant(&tenant("y", "+15550000002", "b"))
            .await
            .unwrap();
        storage
            .insert_lead(&lead("lx", "x", "+15551234567"))
            .await
            .unwrap();

        assert!(resolve_lead(&storage, "x", "+15551234567").await.unwrap().is_some());
        assert!(resolve_lead(&storage, "y", "+15551234567").await.unwrap().is_none());
    }
}
