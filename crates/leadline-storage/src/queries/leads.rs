// SPDX-FileCopyrightText: 2026 Leadline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Lead provisioning, lookup and status updates.

use leadline_core::{Lead, LeadStatus, LeadlineError};
use rusqlite::{OptionalExtension, Row, params};

use super::parse_column;
use crate::database::{Database, map_tr_err};

const LEAD_COLUMNS: &str = "id, tenant_id, phone_number, display_name, status, created_at";

fn row_to_lead(row: &Row<'_>) -> rusqlite::Result<Lead> {
    Ok(Lead {
        id: row.get(0)?,
        tenant_id: row.get(1)?,
        phone_number: row.get(2)?,
        display_name: row.get(3)?,
        status: parse_column(row, 4)?,
        created_at: row.get(5)?,
    })
}

/// Insert a lead. Phone numbers are unique within a tenant.
pub async fn insert_lead(db: &Database, lead: &Lead) -> Result<(), LeadlineError> {
    let lead = lead.clone();
    let key = format!("{}/{}", lead.tenant_id, lead.phone_number);
    let inserted = db
        .connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let taken: bool = tx.query_row(
                "SELECT EXISTS(SELECT 1 FROM leads WHERE tenant_id = ?1 AND phone_number = ?2)",
                params![lead.tenant_id, lead.phone_number],
                |row| row.get(0),
            )?;
            if taken {
                return Ok(false);
            }
            tx.execute(
                &format!("INSERT INTO leads ({LEAD_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6)"),
                params![
                    lead.id,
                    lead.tenant_id,
                    lead.phone_number,
                    lead.display_name,
                    lead.status.to_string(),
                    lead.created_at,
                ],
            )?;
            tx.commit()?;
            Ok(true)
        })
        .await
        .map_err(map_tr_err)?;

    if inserted {
        Ok(())
    } else {
        Err(LeadlineError::Validation(format!("lead {key} already exists")))
    }
}

/// Exact-match lookup of a phone number within one tenant.
pub async fn lead_by_phone(
    db: &Database,
    tenant_id: &str,
    phone_number: &str,
) -> Result<Option<Lead>, LeadlineError> {
    let tenant_id = tenant_id.to_string();
    let phone_number = phone_number.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                &format!(
                    "SELECT {LEAD_COLUMNS} FROM leads WHERE tenant_id = ?1 AND phone_number = ?2"
                ),
                params![tenant_id, phone_number],
                row_to_lead,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn get_lead(db: &Database, id: &str) -> Result<Option<Lead>, LeadlineError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                &format!("SELECT {LEAD_COLUMNS} FROM leads WHERE id = ?1"),
                params![id],
                row_to_lead,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn update_lead_status(
    db: &Database,
    lead_id: &str,
    status: LeadStatus,
) -> Result<(), LeadlineError> {
    let id = lead_id.to_string();
    let updated = db
        .connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE leads SET status = ?1 WHERE id = ?2",
                params![status.to_string(), id],
            )
        })
        .await
        .map_err(map_tr_err)?;
    if updated == 0 {
        return Err(LeadlineError::NotFound {
            entity: "lead",
            key: lead_id.to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::tenants::insert_tenant;
    use crate::test_support::{sample_lead, sample_tenant, test_db};

    #[tokio::test]
    async fn lookup_is_scoped_to_tenant() {
        let db = test_db().await;
        insert_tenant(&db, &sample_tenant("t1", "+15550001111"))
            .await
            .unwrap();
        insert_tenant(&db, &sample_tenant("t2", "+15550002222"))
            .await
            .unwrap();
        insert_lead(&db, &sample_lead("l1", "t1", "+15557770000"))
            .await
            .unwrap();

        assert!(
            lead_by_phone(&db, "t1", "+15557770000")
                .await
                .unwrap()
                .is_some()
        );
        assert!(
            lead_by_phone(&db, "t2", "+15557770000")
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn same_phone_allowed_across_tenants_but_not_within() {
        let db = test_db().await;
        insert_tenant(&db, &sample_tenant("t1", "+15550001111"))
            .await
            .unwrap();
        insert_tenant(&db, &sample_tenant("t2", "+15550002222"))
            .await
            .unwrap();
        insert_lead(&db, &sample_lead("l1", "t1", "+15557770000"))
            .await
            .unwrap();
        insert_lead(&db, &sample_lead("l2", "t2", "+15557770000"))
            .await
            .unwrap();

        let err = insert_lead(&db, &sample_lead("l3", "t1", "+15557770000"))
            .await
            .unwrap_err();
        assert!(matches!(err, LeadlineError::Validation(_)));
    }

    #[tokio::test]
    async fn status_update_persists() {
        let db = test_db().await;
        insert_tenant(&db, &sample_tenant("t1", "+15550001111"))
            .await
            .unwrap();
        insert_lead(&db, &sample_lead("l1", "t1", "+15557770000"))
            .await
            .unwrap();

        update_lead_status(&db, "l1", LeadStatus::Contacted)
            .await
            .unwrap();
        let lead = get_lead(&db, "l1").await.unwrap().unwrap();
        assert_eq!(lead.status, LeadStatus::Contacted);

        let err = update_lead_status(&db, "nope", LeadStatus::Qualified)
            .await
            .unwrap_err();
        assert!(matches!(err, LeadlineError::NotFound { .. }));
    }
}
