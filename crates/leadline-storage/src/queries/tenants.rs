// SPDX-FileCopyrightText: 2026 Leadline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tenant provisioning and lookup.

use leadline_core::{AiProfile, LeadlineError, TelephonyCredentials, Tenant};
use rusqlite::{Connection, OptionalExtension, Row, params};

use crate::database::{Database, map_tr_err};

const TENANT_COLUMNS: &str = "id, name, account_sid, auth_token, sending_number, system_prompt, \
     preferences, ai_api_key, ai_model, default_agent_id, created_at";

fn row_to_tenant(row: &Row<'_>) -> rusqlite::Result<Tenant> {
    Ok(Tenant {
        id: row.get(0)?,
        name: row.get(1)?,
        telephony: TelephonyCredentials {
            account_sid: row.get(2)?,
            auth_token: row.get(3)?,
            sending_number: row.get(4)?,
        },
        ai: AiProfile {
            system_prompt: row.get(5)?,
            preferences: row.get(6)?,
            api_key: row.get(7)?,
            model: row.get(8)?,
        },
        default_agent_id: row.get(9)?,
        created_at: row.get(10)?,
    })
}

/// Insert a tenant. Fails with a validation error if another tenant already
/// owns the sending number.
pub async fn insert_tenant(db: &Database, tenant: &Tenant) -> Result<(), LeadlineError> {
    let tenant = tenant.clone();
    let number = tenant.telephony.sending_number.clone();
    let inserted = db
        .connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let taken: bool = tx.query_row(
                "SELECT EXISTS(SELECT 1 FROM tenants WHERE sending_number = ?1)",
                params![tenant.telephony.sending_number],
                |row| row.get(0),
            )?;
            if taken {
                return Ok(false);
            }
            tx.execute(
                &format!("INSERT INTO tenants ({TENANT_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)"),
                params![
                    tenant.id,
                    tenant.name,
                    tenant.telephony.account_sid,
                    tenant.telephony.auth_token,
                    tenant.telephony.sending_number,
                    tenant.ai.system_prompt,
                    tenant.ai.preferences,
                    tenant.ai.api_key,
                    tenant.ai.model,
                    tenant.default_agent_id,
                    tenant.created_at,
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
        Err(LeadlineError::Validation(format!(
            "sending number {number} is already assigned to a tenant"
        )))
    }
}

pub(crate) fn get_tenant_in(conn: &Connection, id: &str) -> rusqlite::Result<Option<Tenant>> {
    conn.query_row(
        &format!("SELECT {TENANT_COLUMNS} FROM tenants WHERE id = ?1"),
        params![id],
        row_to_tenant,
    )
    .optional()
}

pub async fn get_tenant(db: &Database, id: &str) -> Result<Option<Tenant>, LeadlineError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| get_tenant_in(conn, &id))
        .await
        .map_err(map_tr_err)
}

/// Every tenant registered on `number`, exact match only.
pub async fn tenants_by_sending_number(
    db: &Database,
    number: &str,
) -> Result<Vec<Tenant>, LeadlineError> {
    let number = number.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {TENANT_COLUMNS} FROM tenants WHERE sending_number = ?1 ORDER BY created_at"
            ))?;
            let rows = stmt.query_map(params![number], row_to_tenant)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

/// All tenants, oldest first.
pub async fn list_tenants(db: &Database) -> Result<Vec<Tenant>, LeadlineError> {
    db.connection()
        .call(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {TENANT_COLUMNS} FROM tenants ORDER BY created_at"
            ))?;
            let rows = stmt.query_map([], row_to_tenant)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}
