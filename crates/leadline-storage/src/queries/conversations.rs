// SPDX-FileCopyrightText: 2026 Leadline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation resolution.
//!
//! The active conversation for a (tenant, lead) pair is the most recently
//! created one. Creation only happens inside the same transaction that
//! checked for an existing row, so the single writer thread never creates
//! two conversations for one pair.

use leadline_core::{Conversation, LeadlineError};
use rusqlite::{Connection, OptionalExtension, Row, params};
use uuid::Uuid;

use super::NOW;
use crate::database::{Database, map_tr_err};

const CONVERSATION_COLUMNS: &str = "id, tenant_id, lead_id, agent_id, created_at, updated_at";

fn row_to_conversation(row: &Row<'_>) -> rusqlite::Result<Conversation> {
    Ok(Conversation {
        id: row.get(0)?,
        tenant_id: row.get(1)?,
        lead_id: row.get(2)?,
        agent_id: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

pub(crate) fn find_active_in(
    conn: &Connection,
    tenant_id: &str,
    lead_id: &str,
) -> rusqlite::Result<Option<Conversation>> {
    conn.query_row(
        &format!(
            "SELECT {CONVERSATION_COLUMNS} FROM conversations
             WHERE tenant_id = ?1 AND lead_id = ?2
             ORDER BY created_at DESC, rowid DESC LIMIT 1"
        ),
        params![tenant_id, lead_id],
        row_to_conversation,
    )
    .optional()
}

pub(crate) fn get_conversation_in(
    conn: &Connection,
    id: &str,
) -> rusqlite::Result<Option<Conversation>> {
    conn.query_row(
        &format!("SELECT {CONVERSATION_COLUMNS} FROM conversations WHERE id = ?1"),
        params![id],
        row_to_conversation,
    )
    .optional()
}

/// Returns the active conversation, creating it if needed. The flag is
/// `true` when this call created it.
pub(crate) fn find_or_create_in(
    conn: &Connection,
    tenant_id: &str,
    lead_id: &str,
    agent_id: &str,
) -> rusqlite::Result<(Conversation, bool)> {
    if let Some(existing) = find_active_in(conn, tenant_id, lead_id)? {
        return Ok((existing, false));
    }

    let id = Uuid::new_v4().to_string();
    conn.execute(
        &format!(
            "INSERT INTO conversations (id, tenant_id, lead_id, agent_id, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, {NOW}, {NOW})"
        ),
        params![id, tenant_id, lead_id, agent_id],
    )?;
    let created = get_conversation_in(conn, &id)?.ok_or(rusqlite::Error::QueryReturnedNoRows)?;
    Ok((created, true))
}

pub async fn find_or_create_active(
    db: &Database,
    tenant_id: &str,
    lead_id: &str,
    agent_id: &str,
) -> Result<Conversation, LeadlineError> {
    let (tenant_id, lead_id, agent_id) =
        (tenant_id.to_string(), lead_id.to_string(), agent_id.to_string());
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let (conversation, _) = find_or_create_in(&tx, &tenant_id, &lead_id, &agent_id)?;
            tx.commit()?;
            Ok(conversation)
        })
        .await
        .map_err(map_tr_err)
}

pub async fn find_active(
    db: &Database,
    tenant_id: &str,
    lead_id: &str,
) -> Result<Option<Conversation>, LeadlineError> {
    let (tenant_id, lead_id) = (tenant_id.to_string(), lead_id.to_string());
    db.connection()
        .call(move |conn| find_active_in(conn, &tenant_id, &lead_id))
        .await
        .map_err(map_tr_err)
}

pub async fn get_conversation(
    db: &Database,
    id: &str,
) -> Result<Option<Conversation>, LeadlineError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| get_conversation_in(conn, &id))
        .await
        .map_err(map_tr_err)
}
