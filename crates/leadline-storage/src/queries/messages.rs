// SPDX-FileCopyrightText: 2026 Leadline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The ordered, append-only message log.
//!
//! Every append takes `MAX(sequence) + 1` for its conversation inside a
//! transaction on the writer thread, so sequence numbers are gap-free and
//! strictly increasing. `created_at` never moves backwards within a
//! conversation even if the wall clock does.

use leadline_core::{
    AppendOutcome, DeliveryStatus, Direction, InboundRecord, LeadlineError, MediaAttachment,
    Message, NewMessage, StatusChange,
};
use rusqlite::{Connection, OptionalExtension, Row, params};
use tracing::warn;
use uuid::Uuid;

use super::conversations::find_or_create_in;
use super::{NOW, parse_column};
use crate::database::{Database, map_tr_err};

const MESSAGE_COLUMNS: &str = "id, conversation_id, sequence, sender, direction, body, status, \
     provider_message_id, media_url, media_content_type, error, created_at";

fn row_to_message(row: &Row<'_>) -> rusqlite::Result<Message> {
    let media_url: Option<String> = row.get(8)?;
    let media_content_type: Option<String> = row.get(9)?;
    Ok(Message {
        id: row.get(0)?,
        conversation_id: row.get(1)?,
        sequence: row.get(2)?,
        sender: parse_column(row, 3)?,
        direction: parse_column(row, 4)?,
        body: row.get(5)?,
        status: parse_column(row, 6)?,
        provider_message_id: row.get(7)?,
        media: media_url.map(|url| MediaAttachment {
            url,
            content_type: media_content_type,
        }),
        error: row.get(10)?,
        created_at: row.get(11)?,
    })
}

fn get_message_in(conn: &Connection, id: &str) -> rusqlite::Result<Option<Message>> {
    conn.query_row(
        &format!("SELECT {MESSAGE_COLUMNS} FROM messages WHERE id = ?1"),
        params![id],
        row_to_message,
    )
    .optional()
}

fn inbound_duplicate_in(
    conn: &Connection,
    conversation_id: &str,
    provider_message_id: &str,
) -> rusqlite::Result<Option<Message>> {
    conn.query_row(
        &format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages
             WHERE conversation_id = ?1 AND provider_message_id = ?2 AND direction = 'INBOUND'"
        ),
        params![conversation_id, provider_message_id],
        row_to_message,
    )
    .optional()
}

/// Append within an open transaction. `None` means the conversation does not exist.
pub(crate) fn append_in(
    conn: &Connection,
    conversation_id: &str,
    message: &NewMessage,
) -> rusqlite::Result<Option<AppendOutcome>> {
    if message.direction == Direction::Inbound
        && let Some(provider_id) = &message.provider_message_id
        && let Some(existing) = inbound_duplicate_in(conn, conversation_id, provider_id)?
    {
        return Ok(Some(AppendOutcome::Duplicate(existing)));
    }

    let id = Uuid::new_v4().to_string();
    let (media_url, media_type) = match &message.media {
        Some(m) => (Some(m.url.as_str()), m.content_type.as_deref()),
        None => (None, None),
    };

    let inserted = conn.execute(
        &format!(
            "INSERT INTO messages (id, conversation_id, sequence, sender, direction, body, status,
                                   provider_message_id, media_url, media_content_type,
                                   created_at, updated_at)
             SELECT ?1, c.id,
                    COALESCE((SELECT MAX(sequence) FROM messages WHERE conversation_id = c.id), 0) + 1,
                    ?3, ?4, ?5, ?6, ?7, ?8, ?9,
                    MAX({NOW}, COALESCE((SELECT MAX(created_at) FROM messages
                                         WHERE conversation_id = c.id), '')),
                    {NOW}
             FROM conversations c WHERE c.id = ?2"
        ),
        params![
            id,
            conversation_id,
            message.sender.to_string(),
            message.direction.to_string(),
            message.body,
            message.status.to_string(),
            message.provider_message_id,
            media_url,
            media_type,
        ],
    )?;
    if inserted == 0 {
        return Ok(None);
    }

    conn.execute(
        "UPDATE conversations SET updated_at = (SELECT created_at FROM messages WHERE id = ?1)
         WHERE id = ?2",
        params![id, conversation_id],
    )?;

    let stored = get_message_in(conn, &id)?.ok_or(rusqlite::Error::QueryReturnedNoRows)?;
    Ok(Some(AppendOutcome::Appended(stored)))
}

pub async fn append_message(
    db: &Database,
    conversation_id: &str,
    message: NewMessage,
) -> Result<AppendOutcome, LeadlineError> {
    let cid = conversation_id.to_string();
    let outcome = db
        .connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let outcome = append_in(&tx, &cid, &message)?;
            tx.commit()?;
            Ok(outcome)
        })
        .await
        .map_err(map_tr_err)?;

    outcome.ok_or_else(|| LeadlineError::NotFound {
        entity: "conversation",
        key: conversation_id.to_string(),
    })
}

/// Resolve the active conversation and append the inbound message in one transaction.
pub async fn record_inbound(
    db: &Database,
    tenant_id: &str,
    lead_id: &str,
    agent_id: &str,
    message: NewMessage,
) -> Result<InboundRecord, LeadlineError> {
    let (tenant_id, lead_id, agent_id) =
        (tenant_id.to_string(), lead_id.to_string(), agent_id.to_string());
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let (conversation, created) = find_or_create_in(&tx, &tenant_id, &lead_id, &agent_id)?;
            let outcome =
                append_in(&tx, &conversation.id, &message)?.ok_or(rusqlite::Error::QueryReturnedNoRows)?;
            tx.commit()?;
            // Re-read so `updated_at` reflects the append.
            let conversation = super::conversations::get_conversation_in(conn, &conversation.id)?
                .unwrap_or(conversation);
            Ok(InboundRecord {
                conversation,
                conversation_created: created,
                outcome,
            })
        })
        .await
        .map_err(map_tr_err)
}

enum Transition {
    Applied,
    Missing,
    Rejected(DeliveryStatus),
    MissingProviderId,
}

/// Apply a one-way delivery status transition. Returns whether it was applied.
pub async fn update_message_status(
    db: &Database,
    message_id: &str,
    change: StatusChange,
) -> Result<bool, LeadlineError> {
    let id = message_id.to_string();
    let target = change.status;
    let result = db
        .connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let current: Option<String> = tx
                .query_row(
                    "SELECT status FROM messages WHERE id = ?1",
                    params![id],
                    |row| row.get(0),
                )
                .optional()?;
            let Some(current) = current else {
                return Ok(Transition::Missing);
            };
            let current: DeliveryStatus = current.parse().map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(
                    0,
                    rusqlite::types::Type::Text,
                    Box::new(e),
                )
            })?;
            if !current.can_transition_to(change.status) {
                return Ok(Transition::Rejected(current));
            }
            if change.status == DeliveryStatus::Sent && change.provider_message_id.is_none() {
                return Ok(Transition::MissingProviderId);
            }

            tx.execute(
                &format!(
                    "UPDATE messages
                     SET status = ?1,
                         provider_message_id = COALESCE(?2, provider_message_id),
                         error = COALESCE(?3, error),
                         updated_at = {NOW}
                     WHERE id = ?4"
                ),
                params![
                    change.status.to_string(),
                    change.provider_message_id,
                    change.error,
                    id
                ],
            )?;
            tx.commit()?;
            Ok(Transition::Applied)
        })
        .await
        .map_err(map_tr_err)?;

    match result {
        Transition::Applied => Ok(true),
        Transition::Missing => {
            warn!(message_id, "status update for unknown message");
            Ok(false)
        }
        Transition::Rejected(from) => {
            warn!(message_id, %from, to = %target, "illegal delivery status transition ignored");
            Ok(false)
        }
        Transition::MissingProviderId => {
            warn!(message_id, "refusing to mark message sent without a provider id");
            Ok(false)
        }
    }
}

pub async fn get_message(db: &Database, id: &str) -> Result<Option<Message>, LeadlineError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| get_message_in(conn, &id))
        .await
        .map_err(map_tr_err)
}

pub async fn outbound_by_provider_id(
    db: &Database,
    provider_message_id: &str,
) -> Result<Option<Message>, LeadlineError> {
    let pid = provider_message_id.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                &format!(
                    "SELECT {MESSAGE_COLUMNS} FROM messages
                     WHERE provider_message_id = ?1 AND direction = 'OUTBOUND'
                     ORDER BY created_at DESC LIMIT 1"
                ),
                params![pid],
                row_to_message,
            )
            .optional()
        })
        .await
        .map_err(map_tr_err)
}

pub async fn list_messages(
    db: &Database,
    conversation_id: &str,
) -> Result<Vec<Message>, LeadlineError> {
    let cid = conversation_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {MESSAGE_COLUMNS} FROM messages WHERE conversation_id = ?1 ORDER BY sequence ASC"
            ))?;
            let rows = stmt.query_map(params![cid], row_to_message)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

/// The `limit` most recent messages, returned oldest first.
pub async fn recent_messages(
    db: &Database,
    conversation_id: &str,
    limit: usize,
) -> Result<Vec<Message>, LeadlineError> {
    let cid = conversation_id.to_string();
    let limit = i64::try_from(limit).unwrap_or(i64::MAX);
    let mut messages = db
        .connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {MESSAGE_COLUMNS} FROM messages WHERE conversation_id = ?1
                 ORDER BY sequence DESC LIMIT ?2"
            ))?;
            let rows = stmt.query_map(params![cid, limit], row_to_message)?;
            rows.collect::<Result<Vec<_>, _>>()
        })
        .await
        .map_err(map_tr_err)?;
    messages.reverse();
    Ok(messages)
}
