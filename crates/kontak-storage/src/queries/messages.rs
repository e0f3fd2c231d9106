// SPDX-FileCopyrightText: 2026 Kontak Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message CRUD, status updates, and soft deletion.

use kontak_core::KontakError;
use kontak_core::types::{Message, MessageStatus};
use rusqlite::{OptionalExtension, params};

use crate::database::{Database, is_unique_violation, map_tr_err};

pub(crate) const MESSAGE_COLS: &str = "id, conversation_id, sender_user_id, direction, \
     message_type, content, media_url, status, external_id, template_name, campaign_id, \
     error_detail, provider_meta, deleted_at, deleted_by, created_at, updated_at";

pub(crate) fn row_to_message(row: &rusqlite::Row<'_>) -> rusqlite::Result<Message> {
    Ok(Message {
        id: row.get(0)?,
        conversation_id: row.get(1)?,
        sender_user_id: row.get(2)?,
        direction: super::parse_enum(row.get::<_, String>(3)?, 3)?,
        message_type: super::parse_enum(row.get::<_, String>(4)?, 4)?,
        content: row.get(5)?,
        media_url: row.get(6)?,
        status: super::parse_enum(row.get::<_, String>(7)?, 7)?,
        external_id: row.get(8)?,
        template_name: row.get(9)?,
        campaign_id: row.get(10)?,
        error_detail: row.get(11)?,
        provider_meta: super::parse_json_opt(row.get::<_, Option<String>>(12)?, 12)?,
        deleted_at: row.get(13)?,
        deleted_by: row.get(14)?,
        created_at: row.get(15)?,
        updated_at: row.get(16)?,
    })
}

pub(crate) fn insert_message_tx(
    conn: &rusqlite::Connection,
    message: &Message,
) -> rusqlite::Result<()> {
    let provider_meta = message
        .provider_meta
        .as_ref()
        .map(super::to_json)
        .transpose()?;
    conn.execute(
        "INSERT INTO messages (id, conversation_id, sender_user_id, direction, message_type, \
         content, media_url, status, external_id, template_name, campaign_id, error_detail, \
         provider_meta, deleted_at, deleted_by, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)",
        params![
            message.id,
            message.conversation_id,
            message.sender_user_id,
            message.direction.to_string(),
            message.message_type.to_string(),
            message.content,
            message.media_url,
            message.status.to_string(),
            message.external_id,
            message.template_name,
            message.campaign_id,
            message.error_detail,
            provider_meta,
            message.deleted_at,
            message.deleted_by,
            message.created_at,
            message.updated_at,
        ],
    )?;
    Ok(())
}

/// Insert a new message. A duplicate `external_id` is a conflict.
pub async fn insert_message(db: &Database, message: &Message) -> Result<(), KontakError> {
    let message = message.clone();
    db.connection()
        .call(move |conn| {
            insert_message_tx(conn, &message)?;
            Ok(())
        })
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                KontakError::Conflict("a message with this external_id already exists".into())
            } else {
                map_tr_err(e)
            }
        })
}

pub async fn get_message(db: &Database, id: &str) -> Result<Option<Message>, KontakError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let message = conn
                .query_row(
                    &format!("SELECT {MESSAGE_COLS} FROM messages WHERE id = ?1"),
                    params![id],
                    row_to_message,
                )
                .optional()?;
            Ok(message)
        })
        .await
        .map_err(map_tr_err)
}

/// Look up by provider id, used for webhook dedupe and status correlation.
pub async fn find_by_external_id(
    db: &Database,
    external_id: &str,
) -> Result<Option<Message>, KontakError> {
    let external_id = external_id.to_string();
    db.connection()
        .call(move |conn| {
            let message = conn
                .query_row(
                    &format!("SELECT {MESSAGE_COLS} FROM messages WHERE external_id = ?1"),
                    params![external_id],
                    row_to_message,
                )
                .optional()?;
            Ok(message)
        })
        .await
        .map_err(map_tr_err)
}

/// Messages of a conversation in chronological order, soft-deleted rows
/// excluded.
pub async fn list_for_conversation(
    db: &Database,
    conversation_id: &str,
    limit: i64,
    offset: i64,
) -> Result<Vec<Message>, KontakError> {
    let conversation_id = conversation_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {MESSAGE_COLS} FROM messages \
                 WHERE conversation_id = ?1 AND deleted_at IS NULL \
                 ORDER BY created_at ASC LIMIT ?2 OFFSET ?3"
            ))?;
            let rows = stmt.query_map(params![conversation_id, limit, offset], row_to_message)?;
            let mut messages = Vec::new();
            for row in rows {
                messages.push(row?);
            }
            Ok(messages)
        })
        .await
        .map_err(map_tr_err)
}

/// Record a successful provider handoff: pending -> sent plus the
/// provider-assigned id.
pub async fn mark_sent(db: &Database, id: &str, external_id: &str) -> Result<(), KontakError> {
    let id = id.to_string();
    let external_id = external_id.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE messages SET status = 'sent', external_id = ?2, updated_at = ?3 \
                 WHERE id = ?1",
                params![id, external_id, kontak_core::time::now_rfc3339()],
            )?;
            Ok(())
        })
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                KontakError::Conflict("a message with this external_id already exists".into())
            } else {
                map_tr_err(e)
            }
        })
}

/// Record a failed provider handoff.
pub async fn mark_failed(db: &Database, id: &str, error_detail: &str) -> Result<(), KontakError> {
    let id = id.to_string();
    let error_detail = error_detail.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE messages SET status = 'failed', error_detail = ?2, updated_at = ?3 \
                 WHERE id = ?1",
                params![id, error_detail, kontak_core::time::now_rfc3339()],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Apply a reconciled delivery status. The caller routes the change through
/// `MessageStatus::can_transition` first.
pub async fn set_status(
    db: &Database,
    id: &str,
    status: MessageStatus,
    error_detail: Option<String>,
) -> Result<(), KontakError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE messages SET status = ?2, error_detail = ?3, updated_at = ?4 \
                 WHERE id = ?1",
                params![
                    id,
                    status.to_string(),
                    error_detail,
                    kontak_core::time::now_rfc3339()
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Mark every delivered inbound message in a conversation as read.
/// Runs when an agent opens the conversation.
pub async fn mark_inbound_read(db: &Database, conversation_id: &str) -> Result<(), KontakError> {
    let conversation_id = conversation_id.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE messages SET status = 'read', updated_at = ?2 \
                 WHERE conversation_id = ?1 AND direction = 'inbound' \
                 AND status = 'delivered'",
                params![conversation_id, kontak_core::time::now_rfc3339()],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Soft-delete a message. Already-deleted messages are left untouched.
pub async fn soft_delete(
    db: &Database,
    id: &str,
    deleted_by: Option<String>,
) -> Result<(), KontakError> {
    let id = id.to_string();
    let id_for_err = id.clone();
    let changed = db
        .connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE messages SET deleted_at = ?2, deleted_by = ?3, updated_at = ?2 \
                 WHERE id = ?1 AND deleted_at IS NULL",
                params![id, kontak_core::time::now_rfc3339(), deleted_by],
            )?;
            Ok(changed)
        })
        .await
        .map_err(map_tr_err)?;
    if changed == 0 {
        return Err(KontakError::NotFound {
            entity: "message",
            id: id_for_err,
        });
    }
    Ok(())
}

/// Whether a campaign already produced a message for this customer.
/// Used to make campaign resume idempotent per recipient.
pub async fn campaign_message_exists(
    db: &Database,
    campaign_id: &str,
    customer_id: &str,
) -> Result<bool, KontakError> {
    let campaign_id = campaign_id.to_string();
    let customer_id = customer_id.to_string();
    db.connection()
        .call(move |conn| {
            let exists = conn
                .query_row(
                    "SELECT 1 FROM messages m \
                     JOIN conversations c ON c.id = m.conversation_id \
                     WHERE m.campaign_id = ?1 AND c.customer_id = ?2 \
                     LIMIT 1",
                    params![campaign_id, customer_id],
                    |_| Ok(()),
                )
                .optional()?;
            Ok(exists.is_some())
        })
        .await
        .map_err(map_tr_err)
}
