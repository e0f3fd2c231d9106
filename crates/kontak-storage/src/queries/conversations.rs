// SPDX-FileCopyrightText: 2026 Kontak Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation CRUD and lifecycle updates.
//!
//! A partial unique index guarantees at most one live (not closed, not
//! archived) conversation per customer per channel; racing creates surface
//! as a `Conflict` here instead of producing duplicate threads.

use kontak_core::KontakError;
use kontak_core::types::{ChannelKind, Conversation, ConversationStatus};
use rusqlite::{OptionalExtension, params};

use crate::database::{Database, is_unique_violation, map_tr_err};

pub(crate) const CONVERSATION_COLS: &str = "id, customer_id, assigned_to, channel, status, \
     unread_count, last_message_at, closed_at, subject, tags, created_at, updated_at";

pub(crate) fn row_to_conversation(row: &rusqlite::Row<'_>) -> rusqlite::Result<Conversation> {
    Ok(Conversation {
        id: row.get(0)?,
        customer_id: row.get(1)?,
        assigned_to: row.get(2)?,
        channel: super::parse_enum(row.get::<_, String>(3)?, 3)?,
        status: super::parse_enum(row.get::<_, String>(4)?, 4)?,
        unread_count: row.get(5)?,
        last_message_at: row.get(6)?,
        closed_at: row.get(7)?,
        subject: row.get(8)?,
        tags: super::parse_json(row.get::<_, String>(9)?, 9)?,
        created_at: row.get(10)?,
        updated_at: row.get(11)?,
    })
}

pub(crate) fn insert_conversation_tx(
    conn: &rusqlite::Connection,
    conversation: &Conversation,
) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO conversations (id, customer_id, assigned_to, channel, status, \
         unread_count, last_message_at, closed_at, subject, tags, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        params![
            conversation.id,
            conversation.customer_id,
            conversation.assigned_to,
            conversation.channel.to_string(),
            conversation.status.to_string(),
            conversation.unread_count,
            conversation.last_message_at,
            conversation.closed_at,
            conversation.subject,
            super::to_json(&conversation.tags)?,
            conversation.created_at,
            conversation.updated_at,
        ],
    )?;
    Ok(())
}

pub(crate) fn find_live_for_customer_tx(
    conn: &rusqlite::Connection,
    customer_id: &str,
    channel: ChannelKind,
) -> rusqlite::Result<Option<Conversation>> {
    conn.query_row(
        &format!(
            "SELECT {CONVERSATION_COLS} FROM conversations \
             WHERE customer_id = ?1 AND channel = ?2 \
             AND status NOT IN ('closed', 'archived')"
        ),
        params![customer_id, channel.to_string()],
        row_to_conversation,
    )
    .optional()
}

/// Insert a new conversation. A second live conversation for the same
/// customer and channel is a conflict.
pub async fn create_conversation(
    db: &Database,
    conversation: &Conversation,
) -> Result<(), KontakError> {
    let conversation = conversation.clone();
    db.connection()
        .call(move |conn| {
            insert_conversation_tx(conn, &conversation)?;
            Ok(())
        })
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                KontakError::Conflict(
                    "customer already has a live conversation on this channel".into(),
                )
            } else {
                map_tr_err(e)
            }
        })
}

pub async fn get_conversation(
    db: &Database,
    id: &str,
) -> Result<Option<Conversation>, KontakError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let conversation = conn
                .query_row(
                    &format!("SELECT {CONVERSATION_COLS} FROM conversations WHERE id = ?1"),
                    params![id],
                    row_to_conversation,
                )
                .optional()?;
            Ok(conversation)
        })
        .await
        .map_err(map_tr_err)
}

/// The live conversation for a customer on a channel, if any. The partial
/// unique index guarantees at most one.
pub async fn find_live_for_customer(
    db: &Database,
    customer_id: &str,
    channel: ChannelKind,
) -> Result<Option<Conversation>, KontakError> {
    let customer_id = customer_id.to_string();
    db.connection()
        .call(move |conn| {
            let conversation = find_live_for_customer_tx(conn, &customer_id, channel)?;
            Ok(conversation)
        })
        .await
        .map_err(map_tr_err)
}

/// List filter for conversations. `None` fields are unconstrained, except
/// that archived conversations are hidden unless asked for explicitly.
#[derive(Debug, Clone, Default)]
pub struct ConversationFilter {
    pub status: Option<ConversationStatus>,
    pub customer_id: Option<String>,
    pub include_archived: bool,
}

/// List conversations, most recently active first.
pub async fn list_conversations(
    db: &Database,
    filter: ConversationFilter,
    limit: i64,
    offset: i64,
) -> Result<Vec<Conversation>, KontakError> {
    db.connection()
        .call(move |conn| {
            let mut sql = format!("SELECT {CONVERSATION_COLS} FROM conversations");
            let mut clauses = Vec::new();
            let mut bind: Vec<rusqlite::types::Value> = Vec::new();

            if let Some(status) = filter.status {
                bind.push(status.to_string().into());
                clauses.push(format!("status = ?{}", bind.len()));
            } else if !filter.include_archived {
                clauses.push("status != 'archived'".to_string());
            }
            if let Some(customer_id) = filter.customer_id {
                bind.push(customer_id.into());
                clauses.push(format!("customer_id = ?{}", bind.len()));
            }
            if !clauses.is_empty() {
                sql.push_str(" WHERE ");
                sql.push_str(&clauses.join(" AND "));
            }
            bind.push(limit.into());
            sql.push_str(&format!(" ORDER BY last_message_at DESC LIMIT ?{}", bind.len()));
            bind.push(offset.into());
            sql.push_str(&format!(" OFFSET ?{}", bind.len()));

            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(rusqlite::params_from_iter(bind), row_to_conversation)?;
            let mut conversations = Vec::new();
            for row in rows {
                conversations.push(row?);
            }
            Ok(conversations)
        })
        .await
        .map_err(map_tr_err)
}

/// Apply a status change. The caller is responsible for routing the change
/// through `ConversationStatus::can_transition` first.
///
/// Entering closed or archived stamps `closed_at`; reopening clears it.
pub async fn set_status(
    db: &Database,
    id: &str,
    status: ConversationStatus,
) -> Result<(), KontakError> {
    let id = id.to_string();
    let id_for_err = id.clone();
    let changed = db
        .connection()
        .call(move |conn| {
            let now = kontak_core::time::now_rfc3339();
            let closed_at = if status.is_closed() { Some(now.clone()) } else { None };
            let changed = conn.execute(
                "UPDATE conversations SET status = ?2, closed_at = ?3, updated_at = ?4 \
                 WHERE id = ?1",
                params![id, status.to_string(), closed_at, now],
            )?;
            Ok(changed)
        })
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                // Reopening while another live conversation exists for the
                // same customer and channel.
                KontakError::Conflict(
                    "customer already has a live conversation on this channel".into(),
                )
            } else {
                map_tr_err(e)
            }
        })?;
    if changed == 0 {
        return Err(KontakError::NotFound {
            entity: "conversation",
            id: id_for_err,
        });
    }
    Ok(())
}

/// Update agent-editable fields (assignment, subject, tags).
pub async fn update_conversation(
    db: &Database,
    conversation: &Conversation,
) -> Result<(), KontakError> {
    let conversation = conversation.clone();
    let id = conversation.id.clone();
    let changed = db
        .connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE conversations SET assigned_to = ?2, subject = ?3, tags = ?4, \
                 updated_at = ?5 WHERE id = ?1",
                params![
                    conversation.id,
                    conversation.assigned_to,
                    conversation.subject,
                    super::to_json(&conversation.tags)?,
                    kontak_core::time::now_rfc3339(),
                ],
            )?;
            Ok(changed)
        })
        .await
        .map_err(map_tr_err)?;
    if changed == 0 {
        return Err(KontakError::NotFound {
            entity: "conversation",
            id,
        });
    }
    Ok(())
}

/// Reset the unread counter after an agent has viewed the thread.
pub async fn mark_read(db: &Database, id: &str) -> Result<(), KontakError> {
    let id = id.to_string();
    let id_for_err = id.clone();
    let changed = db
        .connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE conversations SET unread_count = 0, updated_at = ?2 WHERE id = ?1",
                params![id, kontak_core::time::now_rfc3339()],
            )?;
            Ok(changed)
        })
        .await
        .map_err(map_tr_err)?;
    if changed == 0 {
        return Err(KontakError::NotFound {
            entity: "conversation",
            id: id_for_err,
        });
    }
    Ok(())
}

/// Stamp activity after an outbound send.
pub async fn touch_outbound(db: &Database, id: &str, at: &str) -> Result<(), KontakError> {
    let id = id.to_string();
    let at = at.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE conversations SET last_message_at = ?2, updated_at = ?2 WHERE id = ?1",
                params![id, at],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::queries::customers::{create_customer, tests::make_customer};
    use tempfile::tempdir;

    pub(crate) fn make_conversation(id: &str, customer_id: &str) -> Conversation {
        Conversation {
            id: id.to_string(),
            customer_id: customer_id.to_string(),
            assigned_to: None,
            channel: ChannelKind::Whatsapp,
            status: ConversationStatus::Open,
            unread_count: 0,
            last_message_at: "2026-01-01T00:00:00.000Z".to_string(),
            closed_at: None,
            subject: None,
            tags: vec![],
            created_at: "2026-01-01T00:00:00.000Z".to_string(),
            updated_at: "2026-01-01T00:00:00.000Z".to_string(),
        }
    }

    async fn setup_db_with_customer() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        create_customer(&db, &make_customer("cust-1", Some("66812345678")))
            .await
            .unwrap();
        (db, dir)
    }

    #[tokio::test]
    async fn second_live_conversation_is_conflict() {
        let (db, _dir) = setup_db_with_customer().await;

        create_conversation(&db, &make_conversation("conv-1", "cust-1"))
            .await
            .unwrap();
        let err = create_conversation(&db, &make_conversation("conv-2", "cust-1"))
            .await
            .unwrap_err();
        assert!(matches!(err, KontakError::Conflict(_)));

        // Closing the first frees the slot.
        set_status(&db, "conv-1", ConversationStatus::Closed)
            .await
            .unwrap();
        create_conversation(&db, &make_conversation("conv-2", "cust-1"))
            .await
            .unwrap();

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn close_stamps_closed_at_and_reopen_clears_it() {
        let (db, _dir) = setup_db_with_customer().await;
        create_conversation(&db, &make_conversation("conv-1", "cust-1"))
            .await
            .unwrap();

        set_status(&db, "conv-1", ConversationStatus::Closed)
            .await
            .unwrap();
        let conversation = get_conversation(&db, "conv-1").await.unwrap().unwrap();
        assert_eq!(conversation.status, ConversationStatus::Closed);
        assert!(conversation.closed_at.is_some());

        set_status(&db, "conv-1", ConversationStatus::Open)
            .await
            .unwrap();
        let conversation = get_conversation(&db, "conv-1").await.unwrap().unwrap();
        assert_eq!(conversation.status, ConversationStatus::Open);
        assert!(conversation.closed_at.is_none());

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn list_filters_by_status() {
        let (db, _dir) = setup_db_with_customer().await;
        create_customer(&db, &make_customer("cust-2", Some("66810000002")))
            .await
            .unwrap();

        create_conversation(&db, &make_conversation("conv-1", "cust-1"))
            .await
            .unwrap();
        create_conversation(&db, &make_conversation("conv-2", "cust-2"))
            .await
            .unwrap();
        set_status(&db, "conv-2", ConversationStatus::Closed)
            .await
            .unwrap();

        let open = list_conversations(
            &db,
            ConversationFilter {
                status: Some(ConversationStatus::Open),
                ..ConversationFilter::default()
            },
            50,
            0,
        )
        .await
        .unwrap();
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].id, "conv-1");

        let all = list_conversations(&db, ConversationFilter::default(), 50, 0)
            .await
            .unwrap();
        assert_eq!(all.len(), 2);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn mark_read_resets_unread_count() {
        let (db, _dir) = setup_db_with_customer().await;
        let mut conversation = make_conversation("conv-1", "cust-1");
        conversation.unread_count = 4;
        create_conversation(&db, &conversation).await.unwrap();

        mark_read(&db, "conv-1").await.unwrap();
        let conversation = get_conversation(&db, "conv-1").await.unwrap().unwrap();
        assert_eq!(conversation.unread_count, 0);

        db.close().await.unwrap();
    }
}
