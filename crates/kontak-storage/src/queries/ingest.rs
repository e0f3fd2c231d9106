// SPDX-FileCopyrightText: 2026 Kontak Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Atomic inbound ingestion.
//!
//! One transaction covers dedupe, customer resolution, conversation routing,
//! message insert, and the unread/activity bump. Either the full chain
//! commits or nothing is written; a crash mid-ingestion leaves no partial
//! state, and the provider's retry replays cleanly.

use kontak_core::KontakError;
use kontak_core::types::{
    ChannelKind, Conversation, ConversationStatus, Customer, InboundEvent, Message,
    MessageDirection, MessageStatus, ProviderMeta,
};
use rusqlite::{OptionalExtension, params};

use crate::database::{Database, is_unique_violation, map_tr_err};
use crate::queries::conversations::{find_live_for_customer_tx, insert_conversation_tx};
use crate::queries::customers::{CUSTOMER_COLS, insert_customer_tx, row_to_customer};
use crate::queries::messages::insert_message_tx;

/// Pre-generated ids for the rows ingestion may create. Unused ids are
/// simply discarded.
#[derive(Debug, Clone)]
pub struct IngestIds {
    pub customer_id: String,
    pub conversation_id: String,
    pub message_id: String,
}

/// Result of one inbound ingestion attempt.
#[derive(Debug, Clone)]
pub enum IngestOutcome {
    /// The event was new; these rows now exist (customer and conversation
    /// may be pre-existing).
    Created {
        customer: Customer,
        conversation: Conversation,
        message: Message,
        customer_created: bool,
        conversation_created: bool,
    },
    /// A message with this external id already exists. Nothing was written.
    Duplicate,
}

/// Ingest one inbound provider event atomically.
///
/// Inbound messages are stored as `delivered` (the provider only forwards
/// what it already delivered to us). Routing targets the customer's live
/// conversation on the channel, creating one when none exists.
pub async fn ingest_inbound(
    db: &Database,
    channel: ChannelKind,
    event: InboundEvent,
    ids: IngestIds,
) -> Result<IngestOutcome, KontakError> {
    let result = db
        .connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let now = kontak_core::time::now_rfc3339();
            let event_at = kontak_core::time::unix_to_rfc3339(event.timestamp);

            // Dedupe on the provider id before writing anything.
            let duplicate = tx
                .query_row(
                    "SELECT 1 FROM messages WHERE external_id = ?1",
                    params![event.external_id],
                    |_| Ok(()),
                )
                .optional()?
                .is_some();
            if duplicate {
                return Ok(IngestOutcome::Duplicate);
            }

            // Resolve or create the customer by channel identity.
            let existing: Option<Customer> = tx
                .query_row(
                    &format!("SELECT {CUSTOMER_COLS} FROM customers WHERE whatsapp_id = ?1"),
                    params![event.from_id],
                    row_to_customer,
                )
                .optional()?;
            let customer_created = existing.is_none();
            let customer = match existing {
                Some(customer) => customer,
                None => {
                    let customer = Customer {
                        id: ids.customer_id.clone(),
                        name: if event.from_name.is_empty() {
                            event.from_id.clone()
                        } else {
                            event.from_name.clone()
                        },
                        email: None,
                        phone: Some(event.from_id.clone()),
                        whatsapp_id: Some(event.from_id.clone()),
                        preferred_channel: channel,
                        language: "en".to_string(),
                        timezone: "UTC".to_string(),
                        is_active: true,
                        opt_out: false,
                        tags: vec![],
                        created_at: now.clone(),
                        updated_at: now.clone(),
                    };
                    insert_customer_tx(&tx, &customer)?;
                    customer
                }
            };

            // Route to the live conversation, or open a new one.
            let existing = find_live_for_customer_tx(&tx, &customer.id, channel)?;
            let conversation_created = existing.is_none();
            let mut conversation = match existing {
                Some(conversation) => conversation,
                None => {
                    let conversation = Conversation {
                        id: ids.conversation_id.clone(),
                        customer_id: customer.id.clone(),
                        assigned_to: None,
                        channel,
                        status: ConversationStatus::Open,
                        unread_count: 0,
                        last_message_at: event_at.clone(),
                        closed_at: None,
                        subject: None,
                        tags: vec![],
                        created_at: now.clone(),
                        updated_at: now.clone(),
                    };
                    insert_conversation_tx(&tx, &conversation)?;
                    conversation
                }
            };

            let provider_meta = ProviderMeta {
                reply_to: event.reply_to.clone(),
                timestamp: Some(event.timestamp),
                raw: None,
            };
            let message = Message {
                id: ids.message_id.clone(),
                conversation_id: conversation.id.clone(),
                sender_user_id: None,
                direction: MessageDirection::Inbound,
                message_type: event.message_type,
                content: event.content.clone(),
                media_url: event.media_url.clone(),
                status: MessageStatus::Delivered,
                external_id: Some(event.external_id.clone()),
                template_name: None,
                campaign_id: None,
                error_detail: None,
                provider_meta: Some(provider_meta),
                deleted_at: None,
                deleted_by: None,
                created_at: event_at.clone(),
                updated_at: event_at.clone(),
            };
            insert_message_tx(&tx, &message)?;

            tx.execute(
                "UPDATE conversations SET unread_count = unread_count + 1, \
                 last_message_at = ?2, updated_at = ?3 WHERE id = ?1",
                params![conversation.id, event_at, now],
            )?;
            conversation.unread_count += 1;
            conversation.last_message_at = event_at;
            conversation.updated_at = now;

            tx.commit()?;
            Ok(IngestOutcome::Created {
                customer,
                conversation,
                message,
                customer_created,
                conversation_created,
            })
        })
        .await;

    match result {
        Ok(outcome) => Ok(outcome),
        // A duplicate that slipped past the pre-check still hits the
        // unique external_id index; same answer either way.
        Err(e) if is_unique_violation(&e) => Ok(IngestOutcome::Duplicate),
        Err(e) => Err(map_tr_err(e)),
    }
}
