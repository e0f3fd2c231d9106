// SPDX-FileCopyrightText: 2026 Kontak Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Delivery-status reconciliation.
//!
//! Provider callbacks arrive late, repeated, and out of order. The message
//! state machine is forward-only, so a callback is applied exactly when
//! `MessageStatus::can_transition` allows it; everything else is a logged
//! no-op.

use kontak_core::KontakError;
use kontak_core::types::{MessageStatus, StatusEvent};
use kontak_storage::Database;
use kontak_storage::queries::campaigns::CampaignCounter;
use kontak_storage::queries::{campaigns, messages};
use tracing::{debug, info, warn};

/// What a status callback did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// The status moved forward.
    Applied,
    /// The callback was late, repeated, or backwards; nothing changed.
    Ignored,
    /// No message carries this external id.
    Unknown,
}

/// Apply one delivery-status callback.
pub async fn apply_status_event(
    db: &Database,
    event: StatusEvent,
) -> Result<ReconcileOutcome, KontakError> {
    let Some(message) = messages::find_by_external_id(db, &event.external_id).await? else {
        warn!(external_id = %event.external_id, "status callback for unknown message");
        return Ok(ReconcileOutcome::Unknown);
    };

    if !message.status.can_transition(event.status) {
        debug!(
            message_id = %message.id,
            from = %message.status,
            to = %event.status,
            "status callback ignored by forward-only rule"
        );
        return Ok(ReconcileOutcome::Ignored);
    }

    let error_detail = if event.errors.is_empty() {
        None
    } else {
        Some(
            event
                .errors
                .iter()
                .map(|e| match e.code {
                    Some(code) => format!("{code}: {}", e.title),
                    None => e.title.clone(),
                })
                .collect::<Vec<_>>()
                .join("; "),
        )
    };

    messages::set_status(db, &message.id, event.status, error_detail).await?;
    info!(
        message_id = %message.id,
        from = %message.status,
        to = %event.status,
        "message status reconciled"
    );

    // Campaign sends feed the campaign progress counters.
    if let Some(campaign_id) = &message.campaign_id {
        let counter = match event.status {
            MessageStatus::Delivered => Some(CampaignCounter::Delivered),
            MessageStatus::Read => Some(CampaignCounter::Read),
            MessageStatus::Failed => Some(CampaignCounter::Failed),
            _ => None,
        };
        if let Some(counter) = counter {
            campaigns::increment_counter(db, campaign_id, counter).await?;
        }
    }

    Ok(ReconcileOutcome::Applied)
}

#[cfg(test)]
mod tests {
    use super::*;
    use kontak_core::types::{
        ChannelKind, Conversation, ConversationStatus, Customer, Message, MessageDirection,
        MessageType, StatusErrorDetail,
    };
    use kontak_storage::queries::{conversations, customers};
    use tempfile::tempdir;

    fn make_status(external_id: &str, status: MessageStatus) -> StatusEvent {
        StatusEvent {
            external_id: external_id.to_string(),
            status,
            timestamp: 1_760_000_100,
            errors: vec![],
        }
    }

    async fn setup_db_with_sent_message() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db = Database::open(dir.path().join("test.db").to_str().unwrap())
            .await
            .unwrap();

        let now = "2026-01-01T00:00:00.000Z".to_string();
        customers::create_customer(
            &db,
            &Customer {
                id: "cust-1".to_string(),
                name: "Somchai".to_string(),
                email: None,
                phone: Some("66812345678".to_string()),
                whatsapp_id: Some("66812345678".to_string()),
                preferred_channel: ChannelKind::Whatsapp,
                language: "en".to_string(),
                timezone: "UTC".to_string(),
                is_active: true,
                opt_out: false,
                tags: vec![],
                created_at: now.clone(),
                updated_at: now.clone(),
            },
        )
        .await
        .unwrap();
        conversations::create_conversation(
            &db,
            &Conversation {
                id: "conv-1".to_string(),
                customer_id: "cust-1".to_string(),
                assigned_to: None,
                channel: ChannelKind::Whatsapp,
                status: ConversationStatus::Open,
                unread_count: 0,
                last_message_at: now.clone(),
                closed_at: None,
                subject: None,
                tags: vec![],
                created_at: now.clone(),
                updated_at: now.clone(),
            },
        )
        .await
        .unwrap();
        messages::insert_message(
            &db,
            &Message {
                id: "msg-1".to_string(),
                conversation_id: "conv-1".to_string(),
                sender_user_id: None,
                direction: MessageDirection::Outbound,
                message_type: MessageType::Text,
                content: "hello".to_string(),
                media_url: None,
                status: MessageStatus::Sent,
                external_id: Some("wamid.out1".to_string()),
                template_name: None,
                campaign_id: None,
                error_detail: None,
                provider_meta: None,
                deleted_at: None,
                deleted_by: None,
                created_at: now.clone(),
                updated_at: now,
            },
        )
        .await
        .unwrap();

        (db, dir)
    }

    #[tokio::test]
    async fn forward_callback_applies() {
        let (db, _dir) = setup_db_with_sent_message().await;

        let outcome = apply_status_event(&db, make_status("wamid.out1", MessageStatus::Delivered))
            .await
            .unwrap();
        assert_eq!(outcome, ReconcileOutcome::Applied);

        let message = messages::get_message(&db, "msg-1").await.unwrap().unwrap();
        assert_eq!(message.status, MessageStatus::Delivered);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn backwards_and_repeated_callbacks_are_ignored() {
        let (db, _dir) = setup_db_with_sent_message().await;

        apply_status_event(&db, make_status("wamid.out1", MessageStatus::Read))
            .await
            .unwrap();

        // Late "delivered" after "read" must not move the status back.
        let outcome = apply_status_event(&db, make_status("wamid.out1", MessageStatus::Delivered))
            .await
            .unwrap();
        assert_eq!(outcome, ReconcileOutcome::Ignored);

        // Replay of "read" is also a no-op (terminal).
        let outcome = apply_status_event(&db, make_status("wamid.out1", MessageStatus::Read))
            .await
            .unwrap();
        assert_eq!(outcome, ReconcileOutcome::Ignored);

        let message = messages::get_message(&db, "msg-1").await.unwrap().unwrap();
        assert_eq!(message.status, MessageStatus::Read);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn unknown_external_id_is_discarded() {
        let (db, _dir) = setup_db_with_sent_message().await;
        let outcome = apply_status_event(&db, make_status("wamid.ghost", MessageStatus::Delivered))
            .await
            .unwrap();
        assert_eq!(outcome, ReconcileOutcome::Unknown);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn failed_callback_records_error_detail() {
        let (db, _dir) = setup_db_with_sent_message().await;

        let event = StatusEvent {
            external_id: "wamid.out1".to_string(),
            status: MessageStatus::Failed,
            timestamp: 1_760_000_100,
            errors: vec![StatusErrorDetail {
                code: Some(131_026),
                title: "Receiver incapable".to_string(),
            }],
        };
        apply_status_event(&db, event).await.unwrap();

        let message = messages::get_message(&db, "msg-1").await.unwrap().unwrap();
        assert_eq!(message.status, MessageStatus::Failed);
        assert_eq!(
            message.error_detail.as_deref(),
            Some("131026: Receiver incapable")
        );

        db.close().await.unwrap();
    }
}
