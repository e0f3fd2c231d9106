// SPDX-FileCopyrightText: 2026 Kontak Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Inbound event ingestion.
//!
//! Thin layer over the storage transaction: generates row ids, delegates
//! to the atomic ingest, and logs the outcome.

use kontak_core::KontakError;
use kontak_core::types::{ChannelKind, InboundEvent};
use kontak_storage::{Database, IngestIds, IngestOutcome};
use tracing::{debug, info};
use uuid::Uuid;

/// Ingest one parsed inbound event.
///
/// Idempotent: replays of an already-stored external id return
/// [`IngestOutcome::Duplicate`] without writing.
pub async fn ingest_event(
    db: &Database,
    channel: ChannelKind,
    event: InboundEvent,
) -> Result<IngestOutcome, KontakError> {
    let external_id = event.external_id.clone();
    let ids = IngestIds {
        customer_id: Uuid::new_v4().to_string(),
        conversation_id: Uuid::new_v4().to_string(),
        message_id: Uuid::new_v4().to_string(),
    };

    let outcome = kontak_storage::queries::ingest::ingest_inbound(db, channel, event, ids).await?;

    match &outcome {
        IngestOutcome::Created {
            customer,
            conversation,
            message,
            customer_created,
            conversation_created,
        } => {
            info!(
                external_id = %external_id,
                customer_id = %customer.id,
                conversation_id = %conversation.id,
                message_id = %message.id,
                customer_created,
                conversation_created,
                "inbound message ingested"
            );
        }
        IngestOutcome::Duplicate => {
            debug!(external_id = %external_id, "duplicate inbound message discarded");
        }
    }
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use kontak_core::types::MessageType;
    use tempfile::tempdir;

    fn make_event(external_id: &str) -> InboundEvent {
        InboundEvent {
            external_id: external_id.to_string(),
            from_id: "66812345678".to_string(),
            from_name: "Somchai".to_string(),
            timestamp: 1_760_000_000,
            message_type: MessageType::Text,
            content: "hello".to_string(),
            media_url: None,
            reply_to: None,
        }
    }

    #[tokio::test]
    async fn replay_is_idempotent() {
        let dir = tempdir().unwrap();
        let db = Database::open(dir.path().join("test.db").to_str().unwrap())
            .await
            .unwrap();

        let first = ingest_event(&db, ChannelKind::Whatsapp, make_event("wamid.1"))
            .await
            .unwrap();
        assert!(matches!(first, IngestOutcome::Created { .. }));

        let replay = ingest_event(&db, ChannelKind::Whatsapp, make_event("wamid.1"))
            .await
            .unwrap();
        assert!(matches!(replay, IngestOutcome::Duplicate));

        db.close().await.unwrap();
    }
}
