// SPDX-FileCopyrightText: 2026 Kontak Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Outbound dispatch.
//!
//! Ordering invariant: the pending message row exists BEFORE the provider
//! call, so a crash between the two leaves an auditable `pending` row
//! instead of an untracked send. Validation failures happen before the
//! row is created and leave no trace.

use kontak_core::types::{Message, MessageDirection, MessageStatus, OutboundContent};
use kontak_core::{ChannelGateway, KontakError};
use kontak_storage::Database;
use kontak_storage::queries::{conversations, customers, messages};
use tracing::{error, info, warn};
use uuid::Uuid;

/// One outbound send.
#[derive(Debug, Clone)]
pub struct OutboundRequest {
    pub conversation_id: String,
    pub content: OutboundContent,
    /// Sending agent, when a human triggered it.
    pub sender_user_id: Option<String>,
    /// Set when a campaign run produced this send.
    pub campaign_id: Option<String>,
}

/// Send one message through the channel gateway.
///
/// Returns the stored message in its final state (`sent` on success). On
/// provider failure the row is marked `failed` and the provider error is
/// returned.
pub async fn dispatch(
    db: &Database,
    gateway: &dyn ChannelGateway,
    request: OutboundRequest,
) -> Result<Message, KontakError> {
    let conversation = conversations::get_conversation(db, &request.conversation_id)
        .await?
        .ok_or_else(|| KontakError::NotFound {
            entity: "conversation",
            id: request.conversation_id.clone(),
        })?;

    if conversation.channel != gateway.channel() {
        return Err(KontakError::Unsupported(format!(
            "sending on the {} channel is not implemented",
            conversation.channel
        )));
    }

    let customer = customers::get_customer(db, &conversation.customer_id)
        .await?
        .ok_or_else(|| KontakError::NotFound {
            entity: "customer",
            id: conversation.customer_id.clone(),
        })?;
    let destination = customer.whatsapp_id.clone().ok_or_else(|| {
        KontakError::Validation(format!(
            "customer {} has no whatsapp identity",
            customer.id
        ))
    })?;

    let now = kontak_core::time::now_rfc3339();
    let template_name = match &request.content {
        OutboundContent::Template { name, .. } => Some(name.clone()),
        _ => None,
    };
    let media_url = match &request.content {
        OutboundContent::Media { url, .. } => Some(url.clone()),
        OutboundContent::Document {
            source: kontak_core::types::DocumentSource::Link(url),
            ..
        } => Some(url.clone()),
        _ => None,
    };

    let mut message = Message {
        id: Uuid::new_v4().to_string(),
        conversation_id: conversation.id.clone(),
        sender_user_id: request.sender_user_id.clone(),
        direction: MessageDirection::Outbound,
        message_type: request.content.message_type(),
        content: request.content.body_text(),
        media_url,
        status: MessageStatus::Pending,
        external_id: None,
        template_name,
        campaign_id: request.campaign_id.clone(),
        error_detail: None,
        provider_meta: None,
        deleted_at: None,
        deleted_by: None,
        created_at: now.clone(),
        updated_at: now.clone(),
    };
    messages::insert_message(db, &message).await?;

    match gateway.send(&destination, &request.content).await {
        Ok(receipt) => {
            messages::mark_sent(db, &message.id, &receipt.external_id).await?;
            conversations::touch_outbound(db, &conversation.id, &now).await?;
            info!(
                message_id = %message.id,
                external_id = %receipt.external_id,
                conversation_id = %conversation.id,
                "outbound message sent"
            );
            message.status = MessageStatus::Sent;
            message.external_id = Some(receipt.external_id);
            Ok(message)
        }
        Err(send_err) => {
            warn!(
                message_id = %message.id,
                conversation_id = %conversation.id,
                error = %send_err,
                "outbound send failed"
            );
            if let Err(mark_err) =
                messages::mark_failed(db, &message.id, &send_err.to_string()).await
            {
                error!(
                    message_id = %message.id,
                    error = %mark_err,
                    "failed to record send failure"
                );
            }
            Err(send_err)
        }
    }
}
