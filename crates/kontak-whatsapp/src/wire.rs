// SPDX-FileCopyrightText: 2026 Kontak Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wire types and pure parsers for the WhatsApp Cloud API webhook format.
//!
//! Webhook payloads nest the interesting part three levels deep
//! (`entry[0].changes[0].value`); the value carries either `messages`
//! (inbound) or `statuses` (delivery callbacks). Parsers return `None`
//! for anything else so the webhook handler can acknowledge and move on.

use kontak_core::types::{
    InboundEvent, MessageType, StatusErrorDetail, StatusEvent,
};
use serde::Deserialize;

/// Top-level webhook payload.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookPayload {
    #[serde(default)]
    pub object: Option<String>,
    #[serde(default)]
    pub entry: Vec<WebhookEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEntry {
    #[serde(default)]
    pub changes: Vec<WebhookChange>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookChange {
    #[serde(default)]
    pub value: WebhookValue,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WebhookValue {
    #[serde(default)]
    pub contacts: Vec<WebhookContact>,
    #[serde(default)]
    pub messages: Vec<WebhookMessage>,
    #[serde(default)]
    pub statuses: Vec<WebhookStatus>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookContact {
    #[serde(default)]
    pub wa_id: Option<String>,
    #[serde(default)]
    pub profile: Option<ContactProfile>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContactProfile {
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookMessage {
    pub id: String,
    pub from: String,
    pub timestamp: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub text: Option<TextBody>,
    #[serde(default)]
    pub image: Option<MediaBody>,
    #[serde(default)]
    pub video: Option<MediaBody>,
    #[serde(default)]
    pub audio: Option<MediaBody>,
    #[serde(default)]
    pub document: Option<MediaBody>,
    #[serde(default)]
    pub location: Option<LocationBody>,
    #[serde(default)]
    pub context: Option<MessageContext>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TextBody {
    pub body: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MediaBody {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub caption: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LocationBody {
    pub latitude: f64,
    pub longitude: f64,
}

/// Reply context: the id of the message being replied to.
#[derive(Debug, Clone, Deserialize)]
pub struct MessageContext {
    #[serde(default)]
    pub id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookStatus {
    pub id: String,
    pub status: String,
    pub timestamp: String,
    #[serde(default)]
    pub errors: Vec<StatusError>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatusError {
    #[serde(default)]
    pub code: Option<i64>,
    #[serde(default)]
    pub title: Option<String>,
}

/// Response to a send or mark-read call.
#[derive(Debug, Clone, Deserialize)]
pub struct SendResponse {
    #[serde(default)]
    pub messages: Vec<SentMessage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SentMessage {
    pub id: String,
}

/// Response to a media upload.
#[derive(Debug, Clone, Deserialize)]
pub struct MediaUploadResponse {
    pub id: String,
}

/// Response to a media url lookup.
#[derive(Debug, Clone, Deserialize)]
pub struct MediaUrlResponse {
    #[serde(default)]
    pub url: Option<String>,
}

/// Extract an inbound message event, or `None` if the payload carries
/// something else (status callback, unknown message kind, empty entry).
pub fn parse_inbound(payload: &WebhookPayload) -> Option<InboundEvent> {
    let value = &payload.entry.first()?.changes.first()?.value;
    let message = value.messages.first()?;

    let from_name = value
        .contacts
        .first()
        .and_then(|c| c.profile.as_ref())
        .and_then(|p| p.name.clone())
        .unwrap_or_default();

    let (message_type, content, media_url) = match message.kind.as_str() {
        "text" => (
            MessageType::Text,
            message.text.as_ref()?.body.clone(),
            None,
        ),
        "image" => media_parts(MessageType::Image, message.image.as_ref()?),
        "video" => media_parts(MessageType::Video, message.video.as_ref()?),
        "audio" => media_parts(MessageType::Audio, message.audio.as_ref()?),
        "document" => media_parts(MessageType::Document, message.document.as_ref()?),
        "location" => {
            let location = message.location.as_ref()?;
            (
                MessageType::Location,
                format!("Location: {}, {}", location.latitude, location.longitude),
                None,
            )
        }
        // Reactions, stickers, system events and anything newer are not
        // stored as conversation messages.
        _ => return None,
    };

    Some(InboundEvent {
        external_id: message.id.clone(),
        from_id: message.from.clone(),
        from_name,
        timestamp: message.timestamp.parse().ok()?,
        message_type,
        content,
        media_url,
        reply_to: message.context.as_ref().and_then(|c| c.id.clone()),
    })
}

fn media_parts(
    message_type: MessageType,
    media: &MediaBody,
) -> (MessageType, String, Option<String>) {
    let content = media
        .caption
        .clone()
        .unwrap_or_else(|| format!("[{message_type}]"));
    // Webhooks usually carry a media id rather than a link; keep whichever
    // is present so the stored message can resolve the asset later.
    let media_url = media.link.clone().or_else(|| media.id.clone());
    (message_type, content, media_url)
}

/// Extract a delivery-status event, or `None` if the payload carries
/// something else or an unknown status word.
pub fn parse_status(payload: &WebhookPayload) -> Option<StatusEvent> {
    let value = &payload.entry.first()?.changes.first()?.value;
    let status = value.statuses.first()?;

    Some(StatusEvent {
        external_id: status.id.clone(),
        status: status.status.parse().ok()?,
        timestamp: status.timestamp.parse().ok()?,
        errors: status
            .errors
            .iter()
            .map(|e| StatusErrorDetail {
                code: e.code,
                title: e.title.clone().unwrap_or_default(),
            })
            .collect(),
    })
}
