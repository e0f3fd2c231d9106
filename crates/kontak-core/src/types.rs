// SPDX-FileCopyrightText: 2026 Kontak Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Entity types and state machines shared across the Kontak workspace.
//!
//! Each stateful entity (Conversation, Message, Campaign) carries one
//! authoritative `can_transition` function. Handlers and the pipeline must
//! route every status change through it so that illegal transitions are
//! rejected in exactly one place.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// A messaging provider/transport.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ChannelKind {
    Whatsapp,
    Line,
    Email,
}

/// Message payload kind, matching the provider vocabulary.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    Text,
    Image,
    Video,
    Audio,
    Document,
    Location,
    Template,
}

/// Direction of a message relative to the organization.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MessageDirection {
    Inbound,
    Outbound,
}

/// Delivery status of a message.
///
/// The happy path is `Pending -> Sent -> Delivered -> Read`. `Failed` is
/// reachable from any non-terminal state. Status never moves backwards;
/// late or repeated provider callbacks are no-ops.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    Pending,
    Sent,
    Delivered,
    Read,
    Failed,
}

impl MessageStatus {
    /// Position along the forward delivery path. `Failed` and `Read` are terminal.
    fn rank(self) -> u8 {
        match self {
            MessageStatus::Pending => 0,
            MessageStatus::Sent => 1,
            MessageStatus::Delivered => 2,
            MessageStatus::Read => 3,
            MessageStatus::Failed => 4,
        }
    }

    /// Whether no further transitions are allowed out of this status.
    pub fn is_terminal(self) -> bool {
        matches!(self, MessageStatus::Read | MessageStatus::Failed)
    }

    /// Forward-only transition check.
    ///
    /// Strictly forward along the delivery path, or to `Failed` from any
    /// non-terminal status. Everything else (including self-transitions)
    /// is rejected.
    pub fn can_transition(self, to: MessageStatus) -> bool {
        if self.is_terminal() {
            return false;
        }
        match to {
            MessageStatus::Failed => true,
            _ => to.rank() > self.rank(),
        }
    }
}

/// Lifecycle status of a conversation thread.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ConversationStatus {
    Open,
    Pending,
    Closed,
    Archived,
}

impl ConversationStatus {
    /// A closed or archived conversation no longer receives inbound routing.
    pub fn is_closed(self) -> bool {
        matches!(self, ConversationStatus::Closed | ConversationStatus::Archived)
    }

    /// Agent-driven transition check. Archived is terminal; closed
    /// conversations may be reopened.
    pub fn can_transition(self, to: ConversationStatus) -> bool {
        if self == to {
            return false;
        }
        match self {
            ConversationStatus::Open | ConversationStatus::Pending => true,
            ConversationStatus::Closed => {
                matches!(to, ConversationStatus::Open | ConversationStatus::Archived)
            }
            ConversationStatus::Archived => false,
        }
    }
}

/// Lifecycle status of a batch send job.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum CampaignStatus {
    Draft,
    Scheduled,
    Running,
    Paused,
    Completed,
    Failed,
}

impl CampaignStatus {
    /// `draft -> scheduled -> running -> (paused <-> running) -> completed`,
    /// with `failed` reachable from running. Completed and failed are terminal.
    pub fn can_transition(self, to: CampaignStatus) -> bool {
        use CampaignStatus::*;
        matches!(
            (self, to),
            (Draft, Scheduled)
                | (Draft, Running)
                | (Scheduled, Draft)
                | (Scheduled, Running)
                | (Running, Paused)
                | (Running, Completed)
                | (Running, Failed)
                | (Paused, Running)
                | (Paused, Failed)
        )
    }
}

/// A person the organization talks to, unified across channels.
///
/// At most one customer exists per (channel, channel identifier) pair;
/// the store enforces this with a unique index on `whatsapp_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Customer {
    pub id: String,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    /// WhatsApp channel identifier (the sender's wa id / phone).
    pub whatsapp_id: Option<String>,
    pub preferred_channel: ChannelKind,
    pub language: String,
    pub timezone: String,
    pub is_active: bool,
    pub opt_out: bool,
    /// Ordered tag set; duplicates are removed on write.
    pub tags: Vec<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// One thread between exactly one customer and the organization on one channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub customer_id: String,
    pub assigned_to: Option<String>,
    pub channel: ChannelKind,
    pub status: ConversationStatus,
    pub unread_count: i64,
    pub last_message_at: String,
    pub closed_at: Option<String>,
    pub subject: Option<String>,
    pub tags: Vec<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Provider-variable data attached to a message.
///
/// The known fields are typed; anything else a provider sends rides in
/// `raw` as an opaque JSON blob.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProviderMeta {
    /// External id of the message this one replies to, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<String>,
    /// Provider event timestamp (unix seconds).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw: Option<serde_json::Value>,
}

impl ProviderMeta {
    pub fn is_empty(&self) -> bool {
        self.reply_to.is_none() && self.timestamp.is_none() && self.raw.is_none()
    }
}

/// An atomic unit of communication within a conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub conversation_id: String,
    /// Sending agent; `None` for customer messages and campaign sends.
    pub sender_user_id: Option<String>,
    pub direction: MessageDirection,
    pub message_type: MessageType,
    pub content: String,
    pub media_url: Option<String>,
    pub status: MessageStatus,
    /// Provider-assigned id, globally unique; used for deduplication and
    /// status correlation.
    pub external_id: Option<String>,
    pub template_name: Option<String>,
    /// Set when this message was produced by a campaign run.
    pub campaign_id: Option<String>,
    pub error_detail: Option<String>,
    pub provider_meta: Option<ProviderMeta>,
    /// Soft-delete marker; rows are never removed.
    pub deleted_at: Option<String>,
    pub deleted_by: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Targeting filter for campaign recipients. All listed tags must match.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SegmentFilters {
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub has_whatsapp: bool,
}

/// A batch outbound send job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Campaign {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub channel: ChannelKind,
    pub template_id: Option<String>,
    pub message_content: Option<String>,
    pub status: CampaignStatus,
    pub scheduled_at: Option<String>,
    pub started_at: Option<String>,
    pub completed_at: Option<String>,
    pub segment_filters: SegmentFilters,
    pub recipient_count: i64,
    pub sent_count: i64,
    pub delivered_count: i64,
    pub read_count: i64,
    pub clicked_count: i64,
    pub failed_count: i64,
    pub created_by: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// A reusable message template.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Template {
    pub id: String,
    pub name: String,
    pub content: String,
    pub language: String,
    pub category: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// A quotation issued to a customer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quotation {
    pub id: String,
    pub number: String,
    pub customer_id: String,
    /// Line items as an opaque JSON array; the gateway passes them through.
    pub items: serde_json::Value,
    pub total: f64,
    pub currency: String,
    pub status: String,
    pub created_at: String,
    pub updated_at: String,
}

/// An operator/agent account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub username: String,
    pub full_name: Option<String>,
    pub email: String,
    pub is_active: bool,
    pub is_superuser: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl User {
    /// Preferred display name for API responses.
    pub fn display_name(&self) -> &str {
        self.full_name.as_deref().unwrap_or(&self.username)
    }
}

// --- Channel gateway wire types ---

/// Media kinds a channel gateway can carry as attachments.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
    Audio,
    Document,
}

impl MediaKind {
    pub fn message_type(self) -> MessageType {
        match self {
            MediaKind::Image => MessageType::Image,
            MediaKind::Video => MessageType::Video,
            MediaKind::Audio => MessageType::Audio,
            MediaKind::Document => MessageType::Document,
        }
    }
}

/// Where a document payload comes from: a public link or a previously
/// uploaded provider media id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentSource {
    Link(String),
    Uploaded(String),
}

/// Content descriptor for an outbound send.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum OutboundContent {
    Text {
        body: String,
    },
    Template {
        name: String,
        language: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        components: Option<serde_json::Value>,
    },
    Media {
        media: MediaKind,
        url: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        caption: Option<String>,
    },
    Document {
        source: DocumentSource,
        filename: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        caption: Option<String>,
    },
}

impl OutboundContent {
    /// The message type this content persists as.
    pub fn message_type(&self) -> MessageType {
        match self {
            OutboundContent::Text { .. } => MessageType::Text,
            OutboundContent::Template { .. } => MessageType::Template,
            OutboundContent::Media { media, .. } => media.message_type(),
            OutboundContent::Document { .. } => MessageType::Document,
        }
    }

    /// Human-readable body stored on the message row.
    pub fn body_text(&self) -> String {
        match self {
            OutboundContent::Text { body } => body.clone(),
            OutboundContent::Template { name, .. } => format!("[template: {name}]"),
            OutboundContent::Media { media, caption, .. } => caption
                .clone()
                .unwrap_or_else(|| format!("[{media}]")),
            OutboundContent::Document {
                filename, caption, ..
            } => caption.clone().unwrap_or_else(|| format!("[{filename}]")),
        }
    }
}

/// Acknowledgment returned by a provider for an accepted send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderReceipt {
    /// Provider-assigned message id.
    pub external_id: String,
}

/// A parsed inbound message event from a provider webhook.
#[derive(Debug, Clone, PartialEq)]
pub struct InboundEvent {
    pub external_id: String,
    /// Sender channel identifier (e.g. the WhatsApp wa id).
    pub from_id: String,
    pub from_name: String,
    /// Provider event timestamp (unix seconds).
    pub timestamp: i64,
    pub message_type: MessageType,
    pub content: String,
    pub media_url: Option<String>,
    /// External id of the message being replied to, if any.
    pub reply_to: Option<String>,
}

/// One error entry attached to a failed status callback.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusErrorDetail {
    pub code: Option<i64>,
    pub title: String,
}

/// A parsed delivery-status callback from a provider webhook.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusEvent {
    pub external_id: String,
    pub status: MessageStatus,
    pub timestamp: i64,
    pub errors: Vec<StatusErrorDetail>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn message_status_forward_only() {
        use MessageStatus::*;
        assert!(Pending.can_transition(Sent));
        assert!(Pending.can_transition(Delivered));
        assert!(Sent.can_transition(Delivered));
        assert!(Delivered.can_transition(Read));

        // Backwards and self-transitions are rejected.
        assert!(!Sent.can_transition(Pending));
        assert!(!Delivered.can_transition(Sent));
        assert!(!Sent.can_transition(Sent));

        // Failed from any non-terminal state, then terminal.
        assert!(Pending.can_transition(Failed));
        assert!(Delivered.can_transition(Failed));
        assert!(!Failed.can_transition(Sent));
        assert!(!Read.can_transition(Failed));
    }

    #[test]
    fn conversation_transitions() {
        use ConversationStatus::*;
        assert!(Open.can_transition(Closed));
        assert!(Closed.can_transition(Open));
        assert!(Closed.can_transition(Archived));
        assert!(!Closed.can_transition(Pending));
        assert!(!Archived.can_transition(Open));
        assert!(!Open.can_transition(Open));
    }

    #[test]
    fn campaign_transitions() {
        use CampaignStatus::*;
        assert!(Draft.can_transition(Running));
        assert!(Scheduled.can_transition(Running));
        assert!(Running.can_transition(Paused));
        assert!(Paused.can_transition(Running));
        assert!(Running.can_transition(Completed));
        assert!(!Completed.can_transition(Running));
        assert!(!Paused.can_transition(Completed));
        assert!(!Draft.can_transition(Paused));
    }

    #[test]
    fn enums_round_trip_through_strings() {
        assert_eq!(ChannelKind::Whatsapp.to_string(), "whatsapp");
        assert_eq!(ChannelKind::from_str("whatsapp").unwrap(), ChannelKind::Whatsapp);
        assert_eq!(MessageStatus::Delivered.to_string(), "delivered");
        assert_eq!(
            MessageStatus::from_str("delivered").unwrap(),
            MessageStatus::Delivered
        );
        assert_eq!(ConversationStatus::Archived.to_string(), "archived");
        assert_eq!(CampaignStatus::Paused.to_string(), "paused");
    }

    #[test]
    fn outbound_content_maps_to_message_type() {
        let text = OutboundContent::Text { body: "hi".into() };
        assert_eq!(text.message_type(), MessageType::Text);
        assert_eq!(text.body_text(), "hi");

        let media = OutboundContent::Media {
            media: MediaKind::Image,
            url: "https://example.com/a.jpg".into(),
            caption: None,
        };
        assert_eq!(media.message_type(), MessageType::Image);
        assert_eq!(media.body_text(), "[image]");

        let tpl = OutboundContent::Template {
            name: "welcome".into(),
            language: "en".into(),
            components: None,
        };
        assert_eq!(tpl.message_type(), MessageType::Template);
        assert_eq!(tpl.body_text(), "[template: welcome]");
    }

    #[test]
    fn outbound_content_deserializes_tagged() {
        let json = r#"{"kind":"text","body":"hello"}"#;
        let content: OutboundContent = serde_json::from_str(json).unwrap();
        assert_eq!(content, OutboundContent::Text { body: "hello".into() });

        let json = r#"{"kind":"media","media":"image","url":"https://x/y.jpg","caption":"pic"}"#;
        let content: OutboundContent = serde_json::from_str(json).unwrap();
        assert_eq!(content.message_type(), MessageType::Image);
    }

    #[test]
    fn provider_meta_empty_check() {
        assert!(ProviderMeta::default().is_empty());
        let meta = ProviderMeta {
            reply_to: Some("wamid.1".into()),
            ..Default::default()
        };
        assert!(!meta.is_empty());
    }
}
