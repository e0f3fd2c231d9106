// SPDX-FileCopyrightText: 2026 Kontak Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Kontak messaging backend.
//!
//! Provides the entity types, the per-entity state machines, the shared
//! error type, and the [`ChannelGateway`] trait implemented by provider
//! integrations.

pub mod error;
pub mod time;
pub mod traits;
pub mod types;

pub use error::KontakError;
pub use traits::ChannelGateway;
pub use types::{
    Campaign, CampaignStatus, ChannelKind, Conversation, ConversationStatus, Customer,
    DocumentSource, InboundEvent, MediaKind, Message, MessageDirection, MessageStatus,
    MessageType, OutboundContent, ProviderMeta, ProviderReceipt, Quotation, SegmentFilters,
    StatusErrorDetail, StatusEvent, Template, User,
};
