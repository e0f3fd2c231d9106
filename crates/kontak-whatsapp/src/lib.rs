// SPDX-FileCopyrightText: 2026 Kontak Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! WhatsApp Cloud API channel gateway for the Kontak messaging backend.
//!
//! Provides the [`WhatsAppClient`] gateway (outbound sends, media upload,
//! read receipts), pure webhook payload parsers, webhook verification, and
//! phone number normalization.

pub mod client;
pub mod phone;
pub mod verify;
pub mod wire;

pub use client::WhatsAppClient;
pub use phone::normalize_phone;
pub use verify::{answer_challenge, verify_signature};
pub use wire::{WebhookPayload, parse_inbound, parse_status};
