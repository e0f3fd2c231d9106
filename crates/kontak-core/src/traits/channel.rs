// SPDX-FileCopyrightText: 2026 Kontak Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Channel gateway trait for messaging provider integrations.

use async_trait::async_trait;

use crate::error::KontakError;
use crate::types::{ChannelKind, OutboundContent, ProviderReceipt};

/// Outbound side of a messaging provider integration.
///
/// Implementations own the network calls to the provider; inbound webhook
/// parsing lives in pure functions next to each implementation so it stays
/// independently testable.
#[async_trait]
pub trait ChannelGateway: Send + Sync + 'static {
    /// The channel this gateway serves.
    fn channel(&self) -> ChannelKind;

    /// Sends a message to a destination identifier in the provider's
    /// required shape. Returns the provider's message id on acceptance.
    async fn send(
        &self,
        to: &str,
        content: &OutboundContent,
    ) -> Result<ProviderReceipt, KontakError>;

    /// Sends a read receipt for a previously received message.
    async fn mark_read(&self, external_id: &str) -> Result<(), KontakError>;
}
