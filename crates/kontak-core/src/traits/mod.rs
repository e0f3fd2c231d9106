// SPDX-FileCopyrightText: 2026 Kontak Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Trait definitions for pluggable pieces of the Kontak backend.

pub mod channel;

pub use channel::ChannelGateway;
