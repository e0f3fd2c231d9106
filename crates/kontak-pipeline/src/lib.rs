// SPDX-FileCopyrightText: 2026 Kontak Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message pipeline: webhook ingestion, outbound dispatch, delivery
//! reconciliation, and the campaign runner.

pub mod campaign;
pub mod dispatch;
pub mod ingest;
pub mod reconcile;

pub use campaign::CampaignRunner;
pub use dispatch::{OutboundRequest, dispatch};
pub use ingest::ingest_event;
pub use reconcile::{ReconcileOutcome, apply_status_event};
