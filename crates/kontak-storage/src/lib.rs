// SPDX-FileCopyrightText: 2026 Kontak Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence layer for the Kontak messaging backend.
//!
//! Provides WAL-mode SQLite storage with embedded migrations, a single-writer
//! concurrency model via `tokio-rusqlite`, and typed CRUD operations for
//! customers, conversations, messages, campaigns, templates, quotations, and
//! users. Inbound webhook ingestion is a single atomic transaction.

pub mod database;
pub mod migrations;
pub mod queries;

pub use database::Database;
pub use queries::ingest::{IngestIds, IngestOutcome};
