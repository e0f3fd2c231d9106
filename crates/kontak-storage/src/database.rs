// SPDX-FileCopyrightText: 2026 Kontak Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! All writes are serialized through tokio-rusqlite's single background thread.
//! Do NOT create additional Connection instances for writes. Query modules
//! accept `&Database` and call through `db.connection().call()`.

use std::path::Path;

use kontak_core::KontakError;
use tokio_rusqlite::Connection;
use tracing::info;

/// Handle to the single SQLite connection.
///
/// Cloning is cheap; clones share the same background writer thread.
#[derive(Clone)]
pub struct Database {
    conn: Connection,
}

/// Errors from the open-time setup closure: pragmas plus migrations.
#[derive(Debug, thiserror::Error)]
enum SetupError {
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
    #[error(transparent)]
    Migration(#[from] refinery::Error),
}

impl Database {
    /// Open (or create) the database at `path` with WAL mode enabled and
    /// run all pending migrations.
    pub async fn open(path: &str) -> Result<Self, KontakError> {
        Self::open_with(path, true).await
    }

    /// Open with an explicit WAL mode choice.
    pub async fn open_with(path: &str, wal_mode: bool) -> Result<Self, KontakError> {
        if let Some(parent) = Path::new(path).parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(KontakError::storage)?;
        }

        let conn = Connection::open(path).await.map_err(KontakError::storage)?;

        conn.call(move |conn| -> Result<(), SetupError> {
            if wal_mode {
                conn.pragma_update(None, "journal_mode", "WAL")?;
            }
            conn.pragma_update(None, "synchronous", "NORMAL")?;
            conn.pragma_update(None, "foreign_keys", "ON")?;
            conn.pragma_update(None, "busy_timeout", 5000)?;
            crate::migrations::run_migrations(conn)?;
            Ok(())
        })
        .await
        .map_err(KontakError::storage)?;

        info!(path, wal_mode, "database opened");
        Ok(Self { conn })
    }

    /// The underlying tokio-rusqlite connection.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Close the connection, flushing the WAL.
    pub async fn close(self) -> Result<(), KontakError> {
        self.conn.close().await.map_err(map_tr_err)
    }
}

/// Convert a tokio-rusqlite error into the shared storage error.
pub fn map_tr_err(err: tokio_rusqlite::Error) -> KontakError {
    KontakError::Storage {
        source: Box::new(err),
    }
}

/// Whether the error is a SQLite UNIQUE constraint violation.
///
/// Used to turn duplicate-key inserts into domain-level outcomes
/// (idempotent webhook dedupe, conversation conflict).
pub fn is_unique_violation(err: &tokio_rusqlite::Error) -> bool {
    matches!(
        err,
        tokio_rusqlite::Error::Error(rusqlite::Error::SqliteFailure(e, _))
            if e.code == rusqlite::ErrorCode::ConstraintViolation
    )
}
