// SPDX-FileCopyrightText: 2026 Kontak Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Kontak messaging backend.

use thiserror::Error;

/// The primary error type used across all Kontak crates.
#[derive(Debug, Error)]
pub enum KontakError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Channel gateway errors (provider rejection, network failure, rate limiting).
    #[error("channel error: {message}")]
    Channel {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The request is well-formed but semantically invalid. Terminal, never retried.
    #[error("validation error: {0}")]
    Validation(String),

    /// A referenced entity does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Duplicate unique key or conflicting state.
    #[error("conflict: {0}")]
    Conflict(String),

    /// A state-machine transition the entity does not allow.
    #[error("{entity} cannot transition from {from} to {to}")]
    InvalidTransition {
        entity: &'static str,
        from: String,
        to: String,
    },

    /// The requested operation is not implemented for this channel.
    #[error("unsupported: {0}")]
    Unsupported(String),

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl KontakError {
    /// Shorthand for a storage error wrapping any source.
    pub fn storage<E>(source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        KontakError::Storage {
            source: Box::new(source),
        }
    }

    /// Shorthand for a channel error with no underlying source.
    pub fn channel(message: impl Into<String>) -> Self {
        KontakError::Channel {
            message: message.into(),
            source: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_variants_render_messages() {
        let e = KontakError::NotFound {
            entity: "conversation",
            id: "c-1".into(),
        };
        assert_eq!(e.to_string(), "conversation not found: c-1");

        let e = KontakError::InvalidTransition {
            entity: "message",
            from: "read".into(),
            to: "sent".into(),
        };
        assert_eq!(e.to_string(), "message cannot transition from read to sent");
    }

    #[test]
    fn storage_shorthand_wraps_source() {
        let e = KontakError::storage(std::io::Error::other("disk gone"));
        assert!(e.to_string().contains("disk gone"));
    }
}
