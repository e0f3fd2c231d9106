// SPDX-FileCopyrightText: 2026 Kontak Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed query modules. All functions accept `&Database` and route through
//! the single background writer thread.
//!
//! Enum columns are stored as their lowercase string form; JSON columns as
//! TEXT. Row mappers convert both back, failing the row (not the process)
//! on unrecognized values.

pub mod campaigns;
pub mod conversations;
pub mod customers;
pub mod ingest;
pub mod messages;
pub mod quotations;
pub mod templates;
pub mod users;

use std::str::FromStr;

use serde::de::DeserializeOwned;

/// Parse a lowercase enum column value.
pub(crate) fn parse_enum<T: FromStr>(value: String, idx: usize) -> rusqlite::Result<T> {
    value.parse().map_err(|_| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            rusqlite::types::Type::Text,
            format!("unrecognized value `{value}`").into(),
        )
    })
}

/// Parse a JSON TEXT column.
pub(crate) fn parse_json<T: DeserializeOwned>(value: String, idx: usize) -> rusqlite::Result<T> {
    serde_json::from_str(&value).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

/// Parse an optional JSON TEXT column.
pub(crate) fn parse_json_opt<T: DeserializeOwned>(
    value: Option<String>,
    idx: usize,
) -> rusqlite::Result<Option<T>> {
    value.map(|v| parse_json(v, idx)).transpose()
}

/// Serialize a value to its JSON TEXT column form.
pub(crate) fn to_json<T: serde::Serialize>(value: &T) -> rusqlite::Result<String> {
    serde_json::to_string(value).map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use kontak_core::types::MessageStatus;

    #[test]
    fn parse_enum_accepts_lowercase() {
        let status: MessageStatus = parse_enum("delivered".to_string(), 0).unwrap();
        assert_eq!(status, MessageStatus::Delivered);
    }

    #[test]
    fn parse_enum_rejects_unknown() {
        let result: rusqlite::Result<MessageStatus> = parse_enum("bogus".to_string(), 0);
        assert!(result.is_err());
    }

    #[test]
    fn json_roundtrip() {
        let tags = vec!["vip".to_string(), "bkk".to_string()];
        let text = to_json(&tags).unwrap();
        let back: Vec<String> = parse_json(text, 0).unwrap();
        assert_eq!(back, tags);
    }
}
