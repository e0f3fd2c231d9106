// SPDX-FileCopyrightText: 2026 Kontak Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Timestamp helpers.
//!
//! All entity timestamps are RFC 3339 UTC strings with millisecond
//! precision, e.g. `2026-01-01T00:00:00.000Z`. String ordering equals
//! chronological ordering at fixed precision.

use chrono::{DateTime, SecondsFormat, Utc};

/// Current UTC time in the canonical entity timestamp format.
pub fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Convert a unix-seconds provider timestamp to the canonical format.
///
/// Out-of-range values fall back to the current time rather than failing
/// the whole ingestion.
pub fn unix_to_rfc3339(secs: i64) -> String {
    DateTime::<Utc>::from_timestamp(secs, 0)
        .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Millis, true))
        .unwrap_or_else(now_rfc3339)
}
