// SPDX-FileCopyrightText: 2026 Kontak Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Phone number normalization for the WhatsApp API.
//!
//! The API wants bare digits with a country code prefix. Local numbers
//! arrive in several shapes (`081-234-5678`, `+66812345678`, `812345678`)
//! and must all collapse to the same canonical form.

/// Normalize a phone number to API form.
///
/// Strips every non-digit, then applies the country code: a bare 9-digit
/// subscriber number gets the code prepended, a 10-digit number with the
/// `0` trunk prefix gets the prefix replaced by the code. Anything else
/// passes through digits-only.
pub fn normalize_phone(phone: &str, country_code: &str) -> String {
    let digits: String = phone.chars().filter(|c| c.is_ascii_digit()).collect();

    if !digits.starts_with(country_code) && digits.len() == 9 {
        format!("{country_code}{digits}")
    } else if digits.len() == 10
        && let Some(rest) = digits.strip_prefix('0')
    {
        format!("{country_code}{rest}")
    } else {
        digits
    }
}
