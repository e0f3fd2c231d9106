// SPDX-FileCopyrightText: 2026 Kontak Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde attributes,
//! such as valid bind addresses, non-empty paths, and consistent WhatsApp
//! credential pairs.

use crate::diagnostic::ConfigError;
use crate::model::KontakConfig;

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &KontakConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    // Validate host is not empty
    if config.server.host.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "server.host must not be empty".to_string(),
        });
    }

    // Validate host looks like a valid IP or hostname
    if !config.server.host.trim().is_empty() {
        let addr = config.server.host.trim();
        let is_valid_ip = addr.parse::<std::net::IpAddr>().is_ok();
        let is_valid_hostname = addr
            .chars()
            .all(|c| c.is_alphanumeric() || c == '.' || c == '-' || c == ':');
        if !is_valid_ip && !is_valid_hostname {
            errors.push(ConfigError::Validation {
                message: format!("server.host `{addr}` is not a valid IP address or hostname"),
            });
        }
    }

    // Validate log_level is a known tracing level
    let level = config.server.log_level.to_lowercase();
    if !matches!(
        level.as_str(),
        "trace" | "debug" | "info" | "warn" | "error"
    ) {
        errors.push(ConfigError::Validation {
            message: format!(
                "server.log_level `{}` is not one of trace, debug, info, warn, error",
                config.server.log_level
            ),
        });
    }

    // Validate database_path is not empty
    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "storage.database_path must not be empty".to_string(),
        });
    }

    // WhatsApp credentials come in a pair: a token without a phone number id
    // (or vice versa) cannot send anything.
    match (
        &config.whatsapp.access_token,
        &config.whatsapp.phone_number_id,
    ) {
        (Some(_), None) => {
            errors.push(ConfigError::Validation {
                message: "whatsapp.access_token is set but whatsapp.phone_number_id is missing"
                    .to_string(),
            });
        }
        (None, Some(_)) => {
            errors.push(ConfigError::Validation {
                message: "whatsapp.phone_number_id is set but whatsapp.access_token is missing"
                    .to_string(),
            });
        }
        _ => {}
    }

    // Validate api_version looks like "vNN.N"
    let version = config.whatsapp.api_version.trim();
    let version_ok = version
        .strip_prefix('v')
        .is_some_and(|rest| !rest.is_empty() && rest.chars().all(|c| c.is_ascii_digit() || c == '.'));
    if !version_ok {
        errors.push(ConfigError::Validation {
            message: format!(
                "whatsapp.api_version `{version}` must look like `v18.0`"
            ),
        });
    }

    // Validate default_country_code is digits only
    let cc = config.whatsapp.default_country_code.trim();
    if cc.is_empty() || !cc.chars().all(|c| c.is_ascii_digit()) {
        errors.push(ConfigError::Validation {
            message: format!(
                "whatsapp.default_country_code `{cc}` must be a non-empty digit string"
            ),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
