// SPDX-FileCopyrightText: 2026 Kontak Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Kontak backend.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Kontak configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable
/// overrides. All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct KontakConfig {
    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// WhatsApp Cloud API integration settings.
    #[serde(default)]
    pub whatsapp: WhatsappConfig,

    /// Campaign runner settings.
    #[serde(default)]
    pub campaign: CampaignConfig,
}

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Host address to bind.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Bearer token for the operator API. `None` rejects all API requests
    /// (fail-closed); webhook endpoints are unaffected.
    #[serde(default)]
    pub bearer_token: Option<String>,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            bearer_token: None,
            log_level: default_log_level(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("kontak").join("kontak.db"))
        .and_then(|p| p.to_str().map(String::from))
        .unwrap_or_else(|| "kontak.db".to_string())
}

fn default_wal_mode() -> bool {
    true
}

/// WhatsApp Cloud API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WhatsappConfig {
    /// Graph API access token. `None` disables outbound sending.
    #[serde(default)]
    pub access_token: Option<String>,

    /// Business phone number id used in the messages endpoint path.
    #[serde(default)]
    pub phone_number_id: Option<String>,

    /// Secret echoed back during the one-time webhook subscription handshake.
    #[serde(default)]
    pub verify_token: Option<String>,

    /// App secret for X-Hub-Signature-256 verification of webhook bodies.
    /// `None` skips signature checks.
    #[serde(default)]
    pub app_secret: Option<String>,

    /// Graph API version segment.
    #[serde(default = "default_api_version")]
    pub api_version: String,

    /// Country code substituted into bare local phone numbers.
    #[serde(default = "default_country_code")]
    pub default_country_code: String,
}

impl Default for WhatsappConfig {
    fn default() -> Self {
        Self {
            access_token: None,
            phone_number_id: None,
            verify_token: None,
            app_secret: None,
            api_version: default_api_version(),
            default_country_code: default_country_code(),
        }
    }
}

fn default_api_version() -> String {
    "v18.0".to_string()
}

fn default_country_code() -> String {
    "66".to_string()
}

/// Campaign runner configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CampaignConfig {
    /// Fixed delay between recipient sends, for provider rate limits.
    #[serde(default = "default_send_delay_ms")]
    pub send_delay_ms: u64,
}

impl Default for CampaignConfig {
    fn default() -> Self {
        Self {
            send_delay_ms: default_send_delay_ms(),
        }
    }
}

fn default_send_delay_ms() -> u64 {
    500
}
