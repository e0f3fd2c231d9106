// SPDX-FileCopyrightText: 2026 Kontak Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./kontak.toml` > `~/.config/kontak/kontak.toml` > `/etc/kontak/kontak.toml`
//! with environment variable overrides via `KONTAK_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::KontakConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/kontak/kontak.toml` (system-wide)
/// 3. `~/.config/kontak/kontak.toml` (user XDG config)
/// 4. `./kontak.toml` (local directory)
/// 5. `KONTAK_*` environment variables
pub fn load_config() -> Result<KontakConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
///
/// Used for testing and explicit config specification.
pub fn load_config_from_str(toml_content: &str) -> Result<KontakConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(KontakConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<KontakConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(KontakConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used internally for config loading (exposed for diagnostic use).
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(KontakConfig::default()))
        .merge(Toml::file("/etc/kontak/kontak.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("kontak/kontak.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("kontak.toml"))
        .merge(env_provider())
}

/// Create the environment variable provider using explicit `map()` for
/// section-to-dot mapping.
///
/// Uses `Env::map()` NOT `Env::split("_")` to avoid ambiguity with
/// underscore-containing key names: `KONTAK_WHATSAPP_ACCESS_TOKEN` must map
/// to `whatsapp.access_token`, not `whatsapp.access.token`.
fn env_provider() -> Env {
    Env::prefixed("KONTAK_").map(|key| {
        // The closure receives the env var name as-is with the prefix
        // stripped (`WHATSAPP_ACCESS_TOKEN`), so lowercase before mapping
        // to the dotted form `whatsapp.access_token`.
        let key_str = key.as_str().to_lowercase();
        let mapped = key_str
            .replacen("server_", "server.", 1)
            .replacen("storage_", "storage.", 1)
            .replacen("whatsapp_", "whatsapp.", 1)
            .replacen("campaign_", "campaign.", 1);
        mapped.into()
    })
}
