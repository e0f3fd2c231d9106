// SPDX-FileCopyrightText: 2026 Kontak Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `kontak serve` command implementation.
//!
//! Wires the store, the WhatsApp gateway, the campaign runner, and the
//! HTTP server together, then serves until interrupted.

use std::sync::Arc;

use kontak_config::KontakConfig;
use kontak_core::{ChannelGateway, KontakError};
use kontak_gateway::{AppState, AuthConfig, WebhookConfig, start_server};
use kontak_pipeline::CampaignRunner;
use kontak_storage::Database;
use kontak_whatsapp::WhatsAppClient;
use tracing::{info, warn};

/// Runs the `kontak serve` command.
pub async fn run_serve(config: KontakConfig) -> Result<(), KontakError> {
    init_tracing(&config.server.log_level);

    let db = Database::open_with(&config.storage.database_path, config.storage.wal_mode).await?;
    info!(path = %config.storage.database_path, "database ready");

    // Without provider credentials the server still ingests nothing and
    // serves the CRUD API; sends answer 501.
    let gateway: Option<Arc<dyn ChannelGateway>> =
        if config.whatsapp.access_token.is_some() && config.whatsapp.phone_number_id.is_some() {
            Some(Arc::new(WhatsAppClient::new(&config.whatsapp)?))
        } else {
            warn!("whatsapp credentials not configured, outbound sending disabled");
            None
        };
    let runner = gateway
        .clone()
        .map(|g| CampaignRunner::new(db.clone(), g, config.campaign.send_delay_ms));

    if config.server.bearer_token.is_none() {
        warn!("server.bearer_token is not set, all /v1 requests will be rejected");
    }

    let state = AppState {
        db: db.clone(),
        gateway,
        runner,
        auth: AuthConfig {
            bearer_token: config.server.bearer_token.clone(),
        },
        webhook: WebhookConfig {
            verify_token: config.whatsapp.verify_token.clone(),
            app_secret: config.whatsapp.app_secret.clone(),
        },
        default_country_code: config.whatsapp.default_country_code.clone(),
    };

    start_server(
        &config.server.host,
        config.server.port,
        state,
        shutdown_signal(),
    )
    .await?;

    db.close().await?;
    info!("shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for shutdown signal");
        return;
    }
    info!("shutdown signal received");
}

fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("kontak={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
