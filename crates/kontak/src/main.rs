// SPDX-FileCopyrightText: 2026 Kontak Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Kontak - multi-channel customer messaging backend.
//!
//! Binary entry point: loads configuration, then serves the REST API and
//! webhook endpoints.

mod serve;

use clap::{Parser, Subcommand};

/// Kontak - multi-channel customer messaging backend.
#[derive(Parser, Debug)]
#[command(name = "kontak", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the messaging backend server.
    Serve,
    /// Print the effective configuration (secrets redacted).
    Config,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match kontak_config::load_and_validate() {
        Ok(config) => config,
        Err(errors) => {
            kontak_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    match cli.command {
        Some(Commands::Serve) => {
            if let Err(e) = serve::run_serve(config).await {
                eprintln!("kontak serve: {e}");
                std::process::exit(1);
            }
        }
        Some(Commands::Config) => {
            print_config(config);
        }
        None => {
            println!("kontak: use --help for available commands");
        }
    }
}

fn print_config(mut config: kontak_config::KontakConfig) {
    // Never print credentials, only whether they are set.
    config.server.bearer_token = config.server.bearer_token.map(|_| "[set]".to_string());
    config.whatsapp.access_token = config.whatsapp.access_token.map(|_| "[set]".to_string());
    config.whatsapp.app_secret = config.whatsapp.app_secret.map(|_| "[set]".to_string());
    config.whatsapp.verify_token = config.whatsapp.verify_token.map(|_| "[set]".to_string());
    match toml::to_string_pretty(&config) {
        Ok(rendered) => println!("{rendered}"),
        Err(e) => eprintln!("kontak config: {e}"),
    }
}
