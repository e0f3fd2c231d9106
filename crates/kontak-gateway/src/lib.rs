// SPDX-FileCopyrightText: 2026 Kontak Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP gateway: bearer-authenticated REST API plus the WhatsApp webhook
//! endpoints.

pub mod auth;
pub mod error;
pub mod handlers;
pub mod server;

pub use auth::AuthConfig;
pub use error::{ApiError, ApiResult};
pub use server::{AppState, WebhookConfig, build_router, start_server};
