// SPDX-FileCopyrightText: 2026 Kontak Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! WhatsApp webhook endpoints.
//!
//! The POST endpoint acknowledges with 200 regardless of processing
//! outcome; the provider retries on anything else and a malformed payload
//! would retry forever. Signature failures are the one exception and get
//! a 403.

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use kontak_core::types::ChannelKind;
use kontak_whatsapp::{WebhookPayload, parse_inbound, parse_status, verify_signature};
use serde::Deserialize;
use serde_json::json;

use crate::server::AppState;

/// Query parameters of the Meta webhook verification handshake.
#[derive(Debug, Deserialize)]
pub struct VerifyParams {
    #[serde(rename = "hub.mode")]
    pub mode: Option<String>,
    #[serde(rename = "hub.verify_token")]
    pub verify_token: Option<String>,
    #[serde(rename = "hub.challenge")]
    pub challenge: Option<String>,
}

/// GET /webhooks/whatsapp
pub async fn verify(
    State(state): State<AppState>,
    Query(params): Query<VerifyParams>,
) -> Response {
    let Some(expected) = state.webhook.verify_token.as_deref() else {
        return StatusCode::FORBIDDEN.into_response();
    };
    match kontak_whatsapp::answer_challenge(
        params.mode.as_deref(),
        params.verify_token.as_deref(),
        params.challenge.as_deref(),
        expected,
    ) {
        Some(challenge) => challenge.to_string().into_response(),
        None => StatusCode::FORBIDDEN.into_response(),
    }
}

/// POST /webhooks/whatsapp
pub async fn receive(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if let Some(app_secret) = state.webhook.app_secret.as_deref() {
        let header = headers
            .get("x-hub-signature-256")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        if !verify_signature(app_secret, &body, header) {
            tracing::warn!("webhook rejected: invalid signature");
            return StatusCode::FORBIDDEN.into_response();
        }
    }

    let payload: WebhookPayload = match serde_json::from_slice(&body) {
        Ok(payload) => payload,
        Err(e) => {
            tracing::error!(error = %e, "webhook payload is not valid JSON");
            return ack();
        }
    };

    if let Some(event) = parse_inbound(&payload) {
        if let Err(e) =
            kontak_pipeline::ingest_event(&state.db, ChannelKind::Whatsapp, event).await
        {
            tracing::error!(error = %e, "inbound webhook processing failed");
        }
    } else if let Some(event) = parse_status(&payload) {
        if let Err(e) = kontak_pipeline::apply_status_event(&state.db, event).await {
            tracing::error!(error = %e, "status webhook processing failed");
        }
    }

    ack()
}

fn ack() -> Response {
    Json(json!({"status": "received"})).into_response()
}
