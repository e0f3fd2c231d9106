// SPDX-FileCopyrightText: 2026 Kontak Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway HTTP server built on axum.
//!
//! Sets up routes, middleware, and shared state for the REST API and the
//! provider webhook endpoints.

use std::sync::Arc;

use axum::{
    Router,
    middleware as axum_middleware,
    routing::{delete, get, post},
};
use kontak_core::{ChannelGateway, KontakError};
use kontak_pipeline::CampaignRunner;
use kontak_storage::Database;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::auth::{AuthConfig, auth_middleware};
use crate::handlers;

/// Webhook verification settings, taken from the whatsapp config section.
#[derive(Clone, Default)]
pub struct WebhookConfig {
    /// Token echoed back during provider endpoint verification.
    pub verify_token: Option<String>,
    /// App secret for X-Hub-Signature-256 checks. `None` skips the check.
    pub app_secret: Option<String>,
}

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    /// Outbound channel gateway. `None` when provider credentials are
    /// absent; sends then fail with 501.
    pub gateway: Option<Arc<dyn ChannelGateway>>,
    /// Background campaign executor. Present iff `gateway` is.
    pub runner: Option<CampaignRunner>,
    pub auth: AuthConfig,
    pub webhook: WebhookConfig,
    /// Country code used to normalize contact phone numbers.
    pub default_country_code: String,
}

impl AppState {
    /// The outbound gateway, or `Unsupported` when none is configured.
    pub fn require_gateway(&self) -> Result<&Arc<dyn ChannelGateway>, KontakError> {
        self.gateway.as_ref().ok_or_else(|| {
            KontakError::Unsupported("no outbound channel gateway is configured".to_string())
        })
    }

    /// The campaign runner, or `Unsupported` when none is configured.
    pub fn require_runner(&self) -> Result<&CampaignRunner, KontakError> {
        self.runner.as_ref().ok_or_else(|| {
            KontakError::Unsupported("no outbound channel gateway is configured".to_string())
        })
    }
}

/// Build the full application router.
pub fn build_router(state: AppState) -> Router {
    // Unauthenticated routes: health for process supervision, webhooks
    // because the provider authenticates via signature instead.
    let public_routes = Router::new()
        .route("/health", get(handlers::health))
        .route(
            "/webhooks/whatsapp",
            get(handlers::webhook::verify).post(handlers::webhook::receive),
        )
        .with_state(state.clone());

    let api_routes = Router::new()
        .route("/v1/messages/send", post(handlers::messages::send))
        .route("/v1/messages/{id}/read", post(handlers::messages::mark_read))
        .route("/v1/messages/{id}", delete(handlers::messages::delete))
        .route(
            "/v1/conversations",
            get(handlers::conversations::list).post(handlers::conversations::create),
        )
        .route(
            "/v1/conversations/{id}",
            get(handlers::conversations::get_one).put(handlers::conversations::update),
        )
        .route(
            "/v1/conversations/{id}/messages",
            get(handlers::conversations::messages),
        )
        .route(
            "/v1/contacts",
            get(handlers::contacts::list).post(handlers::contacts::create),
        )
        .route(
            "/v1/contacts/{id}",
            get(handlers::contacts::get_one)
                .put(handlers::contacts::update)
                .delete(handlers::contacts::deactivate),
        )
        .route(
            "/v1/campaigns",
            get(handlers::campaigns::list).post(handlers::campaigns::create),
        )
        .route(
            "/v1/campaigns/{id}",
            get(handlers::campaigns::get_one)
                .put(handlers::campaigns::update)
                .delete(handlers::campaigns::delete),
        )
        .route("/v1/campaigns/{id}/send", post(handlers::campaigns::send))
        .route("/v1/campaigns/{id}/pause", post(handlers::campaigns::pause))
        .route("/v1/campaigns/{id}/resume", post(handlers::campaigns::resume))
        .route(
            "/v1/campaigns/{id}/recipients",
            get(handlers::campaigns::recipients),
        )
        .route(
            "/v1/templates",
            get(handlers::templates::list).post(handlers::templates::create),
        )
        .route(
            "/v1/templates/{id}",
            get(handlers::templates::get_one)
                .put(handlers::templates::update)
                .delete(handlers::templates::delete),
        )
        .route(
            "/v1/users",
            get(handlers::users::list).post(handlers::users::create),
        )
        .route("/v1/users/{id}", get(handlers::users::get_one))
        .route(
            "/v1/quotations",
            get(handlers::quotations::list).post(handlers::quotations::create),
        )
        .route(
            "/v1/quotations/{id}",
            get(handlers::quotations::get_one)
                .put(handlers::quotations::update)
                .delete(handlers::quotations::delete),
        )
        .route_layer(axum_middleware::from_fn_with_state(
            state.auth.clone(),
            auth_middleware,
        ))
        .with_state(state);

    Router::new()
        .merge(public_routes)
        .merge(api_routes)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Bind and serve until the shutdown future resolves.
pub async fn start_server<S>(
    host: &str,
    port: u16,
    state: AppState,
    shutdown: S,
) -> Result<(), KontakError>
where
    S: std::future::Future<Output = ()> + Send + 'static,
{
    let app = build_router(state);
    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| KontakError::Channel {
            message: format!("failed to bind gateway to {addr}: {e}"),
            source: Some(Box::new(e)),
        })?;

    tracing::info!("gateway listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| KontakError::Channel {
            message: format!("gateway server error: {e}"),
            source: Some(Box::new(e)),
        })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::test_state;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    #[tokio::test]
    async fn health_is_unauthenticated() {
        let (state, _dir) = test_state().await;
        let app = build_router(state);

        let response = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn api_rejects_missing_and_wrong_tokens() {
        let (state, _dir) = test_state().await;
        let app = build_router(state);

        let response = app
            .clone()
            .oneshot(Request::get("/v1/contacts").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = app
            .oneshot(
                Request::get("/v1/contacts")
                    .header("authorization", "Bearer wrong")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn api_accepts_configured_token() {
        let (state, _dir) = test_state().await;
        let app = build_router(state);

        let response = app
            .oneshot(
                Request::get("/v1/contacts")
                    .header("authorization", "Bearer test-token")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn api_with_no_token_configured_is_fail_closed() {
        let (mut state, _dir) = test_state().await;
        state.auth.bearer_token = None;
        let app = build_router(state);

        let response = app
            .oneshot(
                Request::get("/v1/contacts")
                    .header("authorization", "Bearer anything")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
