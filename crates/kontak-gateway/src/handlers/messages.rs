// SPDX-FileCopyrightText: 2026 Kontak Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message endpoints: outbound send, read receipts, soft delete.

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use kontak_core::KontakError;
use kontak_core::types::{Message, MessageStatus, OutboundContent};
use kontak_pipeline::{OutboundRequest, dispatch};
use kontak_storage::queries::{conversations, messages, users};
use serde::Deserialize;

use crate::error::ApiResult;
use crate::server::AppState;

/// Request body for POST /v1/messages/send.
#[derive(Debug, Deserialize)]
pub struct SendRequest {
    pub conversation_id: String,
    pub content: OutboundContent,
    #[serde(default)]
    pub sender_user_id: Option<String>,
}

/// POST /v1/messages/send
pub async fn send(
    State(state): State<AppState>,
    Json(body): Json<SendRequest>,
) -> ApiResult<(StatusCode, Json<Message>)> {
    let gateway = state.require_gateway()?;
    // sender_user_id is a foreign key; reject a bad id before dispatch
    // writes the pending row.
    if let Some(sender) = body.sender_user_id.as_deref() {
        users::get_user(&state.db, sender)
            .await?
            .ok_or(KontakError::NotFound {
                entity: "user",
                id: sender.to_string(),
            })?;
    }
    let message = dispatch(
        &state.db,
        gateway.as_ref(),
        OutboundRequest {
            conversation_id: body.conversation_id,
            content: body.content,
            sender_user_id: body.sender_user_id,
            campaign_id: None,
        },
    )
    .await?;
    Ok((StatusCode::CREATED, Json(message)))
}

/// POST /v1/messages/{id}/read
///
/// Marks one message read locally, resets the conversation unread
/// counter, and best-effort forwards a read receipt to the provider.
pub async fn mark_read(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Message>> {
    let message = messages::get_message(&state.db, &id)
        .await?
        .ok_or(KontakError::NotFound {
            entity: "message",
            id: id.clone(),
        })?;

    if message.status.can_transition(MessageStatus::Read) {
        messages::set_status(&state.db, &message.id, MessageStatus::Read, None).await?;
    }
    conversations::mark_read(&state.db, &message.conversation_id).await?;

    // Provider failure here must not fail the API call.
    if let (Some(gateway), Some(external_id)) = (&state.gateway, &message.external_id)
        && let Err(e) = gateway.mark_read(external_id).await
    {
        tracing::warn!(
            message_id = %message.id,
            error = %e,
            "upstream read receipt failed"
        );
    }

    let updated = messages::get_message(&state.db, &id)
        .await?
        .ok_or(KontakError::NotFound {
            entity: "message",
            id,
        })?;
    Ok(Json(updated))
}

/// Query parameters for DELETE /v1/messages/{id}.
#[derive(Debug, Default, Deserialize)]
pub struct DeleteParams {
    #[serde(default)]
    pub deleted_by: Option<String>,
}

/// DELETE /v1/messages/{id}
pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<DeleteParams>,
) -> ApiResult<StatusCode> {
    messages::soft_delete(&state.db, &id, params.deleted_by).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use crate::server::build_router;
    use crate::testutil::{
        delete, get, post_json, read_json, seed_conversation, test_state,
        test_state_with_failing_gateway, test_state_with_gateway,
    };
    use axum::http::StatusCode;
    use kontak_core::types::MessageStatus;
    use kontak_storage::queries::messages;
    use serde_json::json;
    use tower::ServiceExt;

    #[tokio::test]
    async fn send_returns_created_message() {
        let (state, gateway, _dir) = test_state_with_gateway().await;
        let db = state.db.clone();
        seed_conversation(&db, "cust-1", "conv-1", Some("66812345678")).await;
        let app = build_router(state);

        let response = app
            .oneshot(post_json(
                "/v1/messages/send",
                json!({
                    "conversation_id": "conv-1",
                    "content": {"kind": "text", "body": "hello"}
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let body = read_json(response).await;
        assert_eq!(body["status"], "sent");
        assert_eq!(body["external_id"], "wamid.gw.1");
        assert_eq!(gateway.sent_to(), vec!["66812345678"]);
    }

    #[tokio::test]
    async fn provider_rejection_marks_message_failed_and_is_500() {
        let (state, _dir) = test_state_with_failing_gateway("rate limited").await;
        let db = state.db.clone();
        seed_conversation(&db, "cust-1", "conv-1", Some("66812345678")).await;
        let app = build_router(state);

        let response = app
            .oneshot(post_json(
                "/v1/messages/send",
                json!({
                    "conversation_id": "conv-1",
                    "content": {"kind": "text", "body": "hello"}
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        // The pending row stays behind, flipped to failed.
        let listed = messages::list_for_conversation(&db, "conv-1", 50, 0)
            .await
            .unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].status, MessageStatus::Failed);
    }

    #[tokio::test]
    async fn send_with_unknown_sender_is_404() {
        let (state, _dir) = test_state().await;
        seed_conversation(&state.db, "cust-1", "conv-1", Some("66812345678")).await;
        let app = build_router(state);

        let response = app
            .oneshot(post_json(
                "/v1/messages/send",
                json!({
                    "conversation_id": "conv-1",
                    "content": {"kind": "text", "body": "hello"},
                    "sender_user_id": "ghost"
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn send_to_unknown_conversation_is_404() {
        let (state, _dir) = test_state().await;
        let app = build_router(state);

        let response = app
            .oneshot(post_json(
                "/v1/messages/send",
                json!({
                    "conversation_id": "ghost",
                    "content": {"kind": "text", "body": "hello"}
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn send_without_gateway_is_501() {
        let (mut state, _dir) = test_state().await;
        seed_conversation(&state.db, "cust-1", "conv-1", Some("66812345678")).await;
        state.gateway = None;
        state.runner = None;
        let app = build_router(state);

        let response = app
            .oneshot(post_json(
                "/v1/messages/send",
                json!({
                    "conversation_id": "conv-1",
                    "content": {"kind": "text", "body": "hello"}
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_IMPLEMENTED);
    }

    #[tokio::test]
    async fn mark_read_forwards_receipt_and_resets_unread() {
        let (state, gateway, _dir) = test_state_with_gateway().await;
        let db = state.db.clone();
        seed_conversation(&db, "cust-1", "conv-1", Some("66812345678")).await;

        // An inbound delivered message with a provider id.
        let event = kontak_core::types::InboundEvent {
            external_id: "wamid.in1".to_string(),
            from_id: "66812345678".to_string(),
            from_name: "Somchai".to_string(),
            timestamp: 1_760_000_000,
            message_type: kontak_core::types::MessageType::Text,
            content: "hello".to_string(),
            media_url: None,
            reply_to: None,
        };
        let outcome =
            kontak_pipeline::ingest_event(&db, kontak_core::types::ChannelKind::Whatsapp, event)
                .await
                .unwrap();
        let kontak_storage::IngestOutcome::Created { message, .. } = outcome else {
            panic!("expected created");
        };

        let app = build_router(state);
        let response = app
            .oneshot(post_json(
                &format!("/v1/messages/{}/read", message.id),
                json!({}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = read_json(response).await;
        assert_eq!(body["status"], "read");
        assert_eq!(gateway.read_receipts(), vec!["wamid.in1"]);

        let conversation =
            kontak_storage::queries::conversations::get_conversation(&db, &message.conversation_id)
                .await
                .unwrap()
                .unwrap();
        assert_eq!(conversation.unread_count, 0);
    }

    #[tokio::test]
    async fn soft_delete_hides_message_from_listing() {
        let (state, _dir) = test_state().await;
        let db = state.db.clone();
        seed_conversation(&db, "cust-1", "conv-1", Some("66812345678")).await;
        let app = build_router(state);

        let response = app
            .clone()
            .oneshot(post_json(
                "/v1/messages/send",
                json!({
                    "conversation_id": "conv-1",
                    "content": {"kind": "text", "body": "oops"}
                }),
            ))
            .await
            .unwrap();
        let message = read_json(response).await;
        let id = message["id"].as_str().unwrap().to_string();

        let response = app
            .clone()
            .oneshot(delete(&format!("/v1/messages/{id}?deleted_by=user-1")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let listed = messages::list_for_conversation(&db, "conv-1", 50, 0)
            .await
            .unwrap();
        assert!(listed.is_empty());

        // Second delete is a 404.
        let response = app
            .oneshot(delete(&format!("/v1/messages/{id}")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn conversation_messages_listing_marks_read() {
        let (state, _dir) = test_state().await;
        let db = state.db.clone();

        let event = kontak_core::types::InboundEvent {
            external_id: "wamid.in9".to_string(),
            from_id: "66899999999".to_string(),
            from_name: "Nok".to_string(),
            timestamp: 1_760_000_000,
            message_type: kontak_core::types::MessageType::Text,
            content: "sawasdee".to_string(),
            media_url: None,
            reply_to: None,
        };
        let outcome =
            kontak_pipeline::ingest_event(&db, kontak_core::types::ChannelKind::Whatsapp, event)
                .await
                .unwrap();
        let kontak_storage::IngestOutcome::Created { conversation, .. } = outcome else {
            panic!("expected created");
        };
        assert_eq!(conversation.unread_count, 1);

        let app = build_router(state);
        let response = app
            .oneshot(get(&format!(
                "/v1/conversations/{}/messages",
                conversation.id
            )))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = read_json(response).await;
        assert_eq!(body.as_array().unwrap().len(), 1);

        let refreshed =
            kontak_storage::queries::conversations::get_conversation(&db, &conversation.id)
                .await
                .unwrap()
                .unwrap();
        assert_eq!(refreshed.unread_count, 0);

        let listed = messages::list_for_conversation(&db, &conversation.id, 50, 0)
            .await
            .unwrap();
        assert_eq!(listed[0].status, MessageStatus::Read);
    }

    #[tokio::test]
    async fn send_rejects_malformed_content() {
        let (state, _dir) = test_state().await;
        let app = build_router(state);

        let response = app
            .oneshot(post_json(
                "/v1/messages/send",
                json!({"conversation_id": "conv-1", "content": {"kind": "telepathy"}}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
