// SPDX-FileCopyrightText: 2026 Kontak Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation endpoints.

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use kontak_core::KontakError;
use kontak_core::types::{ChannelKind, Conversation, ConversationStatus, Message};
use kontak_storage::queries::conversations::{self, ConversationFilter};
use kontak_storage::queries::{customers, messages, users};
use serde::Deserialize;
use uuid::Uuid;

use super::Pagination;
use crate::error::ApiResult;
use crate::server::AppState;

/// Query parameters for GET /v1/conversations.
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    #[serde(default)]
    pub status: Option<ConversationStatus>,
    #[serde(default)]
    pub customer_id: Option<String>,
    /// Archived threads are hidden unless explicitly requested.
    #[serde(default)]
    pub include_archived: bool,
    #[serde(default = "super::default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

/// GET /v1/conversations
pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> ApiResult<Json<Vec<Conversation>>> {
    let filter = ConversationFilter {
        status: params.status,
        customer_id: params.customer_id,
        include_archived: params.include_archived,
    };
    let listed =
        conversations::list_conversations(&state.db, filter, params.limit, params.offset).await?;
    Ok(Json(listed))
}

/// Request body for POST /v1/conversations.
#[derive(Debug, Deserialize)]
pub struct CreateRequest {
    pub customer_id: String,
    #[serde(default = "default_channel")]
    pub channel: ChannelKind,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub assigned_to: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

fn default_channel() -> ChannelKind {
    ChannelKind::Whatsapp
}

/// POST /v1/conversations
pub async fn create(
    State(state): State<AppState>,
    Json(body): Json<CreateRequest>,
) -> ApiResult<(StatusCode, Json<Conversation>)> {
    customers::get_customer(&state.db, &body.customer_id)
        .await?
        .ok_or(KontakError::NotFound {
            entity: "customer",
            id: body.customer_id.clone(),
        })?;
    if let Some(assignee) = body.assigned_to.as_deref() {
        require_user(&state, assignee).await?;
    }

    let now = kontak_core::time::now_rfc3339();
    let conversation = Conversation {
        id: Uuid::new_v4().to_string(),
        customer_id: body.customer_id,
        assigned_to: body.assigned_to,
        channel: body.channel,
        status: ConversationStatus::Open,
        unread_count: 0,
        last_message_at: now.clone(),
        closed_at: None,
        subject: body.subject,
        tags: body.tags,
        created_at: now.clone(),
        updated_at: now,
    };
    conversations::create_conversation(&state.db, &conversation).await?;
    Ok((StatusCode::CREATED, Json(conversation)))
}

/// GET /v1/conversations/{id}
pub async fn get_one(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Conversation>> {
    let conversation = conversations::get_conversation(&state.db, &id)
        .await?
        .ok_or(KontakError::NotFound {
            entity: "conversation",
            id,
        })?;
    Ok(Json(conversation))
}

/// Request body for PUT /v1/conversations/{id}.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateRequest {
    #[serde(default)]
    pub status: Option<ConversationStatus>,
    #[serde(default)]
    pub assigned_to: Option<String>,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
}

/// PUT /v1/conversations/{id}
///
/// Status changes go through the lifecycle state machine; other fields
/// are plain overwrites.
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<UpdateRequest>,
) -> ApiResult<Json<Conversation>> {
    let mut conversation = conversations::get_conversation(&state.db, &id)
        .await?
        .ok_or(KontakError::NotFound {
            entity: "conversation",
            id: id.clone(),
        })?;

    if let Some(status) = body.status
        && status != conversation.status
    {
        if !conversation.status.can_transition(status) {
            return Err(KontakError::InvalidTransition {
                entity: "conversation",
                from: conversation.status.to_string(),
                to: status.to_string(),
            }
            .into());
        }
        conversations::set_status(&state.db, &id, status).await?;
    }

    if body.assigned_to.is_some() || body.subject.is_some() || body.tags.is_some() {
        if body.assigned_to.is_some() {
            // The assignee column is a foreign key; catch a bad id here
            // rather than surfacing a constraint failure as a 500.
            if let Some(assignee) = body.assigned_to.as_deref() {
                require_user(&state, assignee).await?;
            }
            conversation.assigned_to = body.assigned_to;
        }
        if body.subject.is_some() {
            conversation.subject = body.subject;
        }
        if let Some(tags) = body.tags {
            conversation.tags = tags;
        }
        conversations::update_conversation(&state.db, &conversation).await?;
    }

    let updated = conversations::get_conversation(&state.db, &id)
        .await?
        .ok_or(KontakError::NotFound {
            entity: "conversation",
            id,
        })?;
    Ok(Json(updated))
}

async fn require_user(state: &AppState, id: &str) -> Result<(), KontakError> {
    users::get_user(&state.db, id)
        .await?
        .map(|_| ())
        .ok_or(KontakError::NotFound {
            entity: "user",
            id: id.to_string(),
        })
}

/// GET /v1/conversations/{id}/messages
///
/// Reading a thread counts as the agent seeing it: the unread counter
/// resets and delivered inbound messages become read.
pub async fn messages(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(page): Query<Pagination>,
) -> ApiResult<Json<Vec<Message>>> {
    conversations::get_conversation(&state.db, &id)
        .await?
        .ok_or(KontakError::NotFound {
            entity: "conversation",
            id: id.clone(),
        })?;

    messages::mark_inbound_read(&state.db, &id).await?;
    conversations::mark_read(&state.db, &id).await?;
    let listed = messages::list_for_conversation(&state.db, &id, page.limit, page.offset).await?;
    Ok(Json(listed))
}
