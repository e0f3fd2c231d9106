// SPDX-FileCopyrightText: 2026 Kontak Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Campaign endpoints.
//!
//! A campaign is editable in `draft`/`scheduled`, runs in the background
//! once sent, and can be paused and resumed between recipients.

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use kontak_core::KontakError;
use kontak_core::types::{Campaign, CampaignStatus, ChannelKind, Customer, SegmentFilters};
use kontak_storage::queries::{campaigns, customers, templates, users};
use serde::Deserialize;
use uuid::Uuid;

use super::Pagination;
use crate::error::ApiResult;
use crate::server::AppState;

/// GET /v1/campaigns
pub async fn list(
    State(state): State<AppState>,
    Query(page): Query<Pagination>,
) -> ApiResult<Json<Vec<Campaign>>> {
    let listed = campaigns::list_campaigns(&state.db, page.limit, page.offset).await?;
    Ok(Json(listed))
}

/// Request body for POST /v1/campaigns.
#[derive(Debug, Deserialize)]
pub struct CreateRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_channel")]
    pub channel: ChannelKind,
    #[serde(default)]
    pub template_id: Option<String>,
    #[serde(default)]
    pub message_content: Option<String>,
    #[serde(default)]
    pub scheduled_at: Option<String>,
    #[serde(default)]
    pub segment_filters: SegmentFilters,
    #[serde(default)]
    pub created_by: Option<String>,
}

fn default_channel() -> ChannelKind {
    ChannelKind::Whatsapp
}

/// POST /v1/campaigns
pub async fn create(
    State(state): State<AppState>,
    Json(body): Json<CreateRequest>,
) -> ApiResult<(StatusCode, Json<Campaign>)> {
    if body.name.trim().is_empty() {
        return Err(KontakError::Validation("campaign name must not be empty".to_string()).into());
    }
    if body.template_id.is_none() && body.message_content.is_none() {
        return Err(KontakError::Validation(
            "campaign needs a template_id or message_content".to_string(),
        )
        .into());
    }
    if let Some(template_id) = body.template_id.as_deref() {
        require_template(&state, template_id).await?;
    }
    if let Some(user_id) = body.created_by.as_deref() {
        users::get_user(&state.db, user_id)
            .await?
            .ok_or(KontakError::NotFound {
                entity: "user",
                id: user_id.to_string(),
            })?;
    }

    let recipients = customers::find_segment(&state.db, &body.segment_filters).await?;
    let status = if body.scheduled_at.is_some() {
        CampaignStatus::Scheduled
    } else {
        CampaignStatus::Draft
    };

    let now = kontak_core::time::now_rfc3339();
    let campaign = Campaign {
        id: Uuid::new_v4().to_string(),
        name: body.name,
        description: body.description,
        channel: body.channel,
        template_id: body.template_id,
        message_content: body.message_content,
        status,
        scheduled_at: body.scheduled_at,
        started_at: None,
        completed_at: None,
        segment_filters: body.segment_filters,
        recipient_count: recipients.len() as i64,
        sent_count: 0,
        delivered_count: 0,
        read_count: 0,
        clicked_count: 0,
        failed_count: 0,
        created_by: body.created_by,
        created_at: now.clone(),
        updated_at: now,
    };
    campaigns::create_campaign(&state.db, &campaign).await?;
    Ok((StatusCode::CREATED, Json(campaign)))
}

/// GET /v1/campaigns/{id}
pub async fn get_one(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Campaign>> {
    let campaign = fetch(&state, &id).await?;
    Ok(Json(campaign))
}

/// Request body for PUT /v1/campaigns/{id}.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub template_id: Option<String>,
    #[serde(default)]
    pub message_content: Option<String>,
    #[serde(default)]
    pub scheduled_at: Option<String>,
    #[serde(default)]
    pub segment_filters: Option<SegmentFilters>,
}

/// PUT /v1/campaigns/{id}
///
/// Only draft and scheduled campaigns are editable.
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<UpdateRequest>,
) -> ApiResult<Json<Campaign>> {
    let mut campaign = fetch(&state, &id).await?;
    if !matches!(
        campaign.status,
        CampaignStatus::Draft | CampaignStatus::Scheduled
    ) {
        return Err(KontakError::Conflict(format!(
            "campaign in status {} cannot be edited",
            campaign.status
        ))
        .into());
    }

    if let Some(name) = body.name {
        campaign.name = name;
    }
    if body.description.is_some() {
        campaign.description = body.description;
    }
    if body.template_id.is_some() {
        if let Some(template_id) = body.template_id.as_deref() {
            require_template(&state, template_id).await?;
        }
        campaign.template_id = body.template_id;
    }
    if body.message_content.is_some() {
        campaign.message_content = body.message_content;
    }
    if body.scheduled_at.is_some() {
        campaign.scheduled_at = body.scheduled_at;
        campaign.status = CampaignStatus::Scheduled;
    }
    if let Some(filters) = body.segment_filters {
        campaign.segment_filters = filters;
    }
    let recipients = customers::find_segment(&state.db, &campaign.segment_filters).await?;
    campaign.recipient_count = recipients.len() as i64;

    campaigns::update_campaign(&state.db, &campaign).await?;
    Ok(Json(campaign))
}

/// DELETE /v1/campaigns/{id}
///
/// Only drafts can be deleted.
pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let campaign = fetch(&state, &id).await?;
    if campaign.status != CampaignStatus::Draft {
        return Err(KontakError::Conflict(format!(
            "campaign in status {} cannot be deleted",
            campaign.status
        ))
        .into());
    }
    campaigns::delete_campaign(&state.db, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /v1/campaigns/{id}/send
///
/// Moves the campaign to running and hands it to the background runner.
pub async fn send(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<(StatusCode, Json<Campaign>)> {
    let runner = state.require_runner()?.clone();
    let campaign = transition(&state, &id, CampaignStatus::Running).await?;
    runner.spawn(id);
    Ok((StatusCode::ACCEPTED, Json(campaign)))
}

/// POST /v1/campaigns/{id}/pause
pub async fn pause(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Campaign>> {
    let campaign = transition(&state, &id, CampaignStatus::Paused).await?;
    Ok(Json(campaign))
}

/// POST /v1/campaigns/{id}/resume
///
/// Re-scans the recipient filter; recipients who already received this
/// campaign are skipped by the runner.
pub async fn resume(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<(StatusCode, Json<Campaign>)> {
    let runner = state.require_runner()?.clone();
    let campaign = transition(&state, &id, CampaignStatus::Running).await?;
    runner.spawn(id);
    Ok((StatusCode::ACCEPTED, Json(campaign)))
}

/// GET /v1/campaigns/{id}/recipients
pub async fn recipients(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<Customer>>> {
    let campaign = fetch(&state, &id).await?;
    let recipients = customers::find_segment(&state.db, &campaign.segment_filters).await?;
    Ok(Json(recipients))
}

async fn require_template(state: &AppState, id: &str) -> Result<(), KontakError> {
    templates::get_template(&state.db, id)
        .await?
        .map(|_| ())
        .ok_or(KontakError::NotFound {
            entity: "template",
            id: id.to_string(),
        })
}

async fn fetch(state: &AppState, id: &str) -> Result<Campaign, KontakError> {
    campaigns::get_campaign(&state.db, id)
        .await?
        .ok_or(KontakError::NotFound {
            entity: "campaign",
            id: id.to_string(),
        })
}

async fn transition(
    state: &AppState,
    id: &str,
    to: CampaignStatus,
) -> Result<Campaign, KontakError> {
    let campaign = fetch(state, id).await?;
    if !campaign.status.can_transition(to) {
        return Err(KontakError::InvalidTransition {
            entity: "campaign",
            from: campaign.status.to_string(),
            to: to.to_string(),
        });
    }
    campaigns::set_status(&state.db, id, to).await?;
    fetch(state, id).await
}
