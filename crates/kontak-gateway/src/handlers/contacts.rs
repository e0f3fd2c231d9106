// SPDX-FileCopyrightText: 2026 Kontak Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Contact (customer) endpoints.

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use kontak_core::KontakError;
use kontak_core::types::{ChannelKind, Customer};
use kontak_storage::queries::customers;
use kontak_whatsapp::normalize_phone;
use serde::Deserialize;
use uuid::Uuid;

use super::Pagination;
use crate::error::ApiResult;
use crate::server::AppState;

/// GET /v1/contacts
pub async fn list(
    State(state): State<AppState>,
    Query(page): Query<Pagination>,
) -> ApiResult<Json<Vec<Customer>>> {
    let listed = customers::list_customers(&state.db, page.limit, page.offset).await?;
    Ok(Json(listed))
}

/// Request body for POST /v1/contacts.
#[derive(Debug, Deserialize)]
pub struct CreateRequest {
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub whatsapp_id: Option<String>,
    #[serde(default = "default_channel")]
    pub preferred_channel: ChannelKind,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default = "default_timezone")]
    pub timezone: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

fn default_channel() -> ChannelKind {
    ChannelKind::Whatsapp
}

fn default_language() -> String {
    "en".to_string()
}

fn default_timezone() -> String {
    "UTC".to_string()
}

/// POST /v1/contacts
pub async fn create(
    State(state): State<AppState>,
    Json(body): Json<CreateRequest>,
) -> ApiResult<(StatusCode, Json<Customer>)> {
    if body.name.trim().is_empty() {
        return Err(KontakError::Validation("contact name must not be empty".to_string()).into());
    }

    // Identifiers are normalized at write time so the unique index and
    // outbound sends agree on one spelling.
    let whatsapp_id = body
        .whatsapp_id
        .as_deref()
        .map(|raw| normalize_phone(raw, &state.default_country_code));

    let now = kontak_core::time::now_rfc3339();
    let customer = Customer {
        id: Uuid::new_v4().to_string(),
        name: body.name,
        email: body.email,
        phone: body.phone,
        whatsapp_id,
        preferred_channel: body.preferred_channel,
        language: body.language,
        timezone: body.timezone,
        is_active: true,
        opt_out: false,
        tags: body.tags,
        created_at: now.clone(),
        updated_at: now,
    };
    customers::create_customer(&state.db, &customer).await?;
    Ok((StatusCode::CREATED, Json(customer)))
}

/// GET /v1/contacts/{id}
pub async fn get_one(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Customer>> {
    let customer = customers::get_customer(&state.db, &id)
        .await?
        .ok_or(KontakError::NotFound {
            entity: "customer",
            id,
        })?;
    Ok(Json(customer))
}

/// Request body for PUT /v1/contacts/{id}. Absent fields keep their value.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub whatsapp_id: Option<String>,
    #[serde(default)]
    pub preferred_channel: Option<ChannelKind>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub timezone: Option<String>,
    #[serde(default)]
    pub opt_out: Option<bool>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
}

/// PUT /v1/contacts/{id}
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<UpdateRequest>,
) -> ApiResult<Json<Customer>> {
    let mut customer = customers::get_customer(&state.db, &id)
        .await?
        .ok_or(KontakError::NotFound {
            entity: "customer",
            id,
        })?;

    if let Some(name) = body.name {
        customer.name = name;
    }
    if body.email.is_some() {
        customer.email = body.email;
    }
    if body.phone.is_some() {
        customer.phone = body.phone;
    }
    if let Some(raw) = body.whatsapp_id.as_deref() {
        customer.whatsapp_id = Some(normalize_phone(raw, &state.default_country_code));
    }
    if let Some(channel) = body.preferred_channel {
        customer.preferred_channel = channel;
    }
    if let Some(language) = body.language {
        customer.language = language;
    }
    if let Some(timezone) = body.timezone {
        customer.timezone = timezone;
    }
    if let Some(opt_out) = body.opt_out {
        customer.opt_out = opt_out;
    }
    if let Some(tags) = body.tags {
        customer.tags = tags;
    }

    customers::update_customer(&state.db, &customer).await?;
    Ok(Json(customer))
}

/// DELETE /v1/contacts/{id}
///
/// Contacts are deactivated, never removed; their conversation history
/// stays referable.
pub async fn deactivate(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    customers::deactivate_customer(&state.db, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}
