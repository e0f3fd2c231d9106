// SPDX-FileCopyrightText: 2026 Kontak Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message template endpoints.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use kontak_core::KontakError;
use kontak_core::types::Template;
use kontak_storage::queries::templates;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::ApiResult;
use crate::server::AppState;

/// GET /v1/templates
pub async fn list(State(state): State<AppState>) -> ApiResult<Json<Vec<Template>>> {
    let listed = templates::list_templates(&state.db).await?;
    Ok(Json(listed))
}

/// Request body for POST /v1/templates.
#[derive(Debug, Deserialize)]
pub struct CreateRequest {
    pub name: String,
    pub content: String,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default)]
    pub category: Option<String>,
}

fn default_language() -> String {
    "en".to_string()
}

/// POST /v1/templates
pub async fn create(
    State(state): State<AppState>,
    Json(body): Json<CreateRequest>,
) -> ApiResult<(StatusCode, Json<Template>)> {
    if body.name.trim().is_empty() {
        return Err(KontakError::Validation("template name must not be empty".to_string()).into());
    }
    if templates::get_template_by_name(&state.db, &body.name)
        .await?
        .is_some()
    {
        return Err(
            KontakError::Conflict(format!("template name already in use: {}", body.name)).into(),
        );
    }

    let now = kontak_core::time::now_rfc3339();
    let template = Template {
        id: Uuid::new_v4().to_string(),
        name: body.name,
        content: body.content,
        language: body.language,
        category: body.category,
        created_at: now.clone(),
        updated_at: now,
    };
    templates::create_template(&state.db, &template).await?;
    Ok((StatusCode::CREATED, Json(template)))
}

/// GET /v1/templates/{id}
pub async fn get_one(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Template>> {
    let template = templates::get_template(&state.db, &id)
        .await?
        .ok_or(KontakError::NotFound {
            entity: "template",
            id,
        })?;
    Ok(Json(template))
}

/// Request body for PUT /v1/templates/{id}.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
}

/// PUT /v1/templates/{id}
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<UpdateRequest>,
) -> ApiResult<Json<Template>> {
    let mut template = templates::get_template(&state.db, &id)
        .await?
        .ok_or(KontakError::NotFound {
            entity: "template",
            id,
        })?;

    if let Some(name) = body.name {
        template.name = name;
    }
    if let Some(content) = body.content {
        template.content = content;
    }
    if let Some(language) = body.language {
        template.language = language;
    }
    if body.category.is_some() {
        template.category = body.category;
    }

    templates::update_template(&state.db, &template).await?;
    Ok(Json(template))
}

/// DELETE /v1/templates/{id}
pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    templates::delete_template(&state.db, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use crate::server::build_router;
    use crate::testutil::{delete, get, post_json, read_json, test_state};
    use axum::http::StatusCode;
    use serde_json::json;
    use tower::ServiceExt;

    #[tokio::test]
    async fn crud_round_trip() {
        let (state, _dir) = test_state().await;
        let app = build_router(state);

        let response = app
            .clone()
            .oneshot(post_json(
                "/v1/templates",
                json!({"name": "greeting", "content": "Hello {{1}}", "language": "th"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let id = read_json(response).await["id"].as_str().unwrap().to_string();

        let response = app
            .clone()
            .oneshot(get(&format!("/v1/templates/{id}")))
            .await
            .unwrap();
        let body = read_json(response).await;
        assert_eq!(body["language"], "th");

        let response = app
            .clone()
            .oneshot(delete(&format!("/v1/templates/{id}")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);

        let response = app
            .oneshot(get(&format!("/v1/templates/{id}")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn duplicate_name_conflicts() {
        let (state, _dir) = test_state().await;
        let app = build_router(state);

        let create = || {
            post_json(
                "/v1/templates",
                json!({"name": "greeting", "content": "Hello"}),
            )
        };
        let response = app.clone().oneshot(create()).await.unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let response = app.oneshot(create()).await.unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }
}
