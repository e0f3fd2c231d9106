// SPDX-FileCopyrightText: 2026 Kontak Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Operator account endpoints.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use kontak_core::KontakError;
use kontak_core::types::User;
use kontak_storage::queries::users;
use serde::Deserialize;
use uuid::Uuid;

use crate::error::ApiResult;
use crate::server::AppState;

/// GET /v1/users
pub async fn list(State(state): State<AppState>) -> ApiResult<Json<Vec<User>>> {
    let listed = users::list_users(&state.db).await?;
    Ok(Json(listed))
}

/// Request body for POST /v1/users.
#[derive(Debug, Deserialize)]
pub struct CreateRequest {
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub is_superuser: bool,
}

/// POST /v1/users
pub async fn create(
    State(state): State<AppState>,
    Json(body): Json<CreateRequest>,
) -> ApiResult<(StatusCode, Json<User>)> {
    if body.username.trim().is_empty() {
        return Err(KontakError::Validation("username must not be empty".to_string()).into());
    }
    if users::get_user_by_username(&state.db, &body.username)
        .await?
        .is_some()
    {
        return Err(
            KontakError::Conflict(format!("username already in use: {}", body.username)).into(),
        );
    }

    let now = kontak_core::time::now_rfc3339();
    let user = User {
        id: Uuid::new_v4().to_string(),
        username: body.username,
        full_name: body.full_name,
        email: body.email,
        is_active: true,
        is_superuser: body.is_superuser,
        created_at: now.clone(),
        updated_at: now,
    };
    users::create_user(&state.db, &user).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// GET /v1/users/{id}
pub async fn get_one(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<User>> {
    let user = users::get_user(&state.db, &id)
        .await?
        .ok_or(KontakError::NotFound { entity: "user", id })?;
    Ok(Json(user))
}

#[cfg(test)]
mod tests {
    use crate::server::build_router;
    use crate::testutil::{get, post_json, read_json, test_state};
    use axum::http::StatusCode;
    use serde_json::json;
    use tower::ServiceExt;

    #[tokio::test]
    async fn create_then_get() {
        let (state, _dir) = test_state().await;
        let app = build_router(state);

        let response = app
            .clone()
            .oneshot(post_json(
                "/v1/users",
                json!({"username": "nok", "email": "nok@example.com"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let id = read_json(response).await["id"].as_str().unwrap().to_string();

        let response = app.oneshot(get(&format!("/v1/users/{id}"))).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = read_json(response).await;
        assert_eq!(body["username"], "nok");
        assert_eq!(body["is_superuser"], false);
    }

    #[tokio::test]
    async fn duplicate_username_conflicts() {
        let (state, _dir) = test_state().await;
        let app = build_router(state);

        let create = || {
            post_json(
                "/v1/users",
                json!({"username": "nok", "email": "nok@example.com"}),
            )
        };
        let response = app.clone().oneshot(create()).await.unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let response = app.oneshot(create()).await.unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }
}
