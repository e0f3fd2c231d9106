// SPDX-FileCopyrightText: 2026 Kontak Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Quotation endpoints.

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use kontak_core::KontakError;
use kontak_core::types::Quotation;
use kontak_storage::queries::{customers, quotations};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::ApiResult;
use crate::server::AppState;

/// Query parameters for GET /v1/quotations.
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    #[serde(default)]
    pub customer_id: Option<String>,
    #[serde(default = "super::default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

/// GET /v1/quotations
pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> ApiResult<Json<Vec<Quotation>>> {
    let listed =
        quotations::list_quotations(&state.db, params.customer_id, params.limit, params.offset)
            .await?;
    Ok(Json(listed))
}

/// Request body for POST /v1/quotations.
#[derive(Debug, Deserialize)]
pub struct CreateRequest {
    pub number: String,
    pub customer_id: String,
    #[serde(default)]
    pub items: serde_json::Value,
    pub total: f64,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default = "default_status")]
    pub status: String,
}

fn default_currency() -> String {
    "THB".to_string()
}

fn default_status() -> String {
    "draft".to_string()
}

/// POST /v1/quotations
pub async fn create(
    State(state): State<AppState>,
    Json(body): Json<CreateRequest>,
) -> ApiResult<(StatusCode, Json<Quotation>)> {
    customers::get_customer(&state.db, &body.customer_id)
        .await?
        .ok_or(KontakError::NotFound {
            entity: "customer",
            id: body.customer_id.clone(),
        })?;

    let now = kontak_core::time::now_rfc3339();
    let quotation = Quotation {
        id: Uuid::new_v4().to_string(),
        number: body.number,
        customer_id: body.customer_id,
        items: body.items,
        total: body.total,
        currency: body.currency,
        status: body.status,
        created_at: now.clone(),
        updated_at: now,
    };
    quotations::create_quotation(&state.db, &quotation).await?;
    Ok((StatusCode::CREATED, Json(quotation)))
}

/// GET /v1/quotations/{id}
pub async fn get_one(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Quotation>> {
    let quotation = quotations::get_quotation(&state.db, &id)
        .await?
        .ok_or(KontakError::NotFound {
            entity: "quotation",
            id,
        })?;
    Ok(Json(quotation))
}

/// Request body for PUT /v1/quotations/{id}.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateRequest {
    #[serde(default)]
    pub items: Option<serde_json::Value>,
    #[serde(default)]
    pub total: Option<f64>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

/// PUT /v1/quotations/{id}
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<UpdateRequest>,
) -> ApiResult<Json<Quotation>> {
    let mut quotation = quotations::get_quotation(&state.db, &id)
        .await?
        .ok_or(KontakError::NotFound {
            entity: "quotation",
            id,
        })?;

    if let Some(items) = body.items {
        quotation.items = items;
    }
    if let Some(total) = body.total {
        quotation.total = total;
    }
    if let Some(currency) = body.currency {
        quotation.currency = currency;
    }
    if let Some(status) = body.status {
        quotation.status = status;
    }

    quotations::update_quotation(&state.db, &quotation).await?;
    Ok(Json(quotation))
}

/// DELETE /v1/quotations/{id}
pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    quotations::delete_quotation(&state.db, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use crate::server::build_router;
    use crate::testutil::{get, post_json, put_json, read_json, seed_customer, test_state};
    use axum::http::StatusCode;
    use serde_json::json;
    use tower::ServiceExt;

    #[tokio::test]
    async fn create_and_filter_by_customer() {
        let (state, _dir) = test_state().await;
        let db = state.db.clone();
        seed_customer(&db, "cust-1", Some("66810000001")).await;
        seed_customer(&db, "cust-2", Some("66810000002")).await;
        let app = build_router(state);

        for (number, customer) in [("Q-001", "cust-1"), ("Q-002", "cust-2")] {
            let response = app
                .clone()
                .oneshot(post_json(
                    "/v1/quotations",
                    json!({
                        "number": number,
                        "customer_id": customer,
                        "items": [{"name": "widget", "qty": 3}],
                        "total": 1500.0
                    }),
                ))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::CREATED);
        }

        let response = app
            .oneshot(get("/v1/quotations?customer_id=cust-1"))
            .await
            .unwrap();
        let body = read_json(response).await;
        assert_eq!(body.as_array().unwrap().len(), 1);
        assert_eq!(body[0]["number"], "Q-001");
    }

    #[tokio::test]
    async fn duplicate_number_conflicts() {
        let (state, _dir) = test_state().await;
        seed_customer(&state.db, "cust-1", Some("66810000001")).await;
        let app = build_router(state);

        let create = || {
            post_json(
                "/v1/quotations",
                json!({"number": "Q-001", "customer_id": "cust-1", "total": 100.0}),
            )
        };
        let response = app.clone().oneshot(create()).await.unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let response = app.oneshot(create()).await.unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn update_changes_status() {
        let (state, _dir) = test_state().await;
        seed_customer(&state.db, "cust-1", Some("66810000001")).await;
        let app = build_router(state);

        let response = app
            .clone()
            .oneshot(post_json(
                "/v1/quotations",
                json!({"number": "Q-001", "customer_id": "cust-1", "total": 100.0}),
            ))
            .await
            .unwrap();
        let id = read_json(response).await["id"].as_str().unwrap().to_string();

        let response = app
            .oneshot(put_json(
                &format!("/v1/quotations/{id}"),
                json!({"status": "sent"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = read_json(response).await;
        assert_eq!(body["status"], "sent");
    }
}
