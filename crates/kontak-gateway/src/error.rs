// SPDX-FileCopyrightText: 2026 Kontak Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error-to-HTTP mapping for the REST API.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use kontak_core::KontakError;
use serde::Serialize;

/// Handler result type; errors render as a JSON `detail` body.
pub type ApiResult<T> = Result<T, ApiError>;

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub detail: String,
}

/// Wrapper carrying a domain error into an HTTP response.
#[derive(Debug)]
pub struct ApiError(pub KontakError);

impl From<KontakError> for ApiError {
    fn from(e: KontakError) -> Self {
        ApiError(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            KontakError::Validation(_) => StatusCode::BAD_REQUEST,
            KontakError::NotFound { .. } => StatusCode::NOT_FOUND,
            KontakError::Conflict(_) | KontakError::InvalidTransition { .. } => {
                StatusCode::CONFLICT
            }
            KontakError::Unsupported(_) => StatusCode::NOT_IMPLEMENTED,
            KontakError::Config(_)
            | KontakError::Storage { .. }
            | KontakError::Channel { .. }
            | KontakError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::error!(error = %self.0, "request failed");
        }
        let body = ErrorBody {
            detail: self.0.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_maps_to_404() {
        let response = ApiError(KontakError::NotFound {
            entity: "conversation",
            id: "conv-1".to_string(),
        })
        .into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn conflict_maps_to_409() {
        let response =
            ApiError(KontakError::Conflict("duplicate".to_string())).into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn unsupported_maps_to_501() {
        let response =
            ApiError(KontakError::Unsupported("line sends".to_string())).into_response();
        assert_eq!(response.status(), StatusCode::NOT_IMPLEMENTED);
    }
}
