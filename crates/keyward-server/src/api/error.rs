//! Control-plane error responses.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use keyward_store::StoreError;
use thiserror::Error;
use tracing::error;

/// Errors surfaced by the CRUD handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The requested record does not exist.
    #[error("license not found")]
    NotFound,
    /// The record exists but its expiration has passed.
    #[error("license expired")]
    Expired,
    /// Store or task failure.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::LicenseNotFound(_) => Self::NotFound,
            other => Self::Internal(other.to_string()),
        }
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Internal(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Expired => StatusCode::BAD_REQUEST,
            Self::Internal(message) => {
                error!(error = %message, "control-plane request failed");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_maps_to_404() {
        let resp = ApiError::NotFound.into_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn expired_maps_to_400() {
        let resp = ApiError::Expired.into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn internal_maps_to_500() {
        let resp = ApiError::Internal("boom".into()).into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn store_not_found_converts_to_not_found() {
        let err: ApiError = StoreError::LicenseNotFound(3).into();
        assert!(matches!(err, ApiError::NotFound));
    }

    #[test]
    fn other_store_errors_convert_to_internal() {
        let err: ApiError = StoreError::Migration {
            message: "boom".into(),
        }
        .into();
        assert!(matches!(err, ApiError::Internal(_)));
    }
}
