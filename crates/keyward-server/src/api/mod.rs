//! Control-plane CRUD surface: stateless request/response handlers, one
//! store call each.
//!
//! Store operations run on the blocking thread pool so a slow database
//! never stalls the runtime.

mod error;

pub use error::ApiError;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use chrono::Utc;
use keyward_store::{LicenseDraft, LicenseRecord};

use crate::health::PingResponse;
use crate::server::AppState;

/// GET /api/ping
pub async fn ping(State(state): State<AppState>) -> Json<PingResponse> {
    let connections = state.registry.connection_count().await;
    Json(crate::health::ping_response(state.start_time, connections))
}

/// GET /api/licenses
pub async fn list_licenses(
    State(state): State<AppState>,
) -> Result<Json<Vec<LicenseRecord>>, ApiError> {
    let store = state.store.clone();
    let records = tokio::task::spawn_blocking(move || store.list()).await??;
    Ok(Json(records))
}

/// GET /api/licenses/check/{key}
///
/// Unscoped check by key: 404 when absent, 400 when expired, otherwise the
/// record itself.
pub async fn check_license(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<LicenseRecord>, ApiError> {
    let store = state.store.clone();
    let record = tokio::task::spawn_blocking(move || store.get_by_key(&key)).await??;
    let record = record.ok_or(ApiError::NotFound)?;
    if !record.is_valid_at(Utc::now()) {
        return Err(ApiError::Expired);
    }
    Ok(Json(record))
}

/// POST /api/licenses
pub async fn create_license(
    State(state): State<AppState>,
    Json(draft): Json<LicenseDraft>,
) -> Result<(StatusCode, Json<LicenseRecord>), ApiError> {
    let store = state.store.clone();
    let record = tokio::task::spawn_blocking(move || store.create(&draft)).await??;
    Ok((StatusCode::CREATED, Json(record)))
}

/// PUT /api/licenses/{id}
pub async fn update_license(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(draft): Json<LicenseDraft>,
) -> Result<Json<LicenseRecord>, ApiError> {
    let store = state.store.clone();
    let record = tokio::task::spawn_blocking(move || store.update(id, &draft)).await??;
    Ok(Json(record))
}

/// DELETE /api/licenses/{id}
pub async fn delete_license(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    let store = state.store.clone();
    tokio::task::spawn_blocking(move || store.delete(id)).await??;
    Ok(StatusCode::NO_CONTENT)
}
