//! Snapshot API Handlers
//!
//! HTTP endpoints for capturing, moving and exporting snapshots.

use axum::{
    extract::State,
    http::StatusCode,
};
use conveyor_core::domain::snapshot::{Snapshot, SnapshotSummary};
use conveyor_core::domain::target::SnapshotOwner;
use conveyor_core::dto::snapshot::{
    CopySnapshot, CreateSnapshot, ExportSnapshot, ExportedSnapshot, UploadSnapshot,
};
use uuid::Uuid;

use crate::api::AppState;
use crate::api::extract::{Json, Path};
use crate::api::error::{ApiError, ApiResult};
use crate::service::snapshot_service;

/// POST /snapshot/create
pub async fn create_snapshot(
    State(state): State<AppState>,
    Json(req): Json<CreateSnapshot>,
) -> ApiResult<Json<Snapshot>> {
    tracing::info!("Creating snapshot {} of {}", req.name, req.owner);

    let snapshot = snapshot_service::create_snapshot(state.store.as_ref(), req).await?;

    Ok(Json(snapshot))
}

/// GET /snapshot/owner/{kind}/{id}
pub async fn list_snapshots(
    State(state): State<AppState>,
    Path((kind, id)): Path<(String, Uuid)>,
) -> ApiResult<Json<Vec<SnapshotSummary>>> {
    let owner = parse_owner(&kind, id)?;
    tracing::debug!("Listing snapshots of {}", owner);

    let snapshots = snapshot_service::list_snapshots(state.store.as_ref(), owner).await?;

    Ok(Json(snapshots))
}

/// GET /snapshot/{id}
pub async fn get_snapshot(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Snapshot>> {
    tracing::debug!("Getting snapshot: {}", id);

    let snapshot = snapshot_service::get_snapshot(state.store.as_ref(), id).await?;

    Ok(Json(snapshot))
}

/// DELETE /snapshot/{id}
pub async fn delete_snapshot(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    tracing::info!("Deleting snapshot: {}", id);

    snapshot_service::delete_snapshot(state.store.as_ref(), id).await?;

    Ok(StatusCode::NO_CONTENT)
}

/// POST /snapshot/{id}/export
pub async fn export_snapshot(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<ExportSnapshot>,
) -> ApiResult<Json<ExportedSnapshot>> {
    tracing::info!("Exporting snapshot: {}", id);

    let exported = snapshot_service::export_snapshot(state.store.as_ref(), id, req).await?;

    Ok(Json(exported))
}

/// POST /snapshot/{id}/copy
pub async fn copy_snapshot(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<CopySnapshot>,
) -> ApiResult<Json<Snapshot>> {
    tracing::info!("Copying snapshot {} to {}", id, req.target);

    let copy = snapshot_service::copy_snapshot(
        state.store.as_ref(),
        state.gateway.as_ref(),
        id,
        req,
    )
    .await?;

    Ok(Json(copy))
}

/// POST /snapshot/upload
pub async fn upload_snapshot(
    State(state): State<AppState>,
    Json(req): Json<UploadSnapshot>,
) -> ApiResult<Json<Snapshot>> {
    tracing::info!("Uploading snapshot {} to {}", req.snapshot.name, req.owner);

    let snapshot = snapshot_service::upload_snapshot(state.store.as_ref(), req).await?;

    Ok(Json(snapshot))
}

fn parse_owner(kind: &str, id: Uuid) -> ApiResult<SnapshotOwner> {
    match kind {
        "instance" => Ok(SnapshotOwner::Instance(id)),
        "device" => Ok(SnapshotOwner::Device(id)),
        other => Err(ApiError::BadRequest(format!(
            "Unknown snapshot owner kind: {}",
            other
        ))),
    }
}
