//! Status API Handlers
//!
//! Read-side of a deploy, plus the device confirmation endpoint.

use axum::extract::State;
use conveyor_core::dto::status::{
    DeviceGroupStatus, DeviceStatus, InstanceStatus, ReportActiveSnapshot,
};
use uuid::Uuid;

use crate::api::AppState;
use crate::api::extract::{Json, Path};
use crate::api::error::ApiResult;
use crate::service::status_service;

/// GET /instance/{id}/status
pub async fn instance_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<InstanceStatus>> {
    let status = status_service::instance_status(state.store.as_ref(), id).await?;
    Ok(Json(status))
}

/// GET /device/{id}/status
pub async fn device_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<DeviceStatus>> {
    let status = status_service::device_status(state.store.as_ref(), id).await?;
    Ok(Json(status))
}

/// POST /device/{id}/active-snapshot
pub async fn report_active_snapshot(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<ReportActiveSnapshot>,
) -> ApiResult<Json<DeviceStatus>> {
    tracing::debug!("Device {} reports snapshot {:?}", id, req.snapshot_id);

    let status = status_service::report_active_snapshot(state.store.as_ref(), id, req).await?;
    Ok(Json(status))
}

/// GET /device-group/{id}/status
pub async fn device_group_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<DeviceGroupStatus>> {
    let status = status_service::device_group_status(state.store.as_ref(), id).await?;
    Ok(Json(status))
}
