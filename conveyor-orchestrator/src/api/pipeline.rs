//! Pipeline API Handlers
//!
//! HTTP endpoints for pipeline management.

use axum::{
    extract::State,
    http::StatusCode,
};
use conveyor_core::dto::pipeline::{CreatePipeline, PipelineView, UpdatePipeline};
use uuid::Uuid;

use crate::api::AppState;
use crate::api::extract::{Json, Path};
use crate::api::error::ApiResult;
use crate::service::pipeline_service;

/// POST /pipeline/create
pub async fn create_pipeline(
    State(state): State<AppState>,
    Json(req): Json<CreatePipeline>,
) -> ApiResult<Json<PipelineView>> {
    tracing::info!("Creating pipeline: {}", req.name);

    let pipeline = pipeline_service::create_pipeline(state.store.as_ref(), req).await?;

    Ok(Json(pipeline))
}

/// GET /application/{id}/pipelines
pub async fn list_pipelines(
    State(state): State<AppState>,
    Path(application_id): Path<Uuid>,
) -> ApiResult<Json<Vec<PipelineView>>> {
    tracing::debug!("Listing pipelines of application: {}", application_id);

    let pipelines = pipeline_service::list_pipelines(state.store.as_ref(), application_id).await?;

    Ok(Json(pipelines))
}

/// GET /pipeline/{id}
pub async fn get_pipeline(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<PipelineView>> {
    tracing::debug!("Getting pipeline: {}", id);

    let pipeline = pipeline_service::get_pipeline(state.store.as_ref(), id).await?;

    Ok(Json(pipeline))
}

/// PUT /pipeline/{id}
pub async fn update_pipeline(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdatePipeline>,
) -> ApiResult<Json<PipelineView>> {
    tracing::info!("Renaming pipeline {} to {}", id, req.name);

    let pipeline = pipeline_service::update_pipeline(state.store.as_ref(), id, req).await?;

    Ok(Json(pipeline))
}

/// DELETE /pipeline/{id}
pub async fn delete_pipeline(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    tracing::info!("Deleting pipeline: {}", id);

    pipeline_service::delete_pipeline(state.store.as_ref(), id).await?;

    Ok(StatusCode::NO_CONTENT)
}
