//! Stage API Handlers
//!
//! HTTP endpoints for editing a pipeline's stage chain and deploying from a stage.

use axum::{
    extract::State,
    http::StatusCode,
};
use conveyor_core::dto::pipeline::{
    CreateStage, DeployRequest, DeployResponse, DeployStatus, StageView, UpdateStage,
};
use uuid::Uuid;

use crate::api::AppState;
use crate::api::extract::{Json, Path};
use crate::api::error::ApiResult;
use crate::service::stage_service;

/// POST /pipeline/{id}/stages
pub async fn create_stage(
    State(state): State<AppState>,
    Path(pipeline_id): Path<Uuid>,
    Json(req): Json<CreateStage>,
) -> ApiResult<Json<StageView>> {
    tracing::info!("Adding stage {} to pipeline {}", req.name, pipeline_id);

    let stage = stage_service::create_stage(state.store.as_ref(), pipeline_id, req).await?;

    Ok(Json(stage))
}

/// PUT /pipeline/{id}/stages/{stage_id}
pub async fn update_stage(
    State(state): State<AppState>,
    Path((pipeline_id, stage_id)): Path<(Uuid, Uuid)>,
    Json(req): Json<UpdateStage>,
) -> ApiResult<Json<StageView>> {
    tracing::info!("Updating stage {} of pipeline {}", stage_id, pipeline_id);

    let stage =
        stage_service::update_stage(state.store.as_ref(), pipeline_id, stage_id, req).await?;

    Ok(Json(stage))
}

/// DELETE /pipeline/{id}/stages/{stage_id}
pub async fn delete_stage(
    State(state): State<AppState>,
    Path((pipeline_id, stage_id)): Path<(Uuid, Uuid)>,
) -> ApiResult<StatusCode> {
    tracing::info!("Removing stage {} from pipeline {}", stage_id, pipeline_id);

    stage_service::delete_stage(state.store.as_ref(), pipeline_id, stage_id).await?;

    Ok(StatusCode::NO_CONTENT)
}

/// PUT /pipeline/{id}/stages/{stage_id}/deploy
///
/// Returns once the destination pointers are written. An instance restart
/// keeps running in the background; callers poll the status endpoints.
pub async fn deploy_stage(
    State(state): State<AppState>,
    Path((pipeline_id, stage_id)): Path<(Uuid, Uuid)>,
    body: Option<Json<DeployRequest>>,
) -> ApiResult<Json<DeployResponse>> {
    let req = body.map(|Json(req)| req).unwrap_or_default();

    state.deployer.deploy(pipeline_id, stage_id, req).await?;

    Ok(Json(DeployResponse {
        status: DeployStatus::Importing,
    }))
}
