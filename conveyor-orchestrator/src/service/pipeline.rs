//! Pipeline Service
//!
//! Business logic for pipeline management.

use conveyor_core::domain::pipeline::{Pipeline, Stage};
use conveyor_core::domain::target::StageTarget;
use conveyor_core::dto::pipeline::{
    CreatePipeline, DeviceGroupSummary, DeviceSummary, InstanceSummary, PipelineView, StageView,
    UpdatePipeline,
};
use uuid::Uuid;

use crate::repository::{PipelineRepository, Store, TargetRepository};
use crate::service::error::{Result, ServiceError};
use crate::service::stage;

/// Create a new, empty pipeline
pub async fn create_pipeline(store: &dyn Store, req: CreatePipeline) -> Result<PipelineView> {
    validate_name(&req.name)?;

    store
        .find_application(req.application_id)
        .await?
        .ok_or_else(|| ServiceError::not_found("Application", req.application_id))?;

    let now = chrono::Utc::now();
    let pipeline = Pipeline {
        id: Uuid::new_v4(),
        application_id: req.application_id,
        name: req.name,
        created_at: now,
        updated_at: now,
    };

    store.insert_pipeline(&pipeline).await?;

    tracing::info!("Pipeline created: {} ({})", pipeline.name, pipeline.id);

    Ok(PipelineView::new(pipeline, Vec::new()))
}

/// Get a pipeline with its stages in chain order
pub async fn get_pipeline(store: &dyn Store, id: Uuid) -> Result<PipelineView> {
    let pipeline = store
        .find_pipeline(id)
        .await?
        .ok_or_else(|| ServiceError::not_found("Pipeline", id))?;

    view(store, pipeline).await
}

/// List the pipelines of an application
pub async fn list_pipelines(store: &dyn Store, application_id: Uuid) -> Result<Vec<PipelineView>> {
    store
        .find_application(application_id)
        .await?
        .ok_or_else(|| ServiceError::not_found("Application", application_id))?;

    let pipelines = store.list_pipelines(application_id).await?;

    let mut views = Vec::with_capacity(pipelines.len());
    for pipeline in pipelines {
        views.push(view(store, pipeline).await?);
    }

    Ok(views)
}

/// Rename a pipeline
pub async fn update_pipeline(store: &dyn Store, id: Uuid, req: UpdatePipeline) -> Result<PipelineView> {
    validate_name(&req.name)?;

    let mut pipeline = store
        .find_pipeline(id)
        .await?
        .ok_or_else(|| ServiceError::not_found("Pipeline", id))?;

    pipeline.name = req.name;
    pipeline.updated_at = chrono::Utc::now();

    if !store.update_pipeline(&pipeline).await? {
        return Err(ServiceError::not_found("Pipeline", id));
    }

    tracing::info!("Pipeline updated: {} ({})", pipeline.name, pipeline.id);

    view(store, pipeline).await
}

/// Delete a pipeline and all of its stages
pub async fn delete_pipeline(store: &dyn Store, id: Uuid) -> Result<()> {
    let deleted = store.delete_pipeline(id).await?;

    if !deleted {
        return Err(ServiceError::not_found("Pipeline", id));
    }

    tracing::info!("Pipeline deleted: {}", id);

    Ok(())
}

async fn view(store: &dyn Store, pipeline: Pipeline) -> Result<PipelineView> {
    let chain = stage::walk(store, pipeline.id).await?;

    let mut stages = Vec::with_capacity(chain.len());
    for stage in &chain {
        stages.push(stage_view(store, stage).await?);
    }

    Ok(PipelineView::new(pipeline, stages))
}

/// Stage with its target resolved for display. A target that no longer
/// exists shows up as empty lists.
pub(crate) async fn stage_view(store: &dyn Store, stage: &Stage) -> Result<StageView> {
    let mut view = StageView {
        id: stage.id,
        pipeline_id: stage.pipeline_id,
        name: stage.name.clone(),
        action: stage.action,
        source: stage.source_id,
        next_stage_id: stage.next_stage_id,
        instances: Vec::new(),
        devices: Vec::new(),
        device_groups: Vec::new(),
    };

    match stage.target {
        Some(StageTarget::Instance(id)) => {
            if let Some(instance) = store.find_instance(id).await? {
                view.instances.push(InstanceSummary {
                    id: instance.id,
                    name: instance.name,
                });
            }
        }
        Some(StageTarget::Device(id)) => {
            if let Some(device) = store.find_device(id).await? {
                view.devices.push(DeviceSummary {
                    id: device.id,
                    name: device.name,
                    mode: device.mode,
                });
            }
        }
        Some(StageTarget::DeviceGroup(id)) => {
            if let Some(group) = store.find_device_group(id).await? {
                view.device_groups.push(DeviceGroupSummary {
                    id: group.id,
                    name: group.name,
                    description: group.description,
                });
            }
        }
        None => {}
    }

    Ok(view)
}

// =============================================================================
// Validation
// =============================================================================

fn validate_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(ServiceError::InvalidInput(
            "Pipeline name cannot be empty".to_string(),
        ));
    }

    if name.len() > 255 {
        return Err(ServiceError::InvalidInput(
            "Pipeline name is too long (max 255 characters)".to_string(),
        ));
    }

    Ok(())
}
