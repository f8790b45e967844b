//! Pipeline and stage DTOs

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::device::DeviceMode;
use crate::domain::pipeline::{Pipeline, StageAction};

/// Request to create a new pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePipeline {
    pub application_id: Uuid,
    pub name: String,
}

/// Request to rename a pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdatePipeline {
    pub name: String,
}

/// Request to add a stage to a pipeline
///
/// Exactly one of `instance_id`, `device_id` and `device_group_id` must be set.
/// Without `source` the stage is appended after the current last stage.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateStage {
    pub name: String,
    #[serde(default)]
    pub action: StageAction,
    pub instance_id: Option<Uuid>,
    pub device_id: Option<Uuid>,
    pub device_group_id: Option<Uuid>,
    pub source: Option<Uuid>,
}

/// Partial stage update. Setting a target field replaces the current target.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateStage {
    pub name: Option<String>,
    pub action: Option<StageAction>,
    pub instance_id: Option<Uuid>,
    pub device_id: Option<Uuid>,
    pub device_group_id: Option<Uuid>,
}

/// Request to deploy from a stage to its successor
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeployRequest {
    pub source_snapshot_id: Option<Uuid>,
}

/// Only synchronous signal of a deploy; completion is observed through status reads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeployStatus {
    Importing,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeployResponse {
    pub status: DeployStatus,
}

/// Instance as displayed on a stage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceSummary {
    pub id: Uuid,
    pub name: String,
}

/// Device as displayed on a stage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceSummary {
    pub id: Uuid,
    pub name: String,
    pub mode: DeviceMode,
}

/// Device group as displayed on a stage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceGroupSummary {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
}

/// Stage with its target resolved for display
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageView {
    pub id: Uuid,
    pub pipeline_id: Uuid,
    pub name: String,
    pub action: StageAction,
    pub source: Option<Uuid>,
    pub next_stage_id: Option<Uuid>,
    pub instances: Vec<InstanceSummary>,
    pub devices: Vec<DeviceSummary>,
    pub device_groups: Vec<DeviceGroupSummary>,
}

/// Pipeline with its stages in chain order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineView {
    pub id: Uuid,
    pub application_id: Uuid,
    pub name: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
    pub stages: Vec<StageView>,
}

impl PipelineView {
    pub fn new(pipeline: Pipeline, stages: Vec<StageView>) -> Self {
        Self {
            id: pipeline.id,
            application_id: pipeline.application_id,
            name: pipeline.name,
            created_at: pipeline.created_at,
            updated_at: pipeline.updated_at,
            stages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deploy_response_wire_format() {
        let response = DeployResponse {
            status: DeployStatus::Importing,
        };
        assert_eq!(
            serde_json::to_value(response).unwrap(),
            serde_json::json!({ "status": "importing" })
        );
    }

    #[test]
    fn test_create_stage_defaults_action() {
        let req: CreateStage = serde_json::from_value(serde_json::json!({
            "name": "Production",
            "instance_id": Uuid::nil(),
        }))
        .unwrap();
        assert_eq!(req.action, StageAction::CreateSnapshot);
        assert!(req.source.is_none());
    }
}
