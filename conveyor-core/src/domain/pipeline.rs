//! Pipeline domain types

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::target::StageTarget;

/// Ordered chain of deployment stages for one application
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pipeline {
    pub id: Uuid,
    pub application_id: Uuid,
    pub name: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

/// Policy picking the snapshot a stage pushes to its successor
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageAction {
    /// Snapshot the source instance right now
    #[default]
    CreateSnapshot,
    /// Caller names an existing snapshot of the source
    Prompt,
    /// Most recent snapshot owned by the source
    UseLatestSnapshot,
    /// Snapshot the source device confirmed running
    UseActiveSnapshot,
}

impl StageAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CreateSnapshot => "create_snapshot",
            Self::Prompt => "prompt",
            Self::UseLatestSnapshot => "use_latest_snapshot",
            Self::UseActiveSnapshot => "use_active_snapshot",
        }
    }
}

impl std::str::FromStr for StageAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "create_snapshot" => Ok(Self::CreateSnapshot),
            "prompt" => Ok(Self::Prompt),
            "use_latest_snapshot" => Ok(Self::UseLatestSnapshot),
            "use_active_snapshot" => Ok(Self::UseActiveSnapshot),
            other => Err(format!("unknown stage action: {}", other)),
        }
    }
}

impl std::fmt::Display for StageAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Node of a pipeline's stage chain
///
/// `source_id` points at the previous stage (None for the first stage) and
/// `next_stage_id` at the following one (None for the last stage).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stage {
    pub id: Uuid,
    pub pipeline_id: Uuid,
    pub name: String,
    pub action: StageAction,
    pub target: Option<StageTarget>,
    pub source_id: Option<Uuid>,
    pub next_stage_id: Option<Uuid>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl Stage {
    pub fn is_device_group(&self) -> bool {
        matches!(self.target, Some(StageTarget::DeviceGroup(_)))
    }
}
