//! Remote device domain types

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// How a device treats snapshots pushed to it
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceMode {
    /// Follows its target snapshot
    #[default]
    Autonomous,
    /// Edited locally; ignores pushed snapshots and cannot be deployed to
    Developer,
}

impl DeviceMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Autonomous => "autonomous",
            Self::Developer => "developer",
        }
    }
}

impl std::str::FromStr for DeviceMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "autonomous" => Ok(Self::Autonomous),
            "developer" => Ok(Self::Developer),
            other => Err(format!("unknown device mode: {}", other)),
        }
    }
}

/// Who a device belongs to. Application and instance ownership are exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum DeviceOwner {
    Application(Uuid),
    Instance(Uuid),
    Unassigned,
}

/// Remote device running a copy of the runtime
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Device {
    pub id: Uuid,
    pub team_id: Uuid,
    pub name: String,
    pub owner: DeviceOwner,
    pub mode: DeviceMode,
    pub device_group_id: Option<Uuid>,
    /// What the device should run
    pub target_snapshot_id: Option<Uuid>,
    /// What the device last confirmed running
    pub active_snapshot_id: Option<Uuid>,
    pub last_seen_at: Option<chrono::DateTime<chrono::Utc>>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl Device {
    /// True while the device has not yet confirmed its current target
    pub fn is_pending(&self) -> bool {
        self.target_snapshot_id.is_some() && self.target_snapshot_id != self.active_snapshot_id
    }
}

/// Named set of devices within one application sharing a target snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceGroup {
    pub id: Uuid,
    pub application_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub target_snapshot_id: Option<Uuid>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}
