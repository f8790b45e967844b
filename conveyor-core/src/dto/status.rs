//! Status DTOs
//!
//! Deploys return immediately; these are what callers poll to observe completion.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::device::DeviceMode;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceStatus {
    pub instance_id: Uuid,
    pub is_deploying: bool,
    pub target_snapshot_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceStatus {
    pub device_id: Uuid,
    pub mode: DeviceMode,
    pub target_snapshot_id: Option<Uuid>,
    pub active_snapshot_id: Option<Uuid>,
    /// Target set but not yet confirmed by the device
    pub pending: bool,
}

/// Derived counts over the current members of a device group
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceGroupStatus {
    pub device_group_id: Uuid,
    pub target_snapshot_id: Option<Uuid>,
    pub device_count: usize,
    /// Members whose target equals the group target
    pub target_match_count: usize,
    /// Members that confirmed running the group target
    pub running_count: usize,
}

/// Device confirmation of what it is running
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportActiveSnapshot {
    pub snapshot_id: Option<Uuid>,
}
