//! Deployment target types
//!
//! A stage points at exactly one target. The three shapes are a sum type so a
//! stage can never reference two targets at once; an unconfigured stage simply
//! holds `None`.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Target of a pipeline stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum StageTarget {
    Instance(Uuid),
    Device(Uuid),
    DeviceGroup(Uuid),
}

/// More than one of the instance/device/device group fields was supplied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MultipleTargets;

impl StageTarget {
    /// Build a target from the three optional request fields.
    ///
    /// Returns `Ok(None)` when none is set and `Err(MultipleTargets)` when
    /// more than one is.
    pub fn from_fields(
        instance_id: Option<Uuid>,
        device_id: Option<Uuid>,
        device_group_id: Option<Uuid>,
    ) -> Result<Option<Self>, MultipleTargets> {
        match (instance_id, device_id, device_group_id) {
            (None, None, None) => Ok(None),
            (Some(id), None, None) => Ok(Some(Self::Instance(id))),
            (None, Some(id), None) => Ok(Some(Self::Device(id))),
            (None, None, Some(id)) => Ok(Some(Self::DeviceGroup(id))),
            _ => Err(MultipleTargets),
        }
    }

    pub fn id(&self) -> Uuid {
        match self {
            Self::Instance(id) | Self::Device(id) | Self::DeviceGroup(id) => *id,
        }
    }

    pub fn kind(&self) -> TargetKind {
        match self {
            Self::Instance(_) => TargetKind::Instance,
            Self::Device(_) => TargetKind::Device,
            Self::DeviceGroup(_) => TargetKind::DeviceGroup,
        }
    }

    pub fn instance_id(&self) -> Option<Uuid> {
        match self {
            Self::Instance(id) => Some(*id),
            _ => None,
        }
    }

    pub fn device_id(&self) -> Option<Uuid> {
        match self {
            Self::Device(id) => Some(*id),
            _ => None,
        }
    }

    pub fn device_group_id(&self) -> Option<Uuid> {
        match self {
            Self::DeviceGroup(id) => Some(*id),
            _ => None,
        }
    }
}

/// Kind of target, without its identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetKind {
    Instance,
    Device,
    DeviceGroup,
}

impl TargetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Instance => "instance",
            Self::Device => "device",
            Self::DeviceGroup => "device_group",
        }
    }
}

impl std::fmt::Display for TargetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Owner of a snapshot (and of a credential secret)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum SnapshotOwner {
    Instance(Uuid),
    Device(Uuid),
}

impl SnapshotOwner {
    pub fn id(&self) -> Uuid {
        match self {
            Self::Instance(id) | Self::Device(id) => *id,
        }
    }

    pub fn kind(&self) -> TargetKind {
        match self {
            Self::Instance(_) => TargetKind::Instance,
            Self::Device(_) => TargetKind::Device,
        }
    }
}

impl std::fmt::Display for SnapshotOwner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.kind(), self.id())
    }
}
