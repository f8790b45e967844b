//! Target Resolver
//!
//! Turns the abstract target of a stage into the concrete entities a deploy
//! reads from and writes to, and picks the source snapshot per stage action.

use conveyor_core::domain::device::{Device, DeviceGroup, DeviceMode, DeviceOwner};
use conveyor_core::domain::instance::Instance;
use conveyor_core::domain::pipeline::{Stage, StageAction};
use conveyor_core::domain::snapshot::Snapshot;
use conveyor_core::domain::target::{SnapshotOwner, StageTarget, TargetKind};
use uuid::Uuid;

use crate::repository::{SnapshotRepository, Store, TargetRepository};
use crate::service::error::{Result, ServiceError};

/// Where a deploy takes its snapshot from
#[derive(Debug, Clone)]
pub enum SourceTarget {
    Instance(Instance),
    Device(Device),
}

impl SourceTarget {
    pub fn owner(&self) -> SnapshotOwner {
        match self {
            Self::Instance(instance) => SnapshotOwner::Instance(instance.id),
            Self::Device(device) => SnapshotOwner::Device(device.id),
        }
    }
}

/// Where a deploy pushes its snapshot to
#[derive(Debug, Clone)]
pub enum DeployTarget {
    Instance(Instance),
    Device(Device),
    /// Members are read when dispatching, see [`group_members`]
    DeviceGroup(DeviceGroup),
}

/// Snapshot picked from the source stage
#[derive(Debug, Clone)]
pub enum SourceSnapshot {
    Existing(Snapshot),
    /// `create_snapshot`: the instance is snapshotted once validation is over
    CreateNow(Instance),
}

/// Whether a target is part of an application.
///
/// Devices count when owned by the application directly or through one of
/// its instances.
pub async fn belongs_to_application(
    store: &dyn Store,
    target: StageTarget,
    application_id: Uuid,
) -> Result<bool> {
    match target {
        StageTarget::Instance(id) => {
            let instance = find_instance(store, id).await?;
            Ok(instance.application_id == application_id)
        }
        StageTarget::Device(id) => {
            let device = find_device(store, id).await?;
            device_application(store, &device)
                .await
                .map(|app| app == Some(application_id))
        }
        StageTarget::DeviceGroup(id) => {
            let group = find_device_group(store, id).await?;
            Ok(group.application_id == application_id)
        }
    }
}

/// Reject targets from another application
pub async fn check_application(
    store: &dyn Store,
    target: StageTarget,
    application_id: Uuid,
) -> Result<()> {
    if belongs_to_application(store, target, application_id).await? {
        Ok(())
    } else {
        Err(ServiceError::ApplicationMismatch {
            kind: target.kind(),
        })
    }
}

/// Application a device ultimately belongs to
pub async fn device_application(store: &dyn Store, device: &Device) -> Result<Option<Uuid>> {
    match device.owner {
        DeviceOwner::Application(id) => Ok(Some(id)),
        DeviceOwner::Instance(instance_id) => Ok(store
            .find_instance(instance_id)
            .await?
            .map(|instance| instance.application_id)),
        DeviceOwner::Unassigned => Ok(None),
    }
}

/// Resolve the stage a deploy reads from
pub async fn resolve_source(store: &dyn Store, stage: &Stage) -> Result<SourceTarget> {
    match stage.target {
        Some(StageTarget::Instance(id)) => Ok(SourceTarget::Instance(find_instance(store, id).await?)),
        Some(StageTarget::Device(id)) => Ok(SourceTarget::Device(find_device(store, id).await?)),
        Some(StageTarget::DeviceGroup(_)) => Err(ServiceError::InvalidSourceAction(
            "Deploying from a device group is not supported".to_string(),
        )),
        None => Err(ServiceError::InvalidStage(format!(
            "Stage {} has no target configured",
            stage.id
        ))),
    }
}

/// Resolve the stage a deploy writes to
pub async fn resolve_destination(store: &dyn Store, stage: &Stage) -> Result<DeployTarget> {
    match stage.target {
        Some(StageTarget::Instance(id)) => Ok(DeployTarget::Instance(find_instance(store, id).await?)),
        Some(StageTarget::Device(id)) => {
            let device = find_device(store, id).await?;
            if device.mode == DeviceMode::Developer {
                return Err(ServiceError::InvalidTargetStage(format!(
                    "Device {} is in developer mode and cannot be deployed to",
                    device.id
                )));
            }
            Ok(DeployTarget::Device(device))
        }
        Some(StageTarget::DeviceGroup(id)) => {
            Ok(DeployTarget::DeviceGroup(find_device_group(store, id).await?))
        }
        None => Err(ServiceError::InvalidTargetStage(format!(
            "Stage {} has no target configured",
            stage.id
        ))),
    }
}

/// Current members of a device group; an empty group is not an error
pub async fn group_members(store: &dyn Store, group: &DeviceGroup) -> Result<Vec<Device>> {
    Ok(store.list_group_devices(group.id).await?)
}

/// Pick the snapshot a deploy pushes forward, per the source stage's action
pub async fn resolve_source_snapshot(
    store: &dyn Store,
    action: StageAction,
    source: &SourceTarget,
    source_snapshot_id: Option<Uuid>,
) -> Result<SourceSnapshot> {
    match action {
        StageAction::CreateSnapshot => match source {
            SourceTarget::Instance(instance) => Ok(SourceSnapshot::CreateNow(instance.clone())),
            SourceTarget::Device(_) => Err(ServiceError::InvalidSourceAction(
                "Creating a snapshot from a device is not supported".to_string(),
            )),
        },
        StageAction::Prompt => {
            let not_associated = || {
                ServiceError::InvalidSourceSnapshot(format!(
                    "Source snapshot not associated with source {}",
                    source_noun(source)
                ))
            };

            let id = source_snapshot_id.ok_or_else(|| {
                ServiceError::InvalidSourceSnapshot("No source snapshot provided".to_string())
            })?;
            let snapshot = store.find_snapshot(id).await?.ok_or_else(not_associated)?;

            if snapshot.owner != Some(source.owner()) {
                return Err(not_associated());
            }
            Ok(SourceSnapshot::Existing(snapshot))
        }
        StageAction::UseLatestSnapshot => {
            match store.latest_snapshot(source.owner()).await? {
                Some(snapshot) => Ok(SourceSnapshot::Existing(snapshot)),
                None => Err(no_snapshot(source, "has no snapshots")),
            }
        }
        StageAction::UseActiveSnapshot => {
            let SourceTarget::Device(device) = source else {
                return Err(ServiceError::InvalidSourceAction(
                    "use_active_snapshot requires the source stage to be a device".to_string(),
                ));
            };

            let snapshot = match device.active_snapshot_id {
                Some(id) => store.find_snapshot(id).await?,
                None => None,
            };
            snapshot
                .map(SourceSnapshot::Existing)
                .ok_or_else(|| no_snapshot(source, "has no active snapshot"))
        }
    }
}

fn source_noun(source: &SourceTarget) -> &'static str {
    match source {
        SourceTarget::Instance(_) => TargetKind::Instance.as_str(),
        SourceTarget::Device(_) => TargetKind::Device.as_str(),
    }
}

fn no_snapshot(source: &SourceTarget, reason: &str) -> ServiceError {
    match source {
        SourceTarget::Instance(instance) => ServiceError::InvalidSourceInstance(format!(
            "Source instance {} {}",
            instance.id, reason
        )),
        SourceTarget::Device(device) => {
            ServiceError::InvalidSourceDevice(format!("Source device {} {}", device.id, reason))
        }
    }
}

pub(crate) async fn find_instance(store: &dyn Store, id: Uuid) -> Result<Instance> {
    store
        .find_instance(id)
        .await?
        .ok_or_else(|| ServiceError::not_found("Instance", id))
}

pub(crate) async fn find_device(store: &dyn Store, id: Uuid) -> Result<Device> {
    store
        .find_device(id)
        .await?
        .ok_or_else(|| ServiceError::not_found("Device", id))
}

pub(crate) async fn find_device_group(store: &dyn Store, id: Uuid) -> Result<DeviceGroup> {
    store
        .find_device_group(id)
        .await?
        .ok_or_else(|| ServiceError::not_found("Device group", id))
}
