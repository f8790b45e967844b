//! Status Service
//!
//! What callers poll to observe a deploy finishing, and what devices call to
//! confirm the snapshot they are running.

use conveyor_core::domain::device::Device;
use conveyor_core::dto::status::{
    DeviceGroupStatus, DeviceStatus, InstanceStatus, ReportActiveSnapshot,
};
use uuid::Uuid;

use crate::repository::{SnapshotRepository, Store, TargetRepository};
use crate::service::error::{Result, ServiceError};
use crate::service::target;

pub async fn instance_status(store: &dyn Store, id: Uuid) -> Result<InstanceStatus> {
    let instance = target::find_instance(store, id).await?;

    Ok(InstanceStatus {
        instance_id: instance.id,
        is_deploying: instance.is_deploying,
        target_snapshot_id: instance.target_snapshot_id,
    })
}

pub async fn device_status(store: &dyn Store, id: Uuid) -> Result<DeviceStatus> {
    let device = target::find_device(store, id).await?;
    Ok(to_status(&device))
}

/// Counts derived from the group's current members
pub async fn device_group_status(store: &dyn Store, id: Uuid) -> Result<DeviceGroupStatus> {
    let group = target::find_device_group(store, id).await?;
    let members = target::group_members(store, &group).await?;

    let matches = |pointer: Option<Uuid>| {
        group.target_snapshot_id.is_some() && pointer == group.target_snapshot_id
    };

    Ok(DeviceGroupStatus {
        device_group_id: group.id,
        target_snapshot_id: group.target_snapshot_id,
        device_count: members.len(),
        target_match_count: members
            .iter()
            .filter(|d| matches(d.target_snapshot_id))
            .count(),
        running_count: members
            .iter()
            .filter(|d| matches(d.active_snapshot_id))
            .count(),
    })
}

/// Record the snapshot a device confirms running.
///
/// A confirmation for anything but the current target is stored as reported
/// and leaves the device pending.
pub async fn report_active_snapshot(
    store: &dyn Store,
    device_id: Uuid,
    req: ReportActiveSnapshot,
) -> Result<DeviceStatus> {
    let device = target::find_device(store, device_id).await?;

    if let Some(snapshot_id) = req.snapshot_id {
        store
            .find_snapshot(snapshot_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Snapshot", snapshot_id))?;
    }

    store
        .set_device_active_snapshot(device.id, req.snapshot_id)
        .await?;

    if req.snapshot_id.is_some() && req.snapshot_id != device.target_snapshot_id {
        tracing::warn!(
            "Device {} reports snapshot {:?} but its target is {:?}",
            device.id,
            req.snapshot_id,
            device.target_snapshot_id
        );
    } else {
        tracing::debug!("Device {} running {:?}", device.id, req.snapshot_id);
    }

    device_status(store, device_id).await
}

fn to_status(device: &Device) -> DeviceStatus {
    DeviceStatus {
        device_id: device.id,
        mode: device.mode,
        target_snapshot_id: device.target_snapshot_id,
        active_snapshot_id: device.active_snapshot_id,
        pending: device.is_pending(),
    }
}
