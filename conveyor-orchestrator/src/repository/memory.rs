//! In-memory Store
//!
//! Keeps every entity in hash maps behind a single `RwLock`. Used when the
//! orchestrator runs without `DATABASE_URL` and throughout the test-suite.

use async_trait::async_trait;
use conveyor_core::domain::application::Application;
use conveyor_core::domain::device::{Device, DeviceGroup, DeviceOwner};
use conveyor_core::domain::instance::{Instance, RuntimeState};
use conveyor_core::domain::pipeline::{Pipeline, Stage};
use conveyor_core::domain::snapshot::Snapshot;
use conveyor_core::domain::target::SnapshotOwner;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    PipelineRepository, Result, RuntimeRepository, SnapshotRepository, StageRepository,
    TargetRepository,
};

#[derive(Default)]
struct State {
    applications: HashMap<Uuid, Application>,
    instances: HashMap<Uuid, Instance>,
    devices: HashMap<Uuid, Device>,
    device_groups: HashMap<Uuid, DeviceGroup>,
    pipelines: HashMap<Uuid, Pipeline>,
    stages: HashMap<Uuid, Stage>,
    // Insertion order doubles as creation order
    snapshots: Vec<Snapshot>,
    secrets: HashMap<SnapshotOwner, String>,
    runtime: HashMap<SnapshotOwner, RuntimeState>,
}

#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PipelineRepository for MemoryStore {
    async fn insert_pipeline(&self, pipeline: &Pipeline) -> Result<()> {
        let mut state = self.state.write().await;
        state.pipelines.insert(pipeline.id, pipeline.clone());
        Ok(())
    }

    async fn find_pipeline(&self, id: Uuid) -> Result<Option<Pipeline>> {
        Ok(self.state.read().await.pipelines.get(&id).cloned())
    }

    async fn list_pipelines(&self, application_id: Uuid) -> Result<Vec<Pipeline>> {
        let state = self.state.read().await;
        let mut pipelines: Vec<Pipeline> = state
            .pipelines
            .values()
            .filter(|p| p.application_id == application_id)
            .cloned()
            .collect();
        pipelines.sort_by_key(|p| p.created_at);
        Ok(pipelines)
    }

    async fn update_pipeline(&self, pipeline: &Pipeline) -> Result<bool> {
        let mut state = self.state.write().await;
        match state.pipelines.get_mut(&pipeline.id) {
            Some(existing) => {
                *existing = pipeline.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_pipeline(&self, id: Uuid) -> Result<bool> {
        let mut state = self.state.write().await;
        let removed = state.pipelines.remove(&id).is_some();
        state.stages.retain(|_, stage| stage.pipeline_id != id);
        Ok(removed)
    }
}

#[async_trait]
impl StageRepository for MemoryStore {
    async fn insert_stage(&self, stage: &Stage) -> Result<()> {
        let mut state = self.state.write().await;
        state.stages.insert(stage.id, stage.clone());
        Ok(())
    }

    async fn find_stage(&self, id: Uuid) -> Result<Option<Stage>> {
        Ok(self.state.read().await.stages.get(&id).cloned())
    }

    async fn list_stages(&self, pipeline_id: Uuid) -> Result<Vec<Stage>> {
        let state = self.state.read().await;
        Ok(state
            .stages
            .values()
            .filter(|s| s.pipeline_id == pipeline_id)
            .cloned()
            .collect())
    }

    async fn update_stage(&self, stage: &Stage) -> Result<bool> {
        let mut state = self.state.write().await;
        match state.stages.get_mut(&stage.id) {
            Some(existing) => {
                *existing = stage.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_stage(&self, id: Uuid) -> Result<bool> {
        Ok(self.state.write().await.stages.remove(&id).is_some())
    }
}

#[async_trait]
impl SnapshotRepository for MemoryStore {
    async fn insert_snapshot(&self, snapshot: &Snapshot) -> Result<()> {
        self.state.write().await.snapshots.push(snapshot.clone());
        Ok(())
    }

    async fn find_snapshot(&self, id: Uuid) -> Result<Option<Snapshot>> {
        let state = self.state.read().await;
        Ok(state.snapshots.iter().find(|s| s.id == id).cloned())
    }

    async fn list_snapshots(&self, owner: SnapshotOwner) -> Result<Vec<Snapshot>> {
        let state = self.state.read().await;
        Ok(state
            .snapshots
            .iter()
            .rev()
            .filter(|s| s.owner == Some(owner))
            .cloned()
            .collect())
    }

    async fn latest_snapshot(&self, owner: SnapshotOwner) -> Result<Option<Snapshot>> {
        let state = self.state.read().await;
        Ok(state
            .snapshots
            .iter()
            .rev()
            .find(|s| s.owner == Some(owner))
            .cloned())
    }

    async fn delete_snapshot(&self, id: Uuid) -> Result<bool> {
        let mut state = self.state.write().await;
        let before = state.snapshots.len();
        state.snapshots.retain(|s| s.id != id);
        if state.snapshots.len() == before {
            return Ok(false);
        }

        for device in state.devices.values_mut() {
            if device.target_snapshot_id == Some(id) {
                device.target_snapshot_id = None;
            }
            if device.active_snapshot_id == Some(id) {
                device.active_snapshot_id = None;
            }
        }
        for group in state.device_groups.values_mut() {
            if group.target_snapshot_id == Some(id) {
                group.target_snapshot_id = None;
            }
        }
        for instance in state.instances.values_mut() {
            if instance.target_snapshot_id == Some(id) {
                instance.target_snapshot_id = None;
            }
        }

        Ok(true)
    }
}

#[async_trait]
impl TargetRepository for MemoryStore {
    async fn insert_application(&self, application: &Application) -> Result<()> {
        let mut state = self.state.write().await;
        state
            .applications
            .insert(application.id, application.clone());
        Ok(())
    }

    async fn find_application(&self, id: Uuid) -> Result<Option<Application>> {
        Ok(self.state.read().await.applications.get(&id).cloned())
    }

    async fn insert_instance(&self, instance: &Instance) -> Result<()> {
        let mut state = self.state.write().await;
        state.instances.insert(instance.id, instance.clone());
        Ok(())
    }

    async fn find_instance(&self, id: Uuid) -> Result<Option<Instance>> {
        Ok(self.state.read().await.instances.get(&id).cloned())
    }

    async fn set_instance_target_snapshot(
        &self,
        id: Uuid,
        snapshot_id: Option<Uuid>,
    ) -> Result<()> {
        let mut state = self.state.write().await;
        if let Some(instance) = state.instances.get_mut(&id) {
            instance.target_snapshot_id = snapshot_id;
            instance.updated_at = chrono::Utc::now();
        }
        Ok(())
    }

    async fn set_instance_deploying(&self, id: Uuid, deploying: bool) -> Result<()> {
        let mut state = self.state.write().await;
        if let Some(instance) = state.instances.get_mut(&id) {
            instance.is_deploying = deploying;
        }
        Ok(())
    }

    async fn clear_instance_deploying(&self, id: Uuid, snapshot_id: Uuid) -> Result<bool> {
        let mut state = self.state.write().await;
        match state.instances.get_mut(&id) {
            Some(instance) if instance.target_snapshot_id == Some(snapshot_id) => {
                instance.is_deploying = false;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn insert_device(&self, device: &Device) -> Result<()> {
        let mut state = self.state.write().await;
        state.devices.insert(device.id, device.clone());
        Ok(())
    }

    async fn find_device(&self, id: Uuid) -> Result<Option<Device>> {
        Ok(self.state.read().await.devices.get(&id).cloned())
    }

    async fn list_instance_devices(&self, instance_id: Uuid) -> Result<Vec<Device>> {
        let state = self.state.read().await;
        let mut devices: Vec<Device> = state
            .devices
            .values()
            .filter(|d| d.owner == DeviceOwner::Instance(instance_id))
            .cloned()
            .collect();
        devices.sort_by_key(|d| d.created_at);
        Ok(devices)
    }

    async fn set_device_target_snapshot(&self, id: Uuid, snapshot_id: Option<Uuid>) -> Result<()> {
        let mut state = self.state.write().await;
        if let Some(device) = state.devices.get_mut(&id) {
            device.target_snapshot_id = snapshot_id;
            device.updated_at = chrono::Utc::now();
        }
        Ok(())
    }

    async fn set_device_active_snapshot(&self, id: Uuid, snapshot_id: Option<Uuid>) -> Result<()> {
        let mut state = self.state.write().await;
        if let Some(device) = state.devices.get_mut(&id) {
            let now = chrono::Utc::now();
            device.active_snapshot_id = snapshot_id;
            device.last_seen_at = Some(now);
            device.updated_at = now;
        }
        Ok(())
    }

    async fn insert_device_group(&self, group: &DeviceGroup) -> Result<()> {
        let mut state = self.state.write().await;
        state.device_groups.insert(group.id, group.clone());
        Ok(())
    }

    async fn find_device_group(&self, id: Uuid) -> Result<Option<DeviceGroup>> {
        Ok(self.state.read().await.device_groups.get(&id).cloned())
    }

    async fn list_group_devices(&self, group_id: Uuid) -> Result<Vec<Device>> {
        let state = self.state.read().await;
        let mut devices: Vec<Device> = state
            .devices
            .values()
            .filter(|d| d.device_group_id == Some(group_id))
            .cloned()
            .collect();
        devices.sort_by_key(|d| d.created_at);
        Ok(devices)
    }

    async fn set_device_group_target_snapshot(
        &self,
        id: Uuid,
        snapshot_id: Option<Uuid>,
    ) -> Result<()> {
        let mut state = self.state.write().await;
        if let Some(group) = state.device_groups.get_mut(&id) {
            group.target_snapshot_id = snapshot_id;
            group.updated_at = chrono::Utc::now();
        }
        Ok(())
    }

    async fn credential_secret(&self, owner: SnapshotOwner) -> Result<Option<String>> {
        Ok(self.state.read().await.secrets.get(&owner).cloned())
    }

    async fn store_credential_secret(&self, owner: SnapshotOwner, secret: &str) -> Result<()> {
        let mut state = self.state.write().await;
        state.secrets.insert(owner, secret.to_string());
        Ok(())
    }
}

#[async_trait]
impl RuntimeRepository for MemoryStore {
    async fn runtime_state(&self, owner: SnapshotOwner) -> Result<Option<RuntimeState>> {
        Ok(self.state.read().await.runtime.get(&owner).cloned())
    }

    async fn store_runtime_state(&self, owner: SnapshotOwner, state: &RuntimeState) -> Result<()> {
        let mut guard = self.state.write().await;
        guard.runtime.insert(owner, state.clone());
        Ok(())
    }
}
