//! Seeded in-memory world shared by the service tests

use conveyor_core::credentials;
use conveyor_core::domain::application::Application;
use conveyor_core::domain::device::{Device, DeviceGroup, DeviceMode, DeviceOwner};
use conveyor_core::domain::instance::{EnvVar, Instance};
use conveyor_core::domain::pipeline::{Stage, StageAction};
use conveyor_core::domain::snapshot::{Snapshot, SnapshotFlows, SnapshotSettings};
use conveyor_core::domain::target::{SnapshotOwner, StageTarget};
use conveyor_core::dto::pipeline::{CreatePipeline, CreateStage, PipelineView, StageView};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::gateway::{ChannelGateway, CommandGateway, CommandTarget, Envelope};
use crate::repository::{
    MemoryStore, RuntimeRepository, SnapshotRepository, Store, TargetRepository,
};
use crate::service::{Deployer, pipeline, snapshot, stage};

pub struct Fixture {
    pub store: Arc<MemoryStore>,
    pub gateway: Arc<ChannelGateway>,
    pub team_id: Uuid,
    pub application: Application,
}

impl Fixture {
    pub async fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let team_id = Uuid::new_v4();
        let application = Application {
            id: Uuid::new_v4(),
            team_id,
            name: "app".to_string(),
        };
        store.insert_application(&application).await.unwrap();

        Self {
            store,
            gateway: Arc::new(ChannelGateway::new(8)),
            team_id,
            application,
        }
    }

    pub fn store(&self) -> &dyn Store {
        self.store.as_ref()
    }

    pub fn gateway(&self) -> &dyn CommandGateway {
        self.gateway.as_ref()
    }

    pub fn deployer(&self) -> Deployer {
        Deployer::new(
            self.store.clone(),
            self.gateway.clone(),
            Duration::from_secs(2),
        )
    }

    pub async fn connect(&self, target: CommandTarget) -> mpsc::Receiver<Envelope> {
        self.gateway.connect(target).await
    }

    pub async fn other_application(&self) -> Application {
        let application = Application {
            id: Uuid::new_v4(),
            team_id: self.team_id,
            name: "other".to_string(),
        };
        self.store.insert_application(&application).await.unwrap();
        application
    }

    pub async fn instance(&self, name: &str) -> Instance {
        self.instance_in(self.application.id, name).await
    }

    pub async fn instance_in(&self, application_id: Uuid, name: &str) -> Instance {
        let now = chrono::Utc::now();
        let instance = Instance {
            id: Uuid::new_v4(),
            application_id,
            name: name.to_string(),
            target_snapshot_id: None,
            is_deploying: false,
            created_at: now,
            updated_at: now,
        };
        self.store.insert_instance(&instance).await.unwrap();
        instance
    }

    pub async fn device(&self, owner: DeviceOwner, mode: DeviceMode) -> Device {
        self.insert_device(owner, mode, None).await
    }

    /// Autonomous application device in a group
    pub async fn group_device(&self, group_id: Uuid) -> Device {
        self.insert_device(
            DeviceOwner::Application(self.application.id),
            DeviceMode::Autonomous,
            Some(group_id),
        )
        .await
    }

    async fn insert_device(
        &self,
        owner: DeviceOwner,
        mode: DeviceMode,
        device_group_id: Option<Uuid>,
    ) -> Device {
        let now = chrono::Utc::now();
        let id = Uuid::new_v4();
        let device = Device {
            id,
            team_id: self.team_id,
            name: format!("device-{}", id),
            owner,
            mode,
            device_group_id,
            target_snapshot_id: None,
            active_snapshot_id: None,
            last_seen_at: None,
            created_at: now,
            updated_at: now,
        };
        self.store.insert_device(&device).await.unwrap();
        device
    }

    pub async fn device_group(&self, name: &str) -> DeviceGroup {
        self.device_group_in(self.application.id, name).await
    }

    pub async fn device_group_in(&self, application_id: Uuid, name: &str) -> DeviceGroup {
        let now = chrono::Utc::now();
        let group = DeviceGroup {
            id: Uuid::new_v4(),
            application_id,
            name: name.to_string(),
            description: None,
            target_snapshot_id: None,
            created_at: now,
            updated_at: now,
        };
        self.store.insert_device_group(&group).await.unwrap();
        group
    }

    pub async fn pipeline(&self, name: &str) -> PipelineView {
        pipeline::create_pipeline(
            self.store(),
            CreatePipeline {
                application_id: self.application.id,
                name: name.to_string(),
            },
        )
        .await
        .unwrap()
    }

    /// Append a stage through the stage graph
    pub async fn stage(
        &self,
        pipeline_id: Uuid,
        name: &str,
        target: StageTarget,
        action: StageAction,
    ) -> StageView {
        stage::create_stage(
            self.store(),
            pipeline_id,
            CreateStage {
                name: name.to_string(),
                action,
                instance_id: target.instance_id(),
                device_id: target.device_id(),
                device_group_id: target.device_group_id(),
                source: None,
            },
        )
        .await
        .unwrap()
    }

    /// Stage that is never stored
    pub fn bare_stage(&self, target: Option<StageTarget>) -> Stage {
        let now = chrono::Utc::now();
        Stage {
            id: Uuid::new_v4(),
            pipeline_id: Uuid::new_v4(),
            name: "bare".to_string(),
            action: StageAction::CreateSnapshot,
            target,
            source_id: None,
            next_stage_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Snapshot inserted directly, without credentials
    pub async fn snapshot(&self, owner: SnapshotOwner, name: &str) -> Snapshot {
        let now = chrono::Utc::now();
        let snapshot = Snapshot {
            id: Uuid::new_v4(),
            name: name.to_string(),
            description: String::new(),
            owner: Some(owner),
            user_id: None,
            flows: SnapshotFlows {
                flows: vec![serde_json::json!({ "id": name })],
                credentials: None,
            },
            settings: SnapshotSettings::default(),
            created_at: now,
            updated_at: now,
        };
        self.store.insert_snapshot(&snapshot).await.unwrap();
        snapshot
    }

    /// Replace the live runtime of a target. Credentials are given in plaintext.
    pub async fn set_live(
        &self,
        owner: SnapshotOwner,
        flows: Value,
        plaintext_credentials: Value,
        env: &[(&str, &str)],
    ) {
        let key = snapshot::credential_key(self.store(), owner).await.unwrap();
        let mut state = self
            .store
            .runtime_state(owner)
            .await
            .unwrap()
            .unwrap_or_default();

        state.flows = serde_json::from_value(flows).unwrap();
        state.credentials = match plaintext_credentials.as_object() {
            Some(map) if !map.is_empty() => {
                Some(credentials::encrypt(&key, &plaintext_credentials).unwrap())
            }
            _ => None,
        };
        state.env = env
            .iter()
            .map(|(name, value)| EnvVar::new(*name, *value))
            .collect();

        self.store.store_runtime_state(owner, &state).await.unwrap();
    }
}
