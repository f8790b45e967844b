//! Deploy Orchestrator
//!
//! Pushes a snapshot from one stage of a pipeline to the next. Each call runs
//! through `Resolving -> Snapshotting -> Dispatching` and ends `Complete` or
//! `Failed`. Everything that can reject the request is checked while
//! resolving, before anything is written.
//!
//! Instances get their own copy of the snapshot and are restarted in the
//! background; devices and groups are pointed at the source snapshot itself
//! and told to fetch it. Neither waits for the target to finish: callers
//! observe completion through the status endpoints.

use conveyor_core::domain::pipeline::{Pipeline, Stage};
use conveyor_core::domain::snapshot::Snapshot;
use conveyor_core::domain::target::SnapshotOwner;
use conveyor_core::dto::command::Command;
use conveyor_core::dto::pipeline::{DeployRequest, DeployStatus};
use conveyor_core::dto::snapshot::CreateSnapshot;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::Instrument;
use uuid::Uuid;

use crate::gateway::{CommandGateway, CommandTarget, Delivery};
use crate::repository::{PipelineRepository, Store, TargetRepository};
use crate::service::error::{Result, ServiceError};
use crate::service::snapshot::{self, CopyOptions};
use crate::service::stage;
use crate::service::target::{self, DeployTarget, SourceSnapshot};

/// Phase of a single deploy call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeployPhase {
    Resolving,
    Snapshotting,
    Dispatching,
    Complete,
    Failed,
}

impl std::fmt::Display for DeployPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Resolving => "RESOLVING",
            Self::Snapshotting => "SNAPSHOTTING",
            Self::Dispatching => "DISPATCHING",
            Self::Complete => "COMPLETE",
            Self::Failed => "FAILED",
        };
        f.write_str(name)
    }
}

/// Result of a deploy call
#[derive(Debug)]
pub struct Deployment {
    pub status: DeployStatus,
    /// Snapshot the destination now targets
    pub snapshot_id: Uuid,
    /// Background restart of a destination instance
    pub restart: Option<JoinHandle<()>>,
}

/// Everything resolved and validated before the first write
struct Plan {
    pipeline: Pipeline,
    source_stage: Stage,
    destination_stage: Stage,
    source: SourceSnapshot,
    destination: DeployTarget,
}

pub struct Deployer {
    store: Arc<dyn Store>,
    gateway: Arc<dyn CommandGateway>,
    restart_timeout: Duration,
}

impl Deployer {
    pub fn new(
        store: Arc<dyn Store>,
        gateway: Arc<dyn CommandGateway>,
        restart_timeout: Duration,
    ) -> Self {
        Self {
            store,
            gateway,
            restart_timeout,
        }
    }

    /// Deploy from `stage_id` to the stage after it
    pub async fn deploy(
        &self,
        pipeline_id: Uuid,
        stage_id: Uuid,
        req: DeployRequest,
    ) -> Result<Deployment> {
        let span = tracing::info_span!("deploy", %pipeline_id, %stage_id);

        async move {
            let result = self.run(pipeline_id, stage_id, req).await;

            match &result {
                Ok(deployment) => tracing::info!(
                    phase = %DeployPhase::Complete,
                    snapshot_id = %deployment.snapshot_id,
                    "Deploy dispatched"
                ),
                Err(e) => tracing::warn!(
                    phase = %DeployPhase::Failed,
                    code = e.code(),
                    "Deploy failed: {}",
                    e
                ),
            }

            result
        }
        .instrument(span)
        .await
    }

    async fn run(
        &self,
        pipeline_id: Uuid,
        stage_id: Uuid,
        req: DeployRequest,
    ) -> Result<Deployment> {
        tracing::debug!(phase = %DeployPhase::Resolving, "Deploy phase");
        let plan = self.resolve(pipeline_id, stage_id, req).await?;

        tracing::debug!(phase = %DeployPhase::Snapshotting, "Deploy phase");
        let source_snapshot = self.source_snapshot(&plan).await?;

        tracing::debug!(phase = %DeployPhase::Dispatching, "Deploy phase");
        self.dispatch(&plan, &source_snapshot).await
    }

    async fn resolve(
        &self,
        pipeline_id: Uuid,
        stage_id: Uuid,
        req: DeployRequest,
    ) -> Result<Plan> {
        let store = self.store.as_ref();

        let pipeline = store
            .find_pipeline(pipeline_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Pipeline", pipeline_id))?;
        let source_stage = stage::find_stage(store, pipeline_id, stage_id).await?;

        let next_id = source_stage.next_stage_id.ok_or_else(|| {
            ServiceError::InvalidTargetStage(format!(
                "Stage {} is the last stage of its pipeline",
                stage_id
            ))
        })?;
        let destination_stage = stage::find_stage(store, pipeline_id, next_id).await?;

        let source_target = target::resolve_source(store, &source_stage).await?;
        let destination = target::resolve_destination(store, &destination_stage).await?;
        let source = target::resolve_source_snapshot(
            store,
            source_stage.action,
            &source_target,
            req.source_snapshot_id,
        )
        .await?;

        Ok(Plan {
            pipeline,
            source_stage,
            destination_stage,
            source,
            destination,
        })
    }

    async fn source_snapshot(&self, plan: &Plan) -> Result<Snapshot> {
        match &plan.source {
            SourceSnapshot::Existing(snapshot) => Ok(snapshot.clone()),
            SourceSnapshot::CreateNow(instance) => {
                let snapshot = snapshot::create_snapshot(
                    self.store.as_ref(),
                    CreateSnapshot {
                        owner: SnapshotOwner::Instance(instance.id),
                        name: format!("Deploy Snapshot - {}", timestamp()),
                        description: deploy_description(plan),
                        user_id: None,
                        flows: None,
                        credentials: None,
                        settings: None,
                        include_env: true,
                    },
                )
                .await?;
                Ok(snapshot)
            }
        }
    }

    async fn dispatch(&self, plan: &Plan, source: &Snapshot) -> Result<Deployment> {
        let store = self.store.as_ref();

        match &plan.destination {
            DeployTarget::Instance(instance) => {
                let mut description = deploy_description(plan);
                if !source.description.is_empty() {
                    description.push_str("\n\n");
                    description.push_str(&source.description);
                }

                let copy = snapshot::copy_to(
                    store,
                    self.gateway.as_ref(),
                    source,
                    SnapshotOwner::Instance(instance.id),
                    CopyOptions {
                        name: format!("{} - Deploy Snapshot - {}", source.name, timestamp()),
                        description,
                        import_snapshot: true,
                        set_as_target: true,
                        decrypt_secret: None,
                    },
                )
                .await?;

                let team_id = snapshot::owner_team(store, SnapshotOwner::Instance(instance.id)).await?;
                store.set_instance_deploying(instance.id, true).await?;
                let restart = self.spawn_restart(team_id, instance.id, copy.id);

                tracing::info!(
                    "Instance {} importing snapshot {} (copy of {})",
                    instance.id,
                    copy.id,
                    source.id
                );

                Ok(Deployment {
                    status: DeployStatus::Importing,
                    snapshot_id: copy.id,
                    restart: Some(restart),
                })
            }
            DeployTarget::Device(device) => {
                store
                    .set_device_target_snapshot(device.id, Some(source.id))
                    .await?;
                snapshot::notify_device(self.gateway.as_ref(), device.team_id, device.id, source.id)
                    .await;

                tracing::info!("Device {} targeted at snapshot {}", device.id, source.id);

                Ok(Deployment {
                    status: DeployStatus::Importing,
                    snapshot_id: source.id,
                    restart: None,
                })
            }
            DeployTarget::DeviceGroup(group) => {
                // Group pointer first, so no member is ever ahead of its group
                store
                    .set_device_group_target_snapshot(group.id, Some(source.id))
                    .await?;

                let members = target::group_members(store, group).await?;
                let mut offline = 0;

                for device in &members {
                    store
                        .set_device_target_snapshot(device.id, Some(source.id))
                        .await?;
                    let delivery = snapshot::notify_device(
                        self.gateway.as_ref(),
                        device.team_id,
                        device.id,
                        source.id,
                    )
                    .await;
                    if delivery == Delivery::Offline {
                        offline += 1;
                    }
                }

                tracing::info!(
                    "Device group {} targeted at snapshot {}: {} devices, {} offline",
                    group.id,
                    source.id,
                    members.len(),
                    offline
                );

                Ok(Deployment {
                    status: DeployStatus::Importing,
                    snapshot_id: source.id,
                    restart: None,
                })
            }
        }
    }

    /// Restart the instance runtime and clear its deploying flag once it answers,
    /// unless a later deploy has retargeted the instance in the meantime
    fn spawn_restart(&self, team_id: Uuid, instance_id: Uuid, snapshot_id: Uuid) -> JoinHandle<()> {
        let store = Arc::clone(&self.store);
        let gateway = Arc::clone(&self.gateway);
        let timeout = self.restart_timeout;

        tokio::spawn(
            async move {
                let target = CommandTarget::Instance(instance_id);
                match gateway
                    .send_command_await_reply(
                        team_id,
                        target,
                        Command::restart(Some(snapshot_id)),
                        timeout,
                    )
                    .await
                {
                    Ok(_) => tracing::info!("Instance {} restarted", instance_id),
                    Err(e) => tracing::warn!("Restart of instance {} not confirmed: {}", instance_id, e),
                }

                match store.clear_instance_deploying(instance_id, snapshot_id).await {
                    Ok(true) => {}
                    Ok(false) => tracing::debug!(
                        "Instance {} moved past snapshot {}, leaving its deploying flag",
                        instance_id,
                        snapshot_id
                    ),
                    Err(e) => tracing::error!(
                        "Failed to clear deploying flag of instance {}: {}",
                        instance_id,
                        e
                    ),
                }
            }
            .in_current_span(),
        )
    }
}

fn deploy_description(plan: &Plan) -> String {
    format!(
        "Snapshot created for pipeline deployment from {} to {} as part of pipeline {}",
        plan.source_stage.name, plan.destination_stage.name, plan.pipeline.name
    )
}

fn timestamp() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::{RuntimeRepository, SnapshotRepository};
    use crate::service::fixtures::Fixture;
    use conveyor_core::domain::device::{DeviceMode, DeviceOwner};
    use conveyor_core::domain::pipeline::StageAction;
    use conveyor_core::domain::target::StageTarget;
    use conveyor_core::dto::command::CommandKind;
    use serde_json::json;

    #[tokio::test]
    async fn test_instance_to_instance_create_snapshot() {
        let fx = Fixture::new().await;
        let pipeline = fx.pipeline("Release Train").await;
        let dev = fx.instance("dev").await;
        let prod = fx.instance("prod").await;
        let dev_owner = SnapshotOwner::Instance(dev.id);
        let prod_owner = SnapshotOwner::Instance(prod.id);
        fx.set_live(
            dev_owner,
            json!([{ "id": "node1" }]),
            json!({ "node1": { "key": "value" } }),
            &[],
        )
        .await;

        let source = fx
            .stage(
                pipeline.id,
                "Development",
                StageTarget::Instance(dev.id),
                StageAction::CreateSnapshot,
            )
            .await;
        fx.stage(
            pipeline.id,
            "Production",
            StageTarget::Instance(prod.id),
            StageAction::CreateSnapshot,
        )
        .await;

        let deployment = fx
            .deployer()
            .deploy(pipeline.id, source.id, DeployRequest::default())
            .await
            .unwrap();
        assert_eq!(deployment.status, DeployStatus::Importing);

        let source_snapshots = fx.store().list_snapshots(dev_owner).await.unwrap();
        let destination_snapshots = fx.store().list_snapshots(prod_owner).await.unwrap();
        assert_eq!(source_snapshots.len(), 1);
        assert_eq!(destination_snapshots.len(), 1);

        let copy = &destination_snapshots[0];
        assert_eq!(copy.id, deployment.snapshot_id);
        assert_eq!(copy.flows.flows[0]["id"], "node1");
        assert!(copy.description.contains("Development"));
        assert!(copy.description.contains("Production"));
        assert!(copy.description.contains("Release Train"));
        assert!(copy.name.contains(" - Deploy Snapshot - "));

        let prod_state = fx.store().runtime_state(prod_owner).await.unwrap().unwrap();
        assert_eq!(prod_state.flows, vec![json!({ "id": "node1" })]);

        // Nobody answers the restart, so the flag clears once the wait is over
        deployment.restart.unwrap().await.unwrap();
        let instance = fx.store().find_instance(prod.id).await.unwrap().unwrap();
        assert!(!instance.is_deploying);
        assert_eq!(instance.target_snapshot_id, Some(copy.id));
    }

    #[tokio::test]
    async fn test_instance_restart_acknowledged() {
        let fx = Fixture::new().await;
        let pipeline = fx.pipeline("release").await;
        let dev = fx.instance("dev").await;
        let prod = fx.instance("prod").await;
        let mut mailbox = fx.connect(CommandTarget::Instance(prod.id)).await;

        let source = fx
            .stage(
                pipeline.id,
                "dev",
                StageTarget::Instance(dev.id),
                StageAction::UseLatestSnapshot,
            )
            .await;
        fx.stage(
            pipeline.id,
            "prod",
            StageTarget::Instance(prod.id),
            StageAction::CreateSnapshot,
        )
        .await;
        let snapshot = fx.snapshot(SnapshotOwner::Instance(dev.id), "v1").await;

        let deployment = fx
            .deployer()
            .deploy(pipeline.id, source.id, DeployRequest::default())
            .await
            .unwrap();

        let status = fx.store().find_instance(prod.id).await.unwrap().unwrap();
        assert!(status.is_deploying);

        let envelope = mailbox.recv().await.unwrap();
        assert_eq!(envelope.command.kind, CommandKind::Restart);
        assert_eq!(envelope.command.snapshot_id, Some(deployment.snapshot_id));
        assert_ne!(deployment.snapshot_id, snapshot.id);
        envelope.respond(json!({ "ok": true }));

        deployment.restart.unwrap().await.unwrap();
        let status = fx.store().find_instance(prod.id).await.unwrap().unwrap();
        assert!(!status.is_deploying);
    }

    #[tokio::test]
    async fn test_superseded_restart_keeps_deploying_flag() {
        let fx = Fixture::new().await;
        let pipeline = fx.pipeline("release").await;
        let dev = fx.instance("dev").await;
        let prod = fx.instance("prod").await;
        let mut mailbox = fx.connect(CommandTarget::Instance(prod.id)).await;

        let source = fx
            .stage(
                pipeline.id,
                "dev",
                StageTarget::Instance(dev.id),
                StageAction::Prompt,
            )
            .await;
        fx.stage(
            pipeline.id,
            "prod",
            StageTarget::Instance(prod.id),
            StageAction::CreateSnapshot,
        )
        .await;
        let snapshot = fx.snapshot(SnapshotOwner::Instance(dev.id), "v1").await;
        let request = DeployRequest {
            source_snapshot_id: Some(snapshot.id),
        };

        let deployer = fx.deployer();
        let first = deployer
            .deploy(pipeline.id, source.id, request.clone())
            .await
            .unwrap();
        let second = deployer
            .deploy(pipeline.id, source.id, request)
            .await
            .unwrap();

        // Restart commands may arrive in either order
        let mut pending_second = None;
        for _ in 0..2 {
            let envelope = mailbox.recv().await.unwrap();
            if envelope.command.snapshot_id == Some(first.snapshot_id) {
                envelope.respond(json!({ "ok": true }));
            } else {
                pending_second = Some(envelope);
            }
        }

        first.restart.unwrap().await.unwrap();
        let instance = fx.store().find_instance(prod.id).await.unwrap().unwrap();
        assert!(instance.is_deploying);
        assert_eq!(instance.target_snapshot_id, Some(second.snapshot_id));

        pending_second.unwrap().respond(json!({ "ok": true }));
        second.restart.unwrap().await.unwrap();
        let instance = fx.store().find_instance(prod.id).await.unwrap().unwrap();
        assert!(!instance.is_deploying);
    }

    #[tokio::test]
    async fn test_device_to_device_uses_latest_by_reference() {
        let fx = Fixture::new().await;
        let pipeline = fx.pipeline("edge").await;
        let source_device = fx
            .device(
                DeviceOwner::Application(fx.application.id),
                DeviceMode::Autonomous,
            )
            .await;
        let destination_device = fx
            .device(
                DeviceOwner::Application(fx.application.id),
                DeviceMode::Autonomous,
            )
            .await;
        let mut mailbox = fx.connect(CommandTarget::Device(destination_device.id)).await;

        let source_owner = SnapshotOwner::Device(source_device.id);
        fx.snapshot(source_owner, "old").await;
        fx.snapshot(source_owner, "mid").await;
        let latest = fx.snapshot(source_owner, "latest").await;

        let source = fx
            .stage(
                pipeline.id,
                "source",
                StageTarget::Device(source_device.id),
                StageAction::UseLatestSnapshot,
            )
            .await;
        fx.stage(
            pipeline.id,
            "destination",
            StageTarget::Device(destination_device.id),
            StageAction::UseLatestSnapshot,
        )
        .await;

        let deployment = fx
            .deployer()
            .deploy(pipeline.id, source.id, DeployRequest::default())
            .await
            .unwrap();
        assert_eq!(deployment.snapshot_id, latest.id);
        assert!(deployment.restart.is_none());

        let device = fx
            .store()
            .find_device(destination_device.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(device.target_snapshot_id, Some(latest.id));

        let copies = fx
            .store()
            .list_snapshots(SnapshotOwner::Device(destination_device.id))
            .await
            .unwrap();
        assert!(copies.is_empty());

        let envelope = mailbox.recv().await.unwrap();
        assert_eq!(envelope.command.kind, CommandKind::Update);
        assert_eq!(envelope.command.snapshot_id, Some(latest.id));
    }

    #[tokio::test]
    async fn test_developer_device_rejected_for_every_action() {
        let fx = Fixture::new().await;
        let source_device = fx
            .device(
                DeviceOwner::Application(fx.application.id),
                DeviceMode::Autonomous,
            )
            .await;
        let developer = fx
            .device(
                DeviceOwner::Application(fx.application.id),
                DeviceMode::Developer,
            )
            .await;
        let snapshot = fx
            .snapshot(SnapshotOwner::Device(source_device.id), "v1")
            .await;
        fx.store()
            .set_device_active_snapshot(source_device.id, Some(snapshot.id))
            .await
            .unwrap();

        for action in [
            StageAction::CreateSnapshot,
            StageAction::Prompt,
            StageAction::UseLatestSnapshot,
            StageAction::UseActiveSnapshot,
        ] {
            let pipeline = fx.pipeline(action.as_str()).await;
            let source = fx
                .stage(
                    pipeline.id,
                    "source",
                    StageTarget::Device(source_device.id),
                    action,
                )
                .await;
            fx.stage(
                pipeline.id,
                "developer",
                StageTarget::Device(developer.id),
                StageAction::Prompt,
            )
            .await;

            let err = fx
                .deployer()
                .deploy(
                    pipeline.id,
                    source.id,
                    DeployRequest {
                        source_snapshot_id: Some(snapshot.id),
                    },
                )
                .await
                .unwrap_err();
            assert_eq!(err.code(), "invalid_target_stage", "action {}", action);
        }

        let developer = fx.store().find_device(developer.id).await.unwrap().unwrap();
        assert!(developer.target_snapshot_id.is_none());
    }

    #[tokio::test]
    async fn test_group_deploy_tolerates_offline_members() {
        let fx = Fixture::new().await;
        let pipeline = fx.pipeline("fleet").await;
        let dev = fx.instance("dev").await;
        let group = fx.device_group("fleet").await;
        let online = fx.group_device(group.id).await;
        let offline = fx.group_device(group.id).await;
        let mut mailbox = fx.connect(CommandTarget::Device(online.id)).await;

        let source = fx
            .stage(
                pipeline.id,
                "dev",
                StageTarget::Instance(dev.id),
                StageAction::Prompt,
            )
            .await;
        fx.stage(
            pipeline.id,
            "fleet",
            StageTarget::DeviceGroup(group.id),
            StageAction::Prompt,
        )
        .await;
        let snapshot = fx.snapshot(SnapshotOwner::Instance(dev.id), "v1").await;

        let deployment = fx
            .deployer()
            .deploy(
                pipeline.id,
                source.id,
                DeployRequest {
                    source_snapshot_id: Some(snapshot.id),
                },
            )
            .await
            .unwrap();
        assert_eq!(deployment.snapshot_id, snapshot.id);

        let group = fx.store().find_device_group(group.id).await.unwrap().unwrap();
        assert_eq!(group.target_snapshot_id, Some(snapshot.id));
        for id in [online.id, offline.id] {
            let device = fx.store().find_device(id).await.unwrap().unwrap();
            assert_eq!(device.target_snapshot_id, Some(snapshot.id));
            assert!(device.is_pending());
        }

        let envelope = mailbox.recv().await.unwrap();
        assert_eq!(envelope.command.snapshot_id, Some(snapshot.id));
    }

    #[tokio::test]
    async fn test_empty_group_deploy_succeeds() {
        let fx = Fixture::new().await;
        let pipeline = fx.pipeline("fleet").await;
        let dev = fx.instance("dev").await;
        let group = fx.device_group("empty").await;

        let source = fx
            .stage(
                pipeline.id,
                "dev",
                StageTarget::Instance(dev.id),
                StageAction::UseLatestSnapshot,
            )
            .await;
        fx.stage(
            pipeline.id,
            "fleet",
            StageTarget::DeviceGroup(group.id),
            StageAction::Prompt,
        )
        .await;
        fx.snapshot(SnapshotOwner::Instance(dev.id), "v1").await;

        let deployment = fx
            .deployer()
            .deploy(pipeline.id, source.id, DeployRequest::default())
            .await
            .unwrap();
        assert_eq!(deployment.status, DeployStatus::Importing);
    }

    #[tokio::test]
    async fn test_stage_from_other_pipeline() {
        let fx = Fixture::new().await;
        let first = fx.pipeline("first").await;
        let second = fx.pipeline("second").await;
        let dev = fx.instance("dev").await;
        let stage = fx
            .stage(
                first.id,
                "dev",
                StageTarget::Instance(dev.id),
                StageAction::CreateSnapshot,
            )
            .await;

        let err = fx
            .deployer()
            .deploy(second.id, stage.id, DeployRequest::default())
            .await
            .unwrap_err();
        assert_eq!(err.code(), "invalid_stage");
    }

    #[tokio::test]
    async fn test_redeploy_creates_distinct_copies() {
        let fx = Fixture::new().await;
        let pipeline = fx.pipeline("release").await;
        let dev = fx.instance("dev").await;
        let prod = fx.instance("prod").await;

        let source = fx
            .stage(
                pipeline.id,
                "dev",
                StageTarget::Instance(dev.id),
                StageAction::Prompt,
            )
            .await;
        fx.stage(
            pipeline.id,
            "prod",
            StageTarget::Instance(prod.id),
            StageAction::CreateSnapshot,
        )
        .await;
        let snapshot = fx.snapshot(SnapshotOwner::Instance(dev.id), "v1").await;

        let request = DeployRequest {
            source_snapshot_id: Some(snapshot.id),
        };
        let first = fx
            .deployer()
            .deploy(pipeline.id, source.id, request.clone())
            .await
            .unwrap();
        let second = fx
            .deployer()
            .deploy(pipeline.id, source.id, request)
            .await
            .unwrap();
        assert_ne!(first.snapshot_id, second.snapshot_id);

        let copies = fx
            .store()
            .list_snapshots(SnapshotOwner::Instance(prod.id))
            .await
            .unwrap();
        assert_eq!(copies.len(), 2);
    }

    #[tokio::test]
    async fn test_last_stage_has_nowhere_to_go() {
        let fx = Fixture::new().await;
        let pipeline = fx.pipeline("release").await;
        let dev = fx.instance("dev").await;
        let stage = fx
            .stage(
                pipeline.id,
                "dev",
                StageTarget::Instance(dev.id),
                StageAction::CreateSnapshot,
            )
            .await;

        let err = fx
            .deployer()
            .deploy(pipeline.id, stage.id, DeployRequest::default())
            .await
            .unwrap_err();
        assert_eq!(err.code(), "invalid_target_stage");
    }
}
