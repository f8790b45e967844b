//! Stage Graph
//!
//! The stages of a pipeline form a doubly linked chain: `source_id` points at
//! the previous stage and `next_stage_id` at the following one. Every mutation
//! here validates first and only then rewrites the affected pointers, so a
//! rejected request never leaves a partial write behind.
//!
//! Structural mutations of one pipeline are assumed not to run concurrently;
//! callers serialise them.

use conveyor_core::domain::pipeline::{Pipeline, Stage, StageAction};
use conveyor_core::domain::target::StageTarget;
use conveyor_core::dto::pipeline::{CreateStage, StageView, UpdateStage};
use std::collections::HashMap;
use uuid::Uuid;

use crate::repository::{PipelineRepository, StageRepository, Store};
use crate::service::error::{Result, ServiceError};
use crate::service::{pipeline, target};

/// Add a stage to a pipeline.
///
/// With `source` the stage is inserted right after that stage, otherwise it
/// is appended after the current last stage.
pub async fn create_stage(store: &dyn Store, pipeline_id: Uuid, req: CreateStage) -> Result<StageView> {
    let pipeline = find_pipeline(store, pipeline_id).await?;

    validate_name(&req.name)?;
    let target = required_target(req.instance_id, req.device_id, req.device_group_id)?;
    validate_action(req.action, target)?;

    let chain = walk(store, pipeline_id).await?;

    let predecessor = match req.source {
        Some(source_id) => Some(
            chain
                .iter()
                .find(|stage| stage.id == source_id)
                .ok_or_else(|| {
                    ServiceError::InvalidStage(format!(
                        "Source stage {} is not part of pipeline {}",
                        source_id, pipeline_id
                    ))
                })?
                .clone(),
        ),
        None => chain.last().cloned(),
    };

    if predecessor.as_ref().is_some_and(Stage::is_device_group) {
        return Err(ServiceError::InvalidInput(
            "A stage cannot follow a device group stage".to_string(),
        ));
    }

    if let StageTarget::DeviceGroup(_) = target {
        match &predecessor {
            None => {
                return Err(ServiceError::InvalidInput(
                    "A device group cannot be the first stage".to_string(),
                ));
            }
            Some(stage) if stage.next_stage_id.is_some() => {
                return Err(ServiceError::InvalidInput(
                    "A device group must be the last stage".to_string(),
                ));
            }
            Some(_) => {}
        }
    }

    validate_target(store, &pipeline, &chain, None, target).await?;

    let now = chrono::Utc::now();
    let stage = Stage {
        id: Uuid::new_v4(),
        pipeline_id,
        name: req.name,
        action: req.action,
        target: Some(target),
        source_id: predecessor.as_ref().map(|p| p.id),
        next_stage_id: predecessor.as_ref().and_then(|p| p.next_stage_id),
        created_at: now,
        updated_at: now,
    };

    store.insert_stage(&stage).await?;

    if let Some(mut predecessor) = predecessor {
        if let Some(successor_id) = predecessor.next_stage_id {
            let mut successor = find_in(&chain, successor_id)?;
            successor.source_id = Some(stage.id);
            successor.updated_at = now;
            store.update_stage(&successor).await?;
        }

        predecessor.next_stage_id = Some(stage.id);
        predecessor.updated_at = now;
        store.update_stage(&predecessor).await?;
    }

    tracing::info!(
        "Stage created: {} ({}) in pipeline {}",
        stage.name,
        stage.id,
        pipeline_id
    );

    pipeline::stage_view(store, &stage).await
}

/// Update a stage's name, action or target.
///
/// A new target replaces the old one entirely.
pub async fn update_stage(
    store: &dyn Store,
    pipeline_id: Uuid,
    stage_id: Uuid,
    req: UpdateStage,
) -> Result<StageView> {
    let pipeline = find_pipeline(store, pipeline_id).await?;
    let mut stage = find_stage(store, pipeline_id, stage_id).await?;

    if let Some(name) = &req.name {
        validate_name(name)?;
    }

    let new_target = StageTarget::from_fields(req.instance_id, req.device_id, req.device_group_id)
        .map_err(|_| multiple_targets())?;
    let action = req.action.unwrap_or(stage.action);

    if let Some(target) = new_target.filter(|t| Some(*t) != stage.target) {
        let chain = walk(store, pipeline_id).await?;

        if let StageTarget::DeviceGroup(_) = target {
            if stage.source_id.is_none() {
                return Err(ServiceError::InvalidInput(
                    "A device group cannot be the first stage".to_string(),
                ));
            }
            if stage.next_stage_id.is_some() {
                return Err(ServiceError::InvalidInput(
                    "A device group must be the last stage".to_string(),
                ));
            }
        }

        validate_target(store, &pipeline, &chain, Some(stage.id), target).await?;
        stage.target = Some(target);
    }

    if let Some(target) = stage.target {
        validate_action(action, target)?;
    }

    if let Some(name) = req.name {
        stage.name = name;
    }
    stage.action = action;
    stage.updated_at = chrono::Utc::now();

    if !store.update_stage(&stage).await? {
        return Err(ServiceError::not_found("Stage", stage_id));
    }

    tracing::info!("Stage updated: {} ({})", stage.name, stage.id);

    pipeline::stage_view(store, &stage).await
}

/// Remove a stage and link its neighbours to each other
pub async fn delete_stage(store: &dyn Store, pipeline_id: Uuid, stage_id: Uuid) -> Result<()> {
    find_pipeline(store, pipeline_id).await?;
    let stage = find_stage(store, pipeline_id, stage_id).await?;

    let chain = walk(store, pipeline_id).await?;
    let predecessor = stage.source_id.map(|id| find_in(&chain, id)).transpose()?;
    let successor = stage.next_stage_id.map(|id| find_in(&chain, id)).transpose()?;

    if predecessor.is_none() && successor.as_ref().is_some_and(Stage::is_device_group) {
        return Err(ServiceError::InvalidInput(
            "Removing this stage would make a device group the first stage".to_string(),
        ));
    }

    let now = chrono::Utc::now();

    if let Some(mut predecessor) = predecessor {
        predecessor.next_stage_id = stage.next_stage_id;
        predecessor.updated_at = now;
        store.update_stage(&predecessor).await?;
    }

    if let Some(mut successor) = successor {
        successor.source_id = stage.source_id;
        successor.updated_at = now;
        store.update_stage(&successor).await?;
    }

    store.delete_stage(stage_id).await?;

    tracing::info!("Stage deleted: {} from pipeline {}", stage_id, pipeline_id);

    Ok(())
}

/// Stages of a pipeline in chain order
pub async fn walk(store: &dyn Store, pipeline_id: Uuid) -> Result<Vec<Stage>> {
    let stages = store.list_stages(pipeline_id).await?;
    order_chain(stages)
}

/// Order stages by following `next_stage_id` from the single stage without a source.
///
/// Anything other than one head and one acyclic path through every stage is
/// an internal consistency error.
pub fn order_chain(stages: Vec<Stage>) -> Result<Vec<Stage>> {
    if stages.is_empty() {
        return Ok(stages);
    }

    let heads: Vec<Uuid> = stages
        .iter()
        .filter(|stage| stage.source_id.is_none())
        .map(|stage| stage.id)
        .collect();

    let [head] = heads.as_slice() else {
        return Err(ServiceError::Internal(format!(
            "Stage chain has {} first stages",
            heads.len()
        )));
    };
    let head = *head;

    let total = stages.len();
    let mut remaining: HashMap<Uuid, Stage> =
        stages.into_iter().map(|stage| (stage.id, stage)).collect();
    let mut ordered = Vec::with_capacity(total);
    let mut cursor = Some(head);

    while let Some(id) = cursor {
        // A missing entry is either a dangling pointer or a revisit
        let stage = remaining.remove(&id).ok_or_else(|| {
            ServiceError::Internal(format!("Stage chain is broken or cyclic at {}", id))
        })?;
        cursor = stage.next_stage_id;
        ordered.push(stage);
    }

    if !remaining.is_empty() {
        return Err(ServiceError::Internal(format!(
            "{} stages are not reachable from the first stage",
            remaining.len()
        )));
    }

    Ok(ordered)
}

// =============================================================================
// Validation
// =============================================================================

fn validate_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(ServiceError::InvalidInput(
            "Stage name cannot be empty".to_string(),
        ));
    }

    if name.len() > 255 {
        return Err(ServiceError::InvalidInput(
            "Stage name is too long (max 255 characters)".to_string(),
        ));
    }

    Ok(())
}

fn multiple_targets() -> ServiceError {
    ServiceError::InvalidInput(
        "instance_id, device_id and device_group_id are exclusive, only one is permitted"
            .to_string(),
    )
}

fn required_target(
    instance_id: Option<Uuid>,
    device_id: Option<Uuid>,
    device_group_id: Option<Uuid>,
) -> Result<StageTarget> {
    StageTarget::from_fields(instance_id, device_id, device_group_id)
        .map_err(|_| multiple_targets())?
        .ok_or_else(|| {
            ServiceError::InvalidInput(
                "instance_id, device_id or device_group_id is required".to_string(),
            )
        })
}

/// Only a device can supply an active snapshot
fn validate_action(action: StageAction, target: StageTarget) -> Result<()> {
    if action == StageAction::UseActiveSnapshot && !matches!(target, StageTarget::Device(_)) {
        return Err(ServiceError::InvalidInput(format!(
            "use_active_snapshot is only valid for device stages, not {}",
            target.kind()
        )));
    }
    Ok(())
}

/// Rules a target must satisfy within its pipeline. `exclude` is the stage
/// being updated, which may keep its own target.
async fn validate_target(
    store: &dyn Store,
    pipeline: &Pipeline,
    chain: &[Stage],
    exclude: Option<Uuid>,
    target: StageTarget,
) -> Result<()> {
    target::check_application(store, target, pipeline.application_id).await?;

    let others = move || chain.iter().filter(move |stage| Some(stage.id) != exclude);

    if others().any(|stage| stage.target == Some(target)) {
        return Err(ServiceError::InvalidInput(format!(
            "The {} is already in use in this pipeline",
            target.kind()
        )));
    }

    if matches!(target, StageTarget::DeviceGroup(_)) && others().any(Stage::is_device_group) {
        return Err(ServiceError::InvalidInput(
            "A pipeline can only contain one device group".to_string(),
        ));
    }

    Ok(())
}

async fn find_pipeline(store: &dyn Store, id: Uuid) -> Result<Pipeline> {
    store
        .find_pipeline(id)
        .await?
        .ok_or_else(|| ServiceError::not_found("Pipeline", id))
}

/// A stage addressed through a pipeline it does not belong to is rejected
pub(crate) async fn find_stage(store: &dyn Store, pipeline_id: Uuid, stage_id: Uuid) -> Result<Stage> {
    let stage = store
        .find_stage(stage_id)
        .await?
        .ok_or_else(|| ServiceError::not_found("Stage", stage_id))?;

    if stage.pipeline_id != pipeline_id {
        return Err(ServiceError::InvalidStage(format!(
            "Stage {} is not part of pipeline {}",
            stage_id, pipeline_id
        )));
    }

    Ok(stage)
}

fn find_in(chain: &[Stage], id: Uuid) -> Result<Stage> {
    chain
        .iter()
        .find(|stage| stage.id == id)
        .cloned()
        .ok_or_else(|| ServiceError::Internal(format!("Stage {} is missing from its chain", id)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::fixtures::Fixture;
    use conveyor_core::domain::device::{DeviceMode, DeviceOwner};

    fn bare(id: Uuid, source_id: Option<Uuid>, next_stage_id: Option<Uuid>) -> Stage {
        let now = chrono::Utc::now();
        Stage {
            id,
            pipeline_id: Uuid::nil(),
            name: id.to_string(),
            action: StageAction::CreateSnapshot,
            target: None,
            source_id,
            next_stage_id,
            created_at: now,
            updated_at: now,
        }
    }

    fn instance_stage(name: &str, instance_id: Uuid) -> CreateStage {
        CreateStage {
            name: name.to_string(),
            instance_id: Some(instance_id),
            ..Default::default()
        }
    }

    /// Exactly one head, one tail, and a walk covering every stage
    async fn assert_chain(fx: &Fixture, pipeline_id: Uuid, names: &[&str]) {
        let stages = fx.store().list_stages(pipeline_id).await.unwrap();
        let chain = walk(fx.store(), pipeline_id).await.unwrap();

        assert_eq!(chain.len(), stages.len());
        assert_eq!(
            chain.iter().map(|s| s.name.as_str()).collect::<Vec<_>>(),
            names
        );
        if !chain.is_empty() {
            assert_eq!(stages.iter().filter(|s| s.source_id.is_none()).count(), 1);
            assert_eq!(
                stages.iter().filter(|s| s.next_stage_id.is_none()).count(),
                1
            );
        }
    }

    #[test]
    fn test_order_chain_follows_pointers() {
        let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let stages = vec![
            bare(c, Some(b), None),
            bare(a, None, Some(b)),
            bare(b, Some(a), Some(c)),
        ];

        let ordered = order_chain(stages).unwrap();
        assert_eq!(
            ordered.iter().map(|s| s.id).collect::<Vec<_>>(),
            vec![a, b, c]
        );
    }

    #[test]
    fn test_order_chain_rejects_cycle() {
        let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let stages = vec![
            bare(a, None, Some(b)),
            bare(b, Some(a), Some(c)),
            bare(c, Some(b), Some(b)),
        ];

        let err = order_chain(stages).unwrap_err();
        assert!(matches!(err, ServiceError::Internal(_)));
    }

    #[test]
    fn test_order_chain_rejects_two_heads() {
        let stages = vec![
            bare(Uuid::new_v4(), None, None),
            bare(Uuid::new_v4(), None, None),
        ];
        assert!(matches!(
            order_chain(stages),
            Err(ServiceError::Internal(_))
        ));
    }

    #[test]
    fn test_order_chain_rejects_unreachable() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let stages = vec![bare(a, None, None), bare(b, Some(b), None)];
        assert!(matches!(
            order_chain(stages),
            Err(ServiceError::Internal(_))
        ));
    }

    #[tokio::test]
    async fn test_append_and_insert_keep_chain() {
        let fx = Fixture::new().await;
        let pipeline = fx.pipeline("release").await;
        let dev = fx.instance("dev").await;
        let staging = fx.instance("staging").await;
        let prod = fx.instance("prod").await;

        let first = create_stage(fx.store(), pipeline.id, instance_stage("dev", dev.id))
            .await
            .unwrap();
        create_stage(fx.store(), pipeline.id, instance_stage("prod", prod.id))
            .await
            .unwrap();
        assert_chain(&fx, pipeline.id, &["dev", "prod"]).await;

        let mut middle = instance_stage("staging", staging.id);
        middle.source = Some(first.id);
        create_stage(fx.store(), pipeline.id, middle).await.unwrap();
        assert_chain(&fx, pipeline.id, &["dev", "staging", "prod"]).await;
    }

    #[tokio::test]
    async fn test_delete_relinks_neighbours() {
        let fx = Fixture::new().await;
        let pipeline = fx.pipeline("release").await;
        let mut ids = Vec::new();
        for name in ["a", "b", "c", "d"] {
            let instance = fx.instance(name).await;
            let stage = create_stage(fx.store(), pipeline.id, instance_stage(name, instance.id))
                .await
                .unwrap();
            ids.push(stage.id);
        }

        delete_stage(fx.store(), pipeline.id, ids[1]).await.unwrap();
        assert_chain(&fx, pipeline.id, &["a", "c", "d"]).await;

        delete_stage(fx.store(), pipeline.id, ids[3]).await.unwrap();
        assert_chain(&fx, pipeline.id, &["a", "c"]).await;

        delete_stage(fx.store(), pipeline.id, ids[0]).await.unwrap();
        assert_chain(&fx, pipeline.id, &["c"]).await;

        delete_stage(fx.store(), pipeline.id, ids[2]).await.unwrap();
        assert_chain(&fx, pipeline.id, &[]).await;
    }

    #[tokio::test]
    async fn test_target_fields_are_exclusive() {
        let fx = Fixture::new().await;
        let pipeline = fx.pipeline("release").await;
        let instance = fx.instance("dev").await;
        let group = fx.device_group("fleet").await;

        let mut req = instance_stage("both", instance.id);
        req.device_group_id = Some(group.id);
        let err = create_stage(fx.store(), pipeline.id, req).await.unwrap_err();
        assert_eq!(err.code(), "invalid_input");
        assert!(err.to_string().contains("only one is permitted"));

        let req = CreateStage {
            name: "none".to_string(),
            ..Default::default()
        };
        let err = create_stage(fx.store(), pipeline.id, req).await.unwrap_err();
        assert!(err.to_string().contains("instance_id, device_id or device_group_id"));

        assert_chain(&fx, pipeline.id, &[]).await;
    }

    #[tokio::test]
    async fn test_blank_name_rejected() {
        let fx = Fixture::new().await;
        let pipeline = fx.pipeline("release").await;
        let instance = fx.instance("dev").await;

        let err = create_stage(fx.store(), pipeline.id, instance_stage("  ", instance.id))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "invalid_input");
    }

    #[tokio::test]
    async fn test_target_used_once_per_pipeline() {
        let fx = Fixture::new().await;
        let pipeline = fx.pipeline("release").await;
        let instance = fx.instance("dev").await;

        create_stage(fx.store(), pipeline.id, instance_stage("one", instance.id))
            .await
            .unwrap();
        let err = create_stage(fx.store(), pipeline.id, instance_stage("two", instance.id))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("already in use in this pipeline"));
    }

    #[tokio::test]
    async fn test_device_group_placement() {
        let fx = Fixture::new().await;
        let pipeline = fx.pipeline("release").await;
        let instance = fx.instance("dev").await;
        let fleet = fx.device_group("fleet").await;
        let spare = fx.device_group("spare").await;

        let group_stage = |name: &str, id: Uuid| CreateStage {
            name: name.to_string(),
            device_group_id: Some(id),
            ..Default::default()
        };

        let err = create_stage(fx.store(), pipeline.id, group_stage("first", fleet.id))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("cannot be the first stage"));

        let dev = create_stage(fx.store(), pipeline.id, instance_stage("dev", instance.id))
            .await
            .unwrap();
        create_stage(fx.store(), pipeline.id, group_stage("fleet", fleet.id))
            .await
            .unwrap();

        let mut second = group_stage("spare", spare.id);
        second.source = Some(dev.id);
        let err = create_stage(fx.store(), pipeline.id, second).await.unwrap_err();
        assert_eq!(err.code(), "invalid_input");

        // Nothing may be appended behind the device group
        let other = fx.instance("other").await;
        let err = create_stage(fx.store(), pipeline.id, instance_stage("after", other.id))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "invalid_input");

        // Removing the head would promote the device group to first stage
        let err = delete_stage(fx.store(), pipeline.id, dev.id).await.unwrap_err();
        assert_eq!(err.code(), "invalid_input");

        assert_chain(&fx, pipeline.id, &["dev", "fleet"]).await;
        let stages = fx.store().list_stages(pipeline.id).await.unwrap();
        assert_eq!(stages.iter().filter(|s| s.is_device_group()).count(), 1);
    }

    #[tokio::test]
    async fn test_cross_application_targets_rejected() {
        let fx = Fixture::new().await;
        let pipeline = fx.pipeline("release").await;
        let other = fx.other_application().await;
        let foreign_instance = fx.instance_in(other.id, "foreign").await;
        let foreign_device = fx
            .device(DeviceOwner::Application(other.id), DeviceMode::Autonomous)
            .await;
        let foreign_group = fx.device_group_in(other.id, "foreign").await;
        let local = fx.instance("local").await;

        let err = create_stage(
            fx.store(),
            pipeline.id,
            instance_stage("foreign", foreign_instance.id),
        )
        .await
        .unwrap_err();
        assert_eq!(err.code(), "invalid_instancesHaveSameApplication");

        let req = CreateStage {
            name: "device".to_string(),
            device_id: Some(foreign_device.id),
            ..Default::default()
        };
        let err = create_stage(fx.store(), pipeline.id, req).await.unwrap_err();
        assert_eq!(err.code(), "invalid_devicesHaveSameApplication");

        create_stage(fx.store(), pipeline.id, instance_stage("local", local.id))
            .await
            .unwrap();
        let req = CreateStage {
            name: "group".to_string(),
            device_group_id: Some(foreign_group.id),
            ..Default::default()
        };
        let err = create_stage(fx.store(), pipeline.id, req).await.unwrap_err();
        assert_eq!(err.code(), "invalid_deviceGroupsHaveSameApplication");
    }

    #[tokio::test]
    async fn test_update_to_cross_application_target_rejected() {
        let fx = Fixture::new().await;
        let pipeline = fx.pipeline("release").await;
        let other = fx.other_application().await;
        let foreign_instance = fx.instance_in(other.id, "foreign").await;
        let foreign_device = fx
            .device(DeviceOwner::Application(other.id), DeviceMode::Autonomous)
            .await;
        let foreign_group = fx.device_group_in(other.id, "foreign").await;
        let first = fx.instance("first").await;
        let last = fx.instance("last").await;

        create_stage(fx.store(), pipeline.id, instance_stage("first", first.id))
            .await
            .unwrap();
        let stage = create_stage(fx.store(), pipeline.id, instance_stage("last", last.id))
            .await
            .unwrap();

        let cases = [
            (
                UpdateStage {
                    instance_id: Some(foreign_instance.id),
                    ..Default::default()
                },
                "invalid_instancesHaveSameApplication",
            ),
            (
                UpdateStage {
                    device_id: Some(foreign_device.id),
                    ..Default::default()
                },
                "invalid_devicesHaveSameApplication",
            ),
            (
                UpdateStage {
                    device_group_id: Some(foreign_group.id),
                    ..Default::default()
                },
                "invalid_deviceGroupsHaveSameApplication",
            ),
        ];

        for (req, code) in cases {
            let err = update_stage(fx.store(), pipeline.id, stage.id, req)
                .await
                .unwrap_err();
            assert_eq!(err.code(), code);

            let stored = fx.store().find_stage(stage.id).await.unwrap().unwrap();
            assert_eq!(stored.target, Some(StageTarget::Instance(last.id)));
        }
    }

    #[tokio::test]
    async fn test_active_snapshot_needs_device_target() {
        let fx = Fixture::new().await;
        let pipeline = fx.pipeline("release").await;
        let instance = fx.instance("dev").await;

        let mut req = instance_stage("dev", instance.id);
        req.action = StageAction::UseActiveSnapshot;
        let err = create_stage(fx.store(), pipeline.id, req).await.unwrap_err();
        assert_eq!(err.code(), "invalid_input");
    }

    #[tokio::test]
    async fn test_update_replaces_target() {
        let fx = Fixture::new().await;
        let pipeline = fx.pipeline("release").await;
        let instance = fx.instance("dev").await;
        let device = fx
            .device(
                DeviceOwner::Application(fx.application.id),
                DeviceMode::Autonomous,
            )
            .await;

        let stage = create_stage(fx.store(), pipeline.id, instance_stage("dev", instance.id))
            .await
            .unwrap();

        let view = update_stage(
            fx.store(),
            pipeline.id,
            stage.id,
            UpdateStage {
                name: Some("edge".to_string()),
                action: Some(StageAction::UseActiveSnapshot),
                device_id: Some(device.id),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        assert_eq!(view.name, "edge");
        assert!(view.instances.is_empty());
        assert_eq!(view.devices.len(), 1);

        let stored = fx.store().find_stage(stage.id).await.unwrap().unwrap();
        assert_eq!(stored.target, Some(StageTarget::Device(device.id)));
        assert_eq!(stored.action, StageAction::UseActiveSnapshot);
    }

    #[tokio::test]
    async fn test_update_group_only_on_last_stage() {
        let fx = Fixture::new().await;
        let pipeline = fx.pipeline("release").await;
        let a = fx.instance("a").await;
        let b = fx.instance("b").await;
        let c = fx.instance("c").await;
        let group = fx.device_group("fleet").await;

        create_stage(fx.store(), pipeline.id, instance_stage("a", a.id))
            .await
            .unwrap();
        let middle = create_stage(fx.store(), pipeline.id, instance_stage("b", b.id))
            .await
            .unwrap();
        let last = create_stage(fx.store(), pipeline.id, instance_stage("c", c.id))
            .await
            .unwrap();

        let to_group = || UpdateStage {
            device_group_id: Some(group.id),
            ..Default::default()
        };

        let err = update_stage(fx.store(), pipeline.id, middle.id, to_group())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("last stage"));

        update_stage(fx.store(), pipeline.id, last.id, to_group())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_stage_of_other_pipeline_is_invalid() {
        let fx = Fixture::new().await;
        let first = fx.pipeline("first").await;
        let second = fx.pipeline("second").await;
        let instance = fx.instance("dev").await;

        let stage = create_stage(fx.store(), first.id, instance_stage("dev", instance.id))
            .await
            .unwrap();

        let err = delete_stage(fx.store(), second.id, stage.id)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "invalid_stage");

        let mut req = instance_stage("dev", instance.id);
        req.source = Some(stage.id);
        let err = create_stage(fx.store(), second.id, req).await.unwrap_err();
        assert_eq!(err.code(), "invalid_stage");
    }
}
