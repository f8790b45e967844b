//! Deploy command handler

use anyhow::Result;
use colored::*;
use conveyor_client::OrchestratorClient;
use conveyor_core::dto::pipeline::DeployRequest;
use uuid::Uuid;

use crate::config::Config;
use crate::id_resolver::{resolve_pipeline_id, resolve_stage_id};
use crate::types::IdOrPrefix;

/// Trigger a deploy from `stage` to its successor
pub async fn deploy(
    config: &Config,
    pipeline: &str,
    stage: &str,
    snapshot: Option<Uuid>,
) -> Result<()> {
    let client = OrchestratorClient::new(&config.orchestrator_url);

    let pipeline_id = resolve_pipeline_id(&client, config, &IdOrPrefix::parse(pipeline)).await?;
    let stage_id = resolve_stage_id(&client, pipeline_id, &IdOrPrefix::parse(stage)).await?;

    let view = client.get_pipeline(pipeline_id).await?;
    let position = view.stages.iter().position(|s| s.id == stage_id);
    let target = position.and_then(|i| view.stages.get(i + 1));

    client
        .deploy_stage(
            pipeline_id,
            stage_id,
            DeployRequest {
                source_snapshot_id: snapshot,
            },
        )
        .await?;

    println!("{}", "✓ Deploy started".green().bold());
    if let Some(target) = target {
        println!("  Target stage: {}", target.name.bold());
        if let Some(instance) = target.instances.first() {
            println!(
                "  Follow with:  {}",
                format!("GET /instance/{}/status", instance.id).dimmed()
            );
        }
        if let Some(group) = target.device_groups.first() {
            println!(
                "  Follow with:  {}",
                format!("conveyor device group-status {}", group.id).dimmed()
            );
        }
        if let Some(device) = target.devices.first() {
            println!(
                "  Follow with:  {}",
                format!("conveyor device status {}", device.id).dimmed()
            );
        }
    }

    Ok(())
}
