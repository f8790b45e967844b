//! Stage command handlers

use anyhow::{Result, bail};
use clap::{Args, Subcommand};
use colored::*;
use conveyor_client::OrchestratorClient;
use conveyor_core::domain::pipeline::StageAction;
use conveyor_core::dto::pipeline::{CreateStage, UpdateStage};
use uuid::Uuid;

use crate::commands::pipeline::print_stage;
use crate::config::Config;
use crate::id_resolver::{resolve_pipeline_id, resolve_stage_id};
use crate::types::IdOrPrefix;

/// Exactly one of these may be given
#[derive(Args, Default)]
pub struct TargetArgs {
    /// Instance the stage deploys to
    #[arg(long)]
    instance: Option<Uuid>,

    /// Device the stage deploys to
    #[arg(long)]
    device: Option<Uuid>,

    /// Device group the stage deploys to (last stage only)
    #[arg(long)]
    device_group: Option<Uuid>,
}

/// Stage subcommands
#[derive(Subcommand)]
pub enum StageCommands {
    /// Append a stage, or insert it after another one
    Add {
        /// Pipeline ID or unambiguous prefix
        pipeline: String,

        /// Stage name
        name: String,

        #[command(flatten)]
        target: TargetArgs,

        /// create_snapshot, prompt, use_latest_snapshot or use_active_snapshot
        #[arg(long, value_parser = parse_action, default_value = "create_snapshot")]
        action: StageAction,

        /// Insert after this stage instead of at the end
        #[arg(long)]
        after: Option<String>,
    },
    /// Change a stage's name, action or target
    Update {
        /// Pipeline ID or unambiguous prefix
        pipeline: String,

        /// Stage ID or unambiguous prefix
        stage: String,

        #[arg(long)]
        name: Option<String>,

        #[arg(long, value_parser = parse_action)]
        action: Option<StageAction>,

        #[command(flatten)]
        target: TargetArgs,
    },
    /// Remove a stage and relink its neighbours
    Remove {
        /// Pipeline ID or unambiguous prefix
        pipeline: String,

        /// Stage ID or unambiguous prefix
        stage: String,
    },
}

fn parse_action(s: &str) -> Result<StageAction, String> {
    s.parse()
}

pub async fn handle_stage_command(command: StageCommands, config: &Config) -> Result<()> {
    let client = OrchestratorClient::new(&config.orchestrator_url);

    match command {
        StageCommands::Add {
            pipeline,
            name,
            target,
            action,
            after,
        } => {
            let pipeline_id =
                resolve_pipeline_id(&client, config, &IdOrPrefix::parse(&pipeline)).await?;
            let source = match after {
                Some(stage) => {
                    Some(resolve_stage_id(&client, pipeline_id, &IdOrPrefix::parse(&stage)).await?)
                }
                None => None,
            };

            if target.instance.is_none() && target.device.is_none() && target.device_group.is_none()
            {
                bail!("one of --instance, --device or --device-group is required");
            }

            let stage = client
                .create_stage(
                    pipeline_id,
                    CreateStage {
                        name,
                        action,
                        instance_id: target.instance,
                        device_id: target.device,
                        device_group_id: target.device_group,
                        source,
                    },
                )
                .await?;

            println!("{}", "✓ Stage added".green().bold());
            print_stage(1, &stage);
            Ok(())
        }
        StageCommands::Update {
            pipeline,
            stage,
            name,
            action,
            target,
        } => {
            let pipeline_id =
                resolve_pipeline_id(&client, config, &IdOrPrefix::parse(&pipeline)).await?;
            let stage_id = resolve_stage_id(&client, pipeline_id, &IdOrPrefix::parse(&stage)).await?;

            let stage = client
                .update_stage(
                    pipeline_id,
                    stage_id,
                    UpdateStage {
                        name,
                        action,
                        instance_id: target.instance,
                        device_id: target.device,
                        device_group_id: target.device_group,
                    },
                )
                .await?;

            println!("{}", "✓ Stage updated".green().bold());
            print_stage(1, &stage);
            Ok(())
        }
        StageCommands::Remove { pipeline, stage } => {
            let pipeline_id =
                resolve_pipeline_id(&client, config, &IdOrPrefix::parse(&pipeline)).await?;
            let stage_id = resolve_stage_id(&client, pipeline_id, &IdOrPrefix::parse(&stage)).await?;

            client.delete_stage(pipeline_id, stage_id).await?;

            println!("{}", "✓ Stage removed".green().bold());
            println!("  ID: {}", stage_id.to_string().cyan());
            Ok(())
        }
    }
}
