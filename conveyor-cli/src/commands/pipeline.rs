//! Pipeline command handlers

use anyhow::Result;
use clap::Subcommand;
use colored::*;
use conveyor_client::OrchestratorClient;
use conveyor_core::dto::pipeline::{CreatePipeline, PipelineView, StageView, UpdatePipeline};

use crate::config::Config;
use crate::id_resolver::resolve_pipeline_id;
use crate::types::IdOrPrefix;

/// Pipeline subcommands
#[derive(Subcommand)]
pub enum PipelineCommands {
    /// Create an empty pipeline in the configured application
    Create {
        /// Pipeline name
        name: String,
    },
    /// List the pipelines of the configured application
    List,
    /// Show a pipeline and its stages
    Get {
        /// Pipeline ID or unambiguous prefix
        id: String,
    },
    /// Rename a pipeline
    Rename {
        /// Pipeline ID or unambiguous prefix
        id: String,

        /// New name
        name: String,
    },
    /// Delete a pipeline and its stages
    Delete {
        /// Pipeline ID or unambiguous prefix
        id: String,
    },
}

pub async fn handle_pipeline_command(command: PipelineCommands, config: &Config) -> Result<()> {
    let client = OrchestratorClient::new(&config.orchestrator_url);

    match command {
        PipelineCommands::Create { name } => create_pipeline(&client, config, name).await,
        PipelineCommands::List => list_pipelines(&client, config).await,
        PipelineCommands::Get { id } => get_pipeline(&client, config, &id).await,
        PipelineCommands::Rename { id, name } => rename_pipeline(&client, config, &id, name).await,
        PipelineCommands::Delete { id } => delete_pipeline(&client, config, &id).await,
    }
}

async fn create_pipeline(client: &OrchestratorClient, config: &Config, name: String) -> Result<()> {
    let pipeline = client
        .create_pipeline(CreatePipeline {
            application_id: config.require_application()?,
            name,
        })
        .await?;

    println!("{}", "✓ Pipeline created successfully!".green().bold());
    println!("  ID:   {}", pipeline.id.to_string().cyan());
    println!("  Name: {}", pipeline.name.bold());

    Ok(())
}

async fn list_pipelines(client: &OrchestratorClient, config: &Config) -> Result<()> {
    let pipelines = client
        .list_pipelines(config.require_application()?)
        .await?;

    if pipelines.is_empty() {
        println!("{}", "No pipelines found.".yellow());
        return Ok(());
    }

    println!(
        "{}",
        format!("Found {} pipeline(s):", pipelines.len()).bold()
    );
    println!();
    for pipeline in &pipelines {
        println!(
            "  {} {}",
            pipeline.id.to_string()[..8].cyan(),
            pipeline.name.bold()
        );
        let stages: Vec<&str> = pipeline.stages.iter().map(|s| s.name.as_str()).collect();
        if !stages.is_empty() {
            println!("    Stages: {}", stages.join(" → ").dimmed());
        }
        println!();
    }

    Ok(())
}

async fn get_pipeline(client: &OrchestratorClient, config: &Config, id: &str) -> Result<()> {
    let uuid = resolve_pipeline_id(client, config, &IdOrPrefix::parse(id)).await?;

    let pipeline = client.get_pipeline(uuid).await?;

    print_pipeline_details(&pipeline);

    Ok(())
}

async fn rename_pipeline(
    client: &OrchestratorClient,
    config: &Config,
    id: &str,
    name: String,
) -> Result<()> {
    let uuid = resolve_pipeline_id(client, config, &IdOrPrefix::parse(id)).await?;

    let pipeline = client.update_pipeline(uuid, UpdatePipeline { name }).await?;

    println!(
        "{} {}",
        "✓ Pipeline renamed to".green().bold(),
        pipeline.name.bold()
    );

    Ok(())
}

async fn delete_pipeline(client: &OrchestratorClient, config: &Config, id: &str) -> Result<()> {
    let uuid = resolve_pipeline_id(client, config, &IdOrPrefix::parse(id)).await?;

    client.delete_pipeline(uuid).await?;

    println!("{}", "✓ Pipeline deleted successfully!".green().bold());
    println!("  ID: {}", uuid.to_string().cyan());

    Ok(())
}

fn print_pipeline_details(pipeline: &PipelineView) {
    println!("{}", "Pipeline Details:".bold());
    println!("  ID:          {}", pipeline.id.to_string().cyan());
    println!("  Name:        {}", pipeline.name.bold());
    println!("  Application: {}", pipeline.application_id);
    println!(
        "  Created:     {}",
        pipeline.created_at.format("%Y-%m-%d %H:%M:%S")
    );
    println!(
        "  Updated:     {}",
        pipeline.updated_at.format("%Y-%m-%d %H:%M:%S")
    );

    println!("\n{}", "Stages:".bold());
    if pipeline.stages.is_empty() {
        println!("  {}", "(none)".dimmed());
    }
    for (index, stage) in pipeline.stages.iter().enumerate() {
        print_stage(index + 1, stage);
    }
}

pub(crate) fn print_stage(position: usize, stage: &StageView) {
    println!(
        "  {}. {} {} [{}]",
        position,
        stage.name.bold(),
        stage.id.to_string()[..8].cyan(),
        stage.action.as_str().dimmed()
    );
    println!("     Target: {}", describe_target(stage));
}

fn describe_target(stage: &StageView) -> String {
    if let Some(instance) = stage.instances.first() {
        return format!("instance {}", instance.name);
    }
    if let Some(device) = stage.devices.first() {
        return format!("device {} ({})", device.name, device.mode.as_str());
    }
    if let Some(group) = stage.device_groups.first() {
        return format!("device group {}", group.name);
    }
    "unconfigured".yellow().to_string()
}
