//! Commands module
//!
//! Defines all CLI commands and their handlers.

mod deploy;
mod device;
mod pipeline;
mod snapshot;
mod stage;

pub use device::DeviceCommands;
pub use pipeline::PipelineCommands;
pub use snapshot::SnapshotCommands;
pub use stage::StageCommands;

use anyhow::Result;
use clap::Subcommand;

use crate::config::Config;

/// Top-level CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Pipeline management
    Pipeline {
        #[command(subcommand)]
        command: PipelineCommands,
    },
    /// Edit the stages of a pipeline
    Stage {
        #[command(subcommand)]
        command: StageCommands,
    },
    /// Deploy from a stage to the stage after it
    Deploy {
        /// Pipeline ID or unambiguous prefix
        pipeline: String,

        /// Source stage ID or unambiguous prefix
        stage: String,

        /// Snapshot to deploy, for stages that prompt for one
        #[arg(long)]
        snapshot: Option<uuid::Uuid>,
    },
    /// Snapshot management
    Snapshot {
        #[command(subcommand)]
        command: SnapshotCommands,
    },
    /// Device and device group status
    Device {
        #[command(subcommand)]
        command: DeviceCommands,
    },
}

/// Route a command to its handler module
pub async fn handle_command(command: Commands, config: &Config) -> Result<()> {
    match command {
        Commands::Pipeline { command } => pipeline::handle_pipeline_command(command, config).await,
        Commands::Stage { command } => stage::handle_stage_command(command, config).await,
        Commands::Deploy {
            pipeline,
            stage,
            snapshot,
        } => deploy::deploy(config, &pipeline, &stage, snapshot).await,
        Commands::Snapshot { command } => snapshot::handle_snapshot_command(command, config).await,
        Commands::Device { command } => device::handle_device_command(command, config).await,
    }
}
