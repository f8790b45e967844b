//! Conveyor CLI
//!
//! Command-line interface for managing deployment pipelines through the
//! Conveyor orchestrator.

mod commands;
mod config;
mod id_resolver;
mod types;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, handle_command};
use config::Config;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "conveyor")]
#[command(about = "Conveyor deployment pipeline CLI", long_about = None)]
struct Cli {
    /// Orchestrator URL
    #[arg(
        long,
        env = "CONVEYOR_ORCHESTRATOR_URL",
        default_value = "http://localhost:8080"
    )]
    orchestrator_url: String,

    /// Application whose pipelines are listed and searched for id prefixes
    #[arg(long, env = "CONVEYOR_APPLICATION_ID", global = true)]
    application: Option<Uuid>,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config {
        orchestrator_url: cli.orchestrator_url,
        application_id: cli.application,
    };

    handle_command(cli.command, &config).await
}
