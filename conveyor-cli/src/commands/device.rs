//! Device command handlers

use anyhow::Result;
use clap::Subcommand;
use colored::*;
use conveyor_client::OrchestratorClient;
use uuid::Uuid;

use crate::config::Config;

/// Device subcommands
#[derive(Subcommand)]
pub enum DeviceCommands {
    /// Show what a device should run and what it reported running
    Status {
        /// Device ID
        id: Uuid,
    },
    /// Show rollout counts of a device group
    GroupStatus {
        /// Device group ID
        id: Uuid,
    },
}

pub async fn handle_device_command(command: DeviceCommands, config: &Config) -> Result<()> {
    let client = OrchestratorClient::new(&config.orchestrator_url);

    match command {
        DeviceCommands::Status { id } => {
            let status = client.device_status(id).await?;

            println!("{}", "Device Status:".bold());
            println!("  ID:      {}", status.device_id.to_string().cyan());
            println!("  Mode:    {}", status.mode.as_str());
            println!("  Target:  {}", format_snapshot(status.target_snapshot_id));
            println!("  Running: {}", format_snapshot(status.active_snapshot_id));
            if status.pending {
                println!("  {}", "Waiting for the device to confirm its target".yellow());
            }
            Ok(())
        }
        DeviceCommands::GroupStatus { id } => {
            let status = client.device_group_status(id).await?;

            println!("{}", "Device Group Status:".bold());
            println!("  ID:      {}", status.device_group_id.to_string().cyan());
            println!("  Target:  {}", format_snapshot(status.target_snapshot_id));
            println!("  Devices: {}", status.device_count);
            println!(
                "  Updated: {}/{}",
                status.target_match_count, status.device_count
            );
            let running = format!("{}/{}", status.running_count, status.device_count);
            if status.running_count == status.device_count {
                println!("  Running: {}", running.green());
            } else {
                println!("  Running: {}", running.yellow());
            }
            Ok(())
        }
    }
}

fn format_snapshot(id: Option<Uuid>) -> String {
    match id {
        Some(id) => id.to_string(),
        None => "none".dimmed().to_string(),
    }
}
