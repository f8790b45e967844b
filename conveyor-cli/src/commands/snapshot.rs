//! Snapshot command handlers

use anyhow::{Context, Result, bail};
use clap::Subcommand;
use colored::*;
use conveyor_client::OrchestratorClient;
use conveyor_core::domain::target::SnapshotOwner;
use conveyor_core::dto::snapshot::{EnvVarsExport, ExportSnapshot, SnapshotComponents};
use uuid::Uuid;

use crate::config::Config;

/// Snapshot subcommands
#[derive(Subcommand)]
pub enum SnapshotCommands {
    /// List the snapshots of an instance or device, newest first
    List {
        /// Owner kind: instance or device
        kind: String,

        /// Owner ID
        id: Uuid,
    },
    /// Export a snapshot as JSON
    Export {
        /// Snapshot ID
        id: Uuid,

        /// Encrypt exported credentials with this secret
        #[arg(long, env = "CONVEYOR_CREDENTIAL_SECRET")]
        credential_secret: Option<String>,

        /// Leave flows (and with them credentials) out
        #[arg(long)]
        no_flows: bool,

        /// Leave credentials out
        #[arg(long)]
        no_credentials: bool,

        /// Export environment variable names with blank values
        #[arg(long, conflicts_with = "no_env")]
        env_keys_only: bool,

        /// Leave environment variables out
        #[arg(long)]
        no_env: bool,

        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Delete a snapshot and clear every pointer to it
    Delete {
        /// Snapshot ID
        id: Uuid,
    },
}

pub async fn handle_snapshot_command(command: SnapshotCommands, config: &Config) -> Result<()> {
    let client = OrchestratorClient::new(&config.orchestrator_url);

    match command {
        SnapshotCommands::List { kind, id } => {
            let owner = match kind.as_str() {
                "instance" => SnapshotOwner::Instance(id),
                "device" => SnapshotOwner::Device(id),
                other => bail!("unknown owner kind '{}', expected instance or device", other),
            };

            let snapshots = client.list_snapshots(owner).await?;
            if snapshots.is_empty() {
                println!("{}", "No snapshots found.".yellow());
                return Ok(());
            }

            for snapshot in snapshots {
                println!(
                    "  {} {} {}",
                    snapshot.id.to_string().cyan(),
                    snapshot.name.bold(),
                    snapshot
                        .created_at
                        .format("%Y-%m-%d %H:%M:%S")
                        .to_string()
                        .dimmed()
                );
            }
            Ok(())
        }
        SnapshotCommands::Export {
            id,
            credential_secret,
            no_flows,
            no_credentials,
            env_keys_only,
            no_env,
            output,
        } => {
            let env_vars = if no_env {
                EnvVarsExport::None
            } else if env_keys_only {
                EnvVarsExport::Keys
            } else {
                EnvVarsExport::All
            };

            let exported = client
                .export_snapshot(
                    id,
                    ExportSnapshot {
                        credential_secret,
                        components: SnapshotComponents {
                            flows: !no_flows,
                            credentials: !no_credentials,
                            env_vars,
                        },
                    },
                )
                .await?;

            let json = serde_json::to_string_pretty(&exported)?;
            match output {
                Some(path) => {
                    std::fs::write(&path, json)
                        .with_context(|| format!("Failed to write export to {}", path))?;
                    println!("{} {}", "✓ Snapshot exported to".green().bold(), path);
                }
                None => println!("{}", json),
            }
            Ok(())
        }
        SnapshotCommands::Delete { id } => {
            client.delete_snapshot(id).await?;
            println!("{}", "✓ Snapshot deleted".green().bold());
            println!("  ID: {}", id.to_string().cyan());
            Ok(())
        }
    }
}
