//! ID resolver module
//!
//! Resolves UUID prefixes to full UUIDs by querying the API, so users can
//! type short, unambiguous prefixes.

use anyhow::{Context, Result, anyhow};
use conveyor_client::OrchestratorClient;
use uuid::Uuid;

use crate::config::Config;
use crate::types::IdOrPrefix;

/// Resolve a pipeline ID or prefix within the configured application
pub async fn resolve_pipeline_id(
    client: &OrchestratorClient,
    config: &Config,
    id_or_prefix: &IdOrPrefix,
) -> Result<Uuid> {
    if let Some(uuid) = id_or_prefix.as_uuid() {
        return Ok(uuid);
    }

    let application_id = config.require_application()?;

    let pipelines = client
        .list_pipelines(application_id)
        .await
        .context("Failed to fetch pipelines for ID resolution")?;

    pick("pipeline", id_or_prefix, pipelines.iter().map(|p| p.id))
}

/// Resolve a stage ID or prefix among the stages of one pipeline
pub async fn resolve_stage_id(
    client: &OrchestratorClient,
    pipeline_id: Uuid,
    id_or_prefix: &IdOrPrefix,
) -> Result<Uuid> {
    if let Some(uuid) = id_or_prefix.as_uuid() {
        return Ok(uuid);
    }

    let pipeline = client
        .get_pipeline(pipeline_id)
        .await
        .context("Failed to fetch pipeline stages for ID resolution")?;

    pick("stage", id_or_prefix, pipeline.stages.iter().map(|s| s.id))
}

/// Exactly one candidate must match
fn pick(what: &str, id_or_prefix: &IdOrPrefix, ids: impl Iterator<Item = Uuid>) -> Result<Uuid> {
    let matches: Vec<Uuid> = ids.filter(|id| id_or_prefix.matches(*id)).collect();

    match matches.as_slice() {
        [] => Err(anyhow!(
            "No {} found with ID starting with '{}'",
            what,
            id_or_prefix
        )),
        [id] => Ok(*id),
        _ => {
            let ids: Vec<String> = matches.iter().map(Uuid::to_string).collect();
            Err(anyhow!(
                "Ambiguous prefix '{}' matches multiple {}s: {}",
                id_or_prefix,
                what,
                ids.join(", ")
            ))
        }
    }
}
