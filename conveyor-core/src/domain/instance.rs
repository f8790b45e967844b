//! Runtime instance domain types

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::credentials::EncryptedBlob;
use crate::domain::snapshot::blob_or_empty;

/// Hosted runtime instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Instance {
    pub id: Uuid,
    pub application_id: Uuid,
    pub name: String,
    /// Snapshot the instance (and the devices it owns) should run
    pub target_snapshot_id: Option<Uuid>,
    /// Set while a deploy is waiting for the runtime to restart
    pub is_deploying: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

/// Single environment variable of a runtime
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvVar {
    pub name: String,
    pub value: String,
}

impl EnvVar {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Live state of a runtime: what a snapshot captures and what a deploy writes
///
/// Credentials are encrypted under the owning target's own secret.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuntimeState {
    #[serde(default)]
    pub flows: Vec<Value>,
    #[serde(default, with = "blob_or_empty")]
    pub credentials: Option<EncryptedBlob>,
    #[serde(default)]
    pub settings: Map<String, Value>,
    #[serde(default)]
    pub env: Vec<EnvVar>,
    #[serde(default)]
    pub modules: BTreeMap<String, String>,
}

impl RuntimeState {
    /// Environment as a name to value map
    pub fn env_map(&self) -> BTreeMap<String, String> {
        self.env
            .iter()
            .map(|var| (var.name.clone(), var.value.clone()))
            .collect()
    }
}

/// Merge incoming environment variables into an existing list.
///
/// Existing entries keep their position and value, names not yet present are
/// appended in key order, nothing is removed.
pub fn merge_env(existing: &[EnvVar], incoming: &BTreeMap<String, String>) -> Vec<EnvVar> {
    let mut merged = existing.to_vec();

    for (name, value) in incoming {
        if !merged.iter().any(|var| &var.name == name) {
            merged.push(EnvVar::new(name.clone(), value.clone()));
        }
    }

    merged
}
