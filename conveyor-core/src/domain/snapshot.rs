//! Snapshot domain types

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::credentials::EncryptedBlob;
use crate::domain::target::SnapshotOwner;

/// Immutable bundle of flows, credentials and settings of a runtime
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub owner: Option<SnapshotOwner>,
    pub user_id: Option<Uuid>,
    pub flows: SnapshotFlows,
    pub settings: SnapshotSettings,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

/// Flows sub-document. Credentials serialise as `{}` when absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SnapshotFlows {
    #[serde(default)]
    pub flows: Vec<Value>,
    #[serde(default, with = "blob_or_empty")]
    pub credentials: Option<EncryptedBlob>,
}

/// Settings sub-document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SnapshotSettings {
    #[serde(default)]
    pub settings: Map<String, Value>,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    #[serde(default)]
    pub modules: BTreeMap<String, String>,
}

/// Lightweight snapshot listing entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotSummary {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub owner: Option<SnapshotOwner>,
    pub user_id: Option<Uuid>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl From<&Snapshot> for SnapshotSummary {
    fn from(snapshot: &Snapshot) -> Self {
        Self {
            id: snapshot.id,
            name: snapshot.name.clone(),
            description: snapshot.description.clone(),
            owner: snapshot.owner,
            user_id: snapshot.user_id,
            created_at: snapshot.created_at,
        }
    }
}

/// (De)serialise `Option<EncryptedBlob>` with `{}` standing for `None`
pub(crate) mod blob_or_empty {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use serde_json::{Map, Value};

    use crate::credentials::EncryptedBlob;

    pub fn serialize<S: Serializer>(
        value: &Option<EncryptedBlob>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(blob) => blob.serialize(serializer),
            None => Map::new().serialize(serializer),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<EncryptedBlob>, D::Error> {
        match Option::<Value>::deserialize(deserializer)? {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Object(map)) if map.is_empty() => Ok(None),
            Some(other) => serde_json::from_value(other)
                .map(Some)
                .map_err(serde::de::Error::custom),
        }
    }
}
