//! Snapshot DTOs

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::domain::snapshot::{Snapshot, SnapshotFlows, SnapshotSettings};
use crate::domain::target::SnapshotOwner;

/// Request to create a snapshot of a target
///
/// Flows and credentials missing from the request are captured from the
/// target's live runtime. `credentials`, when given, is the plaintext object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateSnapshot {
    pub owner: SnapshotOwner,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub user_id: Option<Uuid>,
    pub flows: Option<Vec<Value>>,
    pub credentials: Option<Value>,
    pub settings: Option<SettingsOverride>,
    #[serde(default = "default_true")]
    pub include_env: bool,
}

/// Settings supplied by the caller on top of the live ones
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SettingsOverride {
    pub settings: Option<Map<String, Value>>,
    pub env: Option<BTreeMap<String, String>>,
    /// Merged into the installed module list by name; these win
    pub modules: Option<BTreeMap<String, String>>,
}

fn default_true() -> bool {
    true
}

/// How environment variables travel in an export or upload
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EnvVarsExport {
    /// Keys and values (`true`)
    #[default]
    All,
    /// Keys only, values blanked (`"keys"`)
    Keys,
    /// Nothing (`false`)
    None,
}

impl EnvVarsExport {
    pub fn apply(&self, env: &BTreeMap<String, String>) -> BTreeMap<String, String> {
        match self {
            Self::All => env.clone(),
            Self::Keys => env.keys().map(|k| (k.clone(), String::new())).collect(),
            Self::None => BTreeMap::new(),
        }
    }
}

impl Serialize for EnvVarsExport {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::All => serializer.serialize_bool(true),
            Self::Keys => serializer.serialize_str("keys"),
            Self::None => serializer.serialize_bool(false),
        }
    }
}

impl<'de> Deserialize<'de> for EnvVarsExport {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Flag(bool),
            Mode(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Flag(true) => Ok(Self::All),
            Raw::Flag(false) => Ok(Self::None),
            Raw::Mode(mode) if mode == "keys" => Ok(Self::Keys),
            Raw::Mode(other) => Err(serde::de::Error::custom(format!(
                "env_vars must be true, false or \"keys\", got \"{}\"",
                other
            ))),
        }
    }
}

/// Which parts of a snapshot cross an export or upload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotComponents {
    #[serde(default = "default_true")]
    pub flows: bool,
    #[serde(default = "default_true")]
    pub credentials: bool,
    #[serde(default)]
    pub env_vars: EnvVarsExport,
}

impl Default for SnapshotComponents {
    fn default() -> Self {
        Self {
            flows: true,
            credentials: true,
            env_vars: EnvVarsExport::All,
        }
    }
}

impl SnapshotComponents {
    /// Credentials never travel without flows
    pub fn normalized(self) -> Self {
        Self {
            credentials: self.flows && self.credentials,
            ..self
        }
    }
}

/// Request to export a snapshot
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExportSnapshot {
    /// Secret the exported credentials get encrypted with.
    /// Required when credentials are exported.
    pub credential_secret: Option<String>,
    #[serde(default)]
    pub components: SnapshotComponents,
}

/// Portable form of a snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportedSnapshot {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub flows: SnapshotFlows,
    pub settings: SnapshotSettings,
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl ExportedSnapshot {
    pub fn header(snapshot: &Snapshot) -> Self {
        Self {
            id: snapshot.id,
            name: snapshot.name.clone(),
            description: snapshot.description.clone(),
            flows: SnapshotFlows::default(),
            settings: SnapshotSettings::default(),
            created_at: Some(snapshot.created_at),
        }
    }
}

/// Request to import an exported snapshot into a target
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadSnapshot {
    pub owner: SnapshotOwner,
    pub snapshot: ExportedSnapshot,
    /// Secret the exported credentials were encrypted with
    pub credential_secret: Option<String>,
    pub user_id: Option<Uuid>,
    #[serde(default)]
    pub components: SnapshotComponents,
}

/// Request to copy a snapshot to another target
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CopySnapshot {
    pub target: SnapshotOwner,
    /// Also write the copy into the destination's live runtime
    #[serde(default)]
    pub import_snapshot: bool,
    /// Make the copy the destination's target snapshot
    #[serde(default)]
    pub set_as_target: bool,
    /// Secret the source credentials are encrypted with, when it is not the owner's
    pub decrypt_and_reencrypt_credentials_secret: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_env_vars_wire_values() {
        let parse = |v: Value| serde_json::from_value::<EnvVarsExport>(v).unwrap();
        assert_eq!(parse(json!(true)), EnvVarsExport::All);
        assert_eq!(parse(json!(false)), EnvVarsExport::None);
        assert_eq!(parse(json!("keys")), EnvVarsExport::Keys);
        assert!(serde_json::from_value::<EnvVarsExport>(json!("values")).is_err());

        assert_eq!(serde_json::to_value(EnvVarsExport::Keys).unwrap(), json!("keys"));
    }

    #[test]
    fn test_env_keys_hides_values() {
        let env = BTreeMap::from([
            ("env1".to_string(), "a".to_string()),
            ("env2".to_string(), "b".to_string()),
        ]);
        let keys = EnvVarsExport::Keys.apply(&env);
        assert_eq!(
            keys,
            BTreeMap::from([
                ("env1".to_string(), String::new()),
                ("env2".to_string(), String::new()),
            ])
        );
    }

    #[test]
    fn test_components_default_to_everything() {
        let components: SnapshotComponents = serde_json::from_value(json!({})).unwrap();
        assert_eq!(components, SnapshotComponents::default());
    }

    #[test]
    fn test_no_credentials_without_flows() {
        let components = SnapshotComponents {
            flows: false,
            credentials: true,
            env_vars: EnvVarsExport::All,
        }
        .normalized();
        assert!(!components.credentials);
    }
}
