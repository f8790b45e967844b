//! Commands pushed to runtimes through the dispatch gateway

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What the receiving runtime is asked to do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandKind {
    /// Device: fetch and adopt the target snapshot
    Update,
    /// Instance: restart with the freshly applied settings
    Restart,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Command {
    pub kind: CommandKind,
    pub snapshot_id: Option<Uuid>,
    pub issued_at: chrono::DateTime<chrono::Utc>,
}

impl Command {
    pub fn update(snapshot_id: Option<Uuid>) -> Self {
        Self {
            kind: CommandKind::Update,
            snapshot_id,
            issued_at: chrono::Utc::now(),
        }
    }

    pub fn restart(snapshot_id: Option<Uuid>) -> Self {
        Self {
            kind: CommandKind::Restart,
            snapshot_id,
            issued_at: chrono::Utc::now(),
        }
    }
}
