//! Application domain types

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Application owning pipelines, instances, devices and device groups
///
/// Applications are managed elsewhere; the pipeline engine only reads them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Application {
    pub id: Uuid,
    pub team_id: Uuid,
    pub name: String,
}
