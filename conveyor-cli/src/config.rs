//! Configuration module
//!
//! Handles CLI configuration including orchestrator URL and other settings.

use anyhow::{Result, anyhow};
use uuid::Uuid;

/// CLI configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// URL of the orchestrator service
    pub orchestrator_url: String,

    /// Application scope for pipeline listing and prefix resolution
    pub application_id: Option<Uuid>,
}

impl Config {
    pub fn require_application(&self) -> Result<Uuid> {
        self.application_id.ok_or_else(|| {
            anyhow!("an application is required: pass --application or set CONVEYOR_APPLICATION_ID")
        })
    }
}
