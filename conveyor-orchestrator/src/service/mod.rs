//! Service Module
//!
//! Business logic layer for the orchestrator.
//! Services take a `&dyn Store` and hold the domain rules; the API layer only
//! translates between HTTP and these functions.

pub mod deploy;
pub mod error;
pub mod pipeline;
pub mod snapshot;
pub mod stage;
pub mod status;
pub mod target;

#[cfg(test)]
pub(crate) mod fixtures;

pub use deploy::{Deployer, Deployment};
pub use error::{Result, ServiceError};

// Re-export for convenience
pub use pipeline as pipeline_service;
pub use snapshot as snapshot_service;
pub use stage as stage_service;
pub use status as status_service;
