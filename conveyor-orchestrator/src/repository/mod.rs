//! Repository Module
//!
//! Data access layer for the orchestrator.
//! Each repository trait covers the database operations of one area; `Store`
//! bundles them so services can take a single `&dyn Store`.
//!
//! Two implementations exist: `PgStore` (PostgreSQL) and `MemoryStore`
//! (used when no database is configured, and by the tests).

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;
use conveyor_core::domain::application::Application;
use conveyor_core::domain::device::{Device, DeviceGroup};
use conveyor_core::domain::instance::{Instance, RuntimeState};
use conveyor_core::domain::pipeline::{Pipeline, Stage};
use conveyor_core::domain::snapshot::Snapshot;
use conveyor_core::domain::target::SnapshotOwner;
use thiserror::Error;
use uuid::Uuid;

/// Repository error type
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Stored document could not be decoded: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A row violates an invariant the schema cannot express
    #[error("Inconsistent row in {table}: {message}")]
    Inconsistent {
        table: &'static str,
        message: String,
    },
}

pub type Result<T> = std::result::Result<T, RepositoryError>;

#[async_trait]
pub trait PipelineRepository: Send + Sync {
    async fn insert_pipeline(&self, pipeline: &Pipeline) -> Result<()>;

    async fn find_pipeline(&self, id: Uuid) -> Result<Option<Pipeline>>;

    /// Pipelines of an application, oldest first
    async fn list_pipelines(&self, application_id: Uuid) -> Result<Vec<Pipeline>>;

    async fn update_pipeline(&self, pipeline: &Pipeline) -> Result<bool>;

    /// Delete a pipeline together with all of its stages
    async fn delete_pipeline(&self, id: Uuid) -> Result<bool>;
}

#[async_trait]
pub trait StageRepository: Send + Sync {
    async fn insert_stage(&self, stage: &Stage) -> Result<()>;

    async fn find_stage(&self, id: Uuid) -> Result<Option<Stage>>;

    /// All stages of a pipeline, in no particular order
    async fn list_stages(&self, pipeline_id: Uuid) -> Result<Vec<Stage>>;

    /// Overwrite a stage, including its chain pointers and target
    async fn update_stage(&self, stage: &Stage) -> Result<bool>;

    async fn delete_stage(&self, id: Uuid) -> Result<bool>;
}

#[async_trait]
pub trait SnapshotRepository: Send + Sync {
    async fn insert_snapshot(&self, snapshot: &Snapshot) -> Result<()>;

    async fn find_snapshot(&self, id: Uuid) -> Result<Option<Snapshot>>;

    /// Snapshots of an owner, newest first
    async fn list_snapshots(&self, owner: SnapshotOwner) -> Result<Vec<Snapshot>>;

    async fn latest_snapshot(&self, owner: SnapshotOwner) -> Result<Option<Snapshot>>;

    /// Delete a snapshot and clear every target/active pointer referencing it
    async fn delete_snapshot(&self, id: Uuid) -> Result<bool>;
}

/// Instances, devices and device groups
///
/// These entities are owned by other parts of the platform; the pipeline
/// engine reads them and only writes their snapshot pointers and deploy flag.
#[async_trait]
pub trait TargetRepository: Send + Sync {
    async fn insert_application(&self, application: &Application) -> Result<()>;

    async fn find_application(&self, id: Uuid) -> Result<Option<Application>>;

    async fn insert_instance(&self, instance: &Instance) -> Result<()>;

    async fn find_instance(&self, id: Uuid) -> Result<Option<Instance>>;

    async fn set_instance_target_snapshot(&self, id: Uuid, snapshot_id: Option<Uuid>)
    -> Result<()>;

    async fn set_instance_deploying(&self, id: Uuid, deploying: bool) -> Result<()>;

    /// Clear the deploying flag only while the instance still targets
    /// `snapshot_id`. Returns false when a newer deploy has taken over.
    async fn clear_instance_deploying(&self, id: Uuid, snapshot_id: Uuid) -> Result<bool>;

    async fn insert_device(&self, device: &Device) -> Result<()>;

    async fn find_device(&self, id: Uuid) -> Result<Option<Device>>;

    /// Devices owned directly by an instance
    async fn list_instance_devices(&self, instance_id: Uuid) -> Result<Vec<Device>>;

    async fn set_device_target_snapshot(&self, id: Uuid, snapshot_id: Option<Uuid>) -> Result<()>;

    /// Record what a device reported running; also refreshes `last_seen_at`
    async fn set_device_active_snapshot(&self, id: Uuid, snapshot_id: Option<Uuid>) -> Result<()>;

    async fn insert_device_group(&self, group: &DeviceGroup) -> Result<()>;

    async fn find_device_group(&self, id: Uuid) -> Result<Option<DeviceGroup>>;

    /// Current members of a device group
    async fn list_group_devices(&self, group_id: Uuid) -> Result<Vec<Device>>;

    async fn set_device_group_target_snapshot(
        &self,
        id: Uuid,
        snapshot_id: Option<Uuid>,
    ) -> Result<()>;

    async fn credential_secret(&self, owner: SnapshotOwner) -> Result<Option<String>>;

    async fn store_credential_secret(&self, owner: SnapshotOwner, secret: &str) -> Result<()>;
}

/// Live runtime state of instances and last reported state of devices
#[async_trait]
pub trait RuntimeRepository: Send + Sync {
    async fn runtime_state(&self, owner: SnapshotOwner) -> Result<Option<RuntimeState>>;

    async fn store_runtime_state(&self, owner: SnapshotOwner, state: &RuntimeState) -> Result<()>;
}

/// Everything the services need from persistence
pub trait Store:
    PipelineRepository + StageRepository + SnapshotRepository + TargetRepository + RuntimeRepository
{
}

impl<T> Store for T where
    T: PipelineRepository
        + StageRepository
        + SnapshotRepository
        + TargetRepository
        + RuntimeRepository
{
}
