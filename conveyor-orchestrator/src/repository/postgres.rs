//! PostgreSQL Store
//!
//! Handles all database operations against the schema created in `db.rs`.

use async_trait::async_trait;
use conveyor_core::domain::application::Application;
use conveyor_core::domain::device::{Device, DeviceGroup, DeviceOwner};
use conveyor_core::domain::instance::{Instance, RuntimeState};
use conveyor_core::domain::pipeline::{Pipeline, Stage};
use conveyor_core::domain::snapshot::{Snapshot, SnapshotFlows, SnapshotSettings};
use conveyor_core::domain::target::{SnapshotOwner, StageTarget};
use sqlx::PgPool;
use sqlx::types::Json;
use uuid::Uuid;

use super::{
    PipelineRepository, RepositoryError, Result, RuntimeRepository, SnapshotRepository,
    StageRepository, TargetRepository,
};

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Table holding the secret and runtime state of an owner
fn owner_table(owner: SnapshotOwner) -> &'static str {
    match owner {
        SnapshotOwner::Instance(_) => "instances",
        SnapshotOwner::Device(_) => "devices",
    }
}

const SNAPSHOT_COLUMNS: &str = "id, name, description, instance_id, device_id, user_id, \
                                flows, settings, created_at, updated_at";

const STAGE_COLUMNS: &str = "id, pipeline_id, name, action, instance_id, device_id, \
                             device_group_id, source_id, next_stage_id, created_at, updated_at";

const DEVICE_COLUMNS: &str = "id, team_id, name, application_id, instance_id, mode, \
                              device_group_id, target_snapshot_id, active_snapshot_id, \
                              last_seen_at, created_at, updated_at";

#[async_trait]
impl PipelineRepository for PgStore {
    async fn insert_pipeline(&self, pipeline: &Pipeline) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO pipelines (id, application_id, name, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(pipeline.id)
        .bind(pipeline.application_id)
        .bind(&pipeline.name)
        .bind(pipeline.created_at)
        .bind(pipeline.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_pipeline(&self, id: Uuid) -> Result<Option<Pipeline>> {
        let row = sqlx::query_as::<_, PipelineRow>(
            r#"
            SELECT id, application_id, name, created_at, updated_at
            FROM pipelines
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.into()))
    }

    async fn list_pipelines(&self, application_id: Uuid) -> Result<Vec<Pipeline>> {
        let rows = sqlx::query_as::<_, PipelineRow>(
            r#"
            SELECT id, application_id, name, created_at, updated_at
            FROM pipelines
            WHERE application_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(application_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|r| r.into()).collect())
    }

    async fn update_pipeline(&self, pipeline: &Pipeline) -> Result<bool> {
        let result = sqlx::query("UPDATE pipelines SET name = $1, updated_at = $2 WHERE id = $3")
            .bind(&pipeline.name)
            .bind(pipeline.updated_at)
            .bind(pipeline.id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_pipeline(&self, id: Uuid) -> Result<bool> {
        // Stages go with it through ON DELETE CASCADE
        let result = sqlx::query("DELETE FROM pipelines WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl StageRepository for PgStore {
    async fn insert_stage(&self, stage: &Stage) -> Result<()> {
        let target = stage.target;

        sqlx::query(
            r#"
            INSERT INTO pipeline_stages (
                id, pipeline_id, name, action, instance_id, device_id,
                device_group_id, source_id, next_stage_id, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(stage.id)
        .bind(stage.pipeline_id)
        .bind(&stage.name)
        .bind(stage.action.as_str())
        .bind(target.and_then(|t| t.instance_id()))
        .bind(target.and_then(|t| t.device_id()))
        .bind(target.and_then(|t| t.device_group_id()))
        .bind(stage.source_id)
        .bind(stage.next_stage_id)
        .bind(stage.created_at)
        .bind(stage.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_stage(&self, id: Uuid) -> Result<Option<Stage>> {
        let row = sqlx::query_as::<_, StageRow>(&format!(
            "SELECT {} FROM pipeline_stages WHERE id = $1",
            STAGE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Stage::try_from).transpose()
    }

    async fn list_stages(&self, pipeline_id: Uuid) -> Result<Vec<Stage>> {
        let rows = sqlx::query_as::<_, StageRow>(&format!(
            "SELECT {} FROM pipeline_stages WHERE pipeline_id = $1",
            STAGE_COLUMNS
        ))
        .bind(pipeline_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Stage::try_from).collect()
    }

    async fn update_stage(&self, stage: &Stage) -> Result<bool> {
        let target = stage.target;

        let result = sqlx::query(
            r#"
            UPDATE pipeline_stages
            SET name = $1, action = $2, instance_id = $3, device_id = $4,
                device_group_id = $5, source_id = $6, next_stage_id = $7, updated_at = $8
            WHERE id = $9
            "#,
        )
        .bind(&stage.name)
        .bind(stage.action.as_str())
        .bind(target.and_then(|t| t.instance_id()))
        .bind(target.and_then(|t| t.device_id()))
        .bind(target.and_then(|t| t.device_group_id()))
        .bind(stage.source_id)
        .bind(stage.next_stage_id)
        .bind(stage.updated_at)
        .bind(stage.id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_stage(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM pipeline_stages WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl SnapshotRepository for PgStore {
    async fn insert_snapshot(&self, snapshot: &Snapshot) -> Result<()> {
        let (instance_id, device_id) = match snapshot.owner {
            Some(SnapshotOwner::Instance(id)) => (Some(id), None),
            Some(SnapshotOwner::Device(id)) => (None, Some(id)),
            None => (None, None),
        };

        sqlx::query(
            r#"
            INSERT INTO snapshots (
                id, name, description, instance_id, device_id, user_id,
                flows, settings, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(snapshot.id)
        .bind(&snapshot.name)
        .bind(&snapshot.description)
        .bind(instance_id)
        .bind(device_id)
        .bind(snapshot.user_id)
        .bind(Json(&snapshot.flows))
        .bind(Json(&snapshot.settings))
        .bind(snapshot.created_at)
        .bind(snapshot.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_snapshot(&self, id: Uuid) -> Result<Option<Snapshot>> {
        let row = sqlx::query_as::<_, SnapshotRow>(&format!(
            "SELECT {} FROM snapshots WHERE id = $1",
            SNAPSHOT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.into()))
    }

    async fn list_snapshots(&self, owner: SnapshotOwner) -> Result<Vec<Snapshot>> {
        let column = match owner {
            SnapshotOwner::Instance(_) => "instance_id",
            SnapshotOwner::Device(_) => "device_id",
        };

        let rows = sqlx::query_as::<_, SnapshotRow>(&format!(
            "SELECT {} FROM snapshots WHERE {} = $1 ORDER BY created_at DESC, seq DESC",
            SNAPSHOT_COLUMNS, column
        ))
        .bind(owner.id())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|r| r.into()).collect())
    }

    async fn latest_snapshot(&self, owner: SnapshotOwner) -> Result<Option<Snapshot>> {
        let column = match owner {
            SnapshotOwner::Instance(_) => "instance_id",
            SnapshotOwner::Device(_) => "device_id",
        };

        let row = sqlx::query_as::<_, SnapshotRow>(&format!(
            "SELECT {} FROM snapshots WHERE {} = $1 ORDER BY created_at DESC, seq DESC LIMIT 1",
            SNAPSHOT_COLUMNS, column
        ))
        .bind(owner.id())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.into()))
    }

    async fn delete_snapshot(&self, id: Uuid) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query("DELETE FROM snapshots WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        for statement in [
            "UPDATE devices SET target_snapshot_id = NULL WHERE target_snapshot_id = $1",
            "UPDATE devices SET active_snapshot_id = NULL WHERE active_snapshot_id = $1",
            "UPDATE device_groups SET target_snapshot_id = NULL WHERE target_snapshot_id = $1",
            "UPDATE instances SET target_snapshot_id = NULL WHERE target_snapshot_id = $1",
        ] {
            sqlx::query(statement).bind(id).execute(&mut *tx).await?;
        }

        tx.commit().await?;
        Ok(true)
    }
}

#[async_trait]
impl TargetRepository for PgStore {
    async fn insert_application(&self, application: &Application) -> Result<()> {
        sqlx::query("INSERT INTO applications (id, team_id, name) VALUES ($1, $2, $3)")
            .bind(application.id)
            .bind(application.team_id)
            .bind(&application.name)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn find_application(&self, id: Uuid) -> Result<Option<Application>> {
        let row = sqlx::query_as::<_, ApplicationRow>(
            "SELECT id, team_id, name FROM applications WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| Application {
            id: r.id,
            team_id: r.team_id,
            name: r.name,
        }))
    }

    async fn insert_instance(&self, instance: &Instance) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO instances (
                id, application_id, name, target_snapshot_id, is_deploying, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(instance.id)
        .bind(instance.application_id)
        .bind(&instance.name)
        .bind(instance.target_snapshot_id)
        .bind(instance.is_deploying)
        .bind(instance.created_at)
        .bind(instance.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_instance(&self, id: Uuid) -> Result<Option<Instance>> {
        let row = sqlx::query_as::<_, InstanceRow>(
            r#"
            SELECT id, application_id, name, target_snapshot_id, is_deploying, created_at, updated_at
            FROM instances
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.into()))
    }

    async fn set_instance_target_snapshot(
        &self,
        id: Uuid,
        snapshot_id: Option<Uuid>,
    ) -> Result<()> {
        sqlx::query("UPDATE instances SET target_snapshot_id = $1, updated_at = $2 WHERE id = $3")
            .bind(snapshot_id)
            .bind(chrono::Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn set_instance_deploying(&self, id: Uuid, deploying: bool) -> Result<()> {
        sqlx::query("UPDATE instances SET is_deploying = $1 WHERE id = $2")
            .bind(deploying)
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn clear_instance_deploying(&self, id: Uuid, snapshot_id: Uuid) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE instances SET is_deploying = FALSE WHERE id = $1 AND target_snapshot_id = $2",
        )
        .bind(id)
        .bind(snapshot_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn insert_device(&self, device: &Device) -> Result<()> {
        let (application_id, instance_id) = match device.owner {
            DeviceOwner::Application(id) => (Some(id), None),
            DeviceOwner::Instance(id) => (None, Some(id)),
            DeviceOwner::Unassigned => (None, None),
        };

        sqlx::query(
            r#"
            INSERT INTO devices (
                id, team_id, name, application_id, instance_id, mode, device_group_id,
                target_snapshot_id, active_snapshot_id, last_seen_at, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(device.id)
        .bind(device.team_id)
        .bind(&device.name)
        .bind(application_id)
        .bind(instance_id)
        .bind(device.mode.as_str())
        .bind(device.device_group_id)
        .bind(device.target_snapshot_id)
        .bind(device.active_snapshot_id)
        .bind(device.last_seen_at)
        .bind(device.created_at)
        .bind(device.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_device(&self, id: Uuid) -> Result<Option<Device>> {
        let row = sqlx::query_as::<_, DeviceRow>(&format!(
            "SELECT {} FROM devices WHERE id = $1",
            DEVICE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Device::try_from).transpose()
    }

    async fn list_instance_devices(&self, instance_id: Uuid) -> Result<Vec<Device>> {
        let rows = sqlx::query_as::<_, DeviceRow>(&format!(
            "SELECT {} FROM devices WHERE instance_id = $1 ORDER BY created_at ASC",
            DEVICE_COLUMNS
        ))
        .bind(instance_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Device::try_from).collect()
    }

    async fn set_device_target_snapshot(&self, id: Uuid, snapshot_id: Option<Uuid>) -> Result<()> {
        sqlx::query("UPDATE devices SET target_snapshot_id = $1, updated_at = $2 WHERE id = $3")
            .bind(snapshot_id)
            .bind(chrono::Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn set_device_active_snapshot(&self, id: Uuid, snapshot_id: Option<Uuid>) -> Result<()> {
        let now = chrono::Utc::now();

        sqlx::query(
            r#"
            UPDATE devices
            SET active_snapshot_id = $1, last_seen_at = $2, updated_at = $2
            WHERE id = $3
            "#,
        )
        .bind(snapshot_id)
        .bind(now)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn insert_device_group(&self, group: &DeviceGroup) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO device_groups (
                id, application_id, name, description, target_snapshot_id, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(group.id)
        .bind(group.application_id)
        .bind(&group.name)
        .bind(&group.description)
        .bind(group.target_snapshot_id)
        .bind(group.created_at)
        .bind(group.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_device_group(&self, id: Uuid) -> Result<Option<DeviceGroup>> {
        let row = sqlx::query_as::<_, DeviceGroupRow>(
            r#"
            SELECT id, application_id, name, description, target_snapshot_id, created_at, updated_at
            FROM device_groups
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.into()))
    }

    async fn list_group_devices(&self, group_id: Uuid) -> Result<Vec<Device>> {
        let rows = sqlx::query_as::<_, DeviceRow>(&format!(
            "SELECT {} FROM devices WHERE device_group_id = $1 ORDER BY created_at ASC",
            DEVICE_COLUMNS
        ))
        .bind(group_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Device::try_from).collect()
    }

    async fn set_device_group_target_snapshot(
        &self,
        id: Uuid,
        snapshot_id: Option<Uuid>,
    ) -> Result<()> {
        sqlx::query(
            "UPDATE device_groups SET target_snapshot_id = $1, updated_at = $2 WHERE id = $3",
        )
        .bind(snapshot_id)
        .bind(chrono::Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn credential_secret(&self, owner: SnapshotOwner) -> Result<Option<String>> {
        let secret = sqlx::query_scalar::<_, Option<String>>(&format!(
            "SELECT credential_secret FROM {} WHERE id = $1",
            owner_table(owner)
        ))
        .bind(owner.id())
        .fetch_optional(&self.pool)
        .await?;

        Ok(secret.flatten())
    }

    async fn store_credential_secret(&self, owner: SnapshotOwner, secret: &str) -> Result<()> {
        sqlx::query(&format!(
            "UPDATE {} SET credential_secret = $1 WHERE id = $2",
            owner_table(owner)
        ))
        .bind(secret)
        .bind(owner.id())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl RuntimeRepository for PgStore {
    async fn runtime_state(&self, owner: SnapshotOwner) -> Result<Option<RuntimeState>> {
        let state = sqlx::query_scalar::<_, Option<Json<RuntimeState>>>(&format!(
            "SELECT runtime FROM {} WHERE id = $1",
            owner_table(owner)
        ))
        .bind(owner.id())
        .fetch_optional(&self.pool)
        .await?;

        Ok(state.flatten().map(|json| json.0))
    }

    async fn store_runtime_state(&self, owner: SnapshotOwner, state: &RuntimeState) -> Result<()> {
        sqlx::query(&format!(
            "UPDATE {} SET runtime = $1, updated_at = $2 WHERE id = $3",
            owner_table(owner)
        ))
        .bind(Json(state))
        .bind(chrono::Utc::now())
        .bind(owner.id())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

// =============================================================================
// Database Row Types
// =============================================================================

#[derive(sqlx::FromRow)]
struct ApplicationRow {
    id: Uuid,
    team_id: Uuid,
    name: String,
}

#[derive(sqlx::FromRow)]
struct PipelineRow {
    id: Uuid,
    application_id: Uuid,
    name: String,
    created_at: chrono::DateTime<chrono::Utc>,
    updated_at: chrono::DateTime<chrono::Utc>,
}

impl From<PipelineRow> for Pipeline {
    fn from(row: PipelineRow) -> Self {
        Pipeline {
            id: row.id,
            application_id: row.application_id,
            name: row.name,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct StageRow {
    id: Uuid,
    pipeline_id: Uuid,
    name: String,
    action: String,
    instance_id: Option<Uuid>,
    device_id: Option<Uuid>,
    device_group_id: Option<Uuid>,
    source_id: Option<Uuid>,
    next_stage_id: Option<Uuid>,
    created_at: chrono::DateTime<chrono::Utc>,
    updated_at: chrono::DateTime<chrono::Utc>,
}

impl TryFrom<StageRow> for Stage {
    type Error = RepositoryError;

    fn try_from(row: StageRow) -> Result<Self> {
        let inconsistent = |message: String| RepositoryError::Inconsistent {
            table: "pipeline_stages",
            message,
        };

        let action = row.action.parse().map_err(inconsistent)?;
        let target = StageTarget::from_fields(row.instance_id, row.device_id, row.device_group_id)
            .map_err(|_| inconsistent(format!("stage {} has more than one target", row.id)))?;

        Ok(Stage {
            id: row.id,
            pipeline_id: row.pipeline_id,
            name: row.name,
            action,
            target,
            source_id: row.source_id,
            next_stage_id: row.next_stage_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct SnapshotRow {
    id: Uuid,
    name: String,
    description: String,
    instance_id: Option<Uuid>,
    device_id: Option<Uuid>,
    user_id: Option<Uuid>,
    flows: Json<SnapshotFlows>,
    settings: Json<SnapshotSettings>,
    created_at: chrono::DateTime<chrono::Utc>,
    updated_at: chrono::DateTime<chrono::Utc>,
}

impl From<SnapshotRow> for Snapshot {
    fn from(row: SnapshotRow) -> Self {
        let owner = match (row.instance_id, row.device_id) {
            (Some(id), _) => Some(SnapshotOwner::Instance(id)),
            (None, Some(id)) => Some(SnapshotOwner::Device(id)),
            (None, None) => None,
        };

        Snapshot {
            id: row.id,
            name: row.name,
            description: row.description,
            owner,
            user_id: row.user_id,
            flows: row.flows.0,
            settings: row.settings.0,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct InstanceRow {
    id: Uuid,
    application_id: Uuid,
    name: String,
    target_snapshot_id: Option<Uuid>,
    is_deploying: bool,
    created_at: chrono::DateTime<chrono::Utc>,
    updated_at: chrono::DateTime<chrono::Utc>,
}

impl From<InstanceRow> for Instance {
    fn from(row: InstanceRow) -> Self {
        Instance {
            id: row.id,
            application_id: row.application_id,
            name: row.name,
            target_snapshot_id: row.target_snapshot_id,
            is_deploying: row.is_deploying,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct DeviceRow {
    id: Uuid,
    team_id: Uuid,
    name: String,
    application_id: Option<Uuid>,
    instance_id: Option<Uuid>,
    mode: String,
    device_group_id: Option<Uuid>,
    target_snapshot_id: Option<Uuid>,
    active_snapshot_id: Option<Uuid>,
    last_seen_at: Option<chrono::DateTime<chrono::Utc>>,
    created_at: chrono::DateTime<chrono::Utc>,
    updated_at: chrono::DateTime<chrono::Utc>,
}

impl TryFrom<DeviceRow> for Device {
    type Error = RepositoryError;

    fn try_from(row: DeviceRow) -> Result<Self> {
        let mode = row
            .mode
            .parse()
            .map_err(|message| RepositoryError::Inconsistent {
                table: "devices",
                message,
            })?;

        let owner = match (row.application_id, row.instance_id) {
            (Some(id), _) => DeviceOwner::Application(id),
            (None, Some(id)) => DeviceOwner::Instance(id),
            (None, None) => DeviceOwner::Unassigned,
        };

        Ok(Device {
            id: row.id,
            team_id: row.team_id,
            name: row.name,
            owner,
            mode,
            device_group_id: row.device_group_id,
            target_snapshot_id: row.target_snapshot_id,
            active_snapshot_id: row.active_snapshot_id,
            last_seen_at: row.last_seen_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct DeviceGroupRow {
    id: Uuid,
    application_id: Uuid,
    name: String,
    description: Option<String>,
    target_snapshot_id: Option<Uuid>,
    created_at: chrono::DateTime<chrono::Utc>,
    updated_at: chrono::DateTime<chrono::Utc>,
}

impl From<DeviceGroupRow> for DeviceGroup {
    fn from(row: DeviceGroupRow) -> Self {
        DeviceGroup {
            id: row.id,
            application_id: row.application_id,
            name: row.name,
            description: row.description,
            target_snapshot_id: row.target_snapshot_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}
