use sqlx::{PgPool, postgres::PgPoolOptions};
use std::time::Duration;

pub async fn create_pool(database_url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(Duration::from_secs(5))
        .connect(database_url)
        .await
}

pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
    // Applications, instances, devices and groups are owned elsewhere in the
    // platform; these definitions only cover the columns the engine touches.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS applications (
            id UUID PRIMARY KEY,
            team_id UUID NOT NULL,
            name VARCHAR(255) NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS instances (
            id UUID PRIMARY KEY,
            application_id UUID NOT NULL REFERENCES applications(id) ON DELETE CASCADE,
            name VARCHAR(255) NOT NULL,
            target_snapshot_id UUID,
            is_deploying BOOLEAN NOT NULL DEFAULT FALSE,
            credential_secret TEXT,
            runtime JSONB,
            created_at TIMESTAMPTZ NOT NULL,
            updated_at TIMESTAMPTZ NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS device_groups (
            id UUID PRIMARY KEY,
            application_id UUID NOT NULL REFERENCES applications(id) ON DELETE CASCADE,
            name VARCHAR(255) NOT NULL,
            description TEXT,
            target_snapshot_id UUID,
            created_at TIMESTAMPTZ NOT NULL,
            updated_at TIMESTAMPTZ NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS devices (
            id UUID PRIMARY KEY,
            team_id UUID NOT NULL,
            name VARCHAR(255) NOT NULL,
            application_id UUID REFERENCES applications(id) ON DELETE SET NULL,
            instance_id UUID REFERENCES instances(id) ON DELETE SET NULL,
            mode VARCHAR(20) NOT NULL DEFAULT 'autonomous',
            device_group_id UUID REFERENCES device_groups(id) ON DELETE SET NULL,
            target_snapshot_id UUID,
            active_snapshot_id UUID,
            last_seen_at TIMESTAMPTZ,
            credential_secret TEXT,
            runtime JSONB,
            created_at TIMESTAMPTZ NOT NULL,
            updated_at TIMESTAMPTZ NOT NULL,
            CHECK (application_id IS NULL OR instance_id IS NULL)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS pipelines (
            id UUID PRIMARY KEY,
            application_id UUID NOT NULL REFERENCES applications(id) ON DELETE CASCADE,
            name VARCHAR(255) NOT NULL,
            created_at TIMESTAMPTZ NOT NULL,
            updated_at TIMESTAMPTZ NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Chain pointers are plain columns: relinking rewrites them in several
    // statements and a foreign key would reject the intermediate states.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS pipeline_stages (
            id UUID PRIMARY KEY,
            pipeline_id UUID NOT NULL REFERENCES pipelines(id) ON DELETE CASCADE,
            name VARCHAR(255) NOT NULL,
            action VARCHAR(50) NOT NULL,
            instance_id UUID,
            device_id UUID,
            device_group_id UUID,
            source_id UUID,
            next_stage_id UUID,
            created_at TIMESTAMPTZ NOT NULL,
            updated_at TIMESTAMPTZ NOT NULL,
            CHECK (num_nonnulls(instance_id, device_id, device_group_id) <= 1)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS snapshots (
            id UUID PRIMARY KEY,
            seq BIGSERIAL,
            name VARCHAR(255) NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            instance_id UUID REFERENCES instances(id) ON DELETE CASCADE,
            device_id UUID REFERENCES devices(id) ON DELETE CASCADE,
            user_id UUID,
            flows JSONB NOT NULL,
            settings JSONB NOT NULL,
            created_at TIMESTAMPTZ NOT NULL,
            updated_at TIMESTAMPTZ NOT NULL,
            CHECK (instance_id IS NULL OR device_id IS NULL)
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Create indexes for better query performance
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_pipeline_stages_pipeline_id ON pipeline_stages(pipeline_id)",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_snapshots_instance ON snapshots(instance_id, created_at DESC)",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_snapshots_device ON snapshots(device_id, created_at DESC)",
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_devices_group ON devices(device_group_id)")
        .execute(pool)
        .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_devices_instance ON devices(instance_id)")
        .execute(pool)
        .await?;

    tracing::info!("Database migrations completed successfully");
    Ok(())
}
