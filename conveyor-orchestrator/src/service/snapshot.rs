//! Snapshot Store
//!
//! Creates, copies, exports and imports snapshots. Credentials are always
//! stored encrypted under the owning target's own secret, so every move
//! between owners or out of the system re-encrypts them.

use conveyor_core::credentials::{self, CipherError, CredentialKey, EncryptedBlob, Sealed};
use conveyor_core::domain::instance::merge_env;
use conveyor_core::domain::snapshot::{Snapshot, SnapshotFlows, SnapshotSettings, SnapshotSummary};
use conveyor_core::domain::target::SnapshotOwner;
use conveyor_core::dto::command::Command;
use conveyor_core::dto::snapshot::{
    CopySnapshot, CreateSnapshot, ExportSnapshot, ExportedSnapshot, UploadSnapshot,
};
use serde_json::Value;
use uuid::Uuid;

use crate::gateway::{CommandGateway, CommandTarget, Delivery};
use crate::repository::{RuntimeRepository, SnapshotRepository, Store, TargetRepository};
use crate::service::error::{Result, ServiceError};
use crate::service::target;

/// Create a snapshot of a target.
///
/// Flows and credentials not supplied are captured from the live runtime.
pub async fn create_snapshot(store: &dyn Store, req: CreateSnapshot) -> Result<Snapshot> {
    validate_name(&req.name)?;
    owner_team(store, req.owner).await?;

    let live = store.runtime_state(req.owner).await?.unwrap_or_default();

    let credentials = match req.credentials {
        Some(plaintext) => encrypt_for(store, req.owner, &plaintext).await?,
        None => live.credentials.clone(),
    };

    let overrides = req.settings.unwrap_or_default();
    let mut modules = live.modules.clone();
    modules.extend(overrides.modules.unwrap_or_default());

    let env = if req.include_env {
        overrides.env.unwrap_or_else(|| live.env_map())
    } else {
        Default::default()
    };

    let now = chrono::Utc::now();
    let snapshot = Snapshot {
        id: Uuid::new_v4(),
        name: req.name,
        description: req.description,
        owner: Some(req.owner),
        user_id: req.user_id,
        flows: SnapshotFlows {
            flows: req.flows.unwrap_or(live.flows),
            credentials,
        },
        settings: SnapshotSettings {
            settings: overrides.settings.unwrap_or(live.settings),
            env,
            modules,
        },
        created_at: now,
        updated_at: now,
    };

    store.insert_snapshot(&snapshot).await?;

    tracing::info!(
        "Snapshot created: {} ({}) for {}",
        snapshot.name,
        snapshot.id,
        req.owner
    );

    Ok(snapshot)
}

pub async fn get_snapshot(store: &dyn Store, id: Uuid) -> Result<Snapshot> {
    store
        .find_snapshot(id)
        .await?
        .ok_or_else(|| ServiceError::not_found("Snapshot", id))
}

/// Snapshots of a target, newest first
pub async fn list_snapshots(store: &dyn Store, owner: SnapshotOwner) -> Result<Vec<SnapshotSummary>> {
    owner_team(store, owner).await?;

    let snapshots = store.list_snapshots(owner).await?;
    Ok(snapshots.iter().map(SnapshotSummary::from).collect())
}

/// Delete a snapshot; target and active pointers referencing it are cleared
pub async fn delete_snapshot(store: &dyn Store, id: Uuid) -> Result<()> {
    if !store.delete_snapshot(id).await? {
        return Err(ServiceError::not_found("Snapshot", id));
    }

    tracing::info!("Snapshot deleted: {}", id);
    Ok(())
}

/// Export a snapshot in portable form
pub async fn export_snapshot(
    store: &dyn Store,
    id: Uuid,
    req: ExportSnapshot,
) -> Result<ExportedSnapshot> {
    let snapshot = get_snapshot(store, id).await?;
    let components = req.components.normalized();

    let mut exported = ExportedSnapshot::header(&snapshot);

    if components.flows {
        exported.flows.flows = snapshot.flows.flows.clone();
    }

    if components.credentials {
        let secret = required_secret(req.credential_secret.as_deref(), "export")?;

        if let Some(blob) = &snapshot.flows.credentials {
            let key = owned_key(store, &snapshot).await?;
            exported.flows.credentials = Some(credentials::reencrypt(
                Sealed::Blob { key: &key, blob },
                &CredentialKey::from_secret(secret),
            )?);
        }
    }

    exported.settings = SnapshotSettings {
        settings: snapshot.settings.settings.clone(),
        env: components.env_vars.apply(&snapshot.settings.env),
        modules: snapshot.settings.modules.clone(),
    };

    tracing::info!("Snapshot exported: {}", id);
    Ok(exported)
}

/// Import an exported snapshot into a target
pub async fn upload_snapshot(store: &dyn Store, req: UploadSnapshot) -> Result<Snapshot> {
    validate_name(&req.snapshot.name)?;
    owner_team(store, req.owner).await?;

    let components = req.components.normalized();
    let incoming = req.snapshot;

    let flows = if components.flows {
        incoming.flows.flows
    } else {
        Vec::new()
    };

    let credentials = match (&incoming.flows.credentials, components.credentials) {
        (Some(blob), true) => {
            let secret = required_secret(req.credential_secret.as_deref(), "upload")?;
            let key = CredentialKey::from_secret(secret);
            Some(credentials::reencrypt(
                Sealed::Blob { key: &key, blob },
                &credential_key(store, req.owner).await?,
            )?)
        }
        _ => None,
    };

    let now = chrono::Utc::now();
    let snapshot = Snapshot {
        id: Uuid::new_v4(),
        name: incoming.name,
        description: incoming.description,
        owner: Some(req.owner),
        user_id: req.user_id,
        flows: SnapshotFlows { flows, credentials },
        settings: SnapshotSettings {
            settings: incoming.settings.settings,
            env: components.env_vars.apply(&incoming.settings.env),
            modules: incoming.settings.modules,
        },
        created_at: now,
        updated_at: now,
    };

    store.insert_snapshot(&snapshot).await?;

    tracing::info!(
        "Snapshot uploaded: {} ({}) for {}",
        snapshot.name,
        snapshot.id,
        req.owner
    );

    Ok(snapshot)
}

/// Copy a snapshot to another target
pub async fn copy_snapshot(
    store: &dyn Store,
    gateway: &dyn CommandGateway,
    id: Uuid,
    req: CopySnapshot,
) -> Result<Snapshot> {
    let source = get_snapshot(store, id).await?;

    let options = CopyOptions {
        name: source.name.clone(),
        description: source.description.clone(),
        import_snapshot: req.import_snapshot,
        set_as_target: req.set_as_target,
        decrypt_secret: req.decrypt_and_reencrypt_credentials_secret,
    };

    copy_to(store, gateway, &source, req.target, options).await
}

/// How [`copy_to`] materialises the copy
#[derive(Debug, Clone)]
pub(crate) struct CopyOptions {
    pub name: String,
    pub description: String,
    pub import_snapshot: bool,
    pub set_as_target: bool,
    pub decrypt_secret: Option<String>,
}

pub(crate) async fn copy_to(
    store: &dyn Store,
    gateway: &dyn CommandGateway,
    source: &Snapshot,
    destination: SnapshotOwner,
    options: CopyOptions,
) -> Result<Snapshot> {
    validate_name(&options.name)?;
    owner_team(store, destination).await?;

    let credentials = match &source.flows.credentials {
        Some(blob) => {
            let key = match options.decrypt_secret.as_deref() {
                Some(secret) => CredentialKey::from_secret(secret),
                None => owned_key(store, source).await?,
            };
            Some(credentials::reencrypt(
                Sealed::Blob { key: &key, blob },
                &credential_key(store, destination).await?,
            )?)
        }
        None => None,
    };

    let now = chrono::Utc::now();
    let copy = Snapshot {
        id: Uuid::new_v4(),
        name: options.name,
        description: options.description,
        owner: Some(destination),
        user_id: source.user_id,
        flows: SnapshotFlows {
            flows: source.flows.flows.clone(),
            credentials,
        },
        settings: source.settings.clone(),
        created_at: now,
        updated_at: now,
    };

    store.insert_snapshot(&copy).await?;

    tracing::info!(
        "Snapshot {} copied to {} as {}",
        source.id,
        destination,
        copy.id
    );

    if options.import_snapshot {
        import_into_runtime(store, destination, &copy).await?;
    }

    if options.set_as_target {
        set_target_snapshot(store, gateway, destination, copy.id).await?;
    }

    Ok(copy)
}

/// Write a snapshot into a target's live runtime.
///
/// Environment variables are merged: existing names keep their values.
async fn import_into_runtime(
    store: &dyn Store,
    owner: SnapshotOwner,
    snapshot: &Snapshot,
) -> Result<()> {
    let mut state = store.runtime_state(owner).await?.unwrap_or_default();

    state.flows = snapshot.flows.flows.clone();
    state.credentials = snapshot.flows.credentials.clone();
    state.settings = snapshot.settings.settings.clone();
    state.modules = snapshot.settings.modules.clone();
    state.env = merge_env(&state.env, &snapshot.settings.env);

    store.store_runtime_state(owner, &state).await?;

    tracing::debug!("Snapshot {} imported into {}", snapshot.id, owner);
    Ok(())
}

/// Point a target at a snapshot and tell it so.
///
/// For an instance, the devices it owns follow the same target.
pub(crate) async fn set_target_snapshot(
    store: &dyn Store,
    gateway: &dyn CommandGateway,
    owner: SnapshotOwner,
    snapshot_id: Uuid,
) -> Result<()> {
    let devices = match owner {
        SnapshotOwner::Instance(id) => {
            store.set_instance_target_snapshot(id, Some(snapshot_id)).await?;
            store.list_instance_devices(id).await?
        }
        SnapshotOwner::Device(id) => vec![target::find_device(store, id).await?],
    };

    for device in devices {
        store
            .set_device_target_snapshot(device.id, Some(snapshot_id))
            .await?;
        notify_device(gateway, device.team_id, device.id, snapshot_id).await;
    }

    Ok(())
}

/// Tell a device to fetch its target snapshot. An offline device catches up later.
pub(crate) async fn notify_device(
    gateway: &dyn CommandGateway,
    team_id: Uuid,
    device_id: Uuid,
    snapshot_id: Uuid,
) -> Delivery {
    let delivery = gateway
        .send_command(
            team_id,
            CommandTarget::Device(device_id),
            Command::update(Some(snapshot_id)),
        )
        .await;

    if delivery == Delivery::Offline {
        tracing::warn!(
            "Device {} is offline, it will pick up snapshot {} when it reconnects",
            device_id,
            snapshot_id
        );
    }

    delivery
}

/// Team of a snapshot owner; fails with `not_found` when the owner is missing
pub(crate) async fn owner_team(store: &dyn Store, owner: SnapshotOwner) -> Result<Uuid> {
    match owner {
        SnapshotOwner::Instance(id) => {
            let instance = target::find_instance(store, id).await?;
            let application = store
                .find_application(instance.application_id)
                .await?
                .ok_or_else(|| ServiceError::not_found("Application", instance.application_id))?;
            Ok(application.team_id)
        }
        SnapshotOwner::Device(id) => Ok(target::find_device(store, id).await?.team_id),
    }
}

/// Key of a target, creating its secret on first use
pub(crate) async fn credential_key(store: &dyn Store, owner: SnapshotOwner) -> Result<CredentialKey> {
    let secret = match store.credential_secret(owner).await? {
        Some(secret) => secret,
        None => {
            let secret = credentials::generate_secret();
            store.store_credential_secret(owner, &secret).await?;
            tracing::debug!("Credential secret created for {}", owner);
            secret
        }
    };

    Ok(CredentialKey::from_secret(&secret))
}

async fn encrypt_for(
    store: &dyn Store,
    owner: SnapshotOwner,
    plaintext: &Value,
) -> Result<Option<EncryptedBlob>> {
    let Value::Object(map) = plaintext else {
        return Err(ServiceError::InvalidInput(
            "credentials must be a JSON object".to_string(),
        ));
    };

    if map.is_empty() {
        return Ok(None);
    }

    let key = credential_key(store, owner).await?;
    Ok(Some(credentials::reencrypt(Sealed::Plaintext(plaintext), &key)?))
}

/// Key of the secret the snapshot's credentials are stored under
async fn owned_key(store: &dyn Store, snapshot: &Snapshot) -> Result<CredentialKey> {
    let secret = match snapshot.owner {
        Some(owner) => store.credential_secret(owner).await?,
        None => None,
    };

    // Encrypted credentials without a secret to read them can never be decrypted
    let secret = secret.ok_or(CipherError::CorruptCredentials)?;
    Ok(CredentialKey::from_secret(&secret))
}

fn required_secret<'a>(secret: Option<&'a str>, operation: &str) -> Result<&'a str> {
    match secret {
        Some(secret) if !secret.is_empty() => Ok(secret),
        _ => Err(ServiceError::InvalidInput(format!(
            "credential_secret is required to {} credentials",
            operation
        ))),
    }
}

fn validate_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(ServiceError::InvalidInput(
            "Snapshot name cannot be empty".to_string(),
        ));
    }

    if name.len() > 255 {
        return Err(ServiceError::InvalidInput(
            "Snapshot name is too long (max 255 characters)".to_string(),
        ));
    }

    Ok(())
}
