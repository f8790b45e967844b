//! Snapshot endpoints

use crate::OrchestratorClient;
use crate::error::Result;
use conveyor_core::domain::snapshot::{Snapshot, SnapshotSummary};
use conveyor_core::domain::target::SnapshotOwner;
use conveyor_core::dto::snapshot::{
    CopySnapshot, CreateSnapshot, ExportSnapshot, ExportedSnapshot, UploadSnapshot,
};
use uuid::Uuid;

impl OrchestratorClient {
    pub async fn create_snapshot(&self, req: CreateSnapshot) -> Result<Snapshot> {
        let url = self.url("/snapshot/create");
        let response = self.client.post(&url).json(&req).send().await?;

        self.handle_response(response).await
    }

    /// Snapshots of an instance or device, newest first
    pub async fn list_snapshots(&self, owner: SnapshotOwner) -> Result<Vec<SnapshotSummary>> {
        let url = self.url(&format!("/snapshot/owner/{}/{}", owner.kind(), owner.id()));
        let response = self.client.get(&url).send().await?;

        self.handle_response(response).await
    }

    pub async fn get_snapshot(&self, snapshot_id: Uuid) -> Result<Snapshot> {
        let url = self.url(&format!("/snapshot/{}", snapshot_id));
        let response = self.client.get(&url).send().await?;

        self.handle_response(response).await
    }

    pub async fn delete_snapshot(&self, snapshot_id: Uuid) -> Result<()> {
        let url = self.url(&format!("/snapshot/{}", snapshot_id));
        let response = self.client.delete(&url).send().await?;

        self.handle_empty_response(response).await
    }

    pub async fn export_snapshot(
        &self,
        snapshot_id: Uuid,
        req: ExportSnapshot,
    ) -> Result<ExportedSnapshot> {
        let url = self.url(&format!("/snapshot/{}/export", snapshot_id));
        let response = self.client.post(&url).json(&req).send().await?;

        self.handle_response(response).await
    }

    pub async fn copy_snapshot(&self, snapshot_id: Uuid, req: CopySnapshot) -> Result<Snapshot> {
        let url = self.url(&format!("/snapshot/{}/copy", snapshot_id));
        let response = self.client.post(&url).json(&req).send().await?;

        self.handle_response(response).await
    }

    pub async fn upload_snapshot(&self, req: UploadSnapshot) -> Result<Snapshot> {
        let url = self.url("/snapshot/upload");
        let response = self.client.post(&url).json(&req).send().await?;

        self.handle_response(response).await
    }
}
