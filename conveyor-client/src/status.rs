//! Status endpoints

use crate::OrchestratorClient;
use crate::error::Result;
use conveyor_core::dto::status::{
    DeviceGroupStatus, DeviceStatus, InstanceStatus, ReportActiveSnapshot,
};
use uuid::Uuid;

impl OrchestratorClient {
    pub async fn instance_status(&self, instance_id: Uuid) -> Result<InstanceStatus> {
        let url = self.url(&format!("/instance/{}/status", instance_id));
        let response = self.client.get(&url).send().await?;

        self.handle_response(response).await
    }

    pub async fn device_status(&self, device_id: Uuid) -> Result<DeviceStatus> {
        let url = self.url(&format!("/device/{}/status", device_id));
        let response = self.client.get(&url).send().await?;

        self.handle_response(response).await
    }

    /// Confirm the snapshot a device is running
    pub async fn report_active_snapshot(
        &self,
        device_id: Uuid,
        snapshot_id: Option<Uuid>,
    ) -> Result<DeviceStatus> {
        let url = self.url(&format!("/device/{}/active-snapshot", device_id));
        let response = self
            .client
            .post(&url)
            .json(&ReportActiveSnapshot { snapshot_id })
            .send()
            .await?;

        self.handle_response(response).await
    }

    pub async fn device_group_status(&self, group_id: Uuid) -> Result<DeviceGroupStatus> {
        let url = self.url(&format!("/device-group/{}/status", group_id));
        let response = self.client.get(&url).send().await?;

        self.handle_response(response).await
    }
}
