//! Stage and deploy endpoints

use crate::OrchestratorClient;
use crate::error::Result;
use conveyor_core::dto::pipeline::{
    CreateStage, DeployRequest, DeployResponse, StageView, UpdateStage,
};
use uuid::Uuid;

impl OrchestratorClient {
    /// Append a stage, or insert it after `req.source`
    pub async fn create_stage(&self, pipeline_id: Uuid, req: CreateStage) -> Result<StageView> {
        let url = self.url(&format!("/pipeline/{}/stages", pipeline_id));
        let response = self.client.post(&url).json(&req).send().await?;

        self.handle_response(response).await
    }

    pub async fn update_stage(
        &self,
        pipeline_id: Uuid,
        stage_id: Uuid,
        req: UpdateStage,
    ) -> Result<StageView> {
        let url = self.url(&format!("/pipeline/{}/stages/{}", pipeline_id, stage_id));
        let response = self.client.put(&url).json(&req).send().await?;

        self.handle_response(response).await
    }

    pub async fn delete_stage(&self, pipeline_id: Uuid, stage_id: Uuid) -> Result<()> {
        let url = self.url(&format!("/pipeline/{}/stages/{}", pipeline_id, stage_id));
        let response = self.client.delete(&url).send().await?;

        self.handle_empty_response(response).await
    }

    /// Deploy from a stage to the stage after it
    ///
    /// Returns as soon as the deploy is dispatched; poll the status endpoints
    /// to see it land.
    pub async fn deploy_stage(
        &self,
        pipeline_id: Uuid,
        stage_id: Uuid,
        req: DeployRequest,
    ) -> Result<DeployResponse> {
        let url = self.url(&format!(
            "/pipeline/{}/stages/{}/deploy",
            pipeline_id, stage_id
        ));
        let response = self.client.put(&url).json(&req).send().await?;

        self.handle_response(response).await
    }
}
