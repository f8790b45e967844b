//! Pipeline-related API endpoints

use crate::OrchestratorClient;
use crate::error::Result;
use conveyor_core::dto::pipeline::{CreatePipeline, PipelineView, UpdatePipeline};
use uuid::Uuid;

impl OrchestratorClient {
    // =============================================================================
    // Pipeline Management
    // =============================================================================

    /// Create a new, empty pipeline
    pub async fn create_pipeline(&self, req: CreatePipeline) -> Result<PipelineView> {
        let url = self.url("/pipeline/create");
        let response = self.client.post(&url).json(&req).send().await?;

        self.handle_response(response).await
    }

    /// List the pipelines of an application
    pub async fn list_pipelines(&self, application_id: Uuid) -> Result<Vec<PipelineView>> {
        let url = self.url(&format!("/application/{}/pipelines", application_id));
        let response = self.client.get(&url).send().await?;

        self.handle_response(response).await
    }

    /// Get a pipeline with its stages in chain order
    pub async fn get_pipeline(&self, pipeline_id: Uuid) -> Result<PipelineView> {
        let url = self.url(&format!("/pipeline/{}", pipeline_id));
        let response = self.client.get(&url).send().await?;

        self.handle_response(response).await
    }

    /// Rename a pipeline
    pub async fn update_pipeline(
        &self,
        pipeline_id: Uuid,
        req: UpdatePipeline,
    ) -> Result<PipelineView> {
        let url = self.url(&format!("/pipeline/{}", pipeline_id));
        let response = self.client.put(&url).json(&req).send().await?;

        self.handle_response(response).await
    }

    /// Delete a pipeline and its stages
    pub async fn delete_pipeline(&self, pipeline_id: Uuid) -> Result<()> {
        let url = self.url(&format!("/pipeline/{}", pipeline_id));
        let response = self.client.delete(&url).send().await?;

        self.handle_empty_response(response).await
    }
}
