//! API Module
//!
//! HTTP API layer for the orchestrator.
//! Each submodule handles endpoints for a specific domain.

pub mod error;
pub mod extract;
pub mod health;
pub mod pipeline;
pub mod snapshot;
pub mod stage;
pub mod status;

use axum::{
    Router,
    routing::{get, post, put},
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::gateway::CommandGateway;
use crate::repository::Store;
use crate::service::Deployer;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub gateway: Arc<dyn CommandGateway>,
    pub deployer: Arc<Deployer>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn Store>,
        gateway: Arc<dyn CommandGateway>,
        restart_timeout: std::time::Duration,
    ) -> Self {
        let deployer = Deployer::new(store.clone(), gateway.clone(), restart_timeout);

        Self {
            store,
            gateway,
            deployer: Arc::new(deployer),
        }
    }
}

/// Create the main API router with all endpoints
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Pipeline endpoints
        .route(
            "/application/{id}/pipelines",
            get(pipeline::list_pipelines),
        )
        .route("/pipeline/create", post(pipeline::create_pipeline))
        .route(
            "/pipeline/{id}",
            get(pipeline::get_pipeline)
                .put(pipeline::update_pipeline)
                .delete(pipeline::delete_pipeline),
        )
        // Stage endpoints
        .route("/pipeline/{id}/stages", post(stage::create_stage))
        .route(
            "/pipeline/{id}/stages/{stage_id}",
            put(stage::update_stage).delete(stage::delete_stage),
        )
        .route(
            "/pipeline/{id}/stages/{stage_id}/deploy",
            put(stage::deploy_stage),
        )
        // Snapshot endpoints
        .route("/snapshot/create", post(snapshot::create_snapshot))
        .route("/snapshot/upload", post(snapshot::upload_snapshot))
        .route(
            "/snapshot/owner/{kind}/{id}",
            get(snapshot::list_snapshots),
        )
        .route(
            "/snapshot/{id}",
            get(snapshot::get_snapshot).delete(snapshot::delete_snapshot),
        )
        .route("/snapshot/{id}/export", post(snapshot::export_snapshot))
        .route("/snapshot/{id}/copy", post(snapshot::copy_snapshot))
        // Status endpoints
        .route("/instance/{id}/status", get(status::instance_status))
        .route("/device/{id}/status", get(status::device_status))
        .route(
            "/device/{id}/active-snapshot",
            post(status::report_active_snapshot),
        )
        .route(
            "/device-group/{id}/status",
            get(status::device_group_status),
        )
        // Add state and middleware
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::RuntimeRepository;
    use crate::service::fixtures::Fixture;
    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use conveyor_core::domain::target::{SnapshotOwner, StageTarget};
    use conveyor_core::domain::pipeline::StageAction;
    use http_body_util::BodyExt;
    use serde_json::{Value, json};
    use std::time::Duration;
    use tower::ServiceExt;

    fn router(fx: &Fixture) -> Router {
        create_router(AppState::new(
            fx.store.clone(),
            fx.gateway.clone(),
            Duration::from_secs(1),
        ))
    }

    async fn send(app: Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    #[tokio::test]
    async fn test_health() {
        let fx = Fixture::new().await;
        let response = router(&fx)
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_missing_pipeline_is_not_found() {
        let fx = Fixture::new().await;
        let uri = format!("/pipeline/{}", uuid::Uuid::new_v4());

        let (status, body) = send(router(&fx), "GET", &uri, None).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["code"], "not_found");
    }

    #[tokio::test]
    async fn test_stage_validation_error_body() {
        let fx = Fixture::new().await;
        let pipeline = fx.pipeline("release").await;
        let uri = format!("/pipeline/{}/stages", pipeline.id);

        let (status, body) = send(router(&fx), "POST", &uri, Some(json!({ "name": "dev" }))).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "invalid_input");
        assert_eq!(
            body["error"],
            "instance_id, device_id or device_group_id is required"
        );
    }

    #[tokio::test]
    async fn test_deploy_returns_importing() {
        let fx = Fixture::new().await;
        let pipeline = fx.pipeline("release").await;
        let dev = fx.instance("dev").await;
        let prod = fx.instance("prod").await;
        fx.set_live(
            SnapshotOwner::Instance(dev.id),
            json!([{ "id": "flow" }]),
            json!({}),
            &[],
        )
        .await;

        let source = fx
            .stage(
                pipeline.id,
                "dev",
                StageTarget::Instance(dev.id),
                StageAction::CreateSnapshot,
            )
            .await;
        fx.stage(
            pipeline.id,
            "prod",
            StageTarget::Instance(prod.id),
            StageAction::CreateSnapshot,
        )
        .await;

        let uri = format!("/pipeline/{}/stages/{}/deploy", pipeline.id, source.id);
        let (status, body) = send(router(&fx), "PUT", &uri, None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "status": "importing" }));

        let live = fx
            .store()
            .runtime_state(SnapshotOwner::Instance(prod.id))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(live.flows, vec![json!({ "id": "flow" })]);
    }

    async fn send_raw(app: Router, method: &str, uri: &str, body: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_malformed_id_has_error_body() {
        let fx = Fixture::new().await;

        let (status, body) = send(router(&fx), "GET", "/pipeline/not-a-uuid", None).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "invalid_input");
        assert!(body["error"].as_str().is_some_and(|msg| !msg.is_empty()));
    }

    #[tokio::test]
    async fn test_malformed_body_has_error_body() {
        let fx = Fixture::new().await;
        let pipeline = fx.pipeline("release").await;
        let uri = format!("/pipeline/{}/stages", pipeline.id);

        let (status, body) = send_raw(router(&fx), "POST", &uri, "{ not json").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "invalid_input");

        // Well-formed JSON of the wrong shape
        let (status, body) = send_raw(router(&fx), "POST", &uri, r#"{ "name": 42 }"#).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "invalid_input");
    }

    #[tokio::test]
    async fn test_malformed_deploy_body_has_error_body() {
        let fx = Fixture::new().await;
        let pipeline = fx.pipeline("release").await;
        let dev = fx.instance("dev").await;
        let source = fx
            .stage(
                pipeline.id,
                "dev",
                StageTarget::Instance(dev.id),
                StageAction::CreateSnapshot,
            )
            .await;

        let uri = format!("/pipeline/{}/stages/{}/deploy", pipeline.id, source.id);
        let (status, body) =
            send_raw(router(&fx), "PUT", &uri, r#"{ "source_snapshot_id": "nope" }"#).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "invalid_input");
    }

    #[tokio::test]
    async fn test_unknown_owner_kind() {
        let fx = Fixture::new().await;
        let uri = format!("/snapshot/owner/group/{}", uuid::Uuid::new_v4());

        let (status, body) = send(router(&fx), "GET", &uri, None).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "invalid_input");
    }
}
