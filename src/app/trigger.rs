//! HTTP trigger surface.
//!
//! `trigger` is the request handler proper: it ignores the request, runs the
//! remote pipeline, and answers with a fixed message. `serve` mounts it on an
//! axum router; the pipeline is blocking, so each request runs it on the
//! blocking pool.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use tracing::{error, info};

use crate::app::pipeline::run_remote_pipeline;
use crate::config::PipelineConfig;
use crate::error::AppError;
use crate::remote::{GcsClient, ObjectStore};

pub const TRIGGER_MESSAGE: &str = "Triggered Dataproc pipeline";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerResponse {
    pub status: u16,
    pub body: String,
}

/// Run the remote pipeline and report success.
pub fn trigger(config: &PipelineConfig, store: &dyn ObjectStore) -> Result<TriggerResponse, AppError> {
    run_remote_pipeline(config, store)?;
    Ok(TriggerResponse {
        status: 200,
        body: TRIGGER_MESSAGE.to_string(),
    })
}

/// Router with `POST /`, `POST /trigger` and `GET /health`.
pub fn router(config: PipelineConfig) -> Router {
    Router::new()
        .route("/", post(handle_trigger))
        .route("/trigger", post(handle_trigger))
        .route("/health", get(health))
        .with_state(Arc::new(config))
}

/// Serve the trigger until Ctrl-C.
pub fn serve(config: PipelineConfig, addr: SocketAddr) -> Result<(), AppError> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| AppError::io(format!("Failed to start async runtime: {e}")))?;

    runtime.block_on(async move {
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| AppError::io(format!("Failed to bind {addr}: {e}")))?;
        info!("Listening on {addr}");

        axum::serve(listener, router(config))
            .with_graceful_shutdown(async {
                tokio::signal::ctrl_c().await.ok();
            })
            .await
            .map_err(|e| AppError::io(format!("Server error: {e}")))
    })
}

async fn handle_trigger(State(config): State<Arc<PipelineConfig>>) -> (StatusCode, String) {
    // The blocking HTTP client must be built and dropped off the async runtime.
    let joined = tokio::task::spawn_blocking(move || {
        config.remote.require_buckets()?;
        let store = GcsClient::from_config(&config.remote)?;
        trigger(&config, &store)
    })
    .await;

    match joined {
        Ok(Ok(resp)) => (
            StatusCode::from_u16(resp.status).unwrap_or(StatusCode::OK),
            resp.body,
        ),
        Ok(Err(err)) => {
            error!(exit_code = err.exit_code(), "Trigger failed: {err}");
            (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
        }
        Err(join_err) => {
            error!("Trigger task panicked: {join_err}");
            (StatusCode::INTERNAL_SERVER_ERROR, "Pipeline task failed".to_string())
        }
    }
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "alive",
        "version": env!("CARGO_PKG_VERSION")
    }))
}
