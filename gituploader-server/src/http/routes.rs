//! HTTP route definitions.

use axum::{
    extract::{rejection::JsonRejection, DefaultBodyLimit, State},
    middleware,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use jiff::Timestamp;
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, warn};

use super::middleware::{check_api_key, create_cors_layer, create_trace_layer};
use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::upload::{Publisher, UploadRequest, UploadResponse};

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub publisher: Arc<Publisher>,
}

impl AppState {
    pub fn new(config: Arc<ServerConfig>, publisher: Arc<Publisher>) -> Self {
        Self { config, publisher }
    }
}

/// Health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: Timestamp,
}

/// Create the main router with all routes.
pub fn create_router(state: AppState) -> Router {
    let upload_route =
        post(upload).layer(middleware::from_fn_with_state(state.clone(), check_api_key));

    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/api/upload", upload_route)
        .layer(DefaultBodyLimit::max(state.config.body_limit))
        .layer(create_cors_layer())
        .layer(create_trace_layer())
        .with_state(state)
}

/// Root endpoint.
async fn root() -> impl IntoResponse {
    Json(serde_json::json!({
        "name": "GitUploader Server",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Health check endpoint.
async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "OK",
        timestamp: Timestamp::now(),
    })
}

/// Publish the uploaded files to the requested repository.
async fn upload(
    State(state): State<AppState>,
    payload: Result<Json<UploadRequest>, JsonRejection>,
) -> Result<Json<UploadResponse>, ServerError> {
    let Json(request) = payload.map_err(|rejection| {
        warn!(error = %rejection.body_text(), "Rejected upload body");
        ServerError::validation(rejection.body_text())
    })?;

    match state.publisher.publish(request).await {
        Ok(response) => {
            info!(files = response.files_uploaded, "{}", response.message);
            Ok(Json(response))
        }
        Err(err @ ServerError::Validation(_)) => {
            warn!(error = %err, "Upload rejected");
            Err(err)
        }
        Err(err) => {
            error!(error = %err, "Upload failed");
            Err(err)
        }
    }
}
