use axum::{extract::State, Json};
use serde::Serialize;

use crate::api::state::AppState;
use crate::infrastructure::AppConfig;

#[derive(Serialize)]
pub struct ServiceInfo {
    pub name: &'static str,
    pub version: &'static str,
    pub endpoints: Vec<&'static str>,
}

/// The embedder actually serving requests, as opposed to the configured one.
#[derive(Serialize)]
pub struct ActiveEmbedding {
    pub model: String,
    pub dimension: usize,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub embedding: ActiveEmbedding,
    pub config: AppConfig,
}

pub async fn root() -> Json<ServiceInfo> {
    Json(ServiceInfo {
        name: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        endpoints: vec![
            "GET /health",
            "POST /api/v1/store",
            "GET /api/v1/documents/{id}",
            "DELETE /api/v1/documents/{id}",
            "GET /api/v1/search",
        ],
    })
}

pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".into(),
        version: env!("CARGO_PKG_VERSION").into(),
        embedding: ActiveEmbedding {
            model: state.document_service.embedding_model().to_string(),
            dimension: state.document_service.embedding_dimension(),
        },
        config: state.config.as_ref().clone(),
    })
}
