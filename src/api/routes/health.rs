use axum::{extract::State, Json};
use serde::Serialize;

use crate::api::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[derive(Serialize)]
pub struct ReadinessResponse {
    pub status: String,
    pub model: String,
    pub search: String,
}

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".into(),
        version: env!("CARGO_PKG_VERSION").into(),
    })
}

/// Reports which collaborators this instance will call, without calling them.
pub async fn readiness_check(State(state): State<AppState>) -> Json<ReadinessResponse> {
    let search = if state.orchestrator.search_enabled() {
        format!("{:?}", state.config.config.search.provider).to_lowercase()
    } else {
        "disabled".to_string()
    };

    Json(ReadinessResponse {
        status: "ready".into(),
        model: state.config.config.llm.model.clone(),
        search,
    })
}
