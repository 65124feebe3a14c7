use axum::extract::State;
use axum::Json;

use crate::models::HealthResponse;
use crate::state::AppState;

/// GET /health
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: "standards-check".to_string(),
        vector_db: if state.index.is_empty() { "empty" } else { "loaded" }.to_string(),
        rules_count: state.index.len(),
        llm_enabled: state.checker.engine().llm_enabled(),
    })
}
