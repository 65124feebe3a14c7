//! HTTP surface.

pub mod check;
pub mod health;

use axum::routing::{get, post};
use axum::Router;

use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/api/check/quality", post(check::check_quality))
        .route("/api/audit/code", post(check::check_quality))
        .with_state(state)
}
