use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;

use crate::analysis::verdict::failure_report;
use crate::models::{CheckRequest, CheckResponse};
use crate::state::AppState;

/// POST /api/check/quality (and the legacy /api/audit/code):
///   1. Empty code short-circuits to an UNKNOWN report
///   2. Enhanced query → thresholded retrieval
///   3. Model analysis, or distance banding when it is unavailable
///
/// Every completed analysis is a 200; only an internal failure (e.g. the
/// embedding service is down) is a 500, still carrying a report.
pub async fn check_quality(
    State(state): State<AppState>,
    Json(req): Json<CheckRequest>,
) -> Result<Json<CheckResponse>, (StatusCode, Json<CheckResponse>)> {
    match state.checker.check(&req.code, &req.language).await {
        Ok(report) => Ok(Json(CheckResponse {
            audit_result: report,
        })),
        Err(e) => {
            tracing::error!("Quality check failed: {e:#}");
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(CheckResponse {
                    audit_result: failure_report(format!("{e:#}")),
                }),
            ))
        }
    }
}
