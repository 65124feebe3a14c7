//! Integration tests for the quality-check pipeline.
//!
//! These run fully offline: the hash embedder stands in for an embedding
//! service and chat models are in-memory fakes.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use tower::ServiceExt;
use uuid::Uuid;

use standards_check::analysis::engine::AnalysisEngine;
use standards_check::analysis::CodeChecker;
use standards_check::api;
use standards_check::config::{Config, RetrievalConfig, ScoringConfig};
use standards_check::error::{AnalysisFailure, ConfigError};
use standards_check::llm::chat::ChatModel;
use standards_check::llm::embeddings::{Embedder, HashEmbedder};
use standards_check::models::{Chunk, RiskLevel, Severity};
use standards_check::search::retriever::Retriever;
use standards_check::search::vector::{IndexedVector, VectorHit, VectorSearch};
use standards_check::state::AppState;

/// Returns the same hits for every query and counts lookups.
struct FixtureIndex {
    hits: Vec<(&'static str, f32)>,
    fail: bool,
    searches: AtomicUsize,
}

impl FixtureIndex {
    fn new(hits: Vec<(&'static str, f32)>) -> Arc<Self> {
        Arc::new(Self {
            hits,
            fail: false,
            searches: AtomicUsize::new(0),
        })
    }

    fn failing() -> Arc<Self> {
        Arc::new(Self {
            hits: Vec::new(),
            fail: true,
            searches: AtomicUsize::new(0),
        })
    }
}

impl VectorSearch for FixtureIndex {
    fn search(&self, _query: &[f32], k: usize) -> anyhow::Result<Vec<VectorHit>> {
        self.searches.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            anyhow::bail!("index unavailable");
        }
        Ok(self
            .hits
            .iter()
            .take(k)
            .map(|(text, distance)| VectorHit {
                entry: IndexedVector {
                    id: Uuid::new_v4(),
                    vector: Vec::new(),
                    chunk: Chunk {
                        text: text.to_string(),
                        source_metadata: BTreeMap::new(),
                    },
                },
                distance: *distance,
            })
            .collect())
    }

    fn len(&self) -> usize {
        self.hits.len()
    }
}

struct UnreachableModel;

#[async_trait]
impl ChatModel for UnreachableModel {
    async fn complete(&self, _system: &str, _user: &str) -> Result<String, AnalysisFailure> {
        Err(AnalysisFailure::Transport("connection refused".to_string()))
    }
}

fn checker(index: Arc<FixtureIndex>, model: Option<Arc<dyn ChatModel>>) -> CodeChecker {
    let embedder: Arc<dyn Embedder> = Arc::new(HashEmbedder::new(64));
    let retriever = Retriever::new(embedder, index, &RetrievalConfig::default());
    let engine = AnalysisEngine::new(model, ScoringConfig::default(), Duration::from_secs(5), 2);
    CodeChecker::new(retriever, engine)
}

fn app(index: Arc<FixtureIndex>) -> axum::Router {
    let state = AppState::from_parts(Config::default(), checker(index.clone(), None), index);
    api::router(state)
}

async fn post_json(app: axum::Router, uri: &str, body: serde_json::Value) -> (StatusCode, serde_json::Value) {
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap())
}

// ─── Pipeline ───────────────────────────────────────────

#[tokio::test]
async fn test_eval_example_without_model() {
    let index = FixtureIndex::new(vec![("avoid using eval() on user input", 0.1)]);
    let report = checker(index, None)
        .check("eval(userInput)", "javascript")
        .await
        .unwrap();

    assert_eq!(report.risk_level, RiskLevel::High);
    assert_eq!(report.quality_score, 90);
    assert_eq!(report.findings.len(), 1);
    assert_eq!(report.findings[0].severity, Severity::High);
    assert_eq!(report.summary, "代码质量检查完成，发现 1 个规范问题");
}

#[tokio::test]
async fn test_empty_code_skips_retrieval() {
    let index = FixtureIndex::new(vec![("rule", 0.1)]);
    let report = checker(index.clone(), None).check("  \n", "javascript").await.unwrap();

    assert_eq!(report.summary, "待检查代码为空");
    assert_eq!(report.error.as_deref(), Some("待检查代码为空"));
    assert_eq!(report.risk_level, RiskLevel::Unknown);
    assert_eq!(report.quality_score, 0);
    assert_eq!(index.searches.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_nothing_within_threshold_is_safe() {
    let index = FixtureIndex::new(vec![("unrelated rule", 0.9), ("another", 1.4)]);
    let report = checker(index, None).check("let x = 1;", "javascript").await.unwrap();

    assert_eq!(report.risk_level, RiskLevel::Safe);
    assert_eq!(report.quality_score, 100);
    assert!(report.findings.is_empty());
    assert!(report.error.is_none());
}

#[tokio::test]
async fn test_transport_error_still_reports_findings() {
    let index = FixtureIndex::new(vec![("use const", 0.25), ("name things", 0.55)]);
    let report = checker(index, Some(Arc::new(UnreachableModel)))
        .check("var a = 1", "javascript")
        .await
        .unwrap();

    assert_eq!(report.findings.len(), 2);
    assert_eq!(report.risk_level, RiskLevel::High);
    assert_eq!(report.findings[1].severity, Severity::Low);
    assert!(report.error.unwrap().contains("connection refused"));
}

#[tokio::test]
async fn test_comment_only_code_still_retrieves() {
    let index = FixtureIndex::new(vec![("document public functions", 0.2)]);
    let report = checker(index.clone(), None)
        .check("// explain the retry policy here", "javascript")
        .await
        .unwrap();
    assert_eq!(index.searches.load(Ordering::SeqCst), 1);
    assert_eq!(report.findings.len(), 1);
}

#[tokio::test]
async fn test_index_failure_propagates() {
    let result = checker(FixtureIndex::failing(), None)
        .check("eval(x)", "javascript")
        .await;
    assert!(result.is_err());
}

// ─── HTTP ───────────────────────────────────────────────

#[tokio::test]
async fn test_check_endpoint_returns_envelope() {
    let index = FixtureIndex::new(vec![("avoid using eval() on user input", 0.1)]);
    let (status, body) = post_json(
        app(index),
        "/api/check/quality",
        serde_json::json!({"code": "eval(userInput)"}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let result = &body["audit_result"];
    assert_eq!(result["risk_level"], "HIGH");
    assert_eq!(result["security_score"], 90);
    assert_eq!(result["vulnerabilities"][0]["severity"], "HIGH");
}

#[tokio::test]
async fn test_legacy_audit_route_and_empty_code() {
    let (status, body) = post_json(
        app(FixtureIndex::new(Vec::new())),
        "/api/audit/code",
        serde_json::json!({"code": "", "language": "javascript"}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["audit_result"]["risk_level"], "UNKNOWN");
    assert_eq!(body["audit_result"]["security_score"], 0);
    assert_eq!(body["audit_result"]["summary"], "待检查代码为空");
}

#[tokio::test]
async fn test_internal_failure_is_500_with_report() {
    let (status, body) = post_json(
        app(FixtureIndex::failing()),
        "/api/check/quality",
        serde_json::json!({"code": "eval(x)"}),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["audit_result"]["risk_level"], "UNKNOWN");
    assert_eq!(body["audit_result"]["summary"], "质量检查失败");
    assert!(body["audit_result"]["error"]
        .as_str()
        .unwrap()
        .contains("index unavailable"));
}

// ─── Startup ────────────────────────────────────────────

fn offline_config(dir: &std::path::Path) -> Config {
    let mut config = Config::default();
    config.data_dir = dir.join("data");
    config.corpus_path = dir.join("standards.md");
    config.embedding.provider = "hash".to_string();
    config.embedding.dim = 128;
    config.chat.api_key = None;
    config.retrieval.score_threshold = 4.0;
    config
}

#[tokio::test]
async fn test_startup_builds_index_and_serves_health() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("standards.md"),
        "## No eval\nNever call eval() on user input.\n\n## Const\nPrefer const over let when a binding is never reassigned.\n",
    )
    .unwrap();

    let config = offline_config(dir.path());
    let state = AppState::new(config.clone()).await.unwrap();
    assert!(config.index_dir().join("index.json").exists());
    assert!(!state.checker.engine().llm_enabled());

    let response = api::router(state.clone())
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let health: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(health["status"], "healthy");
    assert_eq!(health["vector_db"], "loaded");
    assert_eq!(health["llm_enabled"], false);
    assert!(health["rules_count"].as_u64().unwrap() >= 1);

    let report = state
        .checker
        .check("const data = eval(userInput);", "javascript")
        .await
        .unwrap();
    assert!(!report.findings.is_empty());
    assert!(report.quality_score <= 100);
}

#[tokio::test]
async fn test_startup_without_corpus_is_config_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = AppState::new(offline_config(dir.path())).await.err().unwrap();
    assert!(matches!(
        err.downcast_ref::<ConfigError>(),
        Some(ConfigError::CorpusMissing(_))
    ));
}
