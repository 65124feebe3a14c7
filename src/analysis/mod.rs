//! Retrieval-augmented analysis: from raw code to an [`AnalysisReport`].

pub mod engine;
pub mod parse;
pub mod prompt;
pub mod verdict;

use anyhow::Result;

use crate::models::AnalysisReport;
use crate::search::query::enhance_query;
use crate::search::retriever::Retriever;
use engine::AnalysisEngine;

/// The whole pipeline behind one request.
pub struct CodeChecker {
    retriever: Retriever,
    engine: AnalysisEngine,
}

impl CodeChecker {
    pub fn new(retriever: Retriever, engine: AnalysisEngine) -> Self {
        Self { retriever, engine }
    }

    pub fn engine(&self) -> &AnalysisEngine {
        &self.engine
    }

    /// Only retrieval can fail here; analysis always yields a report.
    pub async fn check(&self, code: &str, language: &str) -> Result<AnalysisReport> {
        if code.trim().is_empty() {
            return Ok(verdict::empty_code_report());
        }

        let mut query = enhance_query(code);
        if query.is_empty() {
            // Comment-only input still deserves a lookup
            query = code.trim().to_string();
        }

        let candidates = self.retriever.retrieve(&query).await?;
        let report = self.engine.analyze(code, language, &candidates).await;

        tracing::info!(
            "Checked {} chars of {language}: {} candidates, risk {:?}, score {}",
            code.chars().count(),
            candidates.len(),
            report.risk_level,
            report.quality_score
        );
        Ok(report)
    }
}
