use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;

use crate::analysis::parse::parse_model_output;
use crate::analysis::prompt::{build_user_prompt, truncate_chars, SYSTEM_PROMPT};
use crate::analysis::verdict::{compose, no_candidates_report};
use crate::config::{ChatConfig, ScoringConfig};
use crate::error::AnalysisFailure;
use crate::llm::chat::ChatModel;
use crate::models::{
    scalar_text, AnalysisReport, Confidence, Finding, ModelAnalysis, ModelIssue,
    RetrievedCandidate, Severity,
};

const DEFAULT_CATEGORY: &str = "代码规范";
const DEFAULT_RECOMMENDATION: &str = "请参考规范文档进行修复";
const MODEL_IMPACT: &str = "代码可读性、可维护性或安全性问题";
const FALLBACK_IMPACT: &str = "代码可读性和可维护性降低，可能引入潜在bug";
const FALLBACK_DESCRIPTION_CHARS: usize = 200;
const FALLBACK_SNIPPET_CHARS: usize = 500;
const REFERENCES: [&str; 2] = [
    "https://eslint.org/docs/rules/",
    "https://vuejs.org/style-guide/",
];

/// Turns retrieved standards into a report, with the model when one is
/// configured and by distance banding otherwise.
pub struct AnalysisEngine {
    model: Option<Arc<dyn ChatModel>>,
    scoring: ScoringConfig,
    timeout: Duration,
    permits: Arc<Semaphore>,
}

impl AnalysisEngine {
    pub fn new(
        model: Option<Arc<dyn ChatModel>>,
        scoring: ScoringConfig,
        timeout: Duration,
        max_concurrent: usize,
    ) -> Self {
        Self {
            model,
            scoring,
            timeout,
            permits: Arc::new(Semaphore::new(max_concurrent.max(1))),
        }
    }

    pub fn from_config(
        model: Option<Arc<dyn ChatModel>>,
        chat: &ChatConfig,
        scoring: ScoringConfig,
    ) -> Self {
        Self::new(
            model,
            scoring,
            Duration::from_secs(chat.timeout_secs),
            chat.max_concurrent,
        )
    }

    pub fn llm_enabled(&self) -> bool {
        self.model.is_some()
    }

    /// Never fails: model problems are recorded in `error` and the report
    /// falls back to distance-banded findings.
    pub async fn analyze(
        &self,
        code: &str,
        language: &str,
        candidates: &[RetrievedCandidate],
    ) -> AnalysisReport {
        if candidates.is_empty() {
            return no_candidates_report();
        }

        let Some(model) = &self.model else {
            return compose(
                findings_from_distances(candidates, &self.scoring),
                candidates,
                None,
                None,
                None,
                &self.scoring,
            );
        };

        match self.invoke_model(model.as_ref(), code, language, candidates).await {
            Ok(analysis) => {
                let findings = findings_from_model(&analysis);
                if findings.is_empty() {
                    tracing::info!("Model reported no issues; using distance banding");
                    compose(
                        findings_from_distances(candidates, &self.scoring),
                        candidates,
                        Some(analysis),
                        None,
                        None,
                        &self.scoring,
                    )
                } else {
                    compose(findings, candidates, Some(analysis), None, None, &self.scoring)
                }
            }
            Err(failure) => {
                tracing::warn!("Model analysis failed, falling back to distance banding: {failure}");
                let raw = failure.raw_output().map(str::to_string);
                compose(
                    findings_from_distances(candidates, &self.scoring),
                    candidates,
                    None,
                    raw,
                    Some(failure.to_string()),
                    &self.scoring,
                )
            }
        }
    }

    /// Prompt, call and parse under one deadline; waiting for a permit
    /// counts against it.
    async fn invoke_model(
        &self,
        model: &dyn ChatModel,
        code: &str,
        language: &str,
        candidates: &[RetrievedCandidate],
    ) -> Result<ModelAnalysis, AnalysisFailure> {
        let user_prompt = build_user_prompt(code, language, candidates);

        let call = async {
            let _permit = self
                .permits
                .acquire()
                .await
                .map_err(|_| AnalysisFailure::Transport("model call limiter closed".to_string()))?;
            let content = model.complete(SYSTEM_PROMPT, &user_prompt).await?;
            parse_model_output(&content).into_result()
        };

        tokio::time::timeout(self.timeout, call)
            .await
            .map_err(|_| AnalysisFailure::Timeout(self.timeout))?
    }
}

// ─── Findings ───────────────────────────────────────────

/// One finding per model issue, in the order the model listed them.
pub fn findings_from_model(analysis: &ModelAnalysis) -> Vec<Finding> {
    analysis
        .issues
        .iter()
        .enumerate()
        .map(|(i, issue)| finding_from_issue(i, issue, analysis))
        .collect()
}

fn finding_from_issue(index: usize, issue: &ModelIssue, analysis: &ModelAnalysis) -> Finding {
    let id = scalar_text(issue.rule_id.as_ref()).unwrap_or_else(|| issue_id(index));
    let matched = analysis
        .suggestions
        .iter()
        .find(|s| scalar_text(s.issue_id.as_ref()).as_deref() == Some(id.as_str()));

    let recommendation = non_blank(issue.suggestion.as_deref())
        .or_else(|| matched.and_then(|s| non_blank(s.suggestion.as_deref())))
        .unwrap_or_else(|| DEFAULT_RECOMMENDATION.to_string());
    let impact = matched
        .and_then(|s| non_blank(s.reason.as_deref()))
        .unwrap_or_else(|| MODEL_IMPACT.to_string());

    Finding {
        category: non_blank(issue.issue_type.as_deref())
            .unwrap_or_else(|| DEFAULT_CATEGORY.to_string()),
        severity: issue
            .severity
            .as_deref()
            .and_then(Severity::parse_label)
            .unwrap_or(Severity::Medium),
        confidence: Confidence::High,
        location: scalar_text(issue.line_number.as_ref()).map(|line| format!("Line {line}")),
        description: issue.description.clone().unwrap_or_default(),
        code_snippet: non_blank(issue.code_snippet.as_deref()),
        recommendation: Some(recommendation),
        impact: Some(impact),
        references: references(),
        id,
    }
}

/// One finding per candidate, severity banded by distance.
pub fn findings_from_distances(
    candidates: &[RetrievedCandidate],
    scoring: &ScoringConfig,
) -> Vec<Finding> {
    candidates
        .iter()
        .enumerate()
        .map(|(i, c)| Finding {
            id: issue_id(i),
            category: DEFAULT_CATEGORY.to_string(),
            severity: severity_for_distance(c.distance, scoring),
            confidence: Confidence::High,
            location: None,
            description: truncate_chars(&c.chunk_text, FALLBACK_DESCRIPTION_CHARS).to_string(),
            code_snippet: Some(truncate_chars(&c.chunk_text, FALLBACK_SNIPPET_CHARS).to_string()),
            recommendation: Some(DEFAULT_RECOMMENDATION.to_string()),
            impact: Some(FALLBACK_IMPACT.to_string()),
            references: references(),
        })
        .collect()
}

pub fn severity_for_distance(distance: f32, scoring: &ScoringConfig) -> Severity {
    if distance < scoring.high_below {
        Severity::High
    } else if distance < scoring.medium_below {
        Severity::Medium
    } else {
        Severity::Low
    }
}

fn issue_id(index: usize) -> String {
    format!("QUALITY_ISSUE_{:03}", index + 1)
}

fn non_blank(text: Option<&str>) -> Option<String> {
    text.map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

fn references() -> Vec<String> {
    REFERENCES.iter().map(|r| r.to_string()).collect()
}
