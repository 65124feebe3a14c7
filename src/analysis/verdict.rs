//! Pure report assembly: risk level, quality score and the fixed-shape
//! reports for the short-circuit paths.

use crate::config::ScoringConfig;
use crate::models::{AnalysisReport, Finding, ModelAnalysis, RetrievedCandidate, RiskLevel, Severity};

pub const SUMMARY_EMPTY_CODE: &str = "待检查代码为空";
pub const SUMMARY_NO_ISSUES: &str = "代码质量检查完成，未发现明显的规范问题";
pub const SUMMARY_FAILED: &str = "质量检查失败";

pub fn summary_with_findings(count: usize) -> String {
    format!("代码质量检查完成，发现 {count} 个规范问题")
}

/// Highest severity present decides the level; no findings is `SAFE`.
pub fn risk_level(findings: &[Finding]) -> RiskLevel {
    match findings.iter().map(|f| f.severity).max() {
        Some(Severity::High) => RiskLevel::High,
        Some(Severity::Medium) => RiskLevel::Medium,
        Some(Severity::Low) => RiskLevel::Low,
        None => RiskLevel::Safe,
    }
}

/// `round((1 - mean distance) * 100)` clamped to `[0, 100]`, lifted to the
/// fixed-code floor when the model produced a fix. No candidates scores 100.
pub fn quality_score(candidates: &[RetrievedCandidate], has_fix: bool, scoring: &ScoringConfig) -> u8 {
    let base = if candidates.is_empty() {
        100
    } else {
        let mean = candidates.iter().map(|c| f64::from(c.distance)).sum::<f64>()
            / candidates.len() as f64;
        ((1.0 - mean) * 100.0).clamp(0.0, 100.0).round() as u8
    };

    if has_fix {
        base.max(scoring.fixed_code_floor.min(100))
    } else {
        base
    }
}

/// Assemble the report for a request that reached the analysis stage.
pub fn compose(
    findings: Vec<Finding>,
    candidates: &[RetrievedCandidate],
    llm_analysis: Option<ModelAnalysis>,
    raw_model_output: Option<String>,
    error: Option<String>,
    scoring: &ScoringConfig,
) -> AnalysisReport {
    let has_fix = llm_analysis.as_ref().is_some_and(|a| a.fix().is_some());
    // The model's own assessment wins over the count text
    let summary = llm_analysis
        .as_ref()
        .map(|a| a.summary.trim())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| {
            if findings.is_empty() {
                SUMMARY_NO_ISSUES.to_string()
            } else {
                summary_with_findings(findings.len())
            }
        });

    AnalysisReport {
        summary,
        risk_level: risk_level(&findings),
        quality_score: quality_score(candidates, has_fix, scoring),
        findings,
        llm_analysis,
        raw_model_output,
        error,
    }
}

pub fn empty_code_report() -> AnalysisReport {
    AnalysisReport {
        summary: SUMMARY_EMPTY_CODE.to_string(),
        risk_level: RiskLevel::Unknown,
        quality_score: 0,
        findings: Vec::new(),
        llm_analysis: None,
        raw_model_output: None,
        error: Some(SUMMARY_EMPTY_CODE.to_string()),
    }
}

pub fn no_candidates_report() -> AnalysisReport {
    AnalysisReport {
        summary: SUMMARY_NO_ISSUES.to_string(),
        risk_level: RiskLevel::Safe,
        quality_score: 100,
        findings: Vec::new(),
        llm_analysis: None,
        raw_model_output: None,
        error: None,
    }
}

pub fn failure_report(message: impl Into<String>) -> AnalysisReport {
    AnalysisReport {
        summary: SUMMARY_FAILED.to_string(),
        risk_level: RiskLevel::Unknown,
        quality_score: 0,
        findings: Vec::new(),
        llm_analysis: None,
        raw_model_output: None,
        error: Some(message.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Confidence;
    use std::collections::BTreeMap;

    fn finding(severity: Severity) -> Finding {
        Finding {
            id: "F".to_string(),
            category: "代码规范".to_string(),
            severity,
            confidence: Confidence::High,
            location: None,
            description: String::new(),
            code_snippet: None,
            recommendation: None,
            impact: None,
            references: Vec::new(),
        }
    }

    fn at(distance: f32) -> RetrievedCandidate {
        RetrievedCandidate {
            chunk_text: "rule".to_string(),
            distance,
            source_metadata: BTreeMap::new(),
        }
    }

    #[test]
    fn test_risk_level_takes_highest_severity() {
        assert_eq!(risk_level(&[]), RiskLevel::Safe);
        assert_eq!(risk_level(&[finding(Severity::Low)]), RiskLevel::Low);
        assert_eq!(
            risk_level(&[finding(Severity::Low), finding(Severity::Medium)]),
            RiskLevel::Medium
        );
        assert_eq!(
            risk_level(&[finding(Severity::Medium), finding(Severity::High), finding(Severity::Low)]),
            RiskLevel::High
        );
    }

    #[test]
    fn test_score_from_mean_distance() {
        let scoring = ScoringConfig::default();
        assert_eq!(quality_score(&[at(0.1)], false, &scoring), 90);
        assert_eq!(quality_score(&[at(0.2), at(0.4)], false, &scoring), 70);
        assert_eq!(quality_score(&[], false, &scoring), 100);
    }

    #[test]
    fn test_score_clamps_far_candidates() {
        let scoring = ScoringConfig::default();
        assert_eq!(quality_score(&[at(1.7)], false, &scoring), 0);
    }

    #[test]
    fn test_fixed_code_floor_raises_but_never_lowers() {
        let scoring = ScoringConfig::default();
        assert_eq!(quality_score(&[at(0.55)], true, &scoring), 70);
        assert_eq!(quality_score(&[at(0.1)], true, &scoring), 90);
    }

    #[test]
    fn test_compose_counts_findings_in_summary() {
        let report = compose(
            vec![finding(Severity::High), finding(Severity::Low)],
            &[at(0.1), at(0.3)],
            None,
            None,
            None,
            &ScoringConfig::default(),
        );
        assert_eq!(report.summary, "代码质量检查完成，发现 2 个规范问题");
        assert_eq!(report.risk_level, RiskLevel::High);
        assert_eq!(report.quality_score, 80);
    }

    #[test]
    fn test_compose_applies_floor_for_model_fix() {
        let analysis = ModelAnalysis {
            fixed_code: Some("const x = 1;".to_string()),
            ..Default::default()
        };
        let report = compose(
            vec![finding(Severity::Medium)],
            &[at(0.58)],
            Some(analysis),
            None,
            None,
            &ScoringConfig::default(),
        );
        assert_eq!(report.quality_score, 70);
    }

    #[test]
    fn test_compose_prefers_model_summary() {
        let analysis = ModelAnalysis {
            summary: "  eval on user input is dangerous ".to_string(),
            ..Default::default()
        };
        let report = compose(
            vec![finding(Severity::High)],
            &[at(0.1)],
            Some(analysis),
            None,
            None,
            &ScoringConfig::default(),
        );
        assert_eq!(report.summary, "eval on user input is dangerous");
    }

    #[test]
    fn test_compose_blank_model_summary_uses_count() {
        let report = compose(
            vec![finding(Severity::Low)],
            &[at(0.1)],
            Some(ModelAnalysis::default()),
            None,
            None,
            &ScoringConfig::default(),
        );
        assert_eq!(report.summary, "代码质量检查完成，发现 1 个规范问题");
    }

    #[test]
    fn test_short_circuit_reports() {
        let empty = empty_code_report();
        assert_eq!(empty.risk_level, RiskLevel::Unknown);
        assert_eq!(empty.quality_score, 0);
        assert_eq!(empty.summary, "待检查代码为空");
        assert_eq!(empty.error.as_deref(), Some("待检查代码为空"));

        let none = no_candidates_report();
        assert_eq!(none.risk_level, RiskLevel::Safe);
        assert_eq!(none.quality_score, 100);
        assert!(none.findings.is_empty());

        let failed = failure_report("embedding service unreachable");
        assert_eq!(failed.summary, SUMMARY_FAILED);
        assert_eq!(failed.error.as_deref(), Some("embedding service unreachable"));
    }
}
