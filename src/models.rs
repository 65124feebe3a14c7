use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// A bounded slice of the standards corpus; the unit of retrieval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub text: String,
    pub source_metadata: BTreeMap<String, String>,
}

impl Chunk {
    /// Leading characters this chunk shares with its predecessor.
    pub fn overlap(&self) -> usize {
        self.source_metadata
            .get("overlap")
            .and_then(|v| v.parse().ok())
            .unwrap_or(0)
    }
}

/// A retrieval hit that survived the distance threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedCandidate {
    pub chunk_text: String,
    /// Lower is more relevant
    pub distance: f32,
    #[serde(default)]
    pub source_metadata: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    /// Case-insensitive parse of a model-supplied severity label.
    pub fn parse_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_uppercase().as_str() {
            "HIGH" | "CRITICAL" | "SEVERE" => Some(Severity::High),
            "MEDIUM" | "MODERATE" => Some(Severity::Medium),
            "LOW" | "INFO" | "MINOR" => Some(Severity::Low),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    Safe,
    Low,
    Medium,
    High,
    Unknown,
}

/// One discrete issue in a quality report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    pub id: String,
    pub category: String,
    pub severity: Severity,
    pub confidence: Confidence,
    pub location: Option<String>,
    pub description: String,
    pub code_snippet: Option<String>,
    pub recommendation: Option<String>,
    pub impact: Option<String>,
    #[serde(default)]
    pub references: Vec<String>,
}

/// Final output of one quality check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub summary: String,
    pub risk_level: RiskLevel,
    #[serde(rename = "security_score")]
    pub quality_score: u8,
    #[serde(rename = "vulnerabilities", default)]
    pub findings: Vec<Finding>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub llm_analysis: Option<ModelAnalysis>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_model_output: Option<String>,
    pub error: Option<String>,
}

// ─── Model contract ─────────────────────────────────────

/// The JSON object the analysis model is asked to return.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelAnalysis {
    #[serde(default, deserialize_with = "null_as_default")]
    pub summary: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub issues: Vec<ModelIssue>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub suggestions: Vec<ModelSuggestion>,
    #[serde(default)]
    pub fixed_code: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub additional_tips: Vec<String>,
}

impl ModelAnalysis {
    /// Corrected code, if the model offered any.
    pub fn fix(&self) -> Option<&str> {
        self.fixed_code
            .as_deref()
            .filter(|code| !code.trim().is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelIssue {
    /// Models emit ids and line numbers as either strings or numbers.
    #[serde(default)]
    pub rule_id: Option<serde_json::Value>,
    #[serde(default)]
    pub issue_type: Option<String>,
    #[serde(default)]
    pub severity: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub line_number: Option<serde_json::Value>,
    #[serde(default)]
    pub code_snippet: Option<String>,
    #[serde(default)]
    pub suggestion: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelSuggestion {
    #[serde(default)]
    pub issue_id: Option<serde_json::Value>,
    #[serde(default)]
    pub suggestion: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
}

/// Render a loosely typed scalar (string or number) as text; null and blank
/// strings count as absent.
pub fn scalar_text(value: Option<&serde_json::Value>) -> Option<String> {
    match value? {
        serde_json::Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// ─── HTTP surface ───────────────────────────────────────

/// Quality check request
#[derive(Debug, Clone, Deserialize)]
pub struct CheckRequest {
    pub code: String,
    #[serde(default = "default_language")]
    pub language: String,
}

fn default_language() -> String {
    "javascript".to_string()
}

/// Quality check response envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckResponse {
    pub audit_result: AnalysisReport,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub vector_db: String,
    pub rules_count: usize,
    pub llm_enabled: bool,
}
