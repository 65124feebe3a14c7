//! Turning free-form model text into a [`ModelAnalysis`].
//!
//! Models wrap JSON in markdown fences, prepend chatter or trail off with
//! commentary. Extraction tries the whole text, then the span between the
//! first `{` and the last `}`, then the first complete JSON value starting at
//! the first `{`.

use serde_json::Value;

use crate::error::AnalysisFailure;
use crate::models::ModelAnalysis;

/// Outcome of reading a model reply.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedOutput {
    Parsed(ModelAnalysis),
    Unparseable { raw: String, reason: String },
}

impl ParsedOutput {
    pub fn into_result(self) -> Result<ModelAnalysis, AnalysisFailure> {
        match self {
            ParsedOutput::Parsed(analysis) => Ok(analysis),
            ParsedOutput::Unparseable { raw, reason } => Err(AnalysisFailure::Schema { reason, raw }),
        }
    }
}

/// The span from the first `{` to the last `}`, inclusive.
pub fn extract_json_block(content: &str) -> Option<&str> {
    let start = content.find('{')?;
    let end = content.rfind('}')?;
    (end > start).then(|| &content[start..=end])
}

pub fn parse_model_output(content: &str) -> ParsedOutput {
    let unparseable = |reason: String| ParsedOutput::Unparseable {
        raw: content.to_string(),
        reason,
    };

    let value = match find_json_object(content) {
        Some(value) => value,
        None => return unparseable("no JSON object in model output".to_string()),
    };

    match serde_json::from_value::<ModelAnalysis>(value) {
        Ok(analysis) => ParsedOutput::Parsed(analysis),
        Err(e) => unparseable(format!("unexpected JSON shape: {e}")),
    }
}

fn find_json_object(content: &str) -> Option<Value> {
    if let Ok(value @ Value::Object(_)) = serde_json::from_str::<Value>(content.trim()) {
        return Some(value);
    }

    if let Some(block) = extract_json_block(content) {
        if let Ok(value @ Value::Object(_)) = serde_json::from_str::<Value>(block) {
            return Some(value);
        }
    }

    // A complete object followed by a stray `}` later in the text
    let start = content.find('{')?;
    let mut stream = serde_json::Deserializer::from_str(&content[start..]).into_iter::<Value>();
    match stream.next() {
        Some(Ok(value @ Value::Object(_))) => Some(value),
        _ => None,
    }
}
