//! Retrieval query construction from raw code.
//!
//! Comments are noise for retrieval, while identifiers and error keywords are
//! what coding-standard entries tend to mention. The enhanced query is the
//! cleaned code followed by those tokens.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

static COMMENT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)/\*.*?\*/|//[^\n]*").expect("valid regex"));

static DECLARATION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\bfunction\s+([A-Za-z_$][\w$]*)|\b(?:const|let|var)\s+([A-Za-z_$][\w$]*)\s*=|\bdef\s+([A-Za-z_]\w*)|\bfn\s+([A-Za-z_]\w*)|\bclass\s+([A-Za-z_$][\w$]*)",
    )
    .expect("valid regex")
});

static ERROR_KEYWORD_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(?:ReferenceError|TypeError|undefined|return)\b").expect("valid regex"));

/// Strip line and block comments, then surrounding whitespace.
pub fn strip_comments(code: &str) -> String {
    COMMENT_RE.replace_all(code, "").trim().to_string()
}

/// Declared identifiers and error keywords, deduplicated in first-seen order.
pub fn extract_tokens(cleaned: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut tokens = Vec::new();

    let declared = DECLARATION_RE.captures_iter(cleaned).filter_map(|caps| {
        caps.iter()
            .skip(1)
            .flatten()
            .next()
            .map(|m| m.as_str().to_string())
    });
    let keywords = ERROR_KEYWORD_RE
        .find_iter(cleaned)
        .map(|m| m.as_str().to_string());

    for token in declared.chain(keywords) {
        if seen.insert(token.clone()) {
            tokens.push(token);
        }
    }
    tokens
}

/// Build the retrieval query for `code`.
///
/// Always contains the comment-stripped code; equals it when no tokens
/// were found.
pub fn enhance_query(code: &str) -> String {
    let cleaned = strip_comments(code);
    let tokens = extract_tokens(&cleaned);
    if tokens.is_empty() {
        cleaned
    } else {
        format!("{cleaned} {}", tokens.join(" "))
    }
}
