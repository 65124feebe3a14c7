use crate::models::RetrievedCandidate;

/// Standards embedded in a single prompt.
pub const MAX_PROMPT_CANDIDATES: usize = 5;

/// Code longer than this is cut before being sent to the model.
pub const MAX_PROMPT_CODE_CHARS: usize = 12_000;

pub const SYSTEM_PROMPT: &str = "你是一个专业的代码质量审查专家，专注于代码规范和最佳实践分析。\
只输出 JSON，不要输出其他内容。";

const RESPONSE_SCHEMA: &str = r#"{
    "summary": "代码质量总体评价（2-3句话）",
    "issues": [
        {
            "rule_id": "触发的规范ID（如QUALITY_ISSUE_001）",
            "issue_type": "问题类型（如：代码规范、安全风险、性能问题）",
            "severity": "严重程度（HIGH/MEDIUM/LOW）",
            "description": "问题的具体描述",
            "line_number": "问题所在行号（如无法确定则为null）",
            "code_snippet": "有问题的代码片段",
            "suggestion": "具体的修复建议"
        }
    ],
    "suggestions": [
        {
            "issue_id": "对应的issue编号",
            "suggestion": "具体的修复建议",
            "reason": "为什么这样修改"
        }
    ],
    "fixed_code": "修复后的完整代码（如果可以给出）。如果没有问题则为null。",
    "additional_tips": ["其他优化建议（可选）"]
}"#;

/// Build the user message: the code under review, the retrieved standards
/// and the JSON shape the answer must take.
pub fn build_user_prompt(code: &str, language: &str, candidates: &[RetrievedCandidate]) -> String {
    let rules_context = candidates
        .iter()
        .take(MAX_PROMPT_CANDIDATES)
        .enumerate()
        .map(|(i, c)| format!("规则 {}:\n{}", i + 1, c.chunk_text))
        .collect::<Vec<_>>()
        .join("\n\n");

    let code = truncate_chars(code, MAX_PROMPT_CODE_CHARS);
    // Only tag characters, so the language cannot close the fence early
    let fence: String = language
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '#' | '_' | '-'))
        .collect::<String>()
        .to_ascii_lowercase();

    format!(
        "请分析以下代码，并结合提供的开发规范给出详细的审查结果。\n\n\
         ## 代码:\n```{fence}\n{code}\n```\n\n\
         ## 相关开发规范:\n{rules_context}\n\n\
         ## 审查要求:\n\
         1. 只报告代码中实际存在、且与上述规范相关的问题\n\
         2. 每个问题给出严重程度（HIGH/MEDIUM/LOW）和所在行号\n\
         3. 修复建议必须具体、可执行\n\
         4. 如果能给出修复后的完整代码，放在 fixed_code 中，否则为 null\n\
         5. 没有问题时 issues 返回空数组\n\n\
         请按以下格式返回JSON格式的分析结果：\n\n{RESPONSE_SCHEMA}\n\n\
         请确保返回严格的JSON格式，不要添加额外的markdown代码块标记。"
    )
}

/// Cut `text` to at most `max_chars` characters on a char boundary.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
