
use tracing::debug;

use super::{RiskFinding, RiskRule};
use crate::embeddings::Passage;
use crate::extraction::{clean_text, split_sentences};

const SNIPPET_FALLBACK_CHARS: usize = 250;

/// Scan passages against the risk rules, in passage then rule order
#[inline]
pub fn detect(passages: &[Passage], rules: &[RiskRule]) -> Vec<RiskFinding> {
    let findings: Vec<RiskFinding> = passages
        .iter()
        .flat_map(|passage| detect_passage(passage, rules))
        .collect();

    debug!(
        "Detected {} findings across {} passages",
        findings.len(),
        passages.len()
    );
    findings
}

/// At most one finding per rule; the first keyword that matches decides the snippet
#[inline]
pub fn detect_passage(passage: &Passage, rules: &[RiskRule]) -> Vec<RiskFinding> {
    let lowered = passage.text.to_lowercase();

    rules
        .iter()
        .filter_map(|rule| {
            let keyword = rule
                .keywords
                .iter()
                .find(|k| !k.is_empty() && lowered.contains(&k.to_lowercase()))?;

            Some(RiskFinding {
                risk_type: rule.risk_type.clone(),
                severity: rule.severity,
                page_number: passage.page_number,
                snippet: extract_snippet(&passage.text, keyword),
                chunk_id: passage.chunk_id,
            })
        })
        .collect()
}

/// The sentence of `text` containing `keyword`, or its first 250 characters
/// cut back to a word boundary when no sentence contains it
#[inline]
pub fn extract_snippet(text: &str, keyword: &str) -> String {
    let text = clean_text(text);
    let keyword = keyword.to_lowercase();

    if let Some(sentence) = split_sentences(&text)
        .into_iter()
        .find(|s| s.to_lowercase().contains(&keyword))
    {
        return sentence.to_string();
    }

    truncate_at_word(&text, SNIPPET_FALLBACK_CHARS).to_string()
}

fn truncate_at_word(text: &str, max_chars: usize) -> &str {
    let Some((cut, next)) = text.char_indices().nth(max_chars) else {
        return text;
    };

    let head = &text[..cut];
    if next.is_whitespace() {
        return head.trim_end();
    }

    match head.rfind(char::is_whitespace) {
        Some(space) => head[..space].trim_end(),
        None => head,
    }
}
