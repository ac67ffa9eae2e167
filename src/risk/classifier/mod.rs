
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::DocumentRule;
use crate::extraction::PageText;

pub const UNKNOWN_DOCUMENT_TYPE: &str = "UNKNOWN";

const CLASSIFIED_PAGES: usize = 3;
const FULL_CONFIDENCE_SCORE: f64 = 4.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub document_type: String,
    /// In `[0, 1]`, two decimals
    pub confidence: f64,
}

/// Classify by keyword hits over the first three pages.
///
/// Each rule scores one point per keyword present. The first rule with the
/// highest score wins; a zero score is [`UNKNOWN_DOCUMENT_TYPE`].
#[inline]
pub fn classify_document(pages: &[PageText], rules: &[DocumentRule]) -> Classification {
    let text = pages
        .iter()
        .take(CLASSIFIED_PAGES)
        .map(|p| p.text.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ");

    let mut best: Option<(&DocumentRule, usize)> = None;
    for rule in rules {
        let score = rule
            .keywords
            .iter()
            .filter(|k| text.contains(&k.to_lowercase()))
            .count();
        if best.is_none_or(|(_, best_score)| score > best_score) {
            best = Some((rule, score));
        }
    }

    let classification = match best {
        Some((rule, score)) if score > 0 => Classification {
            document_type: rule.document_type.clone(),
            confidence: round2((score as f64 / FULL_CONFIDENCE_SCORE).min(1.0)),
        },
        _ => Classification {
            document_type: UNKNOWN_DOCUMENT_TYPE.to_string(),
            confidence: 0.0,
        },
    };

    debug!(
        "Classified document as {} (confidence {})",
        classification.document_type, classification.confidence
    );
    classification
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
