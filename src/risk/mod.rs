//! Rule-based risk detection and aggregation
//!
//! Passages are scanned against a [`RuleBook`] by the [`detector`], folded
//! into per-document [`RiskAggregate`]s and a heat map by the
//! [`aggregator`], and documents are typed by the [`classifier`].
//!
//! Keyword matching is case-insensitive substring matching. Word boundaries
//! are not respected, so `"ip"` also matches inside `"relationship"`.

pub mod aggregator;
pub mod classifier;
pub mod detector;
pub mod rules;

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

pub use aggregator::{DiligenceSummary, HeatMapEntry, RiskAggregate, RiskCounts, aggregate};
pub use classifier::{Classification, UNKNOWN_DOCUMENT_TYPE, classify_document};
pub use detector::{detect, detect_passage, extract_snippet};
pub use rules::{DocumentRule, FlagRule, RiskRule, RuleBook};

/// Severity of a single finding.
///
/// Deserialisation is lenient: labels are matched case-insensitively and
/// anything unrecognised becomes [`Severity::Low`], as does a missing field
/// when paired with `#[serde(default)]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
pub enum Severity {
    High,
    Medium,
    #[default]
    Low,
}

impl Severity {
    #[inline]
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "high" => Self::High,
            "medium" => Self::Medium,
            _ => Self::Low,
        }
    }

    #[inline]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::High => "High",
            Self::Medium => "Medium",
            Self::Low => "Low",
        }
    }

    /// Contribution to the acquisition risk index
    #[inline]
    pub fn weight(self) -> u64 {
        match self {
            Self::High => 3,
            Self::Medium => 2,
            Self::Low => 1,
        }
    }
}

impl<'de> Deserialize<'de> for Severity {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let label = Option::<String>::deserialize(deserializer)?;
        Ok(label.map_or(Self::Low, |l| Self::from_label(&l)))
    }
}

impl fmt::Display for Severity {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Highest severity present in a document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OverallRisk {
    High,
    Medium,
    Low,
    #[serde(rename = "No Risk")]
    NoRisk,
}

impl OverallRisk {
    #[inline]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::High => "High",
            Self::Medium => "Medium",
            Self::Low => "Low",
            Self::NoRisk => "No Risk",
        }
    }
}

impl fmt::Display for OverallRisk {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One rule match within one passage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskFinding {
    pub risk_type: String,
    #[serde(default)]
    pub severity: Severity,
    pub page_number: u32,
    pub snippet: String,
    /// Passage the finding was detected in
    #[serde(default)]
    pub chunk_id: u64,
}

/// Identity and classification of an ingested document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub document_id: u64,
    pub document_name: String,
    pub document_type: String,
    pub classification_confidence: f64,
}
