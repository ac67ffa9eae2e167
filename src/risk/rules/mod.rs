
use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{debug, info};

use super::Severity;

/// Keyword rule emitting a finding of `risk_type`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskRule {
    pub risk_type: String,
    #[serde(default)]
    pub severity: Severity,
    pub keywords: Vec<String>,
}

/// Keyword rule raising a qualitative flag on a document aggregate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlagRule {
    pub flag: String,
    pub keywords: Vec<String>,
}

/// Keyword rule scoring a document type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRule {
    pub document_type: String,
    pub keywords: Vec<String>,
}

/// Ordered rule tables driving detection, flagging and classification.
///
/// Each table falls back to its built-in default when absent from a rules
/// file. Keywords are stored lowercase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleBook {
    #[serde(default = "default_risk_rules")]
    pub risk_rules: Vec<RiskRule>,
    #[serde(default = "default_flag_rules")]
    pub flag_rules: Vec<FlagRule>,
    #[serde(default = "default_document_rules")]
    pub document_rules: Vec<DocumentRule>,
}

impl Default for RuleBook {
    #[inline]
    fn default() -> Self {
        Self {
            risk_rules: default_risk_rules(),
            flag_rules: default_flag_rules(),
            document_rules: default_document_rules(),
        }
    }
}

impl RuleBook {
    /// Load a TOML rule book
    #[inline]
    pub fn load(path: &Path) -> Result<Self> {
        debug!("Loading rule book from {}", path.display());

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read rules file {}", path.display()))?;
        let rules = Self::from_toml(&content)
            .with_context(|| format!("Invalid rules file {}", path.display()))?;

        info!(
            "Loaded {} risk rules, {} flag rules and {} document rules from {}",
            rules.risk_rules.len(),
            rules.flag_rules.len(),
            rules.document_rules.len(),
            path.display()
        );
        Ok(rules)
    }

    /// Parse a TOML rule book, lowercasing keywords and rejecting empty rules
    #[inline]
    pub fn from_toml(content: &str) -> Result<Self> {
        let mut rules: Self = toml::from_str(content).context("Failed to parse rules")?;

        for rule in &mut rules.risk_rules {
            sanitize("risk rule", &rule.risk_type, &mut rule.keywords)?;
        }
        for rule in &mut rules.flag_rules {
            sanitize("flag rule", &rule.flag, &mut rule.keywords)?;
        }
        for rule in &mut rules.document_rules {
            sanitize("document rule", &rule.document_type, &mut rule.keywords)?;
        }

        Ok(rules)
    }
}

fn sanitize(kind: &str, label: &str, keywords: &mut Vec<String>) -> Result<()> {
    if label.trim().is_empty() {
        bail!("A {} has an empty label", kind);
    }

    *keywords = keywords
        .iter()
        .map(|k| k.trim().to_lowercase())
        .filter(|k| !k.is_empty())
        .collect();

    if keywords.is_empty() {
        bail!("The {} '{}' has no keywords", kind, label);
    }
    Ok(())
}

fn keywords(words: &[&str]) -> Vec<String> {
    words.iter().map(|w| (*w).to_string()).collect()
}

fn default_risk_rules() -> Vec<RiskRule> {
    [
        (
            "Termination",
            Severity::High,
            &["terminate", "termination", "exit"][..],
        ),
        (
            "Penalty",
            Severity::Medium,
            &["penalty", "liquidated damages", "fine"][..],
        ),
        (
            "Indemnity",
            Severity::High,
            &["indemnify", "indemnification"][..],
        ),
        (
            "Governing Law",
            Severity::Low,
            &["governing law", "jurisdiction"][..],
        ),
    ]
    .into_iter()
    .map(|(risk_type, severity, words)| RiskRule {
        risk_type: risk_type.to_string(),
        severity,
        keywords: keywords(words),
    })
    .collect()
}

fn default_flag_rules() -> Vec<FlagRule> {
    [
        (
            "Hidden liabilities",
            &["penalty", "indemnity", "liquidated damages"][..],
        ),
        (
            "Pending litigation",
            &["litigation", "dispute", "arbitration", "lawsuit"][..],
        ),
        (
            "IP risk",
            &["intellectual property", "ip ownership", "license"][..],
        ),
        (
            "Ownership contradictions",
            &["shareholding", "ownership", "control", "assignment"][..],
        ),
    ]
    .into_iter()
    .map(|(flag, words)| FlagRule {
        flag: flag.to_string(),
        keywords: keywords(words),
    })
    .collect()
}

fn default_document_rules() -> Vec<DocumentRule> {
    [
        (
            "MOA",
            &["memorandum of association", "objects clause", "capital clause"][..],
        ),
        (
            "AOA",
            &["articles of association", "board of directors", "voting rights"][..],
        ),
        (
            "LOAN_AGREEMENT",
            &["loan agreement", "interest rate", "repayment", "security"][..],
        ),
        (
            "SHAREHOLDING",
            &["shareholding", "shareholders", "equity shares"][..],
        ),
        (
            "IP",
            &["intellectual property", "patent", "trademark", "copyright"][..],
        ),
    ]
    .into_iter()
    .map(|(document_type, words)| DocumentRule {
        document_type: document_type.to_string(),
        keywords: keywords(words),
    })
    .collect()
}
