#[cfg(test)]
mod tests;

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use tracing::{debug, warn};

use super::{DocumentRecord, FlagRule, OverallRisk, RiskFinding, Severity};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskCounts {
    #[serde(rename = "High")]
    pub high: usize,
    #[serde(rename = "Medium")]
    pub medium: usize,
    #[serde(rename = "Low")]
    pub low: usize,
}

impl RiskCounts {
    #[inline]
    pub fn record(&mut self, severity: Severity) {
        match severity {
            Severity::High => self.high += 1,
            Severity::Medium => self.medium += 1,
            Severity::Low => self.low += 1,
        }
    }

    #[inline]
    pub fn total(&self) -> usize {
        self.high + self.medium + self.low
    }

    #[inline]
    pub fn overall_risk(&self) -> OverallRisk {
        if self.high > 0 {
            OverallRisk::High
        } else if self.medium > 0 {
            OverallRisk::Medium
        } else if self.low > 0 {
            OverallRisk::Low
        } else {
            OverallRisk::NoRisk
        }
    }

    /// `3·High + 2·Medium + 1·Low`
    #[inline]
    pub fn acquisition_risk_index(&self) -> u64 {
        [
            (Severity::High, self.high),
            (Severity::Medium, self.medium),
            (Severity::Low, self.low),
        ]
        .into_iter()
        .map(|(severity, count)| severity.weight() * count as u64)
        .sum()
    }
}

/// Derived per-document rollup of findings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskAggregate {
    pub document_type: String,
    pub overall_risk: OverallRisk,
    pub risk_counts: RiskCounts,
    pub total_risks: usize,
    pub flags: BTreeSet<String>,
    pub acquisition_risk_index: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeatMapEntry {
    pub document_name: String,
    pub document_type: String,
    pub page_number: u32,
    pub severity: Severity,
    pub risk_type: String,
    pub snippet: String,
}

/// Aggregates keyed by display name, plus the cross-document heat map
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiligenceSummary {
    pub documents: BTreeMap<String, RiskAggregate>,
    pub heat_map: Vec<HeatMapEntry>,
}

impl DiligenceSummary {
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

/// Fold findings into per-document aggregates and a heat map.
///
/// Every document gets an aggregate, even with no findings. Documents are
/// visited in id order and findings in detection order, so the output is a
/// pure function of the inputs. Findings for unknown document ids are
/// skipped. A document whose name was already used is keyed as
/// `"name (#id)"`, so every record keeps its own aggregate.
#[inline]
pub fn aggregate(
    findings_by_document: &BTreeMap<u64, Vec<RiskFinding>>,
    documents: &BTreeMap<u64, DocumentRecord>,
    flag_rules: &[FlagRule],
) -> DiligenceSummary {
    for document_id in findings_by_document.keys() {
        if !documents.contains_key(document_id) {
            warn!(
                "Skipping findings for unknown document id {}",
                document_id
            );
        }
    }

    let mut summary = DiligenceSummary::default();
    let mut used_names = HashSet::new();

    for (document_id, record) in documents {
        let display_name = unique_name(&record.document_name, *document_id, &mut used_names);

        let findings = findings_by_document
            .get(document_id)
            .map_or(&[][..], Vec::as_slice);

        let mut counts = RiskCounts::default();
        let mut flags = BTreeSet::new();

        for finding in findings {
            counts.record(finding.severity);
            flags.extend(derive_flags(finding, flag_rules));
            summary.heat_map.push(HeatMapEntry {
                document_name: display_name.clone(),
                document_type: record.document_type.clone(),
                page_number: finding.page_number,
                severity: finding.severity,
                risk_type: finding.risk_type.clone(),
                snippet: finding.snippet.clone(),
            });
        }

        summary.documents.insert(
            display_name,
            RiskAggregate {
                document_type: record.document_type.clone(),
                overall_risk: counts.overall_risk(),
                risk_counts: counts,
                total_risks: counts.total(),
                flags,
                acquisition_risk_index: counts.acquisition_risk_index(),
            },
        );
    }

    debug!(
        "Aggregated {} documents into {} heat map entries",
        summary.documents.len(),
        summary.heat_map.len()
    );
    summary
}

/// `name`, or `"name (#id)"` when taken, with a further `.n` suffix until the
/// key is unused
fn unique_name(name: &str, document_id: u64, used: &mut HashSet<String>) -> String {
    let mut candidate = name.to_string();
    let mut attempt = 1_u32;
    while used.contains(&candidate) {
        candidate = if attempt == 1 {
            format!("{} (#{})", name, document_id)
        } else {
            format!("{} (#{}.{})", name, document_id, attempt)
        };
        attempt += 1;
    }
    used.insert(candidate.clone());
    candidate
}

/// Flags whose keywords occur in the finding's risk type or snippet
#[inline]
pub fn derive_flags<'a>(
    finding: &RiskFinding,
    flag_rules: &'a [FlagRule],
) -> impl Iterator<Item = String> + 'a {
    let combined = format!("{} {}", finding.risk_type, finding.snippet).to_lowercase();

    flag_rules
        .iter()
        .filter(move |rule| {
            rule.keywords
                .iter()
                .any(|k| !k.is_empty() && combined.contains(&k.to_lowercase()))
        })
        .map(|rule| rule.flag.clone())
}
