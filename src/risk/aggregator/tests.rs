use super::*;
use crate::risk::RuleBook;

fn record(document_id: u64, name: &str, document_type: &str) -> DocumentRecord {
    DocumentRecord {
        document_id,
        document_name: name.to_string(),
        document_type: document_type.to_string(),
        classification_confidence: 0.5,
    }
}

fn finding(risk_type: &str, severity: Severity, page_number: u32, snippet: &str) -> RiskFinding {
    RiskFinding {
        risk_type: risk_type.to_string(),
        severity,
        page_number,
        snippet: snippet.to_string(),
        chunk_id: 0,
    }
}

fn flag_rules() -> Vec<FlagRule> {
    RuleBook::default().flag_rules
}

#[test]
fn high_high_medium_example() {
    let documents = BTreeMap::from([(1, record(1, "loan.pdf", "LOAN_AGREEMENT"))]);
    let findings = BTreeMap::from([(
        1,
        vec![
            finding("Termination", Severity::High, 1, "The Lender may terminate."),
            finding("Indemnity", Severity::High, 2, "The Borrower shall indemnify."),
            finding("Penalty", Severity::Medium, 3, "A penalty applies."),
        ],
    )]);

    let summary = aggregate(&findings, &documents, &flag_rules());
    let loan = &summary.documents["loan.pdf"];

    assert_eq!(
        loan.risk_counts,
        RiskCounts {
            high: 2,
            medium: 1,
            low: 0
        }
    );
    assert_eq!(loan.total_risks, 3);
    assert_eq!(loan.overall_risk, OverallRisk::High);
    assert_eq!(loan.acquisition_risk_index, 8);
    assert_eq!(loan.document_type, "LOAN_AGREEMENT");
    assert_eq!(summary.heat_map.len(), 3);
}

#[test]
fn documents_without_findings_have_no_risk() {
    let documents = BTreeMap::from([(1, record(1, "moa.pdf", "MOA"))]);
    let summary = aggregate(&BTreeMap::new(), &documents, &flag_rules());

    let moa = &summary.documents["moa.pdf"];
    assert_eq!(moa.overall_risk, OverallRisk::NoRisk);
    assert_eq!(moa.total_risks, 0);
    assert_eq!(moa.acquisition_risk_index, 0);
    assert!(moa.flags.is_empty());
    assert!(summary.heat_map.is_empty());
}

#[test]
fn overall_risk_is_highest_present() {
    let documents = BTreeMap::from([
        (1, record(1, "a.pdf", "IP")),
        (2, record(2, "b.pdf", "IP")),
        (3, record(3, "c.pdf", "IP")),
    ]);
    let findings = BTreeMap::from([
        (
            1,
            vec![
                finding("Governing Law", Severity::Low, 1, "Law."),
                finding("Governing Law", Severity::Low, 1, "Law."),
                finding("Termination", Severity::High, 2, "Exit."),
            ],
        ),
        (
            2,
            vec![
                finding("Governing Law", Severity::Low, 1, "Law."),
                finding("Penalty", Severity::Medium, 1, "Fine."),
            ],
        ),
        (3, vec![finding("Governing Law", Severity::Low, 1, "Law.")]),
    ]);

    let summary = aggregate(&findings, &documents, &[]);
    assert_eq!(summary.documents["a.pdf"].overall_risk, OverallRisk::High);
    assert_eq!(summary.documents["b.pdf"].overall_risk, OverallRisk::Medium);
    assert_eq!(summary.documents["c.pdf"].overall_risk, OverallRisk::Low);

    for aggregate in summary.documents.values() {
        let counts = aggregate.risk_counts;
        assert_eq!(counts.high + counts.medium + counts.low, aggregate.total_risks);
        assert_eq!(
            aggregate.acquisition_risk_index,
            (3 * counts.high + 2 * counts.medium + counts.low) as u64
        );
    }
}

#[test]
fn flags_from_risk_type_and_snippet() {
    let documents = BTreeMap::from([(1, record(1, "spa.pdf", "SHAREHOLDING"))]);
    let findings = BTreeMap::from([(
        1,
        vec![
            finding("Penalty", Severity::Medium, 1, "Late payment is charged."),
            finding(
                "Governing Law",
                Severity::Low,
                2,
                "Any dispute goes to arbitration.",
            ),
            finding(
                "Termination",
                Severity::High,
                3,
                "Termination on change of control or arbitration.",
            ),
        ],
    )]);

    let summary = aggregate(&findings, &documents, &flag_rules());
    let flags: Vec<&str> = summary.documents["spa.pdf"]
        .flags
        .iter()
        .map(String::as_str)
        .collect();

    assert_eq!(
        flags,
        vec![
            "Hidden liabilities",
            "Ownership contradictions",
            "Pending litigation"
        ]
    );
    // Flags never touch counts
    assert_eq!(summary.documents["spa.pdf"].total_risks, 3);
}

#[test]
fn heat_map_follows_document_then_detection_order() {
    let documents = BTreeMap::from([
        (2, record(2, "second.pdf", "AOA")),
        (1, record(1, "first.pdf", "MOA")),
    ]);
    let findings = BTreeMap::from([
        (2, vec![finding("Penalty", Severity::Medium, 5, "Fine.")]),
        (
            1,
            vec![
                finding("Termination", Severity::High, 2, "Exit."),
                finding("Indemnity", Severity::High, 1, "Indemnify."),
            ],
        ),
    ]);

    let summary = aggregate(&findings, &documents, &flag_rules());
    let order: Vec<(&str, &str, u32)> = summary
        .heat_map
        .iter()
        .map(|e| (e.document_name.as_str(), e.risk_type.as_str(), e.page_number))
        .collect();

    assert_eq!(
        order,
        vec![
            ("first.pdf", "Termination", 2),
            ("first.pdf", "Indemnity", 1),
            ("second.pdf", "Penalty", 5),
        ]
    );
    assert_eq!(summary.heat_map[2].document_type, "AOA");
    assert_eq!(summary.heat_map[2].severity, Severity::Medium);
}

#[test]
fn findings_for_unknown_documents_are_skipped() {
    let documents = BTreeMap::from([(1, record(1, "known.pdf", "MOA"))]);
    let findings = BTreeMap::from([
        (1, vec![finding("Penalty", Severity::Medium, 1, "Fine.")]),
        (9, vec![finding("Termination", Severity::High, 1, "Exit.")]),
    ]);

    let summary = aggregate(&findings, &documents, &flag_rules());
    assert_eq!(summary.documents.len(), 1);
    assert_eq!(summary.heat_map.len(), 1);
    assert_eq!(summary.heat_map[0].document_name, "known.pdf");
}

#[test]
fn duplicate_names_are_disambiguated() {
    let documents = BTreeMap::from([
        (1, record(1, "contract.pdf", "MOA")),
        (4, record(4, "contract.pdf", "AOA")),
    ]);
    let findings = BTreeMap::from([(4, vec![finding("Penalty", Severity::Medium, 1, "Fine.")])]);

    let summary = aggregate(&findings, &documents, &flag_rules());
    assert_eq!(summary.documents["contract.pdf"].document_type, "MOA");
    assert_eq!(summary.documents["contract.pdf (#4)"].total_risks, 1);
    assert_eq!(summary.heat_map[0].document_name, "contract.pdf (#4)");
}

#[test]
fn generated_names_never_collide() {
    let documents = BTreeMap::from([
        (1, record(1, "a", "MOA")),
        (2, record(2, "a (#3)", "AOA")),
        (3, record(3, "a", "IP")),
    ]);

    let summary = aggregate(&BTreeMap::new(), &documents, &flag_rules());
    assert_eq!(summary.documents.len(), 3);
    assert_eq!(summary.documents["a"].document_type, "MOA");
    assert_eq!(summary.documents["a (#3)"].document_type, "AOA");
    assert_eq!(summary.documents["a (#3.2)"].document_type, "IP");
}

#[test]
fn aggregation_is_idempotent() {
    let documents = BTreeMap::from([
        (1, record(1, "a.pdf", "MOA")),
        (2, record(2, "b.pdf", "IP")),
    ]);
    let findings = BTreeMap::from([
        (
            1,
            vec![
                finding("Penalty", Severity::Medium, 1, "A penalty and a license."),
                finding("Termination", Severity::High, 2, "Exit on lawsuit."),
            ],
        ),
        (2, vec![finding("Governing Law", Severity::Low, 1, "Jurisdiction.")]),
    ]);

    let first = aggregate(&findings, &documents, &flag_rules());
    let second = aggregate(&findings, &documents, &flag_rules());

    assert_eq!(first, second);
    assert_eq!(
        serde_json::to_vec(&first).expect("serialize"),
        serde_json::to_vec(&second).expect("serialize")
    );
}

#[test]
fn summary_json_shape() {
    let documents = BTreeMap::from([(1, record(1, "a.pdf", "MOA"))]);
    let summary = aggregate(&BTreeMap::new(), &documents, &flag_rules());
    let json = serde_json::to_value(&summary).expect("serialize");

    assert_eq!(json["documents"]["a.pdf"]["overall_risk"], "No Risk");
    assert_eq!(json["documents"]["a.pdf"]["risk_counts"]["High"], 0);
    assert_eq!(json["documents"]["a.pdf"]["flags"], serde_json::json!([]));
    assert_eq!(json["heat_map"], serde_json::json!([]));
}
