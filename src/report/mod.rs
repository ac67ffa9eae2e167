
use chrono::{DateTime, Utc};
use itertools::Itertools;
use pulldown_cmark::{Options, Parser, html};
use std::fmt::Write as _;
use tracing::debug;

use crate::Result;
use crate::config::ReportFormat;
use crate::risk::DiligenceSummary;

pub const REPORT_TITLE: &str = "Due Diligence Report";
pub const EMPTY_REPORT: &str = "No Due Diligence data available.";

/// A rendered report ready to be served or written to disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedReport {
    pub file_name: String,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

pub trait ReportRenderer: Send + Sync {
    fn render(&self, summary: &DiligenceSummary) -> Result<RenderedReport>;
}

/// Markdown report, optionally converted to HTML
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkdownReport {
    format: ReportFormat,
}

impl MarkdownReport {
    #[inline]
    pub fn new(format: ReportFormat) -> Self {
        Self { format }
    }

    #[inline]
    pub fn render_at(
        &self,
        summary: &DiligenceSummary,
        generated_at: DateTime<Utc>,
    ) -> Result<RenderedReport> {
        let markdown = render_markdown(summary, generated_at)?;

        let report = match self.format {
            ReportFormat::Markdown => RenderedReport {
                file_name: "due_diligence_report.md".to_string(),
                content_type: "text/markdown; charset=utf-8",
                bytes: markdown.into_bytes(),
            },
            ReportFormat::Html => RenderedReport {
                file_name: "due_diligence_report.html".to_string(),
                content_type: "text/html; charset=utf-8",
                bytes: markdown_to_html(&markdown).into_bytes(),
            },
        };

        debug!(
            "Rendered {} ({} bytes)",
            report.file_name,
            report.bytes.len()
        );
        Ok(report)
    }
}

impl ReportRenderer for MarkdownReport {
    #[inline]
    fn render(&self, summary: &DiligenceSummary) -> Result<RenderedReport> {
        self.render_at(summary, Utc::now())
    }
}

/// Per-document sections followed by the clause heat map
#[inline]
pub fn render_markdown(summary: &DiligenceSummary, generated_at: DateTime<Utc>) -> Result<String> {
    let mut out = String::new();
    write_report(&mut out, summary, generated_at)
        .map_err(|e| crate::DiligenceError::Report(e.to_string()))?;
    Ok(out)
}

fn write_report(
    out: &mut String,
    summary: &DiligenceSummary,
    generated_at: DateTime<Utc>,
) -> std::fmt::Result {
    writeln!(out, "# {REPORT_TITLE}")?;
    writeln!(out)?;
    writeln!(out, "Generated: {}", generated_at.format("%Y-%m-%d %H:%M UTC"))?;
    writeln!(out)?;

    if summary.is_empty() {
        writeln!(out, "{EMPTY_REPORT}")?;
        return Ok(());
    }

    for (name, aggregate) in &summary.documents {
        let counts = aggregate.risk_counts;
        let flags = if aggregate.flags.is_empty() {
            "None".to_string()
        } else {
            aggregate.flags.iter().join(", ")
        };

        writeln!(out, "## {}", inline(name))?;
        writeln!(out)?;
        writeln!(out, "Document Type: {}", aggregate.document_type)?;
        writeln!(out)?;
        writeln!(out, "Overall Risk: {}", aggregate.overall_risk)?;
        writeln!(out)?;
        writeln!(
            out,
            "High: {}, Medium: {}, Low: {}, Total: {}",
            counts.high, counts.medium, counts.low, aggregate.total_risks
        )?;
        writeln!(out)?;
        writeln!(
            out,
            "Acquisition Risk Index: {}",
            aggregate.acquisition_risk_index
        )?;
        writeln!(out)?;
        writeln!(out, "Flags: {flags}")?;
        writeln!(out)?;
    }

    writeln!(out, "## Clause Heat Map")?;
    writeln!(out)?;

    if summary.heat_map.is_empty() {
        writeln!(out, "No risk clauses detected.")?;
        return Ok(());
    }

    writeln!(out, "| Document | Type | Page | Severity | Risk | Clause |")?;
    writeln!(out, "|---|---|---|---|---|---|")?;
    for entry in &summary.heat_map {
        writeln!(
            out,
            "| {} | {} | {} | {} | {} | {} |",
            table_cell(&entry.document_name),
            table_cell(&entry.document_type),
            entry.page_number,
            entry.severity,
            table_cell(&entry.risk_type),
            table_cell(&entry.snippet)
        )?;
    }

    Ok(())
}

fn inline(text: &str) -> String {
    text.split_whitespace().join(" ")
}

fn table_cell(text: &str) -> String {
    inline(text).replace('|', "\\|")
}

fn markdown_to_html(markdown: &str) -> String {
    let parser = Parser::new_ext(markdown, Options::ENABLE_TABLES);
    let mut body = String::new();
    html::push_html(&mut body, parser);

    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{REPORT_TITLE}</title>\n</head>\n<body>\n{body}</body>\n</html>\n"
    )
}
