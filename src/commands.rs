use anyhow::{Context, Result};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::config::Config;
use crate::session::Workspace;

/// Start the HTTP server
#[inline]
pub async fn serve(config: &Config, bind: Option<String>) -> Result<()> {
    let mut config = config.clone();
    if let Some(bind) = bind {
        config.server.bind = bind;
    }
    config
        .server
        .validate()
        .context("Invalid server configuration")?;

    info!("Starting legal-diligence server on {}", config.server.bind);
    crate::http::serve(&config).await
}

/// Ingest local files into a fresh workspace and print the diligence summary
#[inline]
pub async fn analyze(
    config: &Config,
    files: &[PathBuf],
    use_ocr: bool,
    report_path: Option<&Path>,
    question: Option<&str>,
) -> Result<()> {
    let workspace = Workspace::from_config(config)?;

    let progress = ProgressBar::new(files.len() as u64);
    progress.set_style(
        ProgressStyle::with_template("{spinner} [{bar:30}] {pos}/{len} {msg}")
            .context("Invalid progress template")?
            .progress_chars("=> "),
    );

    let mut indexed = 0_usize;
    for path in files {
        let name = path
            .file_name()
            .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned());
        progress.set_message(name.clone());

        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;

        match workspace.ingest(&bytes, &name, use_ocr, false).await {
            Ok(report) => {
                indexed += 1;
                progress.println(format!(
                    "{} {} ({}, {} passages, {} risks)",
                    style("✓").green(),
                    report.document_name,
                    report.document_type,
                    report.passages,
                    report.risks
                ));
            }
            Err(e) => {
                warn!("Skipping {}: {}", name, e);
                progress.println(format!("{} {}: {}", style("✗").red(), name, e));
            }
        }
        progress.inc(1);
    }
    progress.finish_and_clear();

    if indexed == 0 {
        println!("{}", style("No documents could be indexed").yellow());
        return Ok(());
    }

    let summary = workspace.summary();
    println!("{}", style("Due Diligence Summary").bold().cyan());
    println!(
        "{}",
        serde_json::to_string_pretty(&*summary).context("Failed to serialize summary")?
    );

    if let Some(path) = report_path {
        let report = workspace.report()?;
        tokio::fs::write(path, &report.bytes)
            .await
            .with_context(|| format!("Failed to write report to {}", path.display()))?;
        println!(
            "Report written to {}",
            style(path.display()).cyan()
        );
    }

    if let Some(question) = question {
        let answer = workspace.ask(question).await?;
        println!();
        println!("{} {}", style("Q:").bold().yellow(), question);
        println!("{} {}", style("A:").bold().green(), answer.answer);
        for source in &answer.sources {
            println!(
                "  {} {} p.{} ({:.1}%)",
                style(format!("[{}]", source.rank)).dim(),
                source.passage.document_name,
                source.passage.page_number,
                source.confidence_pct
            );
        }
    }

    Ok(())
}
