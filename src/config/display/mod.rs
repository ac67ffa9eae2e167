
use anyhow::{Context, Result};
use console::style;
use std::path::{Path, PathBuf};

use super::{Config, EmbeddingProvider};

/// Print the effective configuration to stderr
#[inline]
pub fn show_config(config: &Config) -> Result<()> {
    eprintln!("{}", style("📋 Current Configuration").bold().cyan());
    eprintln!();

    eprintln!("{}", style("Server:").bold().yellow());
    eprintln!("  Bind: {}", style(&config.server.bind).cyan());
    eprintln!(
        "  Max Upload: {} bytes",
        style(config.server.max_upload_bytes).cyan()
    );

    eprintln!();
    eprintln!("{}", style("Embeddings:").bold().yellow());
    match config.embedding.provider {
        EmbeddingProvider::Ollama => {
            eprintln!("  Provider: {}", style("ollama").cyan());
            eprintln!("  Model: {}", style(&config.ollama.model).cyan());
            eprintln!("  Batch Size: {}", style(config.ollama.batch_size).cyan());
        }
        EmbeddingProvider::Hashing => {
            eprintln!("  Provider: {}", style("hashing").cyan());
            eprintln!(
                "  Dimension: {}",
                style(config.embedding.hashing_dimension).cyan()
            );
        }
    }
    eprintln!(
        "  Generation Model: {}",
        style(&config.ollama.generation_model).cyan()
    );
    match config.ollama_url() {
        Ok(url) => eprintln!("  Ollama URL: {}", style(url).cyan()),
        Err(e) => eprintln!("  Ollama URL: {} ({})", style("Invalid").red(), e),
    }

    eprintln!();
    eprintln!("{}", style("Pipeline:").bold().yellow());
    eprintln!(
        "  Chunking: {} chars, {} overlap",
        style(config.chunking.max_chars).cyan(),
        style(config.chunking.overlap).cyan()
    );
    eprintln!(
        "  Search: top {} (rerank: {}, keep {})",
        style(config.search.top_k).cyan(),
        style(config.search.rerank).cyan(),
        style(config.search.rerank_top_k).cyan()
    );
    eprintln!(
        "  OCR: {} dpi, {} concurrent pages",
        style(config.extraction.ocr_dpi).cyan(),
        style(config.extraction.ocr_concurrency).cyan()
    );
    eprintln!("  Report: {:?}", style(config.report.format).cyan());
    match &config.rules_file {
        Some(path) => eprintln!("  Rules: {}", style(path.display()).cyan()),
        None => eprintln!("  Rules: {}", style("built-in").cyan()),
    }

    eprintln!();
    eprintln!(
        "Config file: {}",
        style(config.config_file_path().display()).dim()
    );

    Ok(())
}

/// Write the default configuration into `config_dir` unless a file already exists
#[inline]
pub fn init_config(config_dir: &Path) -> Result<PathBuf> {
    let config = Config::load(config_dir).context("Failed to load configuration")?;
    let path = config.config_file_path();

    if path.exists() {
        eprintln!(
            "{}",
            style("Configuration already exists, leaving it unchanged.").yellow()
        );
        return Ok(path);
    }

    config.save().context("Failed to save configuration")?;
    eprintln!(
        "{} {}",
        style("✓ Configuration written to").green(),
        style(path.display()).cyan()
    );
    Ok(path)
}
