use clap::{Parser, Subcommand};
use legal_diligence::Result;
use legal_diligence::commands::{analyze, serve};
use legal_diligence::config::{Config, get_config_dir, init_config, show_config};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "legal-diligence")]
#[command(about = "Legal due-diligence retrieval and risk analysis over uploaded documents")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API server
    Serve {
        /// Override the bind address, e.g. "0.0.0.0:8000"
        #[arg(long)]
        bind: Option<String>,
    },
    /// Show or initialise the configuration file
    Config {
        /// Show current configuration
        #[arg(long)]
        show: bool,
        /// Write a default configuration file if none exists
        #[arg(long, conflicts_with = "show")]
        init: bool,
    },
    /// Analyse local documents and print the due-diligence summary
    Analyze {
        /// Documents to ingest (PDF or plain text)
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Use OCR instead of the embedded text layer
        #[arg(long)]
        ocr: bool,
        /// Write the rendered report to this path
        #[arg(long)]
        report: Option<PathBuf>,
        /// Ask a question against the ingested documents
        #[arg(long)]
        question: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config_dir = get_config_dir()?;

    match cli.command {
        Commands::Config { init, .. } => {
            if init {
                init_config(&config_dir)?;
            } else {
                show_config(&Config::load(&config_dir)?)?;
            }
        }
        Commands::Serve { bind } => {
            serve(&Config::load(&config_dir)?, bind).await?;
        }
        Commands::Analyze {
            files,
            ocr,
            report,
            question,
        } => {
            analyze(
                &Config::load(&config_dir)?,
                &files,
                ocr,
                report.as_deref(),
                question.as_deref(),
            )
            .await?;
        }
    }

    Ok(())
}
