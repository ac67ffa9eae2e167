use thiserror::Error;

pub type Result<T> = std::result::Result<T, DiligenceError>;

#[derive(Error, Debug)]
pub enum DiligenceError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Extraction error: {0}")]
    Extraction(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Index error: {0}")]
    Index(String),

    #[error("Generation error: {0}")]
    Generation(String),

    #[error("Report error: {0}")]
    Report(String),

    #[error("No documents uploaded")]
    NoDocuments,

    #[error("Invalid request: {0}")]
    InvalidInput(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

impl From<config::ConfigError> for DiligenceError {
    #[inline]
    fn from(error: config::ConfigError) -> Self {
        Self::Config(error.to_string())
    }
}

pub mod answer;
pub mod commands;
pub mod config;
pub mod embeddings;
pub mod extraction;
pub mod http;
pub mod report;
pub mod risk;
pub mod search;
pub mod session;
