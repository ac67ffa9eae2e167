// Configuration management module
// TOML settings plus helpers for showing and initialising them

pub mod display;
pub mod settings;

pub use display::{init_config, show_config};
pub use settings::{
    Config, ConfigError, EmbeddingConfig, EmbeddingProvider, ExtractionConfig, OllamaConfig,
    ReportConfig, ReportFormat, SearchConfig, ServerConfig,
};

/// Get the configuration directory path
#[inline]
pub fn get_config_dir() -> Result<std::path::PathBuf, ConfigError> {
    Config::config_dir()
}
