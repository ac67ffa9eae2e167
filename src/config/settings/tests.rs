use super::*;
use tempfile::TempDir;

#[test]
fn default_config() {
    let config = Config::default();
    assert_eq!(config.server.bind, "127.0.0.1:8000");
    assert_eq!(config.ollama.protocol, "http");
    assert_eq!(config.ollama.host, "localhost");
    assert_eq!(config.ollama.port, 11434);
    assert_eq!(config.ollama.batch_size, 16);
    assert_eq!(config.chunking.max_chars, 800);
    assert_eq!(config.chunking.overlap, 150);
    assert_eq!(config.search.top_k, 5);
    assert!(!config.search.rerank);
    assert_eq!(config.embedding.provider, EmbeddingProvider::Ollama);
    assert_eq!(config.report.format, ReportFormat::Markdown);
    assert!(config.validate().is_ok());
}

#[test]
fn config_validation() {
    let config = Config::default();

    let mut invalid_config = config.clone();
    invalid_config.ollama.protocol = "ftp".to_string();
    assert!(invalid_config.validate().is_err());

    let mut invalid_config = config.clone();
    invalid_config.ollama.port = 0;
    assert!(invalid_config.validate().is_err());

    let mut invalid_config = config.clone();
    invalid_config.ollama.model = String::new();
    assert!(invalid_config.validate().is_err());

    let mut invalid_config = config.clone();
    invalid_config.ollama.batch_size = 1001;
    assert!(invalid_config.validate().is_err());

    let mut invalid_config = config.clone();
    invalid_config.server.bind = "not an address".to_string();
    assert!(matches!(
        invalid_config.validate(),
        Err(ConfigError::InvalidBindAddress(_))
    ));

    let mut invalid_config = config.clone();
    invalid_config.search.top_k = 0;
    assert!(matches!(
        invalid_config.validate(),
        Err(ConfigError::InvalidTopK(0))
    ));

    let mut invalid_config = config.clone();
    invalid_config.extraction.ocr_dpi = 20;
    assert!(matches!(
        invalid_config.validate(),
        Err(ConfigError::InvalidOcrDpi(20))
    ));

    let mut invalid_config = config.clone();
    invalid_config.extraction.ocr_concurrency = 0;
    assert!(matches!(
        invalid_config.validate(),
        Err(ConfigError::InvalidOcrConcurrency(0))
    ));

    let mut invalid_config = config;
    invalid_config.extraction.tesseract = " ".to_string();
    assert!(matches!(
        invalid_config.validate(),
        Err(ConfigError::InvalidCommand("tesseract"))
    ));
}

#[test]
fn chunking_validation() {
    let mut config = Config::default();

    config.chunking.max_chars = 0;
    assert!(matches!(
        config.validate(),
        Err(ConfigError::InvalidMaxChars(0))
    ));

    config.chunking.max_chars = 100;
    config.chunking.overlap = 100;
    assert!(matches!(
        config.validate(),
        Err(ConfigError::OverlapTooLarge(100, 100))
    ));

    config.chunking.overlap = 0;
    assert!(config.validate().is_ok());
}

#[test]
fn ollama_url_generation() {
    let config = Config::default();
    let url = config
        .ollama_url()
        .expect("should generate ollama_url successfully");
    assert_eq!(url.as_str(), "http://localhost:11434/");
}

#[test]
fn toml_serialization() {
    let config = Config::default();
    let toml_str = toml::to_string(&config).expect("should serialize toml correctly");
    let parsed_config: Config = toml::from_str(&toml_str).expect("should parse toml correctly");
    assert_eq!(config, parsed_config);
}

#[test]
fn partial_toml_uses_section_defaults() {
    let toml_str = r#"
        [embedding]
        provider = "hashing"

        [chunking]
        max_chars = 400
    "#;

    let config: Config = toml::from_str(toml_str).expect("should parse partial toml");
    assert_eq!(config.embedding.provider, EmbeddingProvider::Hashing);
    assert_eq!(config.chunking.max_chars, 400);
    assert_eq!(config.chunking.overlap, 150);
    assert_eq!(config.ollama, OllamaConfig::default());
}

#[test]
fn load_missing_file_yields_defaults() {
    let temp_dir = TempDir::new().expect("should create TempDir successfully");
    let config = Config::load(temp_dir.path()).expect("missing config should load");

    assert_eq!(config.base_dir, temp_dir.path());
    assert_eq!(config.server, ServerConfig::default());
}

#[test]
fn save_then_load() {
    let temp_dir = TempDir::new().expect("should create TempDir successfully");
    let mut config = Config::load(temp_dir.path()).expect("missing config should load");
    config.search.rerank = true;
    config.report.format = ReportFormat::Html;
    config.save().expect("config should save");

    let loaded = Config::load(temp_dir.path()).expect("saved config should load");
    assert_eq!(config, loaded);
}

#[test]
fn load_rejects_invalid_file() {
    let temp_dir = TempDir::new().expect("should create TempDir successfully");
    fs::write(
        temp_dir.path().join("config.toml"),
        "[search]\ntop_k = 0\n",
    )
    .expect("should write config");

    assert!(Config::load(temp_dir.path()).is_err());
}

#[test]
fn load_rules_from_relative_path() {
    let temp_dir = TempDir::new().expect("should create TempDir successfully");
    fs::write(
        temp_dir.path().join("rules.toml"),
        r#"
            [[risk_rules]]
            risk_type = "Change of Control"
            severity = "High"
            keywords = ["change of control"]
        "#,
    )
    .expect("should write rules");

    let config = Config {
        rules_file: Some(PathBuf::from("rules.toml")),
        base_dir: temp_dir.path().to_path_buf(),
        ..Config::default()
    };

    let rules = config.load_rules().expect("rules should load");
    assert_eq!(rules.risk_rules.len(), 1);
    assert_eq!(rules.risk_rules[0].risk_type, "Change of Control");
    assert!(!rules.flag_rules.is_empty());
}
