//! Application configuration for the blueprint annotator.
//!
//! User config lives at `~/.blueprint-annotator/annotator.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{AnnotatorError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "annotator.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".blueprint-annotator";

// ---------------------------------------------------------------------------
// Config structs (matching annotator.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Generation service settings.
    #[serde(default)]
    pub gemini: GeminiConfig,

    /// Which document to load and how to split it.
    #[serde(default)]
    pub document: DocumentConfig,

    /// Safety auditor settings.
    #[serde(default)]
    pub auditor: AuditorConfig,
}

/// `[gemini]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiConfig {
    /// Name of the env var holding the API key (never store the key itself).
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Service root, without the `/v1beta` path.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Model for explanations, keywords and audits.
    #[serde(default = "default_model")]
    pub model: String,

    /// Model for hypothesis generation.
    #[serde(default = "default_creative_model")]
    pub creative_model: String,

    /// Per-request timeout.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_api_key_env(),
            base_url: default_base_url(),
            model: default_model(),
            creative_model: default_creative_model(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_api_key_env() -> String {
    "GEMINI_API_KEY".into()
}
fn default_base_url() -> String {
    "https://generativelanguage.googleapis.com".into()
}
fn default_model() -> String {
    "gemini-2.5-flash".into()
}
fn default_creative_model() -> String {
    "gemini-2.5-pro".into()
}
fn default_timeout_secs() -> u64 {
    60
}

/// How `\subsection` blocks are represented in the parsed document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubsectionMode {
    /// Each subsection is its own level-2 entry; the parent keeps only its preface.
    #[default]
    Separate,
    /// Subsections stay inside the parent's content; one entry per `\section`.
    Folded,
}

/// `[document]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentConfig {
    /// Document to load instead of the bundled blueprint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// Subsection handling.
    #[serde(default)]
    pub subsections: SubsectionMode,
}

/// `[auditor]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditorConfig {
    /// Directory of `*.txt` rubrics replacing the bundled set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rubric_dir: Option<String>,

    /// How much of the audited text is embedded in the rubric prompt.
    #[serde(default = "default_excerpt_chars")]
    pub excerpt_chars: usize,

    /// Fixed seed for the information-integration metric.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub integration_seed: Option<u64>,
}

impl Default for AuditorConfig {
    fn default() -> Self {
        Self {
            rubric_dir: None,
            excerpt_chars: default_excerpt_chars(),
            integration_seed: None,
        }
    }
}

fn default_excerpt_chars() -> usize {
    2000
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.blueprint-annotator/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| AnnotatorError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.blueprint-annotator/annotator.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| AnnotatorError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| AnnotatorError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| AnnotatorError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| AnnotatorError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| AnnotatorError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Read the API key named by `[gemini].api_key_env`.
pub fn resolve_api_key(config: &AppConfig) -> Result<String> {
    let var_name = &config.gemini.api_key_env;
    match std::env::var(var_name) {
        Ok(val) if !val.is_empty() => Ok(val),
        _ => Err(AnnotatorError::config(format!(
            "Gemini API key not found. Set the {var_name} environment variable.\n\
             Get a key at https://aistudio.google.com/apikey"
        ))),
    }
}

/// Check that the API key env var is set and non-empty.
pub fn validate_api_key(config: &AppConfig) -> Result<()> {
    resolve_api_key(config).map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("GEMINI_API_KEY"));
        assert!(toml_str.contains("excerpt_chars"));
        assert!(toml_str.contains("subsections = \"separate\""));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.gemini.model, "gemini-2.5-flash");
        assert_eq!(parsed.gemini.creative_model, "gemini-2.5-pro");
        assert_eq!(parsed.auditor.excerpt_chars, 2000);
        assert!(parsed.auditor.integration_seed.is_none());
    }

    #[test]
    fn partial_config_fills_defaults() {
        let toml_str = r#"
[document]
path = "/tmp/paper.tex"
subsections = "folded"

[auditor]
integration_seed = 7
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.document.path.as_deref(), Some("/tmp/paper.tex"));
        assert_eq!(config.document.subsections, SubsectionMode::Folded);
        assert_eq!(config.auditor.integration_seed, Some(7));
        assert_eq!(config.auditor.excerpt_chars, 2000);
        assert_eq!(config.gemini.timeout_secs, 60);
    }

    #[test]
    fn load_config_from_reports_bad_toml() {
        let path = std::env::temp_dir().join("annotator-bad-config-test.toml");
        std::fs::write(&path, "[gemini\nmodel = ").expect("write temp config");
        let err = load_config_from(&path).unwrap_err();
        assert!(err.to_string().contains("failed to parse"));
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn api_key_validation() {
        let mut config = AppConfig::default();
        // Use a unique env var name to avoid interfering with other tests
        config.gemini.api_key_env = "ANNOTATOR_TEST_NONEXISTENT_KEY_12345".into();
        let result = validate_api_key(&config);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("API key not found"));
    }
}
