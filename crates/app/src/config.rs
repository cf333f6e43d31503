use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

pub const DEFAULT_CONFIG_FILE: &str = "momo.toml";

/// Settings read from `momo.toml`. Command-line flags override these.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub input: PathBuf,
    pub processed_output: PathBuf,
    pub review_output: PathBuf,
    pub database: PathBuf,
    pub log_level: String,
    /// Rule table replacing the built-in one.
    pub rules: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            input: PathBuf::from("data/modified_sms_v2.xml"),
            processed_output: PathBuf::from("data/processed_sms_data.json"),
            review_output: PathBuf::from("data/unprocessed_sms_messages.json"),
            database: PathBuf::from("sms_data.db"),
            log_level: "info".to_string(),
            rules: None,
        }
    }
}

impl AppConfig {
    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// An explicit path must exist. Without one, `momo.toml` in the working
    /// directory is used when present, defaults otherwise.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p,
            None => {
                let default = Path::new(DEFAULT_CONFIG_FILE);
                if !default.exists() {
                    return Ok(Self::default());
                }
                default
            }
        };
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::from_toml(&content).with_context(|| format!("parsing config {}", path.display()))
    }
}
