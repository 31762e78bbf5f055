use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::OnceLock;
use thiserror::Error;

use crate::types::UpiProvider;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid extraction config: {0}")]
    Invalid(String),
    #[error("Extraction config already installed")]
    AlreadyInstalled,
}

/// Keyword substrings that identify one provider's screen layout.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProviderKeywords {
    pub provider: UpiProvider,
    pub keywords: Vec<String>,
}

/// Declarative tables driving extraction. List order is the tie-break:
/// the first label / provider that matches wins.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ExtractionConfig {
    /// Language hint passed to the OCR engine.
    pub language: String,
    pub payee_labels: Vec<String>,
    pub providers: Vec<ProviderKeywords>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            language: "eng".to_string(),
            payee_labels: [
                "to",
                "pay to",
                "receiver",
                "recipient",
                "paid to",
                "beneficiary",
                "credited to",
                "banking name",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            providers: vec![
                ProviderKeywords {
                    provider: UpiProvider::Gpay,
                    keywords: vec![
                        "google pay".into(),
                        "gpay".into(),
                        "google transaction id".into(),
                    ],
                },
                ProviderKeywords {
                    provider: UpiProvider::Phonepe,
                    keywords: vec![
                        "phonepe".into(),
                        "contact phonepe".into(),
                        "powered by phonepe".into(),
                    ],
                },
            ],
        }
    }
}

static GLOBAL: OnceLock<ExtractionConfig> = OnceLock::new();

impl ExtractionConfig {
    pub fn from_toml(toml_content: &str) -> Result<Self, ConfigError> {
        let config: ExtractionConfig = toml::from_str(toml_content)?;
        config.validated()
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Set the process-wide config. Call once at startup, before the first
    /// extraction; later calls fail.
    pub fn install(config: ExtractionConfig) -> Result<(), ConfigError> {
        let config = config.validated()?;
        GLOBAL.set(config).map_err(|_| ConfigError::AlreadyInstalled)
    }

    /// The process-wide config, falling back to the built-in tables if none
    /// was installed.
    pub fn global() -> &'static ExtractionConfig {
        GLOBAL.get_or_init(ExtractionConfig::default)
    }

    fn validated(self) -> Result<Self, ConfigError> {
        if self.payee_labels.is_empty() {
            return Err(ConfigError::Invalid("payee_labels must not be empty".into()));
        }
        if self.payee_labels.iter().any(|l| l.trim().is_empty()) {
            return Err(ConfigError::Invalid("payee label must not be blank".into()));
        }
        for entry in &self.providers {
            if entry.keywords.iter().any(|k| k.trim().is_empty()) {
                return Err(ConfigError::Invalid(format!(
                    "blank keyword for provider '{}'",
                    entry.provider
                )));
            }
        }
        Ok(self)
    }
}
