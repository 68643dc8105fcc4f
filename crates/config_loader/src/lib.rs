//! # Config Loader
//!
//! Configuration loading and parsing module.
//!
//! Responsibilities:
//! - Parse TOML/JSON configuration files
//! - Validate configuration legality
//! - Resolve the API key from the environment (never from the file)
//!
//! # Example
//!
//! ```no_run
//! use config_loader::ConfigLoader;
//! use std::path::Path;
//!
//! let config = ConfigLoader::load_from_path(Path::new("ingest.toml")).unwrap();
//! let api_key = ConfigLoader::resolve_api_key(&config.dispatcher).unwrap();
//! println!("Processor: {}", config.processor.name);
//! ```

mod parser;
mod validator;

pub use contracts::IngestConfig;
pub use parser::ConfigFormat;

use contracts::{ApiKey, ContractError, DispatcherSettings};
use std::path::Path;

/// Configuration loader
///
/// Provides static methods to load configuration from files or strings.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from file path
    ///
    /// Automatically detects format from file extension (.toml / .json).
    ///
    /// # Errors
    /// - File read failure
    /// - Unsupported format
    /// - Parse failure
    /// - Validation failure
    pub fn load_from_path(path: &Path) -> Result<IngestConfig, ContractError> {
        let format = ConfigFormat::from_path(path)?;
        let content = Self::read_file(path)?;
        Self::load_from_str(&content, format)
    }

    /// Load configuration from string
    ///
    /// # Errors
    /// - Parse failure
    /// - Validation failure
    pub fn load_from_str(content: &str, format: ConfigFormat) -> Result<IngestConfig, ContractError> {
        Self::parse_and_validate(content, format)
    }

    /// Serialize IngestConfig to TOML string
    pub fn to_toml(config: &IngestConfig) -> Result<String, ContractError> {
        toml::to_string_pretty(config)
            .map_err(|e| ContractError::config_parse(format!("TOML serialize error: {e}")))
    }

    /// Serialize IngestConfig to JSON string
    pub fn to_json(config: &IngestConfig) -> Result<String, ContractError> {
        serde_json::to_string_pretty(config)
            .map_err(|e| ContractError::config_parse(format!("JSON serialize error: {e}")))
    }

    /// Read the API key from the environment variable named by `settings.api_key_env`
    ///
    /// # Errors
    /// `MissingSecret` if the variable is unset or empty
    pub fn resolve_api_key(settings: &DispatcherSettings) -> Result<ApiKey, ContractError> {
        Self::resolve_api_key_with(settings, |name| std::env::var(name).ok())
    }

    /// Same as [`ConfigLoader::resolve_api_key`] with a custom lookup
    pub fn resolve_api_key_with<F>(
        settings: &DispatcherSettings,
        lookup: F,
    ) -> Result<ApiKey, ContractError>
    where
        F: FnOnce(&str) -> Option<String>,
    {
        match lookup(&settings.api_key_env) {
            Some(value) if !value.trim().is_empty() => Ok(ApiKey::new(value.trim())),
            _ => Err(ContractError::MissingSecret {
                name: settings.api_key_env.clone(),
            }),
        }
    }
}

impl ConfigLoader {
    /// Read configuration file content
    fn read_file(path: &Path) -> Result<String, ContractError> {
        Ok(std::fs::read_to_string(path)?)
    }

    /// Parse and validate configuration content
    fn parse_and_validate(
        content: &str,
        format: ConfigFormat,
    ) -> Result<IngestConfig, ContractError> {
        let config = parser::parse(content, format)?;
        validator::validate(&config)?;
        Ok(config)
    }
}
