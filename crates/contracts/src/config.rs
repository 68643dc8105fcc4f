//! Ingestion configuration schema
//!
//! Loaded from TOML/JSON by `config_loader`. The credential itself is never part of
//! the file; only the name of the environment variable holding it.

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Top-level configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct IngestConfig {
    /// Config version
    #[serde(default)]
    pub version: ConfigVersion,

    /// Dispatcher settings
    #[serde(default)]
    #[validate(nested)]
    pub dispatcher: DispatcherSettings,

    /// Downstream processor
    #[validate(nested)]
    pub processor: ProcessorConfig,

    /// Static entries added to every request context
    #[serde(default)]
    pub context: BTreeMap<String, String>,
}

/// Config version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    #[serde(rename = "1")]
    V1,
}

/// Dispatcher-level settings
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct DispatcherSettings {
    /// Per-invocation deadline in milliseconds (None = no deadline)
    #[serde(default)]
    #[validate(range(min = 1))]
    pub timeout_ms: Option<u64>,

    /// Environment variable holding the API key
    #[serde(default = "default_api_key_env")]
    #[validate(length(min = 1))]
    pub api_key_env: String,
}

impl DispatcherSettings {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }
}

impl Default for DispatcherSettings {
    fn default() -> Self {
        Self {
            timeout_ms: None,
            api_key_env: default_api_key_env(),
        }
    }
}

fn default_api_key_env() -> String {
    "INGEST_API_KEY".to_string()
}

/// Processor configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ProcessorConfig {
    /// Processor name
    #[validate(length(min = 1))]
    pub name: String,

    /// Processor type
    pub processor_type: ProcessorType,

    /// Type-specific parameters
    #[serde(default)]
    pub params: HashMap<String, String>,
}

/// Processor type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessorType {
    /// Drain and log
    Log,
    /// Persist to a local directory
    File,
    /// Forward to a remote orchestration endpoint (TCP)
    Network,
}

impl std::fmt::Display for ProcessorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Log => "log",
            Self::File => "file",
            Self::Network => "network",
        };
        f.write_str(s)
    }
}
