//! Layered error definitions
//!
//! Categorized by source: input / processor / deadline / config

use thiserror::Error;

/// Unified error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Input Errors =====
    /// Malformed or missing input (file name, unsafe path)
    #[error("invalid input at '{field}': {message}")]
    InvalidInput { field: String, message: String },

    // ===== Processor Errors =====
    /// The downstream processor raised
    #[error("processor '{processor}' failed: {message}")]
    ProcessorFailure {
        processor: String,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    // ===== Deadline Errors =====
    /// Invocation deadline exceeded
    #[error("timeout: processing aborted after {waited_ms}ms")]
    Timeout { waited_ms: u64 },

    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    /// Secret not available from the environment
    #[error("secret '{name}' is not set")]
    MissingSecret { name: String },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ContractError {
    /// Create invalid input error
    pub fn invalid_input(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidInput {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create processor failure without an underlying cause
    pub fn processor_failure(processor: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ProcessorFailure {
            processor: processor.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Create processor failure wrapping the underlying cause
    pub fn processor_failure_with<E>(processor: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::ProcessorFailure {
            processor: processor.into(),
            message: source.to_string(),
            source: Some(Box::new(source)),
        }
    }

    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Short, stable label used for log fields and metric labels
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidInput { .. } => "invalid_input",
            Self::ProcessorFailure { .. } => "processor_failure",
            Self::Timeout { .. } => "timeout",
            Self::ConfigParse { .. } | Self::ConfigValidation { .. } => "config",
            Self::MissingSecret { .. } => "missing_secret",
            Self::Io(_) => "io",
        }
    }
}
