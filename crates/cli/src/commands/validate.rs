//! `validate` command implementation.

use anyhow::{Context, Result};
use contracts::{IngestConfig, ProcessorType};
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    version: String,
    processor: String,
    processor_type: String,
    timeout_ms: Option<u64>,
    api_key_env: String,
    context_entries: usize,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("File not found: {}", args.config.display())),
            warnings: None,
            summary: None,
        };
    }

    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(config) => {
            let warnings = collect_warnings(&config, |name| std::env::var(name).ok());
            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: if warnings.is_empty() {
                    None
                } else {
                    Some(warnings)
                },
                summary: Some(ConfigSummary {
                    version: format!("{:?}", config.version),
                    processor: config.processor.name.clone(),
                    processor_type: config.processor.processor_type.to_string(),
                    timeout_ms: config.dispatcher.timeout_ms,
                    api_key_env: config.dispatcher.api_key_env.clone(),
                    context_entries: config.context.len(),
                }),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings<F>(config: &IngestConfig, lookup: F) -> Vec<String>
where
    F: Fn(&str) -> Option<String>,
{
    let mut warnings = Vec::new();

    if config.dispatcher.timeout_ms.is_none() {
        warnings.push("dispatcher.timeout_ms not set - invocations have no deadline".to_string());
    }

    if config_loader::ConfigLoader::resolve_api_key_with(&config.dispatcher, lookup).is_err() {
        warnings.push(format!(
            "{} is not set - pass --api-key or export it before dispatching",
            config.dispatcher.api_key_env
        ));
    }

    if config.processor.processor_type == ProcessorType::File
        && !config.processor.params.contains_key("base_path")
    {
        warnings.push("processor.params.base_path not set - using ./processed".to_string());
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Version: {}", summary.version);
            println!(
                "  Processor: {} ({})",
                summary.processor, summary.processor_type
            );
            match summary.timeout_ms {
                Some(ms) => println!("  Timeout: {} ms", ms),
                None => println!("  Timeout: none"),
            }
            println!("  API key env: {}", summary.api_key_env);
            println!("  Extra context entries: {}", summary.context_entries);
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}
