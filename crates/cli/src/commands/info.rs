//! `info` command implementation.

use std::collections::{BTreeMap, HashMap};

use anyhow::{Context, Result};
use contracts::{IngestConfig, API_KEY_HEADER, CONTAINER_NAME_KEY};
use serde::Serialize;
use tracing::info;

use crate::cli::InfoArgs;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    version: String,
    dispatcher: DispatcherInfo,
    processor: ProcessorInfo,
    /// Keys every request context will carry
    context_keys: Vec<String>,
}

#[derive(Serialize)]
struct DispatcherInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    timeout_ms: Option<u64>,
    api_key_env: String,
}

#[derive(Serialize)]
struct ProcessorInfo {
    name: String,
    processor_type: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    params: BTreeMap<String, String>,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration info");

    if !args.config.exists() {
        anyhow::bail!("Configuration file not found: {}", args.config.display());
    }

    let config = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    let info = build_config_info(&config, args);
    if args.json {
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&info);
    }

    Ok(())
}

fn build_config_info(config: &IngestConfig, args: &InfoArgs) -> ConfigInfo {
    let params = if args.params {
        sorted(&config.processor.params)
    } else {
        BTreeMap::new()
    };

    let mut context_keys = vec![API_KEY_HEADER.to_string(), CONTAINER_NAME_KEY.to_string()];
    context_keys.extend(config.context.keys().cloned());

    ConfigInfo {
        version: format!("{:?}", config.version),
        dispatcher: DispatcherInfo {
            timeout_ms: config.dispatcher.timeout_ms,
            api_key_env: config.dispatcher.api_key_env.clone(),
        },
        processor: ProcessorInfo {
            name: config.processor.name.clone(),
            processor_type: config.processor.processor_type.to_string(),
            params,
        },
        context_keys,
    }
}

fn sorted(params: &HashMap<String, String>) -> BTreeMap<String, String> {
    params.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
}

fn print_config_info(info: &ConfigInfo) {
    println!("=== Ingest Dispatch Configuration ===\n");

    println!("Dispatcher");
    println!("   ├─ Version: {}", info.version);
    match info.dispatcher.timeout_ms {
        Some(ms) => println!("   ├─ Timeout: {} ms", ms),
        None => println!("   ├─ Timeout: none"),
    }
    println!("   └─ API key env: {}", info.dispatcher.api_key_env);

    println!("\nProcessor");
    println!("   ├─ Name: {}", info.processor.name);
    if info.processor.params.is_empty() {
        println!("   └─ Type: {}", info.processor.processor_type);
    } else {
        println!("   ├─ Type: {}", info.processor.processor_type);
        println!("   └─ Params:");
        for (key, value) in &info.processor.params {
            println!("        {} = {}", key, value);
        }
    }

    println!("\nRequest context keys");
    for (i, key) in info.context_keys.iter().enumerate() {
        let prefix = if i == info.context_keys.len() - 1 {
            "└─"
        } else {
            "├─"
        };
        println!("   {} {}", prefix, key);
    }
}
