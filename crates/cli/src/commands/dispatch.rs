//! `dispatch` command implementation.

use anyhow::{Context, Result};
use contracts::{ApiKey, ContractError, DispatcherSettings};
use tracing::{info, warn};

use crate::cli::DispatchArgs;
use crate::host::{BlobRef, TriggerHost};

/// Execute the `dispatch` command
pub async fn run_dispatch(args: &DispatchArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration");

    if !args.config.exists() {
        anyhow::bail!("Configuration file not found: {}", args.config.display());
    }

    let mut config = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    // Apply CLI overrides
    if args.timeout_ms > 0 {
        info!(timeout_ms = args.timeout_ms, "Overriding deadline from CLI");
        config.dispatcher.timeout_ms = Some(args.timeout_ms);
    }

    let blobs = collect_blobs(args)?;

    let api_key = resolve_api_key(args, &config.dispatcher, |name| std::env::var(name).ok())
        .context("API key not available")?;

    info!(
        processor = %config.processor.name,
        processor_type = %config.processor.processor_type,
        timeout_ms = ?config.dispatcher.timeout_ms,
        context_entries = config.context.len(),
        files = blobs.len(),
        "Configuration loaded"
    );

    if args.dry_run {
        info!("Dry run mode - configuration and inputs are valid, exiting");
        for blob in &blobs {
            println!("{} -> {}", blob.path.display(), blob.name);
        }
        return Ok(());
    }

    if args.metrics_port > 0 {
        observability::init_metrics_only(args.metrics_port)?;
    }

    let dispatcher = dispatcher::create_dispatcher(&config, api_key)
        .context("Failed to create dispatcher")?;
    let host = TriggerHost::new(dispatcher, args.concurrency);

    tokio::select! {
        stats = host.run(blobs) => {
            let total = stats.succeeded() + stats.failed();
            info!(
                succeeded = stats.succeeded(),
                failed = stats.failed(),
                duration_secs = stats.duration.as_secs_f64(),
                "Dispatch finished"
            );
            stats.print_summary();

            if stats.failed() > 0 {
                anyhow::bail!("{} of {} files failed", stats.failed(), total);
            }
        }
        _ = shutdown_signal() => {
            warn!("Received shutdown signal, abandoning in-flight invocations");
            anyhow::bail!("Interrupted");
        }
    }

    Ok(())
}

/// `--api-key` if given, else the variable named by `dispatcher.api_key_env`
fn resolve_api_key<F>(
    args: &DispatchArgs,
    settings: &DispatcherSettings,
    lookup: F,
) -> Result<ApiKey, ContractError>
where
    F: FnOnce(&str) -> Option<String>,
{
    match args.api_key.as_deref() {
        Some(key) if !key.trim().is_empty() => Ok(ApiKey::new(key.trim())),
        _ => config_loader::ConfigLoader::resolve_api_key_with(settings, lookup),
    }
}

/// Resolve the blob list from CLI arguments
fn collect_blobs(args: &DispatchArgs) -> Result<Vec<BlobRef>> {
    if args.name.is_some() && args.files.len() != 1 {
        anyhow::bail!("--name can only be used with a single file");
    }

    let mut blobs = Vec::with_capacity(args.files.len());
    for path in &args.files {
        if !path.is_file() {
            anyhow::bail!("Not a file: {}", path.display());
        }
        let mut blob = BlobRef::from_path(path.clone());
        if let Some(name) = &args.name {
            blob.name = name.clone();
        }
        blobs.push(blob);
    }
    Ok(blobs)
}

/// Resolve on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
