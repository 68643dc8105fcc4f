//! IngestionDispatcher - one incoming file, one context, one processor call

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::AsyncRead;
use tokio::time::{timeout_at, Instant};
use tracing::{error, info, instrument};

use contracts::{
    ApiKey, ContractError, IncomingFile, IngestConfig, ProcessingResult, Processor,
    RequestContext,
};

use crate::error::DispatcherError;
use crate::metrics::DispatchMetrics;
use crate::processors::{create_processor, ConfiguredProcessor};
use crate::reader::CountingReader;

/// Settings injected at startup
#[derive(Debug, Clone)]
pub struct DispatchSettings {
    /// Credential placed under `x-api-key`
    pub api_key: ApiKey,
    /// Default per-invocation deadline
    pub timeout: Option<Duration>,
    /// Static entries added to every context
    pub extra_context: BTreeMap<String, String>,
}

impl DispatchSettings {
    pub fn new(api_key: ApiKey) -> Self {
        Self {
            api_key,
            timeout: None,
            extra_context: BTreeMap::new(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_context_entry(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_context.insert(key.into(), value.into());
        self
    }
}

/// Build a dispatcher from loaded configuration and a resolved API key
#[instrument(
    name = "dispatcher_create",
    skip(config, api_key),
    fields(processor = %config.processor.name, processor_type = %config.processor.processor_type)
)]
pub fn create_dispatcher(
    config: &IngestConfig,
    api_key: ApiKey,
) -> Result<IngestionDispatcher<ConfiguredProcessor>, DispatcherError> {
    if api_key.is_empty() {
        return Err(ContractError::MissingSecret {
            name: config.dispatcher.api_key_env.clone(),
        }
        .into());
    }

    let processor = create_processor(&config.processor)?;
    let settings = DispatchSettings {
        api_key,
        timeout: config.dispatcher.timeout(),
        extra_context: config.context.clone(),
    };

    Ok(IngestionDispatcher::new(processor, settings))
}

/// Stateless dispatcher; safe to share across concurrent invocations
pub struct IngestionDispatcher<P> {
    processor: P,
    settings: DispatchSettings,
    metrics: Arc<DispatchMetrics>,
}

impl<P: Processor + Sync> IngestionDispatcher<P> {
    pub fn new(processor: P, settings: DispatchSettings) -> Self {
        Self {
            processor,
            settings,
            metrics: Arc::new(DispatchMetrics::new()),
        }
    }

    pub fn processor(&self) -> &P {
        &self.processor
    }

    pub fn settings(&self) -> &DispatchSettings {
        &self.settings
    }

    /// Get shared metrics
    pub fn metrics(&self) -> &Arc<DispatchMetrics> {
        &self.metrics
    }

    /// Context for `file_name`: credential, file name, then configured extras
    pub fn build_context(&self, file_name: &str) -> RequestContext {
        let mut context = RequestContext::for_file(&self.settings.api_key, file_name);
        context.extend_missing(&self.settings.extra_context);
        context
    }

    /// Handle one file using the configured default deadline
    pub async fn handle<R>(&self, file: IncomingFile<R>) -> Result<ProcessingResult, ContractError>
    where
        R: AsyncRead + Unpin + Send,
    {
        let deadline = self.settings.timeout.map(|t| Instant::now() + t);
        self.handle_until(file, deadline).await
    }

    /// Handle one file, aborting the processor once `deadline` passes
    ///
    /// The result string is logged at INFO; any error is logged at ERROR and
    /// returned exactly as produced.
    #[instrument(
        name = "dispatcher_handle",
        skip(self, file, deadline),
        fields(file = %file.name, processor = %self.processor.name())
    )]
    pub async fn handle_until<R>(
        &self,
        file: IncomingFile<R>,
        deadline: Option<Instant>,
    ) -> Result<ProcessingResult, ContractError>
    where
        R: AsyncRead + Unpin + Send,
    {
        let started = Instant::now();
        let processor = self.processor.name();
        self.metrics.inc_received();
        observability::record_file_received(processor);

        let (name, content) = file.into_parts();
        let mut reader = CountingReader::new(content);
        let result = self.dispatch(&name, &mut reader, deadline, started).await;

        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
        let bytes = reader.bytes_read();
        self.metrics.add_bytes_read(bytes);
        observability::record_bytes_read(processor, bytes);
        observability::record_dispatch_latency_ms(processor, elapsed_ms);

        match &result {
            Ok(outcome) => {
                self.metrics.inc_succeeded();
                observability::record_dispatch_outcome(processor, "success");
                info!(file = %name, processor, bytes, elapsed_ms, "{}", outcome);
            }
            Err(e) => {
                self.metrics.record_failure(e);
                observability::record_dispatch_outcome(processor, e.kind());
                error!(
                    file = %name,
                    processor,
                    kind = e.kind(),
                    error = %e,
                    bytes,
                    elapsed_ms,
                    "Dispatch failed"
                );
            }
        }

        result
    }

    async fn dispatch<R>(
        &self,
        name: &str,
        reader: &mut R,
        deadline: Option<Instant>,
        started: Instant,
    ) -> Result<ProcessingResult, ContractError>
    where
        R: AsyncRead + Unpin + Send,
    {
        validate_name(name)?;

        let context = self.build_context(name);
        let run = self.processor.run(context, reader);

        match deadline {
            Some(deadline) => timeout_at(deadline, run).await.map_err(|_| ContractError::Timeout {
                waited_ms: started.elapsed().as_millis() as u64,
            })?,
            None => run.await,
        }
    }
}

/// Reject names the processor could not meaningfully address
fn validate_name(name: &str) -> Result<(), ContractError> {
    if name.trim().is_empty() {
        return Err(ContractError::invalid_input(
            "file.name",
            "file name must not be empty",
        ));
    }
    if name.chars().any(char::is_control) {
        return Err(ContractError::invalid_input(
            "file.name",
            "file name contains control characters",
        ));
    }
    Ok(())
}
