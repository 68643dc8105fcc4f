//! Processor implementations
//!
//! Contains LogProcessor, FileProcessor, and NetworkProcessor, plus the
//! config-driven `ConfiguredProcessor`.

mod file;
mod log;
mod network;

pub use self::file::{FileProcessor, FileProcessorConfig};
pub use self::log::LogProcessor;
pub use self::network::{decode_response, encode_request, NetworkProcessor, NetworkProcessorConfig};

use contracts::{
    ContractError, ProcessingResult, Processor, ProcessorConfig, ProcessorType, RequestContext,
};
use tokio::io::AsyncRead;
use tracing::instrument;

use crate::error::DispatcherError;

/// Processor selected by configuration
pub enum ConfiguredProcessor {
    Log(LogProcessor),
    File(FileProcessor),
    Network(NetworkProcessor),
}

impl Processor for ConfiguredProcessor {
    fn name(&self) -> &str {
        match self {
            Self::Log(p) => p.name(),
            Self::File(p) => p.name(),
            Self::Network(p) => p.name(),
        }
    }

    async fn run<R>(
        &self,
        context: RequestContext,
        content: &mut R,
    ) -> Result<ProcessingResult, ContractError>
    where
        R: AsyncRead + Unpin + Send,
    {
        match self {
            Self::Log(p) => p.run(context, content).await,
            Self::File(p) => p.run(context, content).await,
            Self::Network(p) => p.run(context, content).await,
        }
    }
}

/// Create a processor from configuration
#[instrument(
    name = "dispatcher_create_processor",
    skip(config),
    fields(processor = %config.name, processor_type = %config.processor_type)
)]
pub fn create_processor(config: &ProcessorConfig) -> Result<ConfiguredProcessor, DispatcherError> {
    match config.processor_type {
        ProcessorType::Log => Ok(ConfiguredProcessor::Log(LogProcessor::new(&config.name))),
        ProcessorType::File => {
            let processor = FileProcessor::from_params(&config.name, &config.params)
                .map_err(|e| DispatcherError::processor_creation(&config.name, e.to_string()))?;
            Ok(ConfiguredProcessor::File(processor))
        }
        ProcessorType::Network => {
            let processor = NetworkProcessor::from_params(&config.name, &config.params)
                .map_err(|e| DispatcherError::processor_creation(&config.name, e))?;
            Ok(ConfiguredProcessor::Network(processor))
        }
    }
}
