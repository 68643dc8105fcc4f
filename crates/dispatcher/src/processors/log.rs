//! LogProcessor - drains the stream and logs a summary via tracing

use contracts::{ContractError, ProcessingResult, Processor, RequestContext};
use tokio::io::AsyncRead;
use tracing::{info, instrument};

/// Processor that consumes the file and reports it, for dry runs and debugging
pub struct LogProcessor {
    name: String,
}

impl LogProcessor {
    /// Create a new LogProcessor with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Processor for LogProcessor {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(name = "log_processor_run", skip(self, context, content), fields(processor = %self.name))]
    async fn run<R>(
        &self,
        context: RequestContext,
        content: &mut R,
    ) -> Result<ProcessingResult, ContractError>
    where
        R: AsyncRead + Unpin + Send,
    {
        let file = context.container_name().unwrap_or_default();
        let bytes = tokio::io::copy(content, &mut tokio::io::sink())
            .await
            .map_err(|e| ContractError::processor_failure_with(&self.name, e))?;

        info!(
            processor = %self.name,
            file = %file,
            bytes,
            entries = context.len(),
            "File received"
        );

        Ok(format!("processed {file}"))
    }
}
