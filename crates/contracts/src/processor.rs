//! Processor trait - Dispatcher downstream interface
//!
//! Abstracts the orchestration capability the dispatcher delegates to.

use tokio::io::AsyncRead;

use crate::{ContractError, RequestContext};

/// Opaque status message returned by a processor; only logged and handed back
pub type ProcessingResult = String;

/// Downstream processing trait
///
/// All processor implementations must implement this trait.
#[trait_variant::make(Processor: Send)]
pub trait LocalProcessor {
    /// Processor name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Process one file.
    ///
    /// `content` is borrowed for the duration of the call; implementations must not
    /// keep it or spawn work that outlives the returned future.
    ///
    /// # Errors
    /// Returns whatever the processor raises (should include context)
    async fn run<R>(
        &self,
        context: RequestContext,
        content: &mut R,
    ) -> Result<ProcessingResult, ContractError>
    where
        R: AsyncRead + Unpin + Send;
}
