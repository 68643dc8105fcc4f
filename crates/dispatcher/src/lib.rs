//! # Dispatcher
//!
//! File ingestion dispatch module.
//!
//! Responsibilities:
//! - Validate the incoming file name
//! - Build one `RequestContext` per incoming file
//! - Invoke the configured processor exactly once, honouring the deadline
//! - Report the outcome through tracing and metrics

pub mod dispatcher;
pub mod error;
pub mod metrics;
pub mod processors;
pub mod reader;

pub use contracts::{IncomingFile, Processor, RequestContext};
pub use dispatcher::{create_dispatcher, DispatchSettings, IngestionDispatcher};
pub use error::DispatcherError;
pub use metrics::{DispatchMetrics, MetricsSnapshot};
pub use processors::{create_processor, ConfiguredProcessor, FileProcessor, LogProcessor, NetworkProcessor};
pub use reader::CountingReader;
