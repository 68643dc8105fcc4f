//! # Contracts
//!
//! Frozen interface contracts shared by every crate in the workspace.
//! Business crates depend on this crate only; reverse dependencies are prohibited.
//!
//! ## Invocation Model
//! - One `IncomingFile` in, one `RequestContext` built, one `Processor::run` call out
//! - The byte stream stays owned by the trigger host for the whole call

mod config;
mod context;
mod error;
mod file;
mod processor;
mod secret;

pub use config::*;
pub use context::{RequestContext, API_KEY_HEADER, CONTAINER_NAME_KEY};
pub use error::*;
pub use file::IncomingFile;
pub use processor::{LocalProcessor, ProcessingResult, Processor};
pub use secret::ApiKey;
