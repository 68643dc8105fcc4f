//! Command implementations.

mod dispatch;
mod info;
mod validate;

pub use dispatch::run_dispatch;
pub use info::run_info;
pub use validate::run_validate;
