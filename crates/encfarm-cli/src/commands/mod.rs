//! CLI command implementations.

pub mod cancel;
pub mod common;
pub mod list;
pub mod monitor;
pub mod retry;
pub mod submit;
pub mod version;
