//! GitUploader Server
//!
//! Accepts a batch of files over HTTP and publishes them as a single
//! force-pushed commit to a remote Git repository.

pub mod config;
pub mod error;
pub mod git;
pub mod http;
pub mod upload;

pub use config::ServerConfig;
pub use error::{Result, ServerError};
