//! Core functionality shared by the mission control crates.
//!
//! This crate provides configuration loading, logging initialization and
//! the core error type used across the workspace.

pub mod config;
pub mod error;
pub mod logging;

pub use config::{Config, DatabaseConfig, LogFormat, LoggingConfig, ServerConfig, StreamConfig};
pub use error::{CoreError, Result};
