// src/utils/mod.rs
//! Common utilities: error types and configuration loading

pub mod config;
pub mod errors;

pub use config::{ControlConfig, LoggingConfig, MetricsConfig, PlatformConfig};
pub use errors::{ControlError, Result};
