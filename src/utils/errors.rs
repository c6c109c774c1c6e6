// src/utils/errors.rs
//! Error types for the global control subsystem
//!
//! Only the outer surfaces (raw parameter indices, handle construction,
//! configuration, observability setup) return errors. The lifecycle API
//! itself never fails once it is handed a valid handle.

use crate::control::parameter::Parameter;
use thiserror::Error;

/// Errors raised at the boundaries of the control subsystem
#[derive(Error, Debug)]
pub enum ControlError {
    /// Raw parameter index outside the enumerated range
    #[error("Invalid parameter index: {0} (expected < {})", Parameter::COUNT)]
    InvalidParameter(usize),

    /// Requested value that the parameter cannot accept
    #[error("Invalid value {value} for {parameter}: {reason}")]
    InvalidValue {
        parameter: Parameter,
        value: usize,
        reason: &'static str,
    },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error(transparent)]
    Config(#[from] config::ConfigError),

    /// The process-wide registry was created before a configured one could be installed
    #[error("Global control registry is already initialized")]
    AlreadyInitialized,

    #[error("Observability setup failed: {0}")]
    Observability(String),
}

pub type Result<T> = std::result::Result<T, ControlError>;
