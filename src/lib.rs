// src/lib.rs
//! Global Control Library
//!
//! Scoped, thread-safe constraints on the runtime-wide parameters of a
//! parallel task runtime: maximum concurrency, worker stack size,
//! termination on uncaught task exceptions, and scheduler lifetime extension.
//!
//! # Architecture
//!
//! The library is structured into several key modules:
//!
//! - **control**: parameters, resolution policies, storages, registry and guards
//! - **runtime**: seams to the scheduler ("market") and the platform
//! - **observability**: tracing and Prometheus metrics setup
//! - **utils**: error types and configuration loading

// Public module exports
pub mod control;
pub mod observability;
pub mod runtime;
pub mod utils;

// Re-export commonly used types
pub use control::{
    ControlHandle, ControlRegistry, ControlSnapshot, GlobalControl, Parameter, SchedulerHandle,
};
pub use runtime::market::Market;
pub use runtime::platform::PlatformDefaults;
pub use utils::config::ControlConfig;
pub use utils::errors::{ControlError, Result};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const GIT_HASH: &str = env!("GIT_HASH");

/// Library build information
pub struct BuildInfo {
    pub version: &'static str,
    pub git_hash: &'static str,
    pub build_timestamp: &'static str,
    pub rustc_version: &'static str,
}

impl BuildInfo {
    pub fn current() -> Self {
        Self {
            version: VERSION,
            git_hash: GIT_HASH,
            build_timestamp: env!("BUILD_TIMESTAMP"),
            rustc_version: env!("RUSTC_VERSION"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_build_info() {
        let info = BuildInfo::current();
        assert!(!info.version.is_empty());
        assert!(!info.git_hash.is_empty());
    }
}
