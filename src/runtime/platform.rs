// src/runtime/platform.rs
//! Platform defaults for worker count and worker stack size

use crate::utils::config::PlatformConfig;
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;

const MBYTE: usize = 1024 * 1024;

/// Default worker stack size: 2 MiB on 32-bit targets, 4 MiB otherwise
pub const THREAD_STACK_SIZE: usize = if usize::BITS <= 32 { 2 * MBYTE } else { 4 * MBYTE };

/// Hardware concurrency available to this process, never less than 1
pub fn default_worker_count() -> usize {
    std::thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(1)
}

/// Values a registry falls back to when no constraint is registered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformDefaults {
    pub worker_count: usize,
    pub stack_size: usize,
}

impl PlatformDefaults {
    /// Query the running platform
    pub fn detect() -> Self {
        Self {
            worker_count: default_worker_count(),
            stack_size: THREAD_STACK_SIZE,
        }
    }

    /// Detected defaults with configured overrides applied
    pub fn from_config(config: &PlatformConfig) -> Self {
        let detected = Self::detect();
        Self {
            worker_count: config.worker_count.unwrap_or(detected.worker_count),
            stack_size: config.stack_size.unwrap_or(detected.stack_size),
        }
    }
}

impl Default for PlatformDefaults {
    fn default() -> Self {
        Self::detect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect() {
        let defaults = PlatformDefaults::detect();
        assert!(defaults.worker_count >= 1);
        assert_eq!(defaults.stack_size, THREAD_STACK_SIZE);
    }

    #[test]
    fn test_stack_size_constant() {
        #[cfg(target_pointer_width = "64")]
        assert_eq!(THREAD_STACK_SIZE, 4 * 1024 * 1024);
        #[cfg(target_pointer_width = "32")]
        assert_eq!(THREAD_STACK_SIZE, 2 * 1024 * 1024);
    }

    #[test]
    fn test_config_overrides() {
        let config = PlatformConfig {
            worker_count: Some(3),
            stack_size: None,
        };
        let defaults = PlatformDefaults::from_config(&config);
        assert_eq!(defaults.worker_count, 3);
        assert_eq!(defaults.stack_size, THREAD_STACK_SIZE);
    }
}
