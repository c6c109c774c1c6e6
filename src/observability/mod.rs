// src/observability/mod.rs
//! Logging and metrics setup
//!
//! The library only emits through `tracing` and `metrics`; installing a
//! subscriber or recorder is left to the embedding program.

use crate::utils::config::LoggingConfig;
use crate::utils::errors::{ControlError, Result};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing_subscriber::EnvFilter;

/// Install a global `tracing` subscriber
///
/// `RUST_LOG` takes precedence over the configured level.
pub fn init_tracing(config: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .map_err(|e| ControlError::Observability(e.to_string()))?;

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let installed = if config.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    installed.map_err(|e| ControlError::Observability(e.to_string()))
}

/// Install the Prometheus recorder and return a handle for rendering
pub fn init_metrics() -> Result<PrometheusHandle> {
    PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| ControlError::Observability(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::{ControlRegistry, GlobalControl, Parameter};
    use crate::runtime::platform::PlatformDefaults;
    use std::sync::Arc;

    #[test]
    fn test_metrics_exported() {
        let handle = init_metrics().unwrap();
        let registry = Arc::new(ControlRegistry::new(PlatformDefaults::detect()));
        let _control =
            GlobalControl::with_registry(Arc::clone(&registry), Parameter::StackSize, 1 << 22)
                .unwrap();

        let rendered = handle.render();
        assert!(rendered.contains("global_control_active_value"));
        assert!(rendered.contains("global_control_registrations_total"));

        // only one recorder per process
        assert!(init_metrics().is_err());
    }

    #[test]
    fn test_invalid_filter() {
        let config = LoggingConfig {
            level: "global_control=notalevel".to_string(),
            json: false,
        };
        if std::env::var_os("RUST_LOG").is_none() {
            assert!(init_tracing(&config).is_err());
        }
    }
}
