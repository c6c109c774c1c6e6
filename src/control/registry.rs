// src/control/registry.rs
//! Process-wide control registry and the lifecycle API
//!
//! The registry is a fixed table of one [`ControlStorage`] per [`Parameter`].
//! Handles register on construction and unregister on drop; the registry keeps
//! only their ordering keys, never the handles themselves.
//!
//! # Resolution
//!
//! - **create**: if the set is empty or the new value is preferred over the
//!   active one, apply it before inserting
//! - **destroy**: remove, then re-resolve to the winner among the remaining
//!   handles (or the default) and apply it if it changed
//!
//! Calls that may block on the market's own lock run after the storage lock
//! has been released.

use crate::control::handle::ControlHandle;
use crate::control::parameter::Parameter;
use crate::control::policy::Policy;
use crate::control::storage::ControlStorage;
use crate::runtime::market::{Market, MarketSlot};
use crate::runtime::platform::PlatformDefaults;
use crate::utils::config::ControlConfig;
use crate::utils::errors::{ControlError, Result};
use crossbeam::utils::CachePadded;
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info};

static GLOBAL: OnceCell<Arc<ControlRegistry>> = OnceCell::new();

/// Fixed table of per-parameter storages plus the market lookup slot
pub struct ControlRegistry {
    storages: [CachePadded<ControlStorage>; Parameter::COUNT],
    market: MarketSlot,
    defaults: PlatformDefaults,
}

impl ControlRegistry {
    /// Create an isolated registry
    pub fn new(defaults: PlatformDefaults) -> Self {
        let storages = Parameter::ALL.map(|parameter| {
            CachePadded::new(ControlStorage::new(Policy::for_parameter(parameter, &defaults)))
        });
        Self {
            storages,
            market: MarketSlot::new(),
            defaults,
        }
    }

    pub fn from_config(config: &ControlConfig) -> Self {
        Self::new(PlatformDefaults::from_config(&config.platform))
    }

    /// Process-wide registry, created from detected platform defaults on first use
    pub fn global() -> &'static Arc<ControlRegistry> {
        GLOBAL.get_or_init(|| {
            let defaults = PlatformDefaults::detect();
            info!(
                "Global control registry initialized (workers: {}, stack size: {})",
                defaults.worker_count, defaults.stack_size
            );
            Arc::new(ControlRegistry::new(defaults))
        })
    }

    /// Install a configured registry as the process-wide one
    ///
    /// Must happen before anything touches [`ControlRegistry::global`].
    pub fn install_global(registry: Arc<ControlRegistry>) -> Result<&'static Arc<ControlRegistry>> {
        GLOBAL
            .set(registry)
            .map_err(|_| ControlError::AlreadyInitialized)?;
        GLOBAL.get().ok_or(ControlError::AlreadyInitialized)
    }

    pub fn defaults(&self) -> &PlatformDefaults {
        &self.defaults
    }

    pub fn storage(&self, parameter: Parameter) -> &ControlStorage {
        &self.storages[parameter.index()]
    }

    /// Publish the scheduler singleton; returns the one it replaces
    pub fn attach_market(&self, market: Arc<dyn Market>) -> Option<Arc<dyn Market>> {
        self.market.install(market)
    }

    /// Forget the scheduler singleton
    pub fn detach_market(&self) -> Option<Arc<dyn Market>> {
        self.market.take()
    }

    pub fn market(&self) -> &MarketSlot {
        &self.market
    }

    /// Register a handle
    pub fn create(&self, handle: &ControlHandle) {
        let parameter = handle.parameter();
        debug!(
            "Registering control {} on {} = {}",
            handle.id().get(),
            parameter,
            handle.value()
        );
        self.storage(parameter)
            .register(handle.key(), &self.market)
            .run();
        metrics::counter!("global_control_registrations_total", "parameter" => parameter.name())
            .increment(1);
    }

    /// Unregister a handle and re-resolve the active value
    ///
    /// Destroying a handle that is not registered is a caller bug, except for
    /// [`Parameter::SchedulerLifetimeExtension`] where it may race with
    /// scheduler finalization and is ignored.
    pub fn destroy(&self, handle: &ControlHandle) {
        let parameter = handle.parameter();
        match self.storage(parameter).unregister(&handle.key(), &self.market) {
            Some(deferred) => {
                debug!("Unregistered control {} on {}", handle.id().get(), parameter);
                deferred.run();
            }
            None if parameter == Parameter::SchedulerLifetimeExtension => {
                debug!(
                    "Lifetime control {} already removed, nothing to do",
                    handle.id().get()
                );
            }
            None => {
                error!(
                    "Control {} on {} destroyed while not registered",
                    handle.id().get(),
                    parameter
                );
                debug_assert!(false, "destroying an unregistered {} control", parameter);
            }
        }
    }

    /// Remove a handle without re-resolving; returns whether none remain
    pub fn remove_and_check_if_empty(&self, handle: &ControlHandle) -> bool {
        self.storage(handle.parameter()).remove(&handle.key())
    }

    /// Finalize a scheduler lifetime handle
    ///
    /// Removes the handle; if it was the last one, releases the pinned market
    /// reference with the given blocking mode once the storage lock is
    /// dropped. Returns `true` when this was the last handle and the release
    /// (if any) succeeded.
    pub fn finalize_scheduler(&self, handle: &ControlHandle, blocking: bool) -> bool {
        debug_assert_eq!(handle.parameter(), Parameter::SchedulerLifetimeExtension);
        let (last, deferred) = self
            .storage(Parameter::SchedulerLifetimeExtension)
            .remove_last(&handle.key(), blocking);
        if !last {
            debug!("Scheduler handle {} finalized, others remain", handle.id().get());
            return false;
        }
        deferred.run()
    }

    /// Resolved value of a parameter
    pub fn active_value(&self, parameter: Parameter) -> usize {
        self.storage(parameter).active_value(&self.market)
    }

    /// Resolved value by raw parameter index
    pub fn active_value_by_index(&self, index: usize) -> Result<usize> {
        Ok(self.active_value(Parameter::try_from(index)?))
    }

    /// Diagnostic membership test
    pub fn is_present(&self, handle: &ControlHandle) -> bool {
        self.storage(handle.parameter()).contains(&handle.key())
    }

    /// Concurrency limit imposed by the application, 0 when none is registered
    pub fn app_parallelism_limit(&self) -> usize {
        self.storage(Parameter::MaxConcurrency).active_value_if_present()
    }

    pub fn terminate_on_exception(&self) -> bool {
        self.active_value(Parameter::ExceptionTerminate) == 1
    }

    pub fn is_lifetime_control_present(&self) -> bool {
        !self.storage(Parameter::SchedulerLifetimeExtension).is_empty()
    }

    /// Resolved values of all parameters
    pub fn snapshot(&self) -> ControlSnapshot {
        ControlSnapshot {
            max_concurrency: self.active_value(Parameter::MaxConcurrency),
            stack_size: self.active_value(Parameter::StackSize),
            exception_terminate: self.active_value(Parameter::ExceptionTerminate),
            scheduler_lifetime_extension: self.active_value(Parameter::SchedulerLifetimeExtension),
            live_controls: Parameter::ALL.map(|p| self.storage(p).len()).iter().sum(),
        }
    }
}

impl fmt::Debug for ControlRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ControlRegistry")
            .field("defaults", &self.defaults)
            .field("market_attached", &self.market.is_attached())
            .finish_non_exhaustive()
    }
}

impl Default for ControlRegistry {
    fn default() -> Self {
        Self::new(PlatformDefaults::detect())
    }
}

/// Point-in-time view of every resolved parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlSnapshot {
    pub max_concurrency: usize,
    pub stack_size: usize,
    pub exception_terminate: usize,
    pub scheduler_lifetime_extension: usize,
    pub live_controls: usize,
}

impl ControlSnapshot {
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| ControlError::ConfigError(e.to_string()))
    }
}
