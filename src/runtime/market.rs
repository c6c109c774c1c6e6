// src/runtime/market.rs
//! Interface to the scheduler ("market") singleton
//!
//! The market owns the worker threads. The control registry only looks it up
//! through a [`MarketSlot`]; it never decides when the market is created or
//! destroyed. Lock order is always control storage lock, then slot lock, then
//! whatever the market takes internally. The one call that may take the
//! market's own global lock (`release_reference`) is made with no control
//! storage lock held.

use parking_lot::Mutex;
use std::sync::Arc;
use tracing::debug;

/// Operations the control subsystem consumes from the scheduler
pub trait Market: Send + Sync {
    /// Number of worker threads allowed to run, excluding the external thread
    fn set_active_worker_count(&self, count: usize);

    /// Hard worker limit of the live market, 0 when it is not running
    fn max_worker_count(&self) -> usize;

    /// Take an extra reference keeping the market alive
    fn acquire_reference(&self, is_public: bool);

    /// Drop a reference taken with [`Market::acquire_reference`]
    ///
    /// Returns `false` if a blocking release could not wait for workers.
    fn release_reference(&self, is_public: bool, blocking: bool) -> bool;
}

/// Slot holding the current market singleton, if any
pub struct MarketSlot {
    current: Mutex<Option<Arc<dyn Market>>>,
}

impl MarketSlot {
    pub fn new() -> Self {
        Self {
            current: Mutex::new(None),
        }
    }

    /// Publish a market, returning the one it replaces
    pub fn install(&self, market: Arc<dyn Market>) -> Option<Arc<dyn Market>> {
        debug!("Market attached");
        self.current.lock().replace(market)
    }

    /// Clear the slot
    pub fn take(&self) -> Option<Arc<dyn Market>> {
        let previous = self.current.lock().take();
        if previous.is_some() {
            debug!("Market detached");
        }
        previous
    }

    /// Clone the current market out of the slot; the slot lock is released on return
    pub fn current(&self) -> Option<Arc<dyn Market>> {
        self.current.lock().clone()
    }

    /// Run `f` against the current market while holding the slot lock
    ///
    /// The market cannot be detached while `f` runs.
    pub fn with_current<R>(&self, f: impl FnOnce(&Arc<dyn Market>) -> R) -> Option<R> {
        let guard = self.current.lock();
        guard.as_ref().map(f)
    }

    pub fn is_attached(&self) -> bool {
        self.current.lock().is_some()
    }
}

impl Default for MarketSlot {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Recording market used by the registry tests

    use super::*;
    use crate::control::parameter::Parameter;
    use crate::control::registry::ControlRegistry;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    #[derive(Default)]
    pub(crate) struct RecordingMarket {
        pub max_workers: AtomicUsize,
        pub worker_counts: Mutex<Vec<usize>>,
        pub public_refs: AtomicUsize,
        pub releases: Mutex<Vec<(bool, bool)>>,
        /// Set when a release observed the lifetime storage lock held
        pub released_under_lock: AtomicBool,
        pub registry: Mutex<Option<Arc<ControlRegistry>>>,
    }

    impl RecordingMarket {
        pub fn with_max_workers(max_workers: usize) -> Arc<Self> {
            let market = Self::default();
            market.max_workers.store(max_workers, Ordering::SeqCst);
            Arc::new(market)
        }

        pub fn watch(&self, registry: &Arc<ControlRegistry>) {
            *self.registry.lock() = Some(Arc::clone(registry));
        }

        pub fn last_worker_count(&self) -> Option<usize> {
            self.worker_counts.lock().last().copied()
        }
    }

    impl Market for RecordingMarket {
        fn set_active_worker_count(&self, count: usize) {
            self.worker_counts.lock().push(count);
        }

        fn max_worker_count(&self) -> usize {
            self.max_workers.load(Ordering::SeqCst)
        }

        fn acquire_reference(&self, is_public: bool) {
            if is_public {
                self.public_refs.fetch_add(1, Ordering::SeqCst);
            }
        }

        fn release_reference(&self, is_public: bool, blocking: bool) -> bool {
            if let Some(registry) = self.registry.lock().as_ref() {
                if registry
                    .storage(Parameter::SchedulerLifetimeExtension)
                    .is_locked()
                {
                    self.released_under_lock.store(true, Ordering::SeqCst);
                }
            }
            if is_public {
                self.public_refs.fetch_sub(1, Ordering::SeqCst);
            }
            self.releases.lock().push((is_public, blocking));
            true
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::RecordingMarket;
    use super::*;

    #[test]
    fn test_slot_install_and_take() {
        let slot = MarketSlot::new();
        assert!(!slot.is_attached());
        assert!(slot.current().is_none());

        let market = RecordingMarket::with_max_workers(8);
        assert!(slot.install(market).is_none());
        assert!(slot.is_attached());
        assert_eq!(slot.with_current(|m| m.max_worker_count()), Some(8));

        assert!(slot.take().is_some());
        assert!(slot.take().is_none());
        assert_eq!(slot.with_current(|m| m.max_worker_count()), None);
    }

    #[test]
    fn test_install_replaces_previous() {
        let slot = MarketSlot::new();
        slot.install(RecordingMarket::with_max_workers(2));
        let previous = slot.install(RecordingMarket::with_max_workers(6));
        assert_eq!(previous.map(|m| m.max_worker_count()), Some(2));
        assert_eq!(slot.current().map(|m| m.max_worker_count()), Some(6));
    }
}
