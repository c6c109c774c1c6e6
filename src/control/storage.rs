// src/control/storage.rs
//! Per-parameter control storage
//!
//! Each storage owns the active value and the ordered set of registered
//! handles for one parameter. Every read and write of that pair happens under
//! the storage's own lock; storages never touch each other's locks.

use crate::control::parameter::Parameter;
use crate::control::policy::{Deferred, Policy};
use crate::runtime::market::{Market, MarketSlot};
use parking_lot::Mutex;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

static NEXT_HANDLE_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a control handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HandleId(u64);

impl HandleId {
    pub fn next() -> Self {
        Self(NEXT_HANDLE_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

/// Ordering key of a registered handle: requested value, then identity
///
/// The identity tie-break keeps equal requests distinct, so the first element
/// is well defined and removal always hits the right entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HandleKey {
    pub value: usize,
    pub id: HandleId,
}

impl HandleKey {
    pub fn new(value: usize, id: HandleId) -> Self {
        Self { value, id }
    }
}

/// State guarded by the storage lock
pub(crate) struct StorageState {
    pub(crate) active_value: usize,
    pub(crate) handles: BTreeSet<HandleKey>,
    /// Market holding the lifetime-extension reference, if one was taken
    pub(crate) pinned_market: Option<Arc<dyn Market>>,
}

impl StorageState {
    pub(crate) fn new() -> Self {
        Self {
            active_value: 0,
            handles: BTreeSet::new(),
            pinned_market: None,
        }
    }
}

/// Active value and live handles for one parameter
pub struct ControlStorage {
    policy: Policy,
    state: Mutex<StorageState>,
}

impl ControlStorage {
    pub fn new(policy: Policy) -> Self {
        Self {
            policy,
            state: Mutex::new(StorageState::new()),
        }
    }

    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    pub fn parameter(&self) -> Parameter {
        self.policy.parameter()
    }

    /// Insert a handle, applying its value first if it becomes the winner
    pub(crate) fn register(&self, key: HandleKey, market: &MarketSlot) -> Deferred {
        let mut state = self.state.lock();
        let deferred = if state.handles.is_empty()
            || self.policy.preferred(key.value, state.active_value)
        {
            self.policy.apply_active(&mut state, key.value, market)
        } else {
            Deferred::Nothing
        };
        let inserted = state.handles.insert(key);
        debug_assert!(inserted, "handle {:?} registered twice", key.id);
        deferred
    }

    /// Remove a handle and re-resolve the active value
    ///
    /// Returns `None` if the handle was not registered.
    pub(crate) fn unregister(&self, key: &HandleKey, market: &MarketSlot) -> Option<Deferred> {
        let mut state = self.state.lock();
        if !state.handles.remove(key) {
            return None;
        }
        let old_active = state.active_value;
        let new_active = self
            .policy
            .select(&state.handles)
            .unwrap_or_else(|| self.policy.default_value());
        if new_active != old_active {
            Some(self.policy.apply_active(&mut state, new_active, market))
        } else {
            Some(Deferred::Nothing)
        }
    }

    /// Remove a handle without re-resolving; returns whether the set is now empty
    pub(crate) fn remove(&self, key: &HandleKey) -> bool {
        let mut state = self.state.lock();
        state.handles.remove(key);
        state.handles.is_empty()
    }

    /// Remove a handle; if it was the last one, hand back the pinned market for release
    pub(crate) fn remove_last(&self, key: &HandleKey, blocking: bool) -> (bool, Deferred) {
        let mut state = self.state.lock();
        state.handles.remove(key);
        if !state.handles.is_empty() {
            return (false, Deferred::Nothing);
        }
        let deferred = match state.pinned_market.take() {
            Some(market) => Deferred::ReleaseMarket { market, blocking },
            None => Deferred::Nothing,
        };
        (true, deferred)
    }

    pub fn contains(&self, key: &HandleKey) -> bool {
        self.state.lock().handles.contains(key)
    }

    /// Resolved value: the default while empty, otherwise the policy's view of the stored value
    pub fn active_value(&self, market: &MarketSlot) -> usize {
        let state = self.state.lock();
        if state.handles.is_empty() {
            self.policy.default_value()
        } else {
            self.policy.observe(state.active_value, market)
        }
    }

    /// Stored active value, or 0 when nothing is registered
    pub fn active_value_if_present(&self) -> usize {
        let state = self.state.lock();
        if state.handles.is_empty() {
            0
        } else {
            state.active_value
        }
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().handles.is_empty()
    }

    pub fn len(&self) -> usize {
        self.state.lock().handles.len()
    }

    /// Registered values in ascending order
    pub fn registered_values(&self) -> Vec<usize> {
        self.state.lock().handles.iter().map(|key| key.value).collect()
    }

    #[cfg(test)]
    pub(crate) fn is_locked(&self) -> bool {
        self.state.is_locked()
    }
}
