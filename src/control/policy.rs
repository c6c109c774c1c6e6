// src/control/policy.rs
//! Per-parameter resolution policies
//!
//! The parameter set is closed, so the four behaviors are a table keyed by
//! [`Parameter`] rather than a trait hierarchy:
//!
//! | Parameter                    | Default            | Winner   | Side effect                  |
//! |------------------------------|--------------------|----------|------------------------------|
//! | `MaxConcurrency`             | max(1, workers)    | minimum  | market gets `value - 1`      |
//! | `StackSize`                  | platform constant  | maximum  | none                         |
//! | `ExceptionTerminate`         | 0                  | maximum  | none                         |
//! | `SchedulerLifetimeExtension` | 0                  | presence | market reference pin/release |

use crate::control::parameter::Parameter;
use crate::control::storage::{HandleKey, StorageState};
use crate::runtime::market::{Market, MarketSlot};
use crate::runtime::platform::PlatformDefaults;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// Which of two competing requests becomes active
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Most restrictive (smallest) request wins
    MinWins,
    /// Most demanding (largest) request wins
    MaxWins,
    /// Only whether any request exists matters
    Presence,
}

/// Work that must run after the storage lock is released
#[must_use]
pub(crate) enum Deferred {
    Nothing,
    ReleaseMarket {
        market: Arc<dyn Market>,
        blocking: bool,
    },
}

impl Deferred {
    /// Execute the deferred call; returns `false` only if a release reported failure
    pub(crate) fn run(self) -> bool {
        match self {
            Deferred::Nothing => true,
            Deferred::ReleaseMarket { market, blocking } => {
                debug!("Releasing pinned market reference (blocking: {})", blocking);
                let released = market.release_reference(true, blocking);
                if !released {
                    warn!("Market reported an unsuccessful release");
                }
                released
            }
        }
    }
}

/// Resolution rules for one parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Policy {
    parameter: Parameter,
    direction: Direction,
    default: usize,
}

impl Policy {
    pub fn for_parameter(parameter: Parameter, defaults: &PlatformDefaults) -> Self {
        let (direction, default) = match parameter {
            Parameter::MaxConcurrency => (Direction::MinWins, defaults.worker_count.max(1)),
            Parameter::StackSize => (Direction::MaxWins, defaults.stack_size),
            Parameter::ExceptionTerminate => (Direction::MaxWins, 0),
            Parameter::SchedulerLifetimeExtension => (Direction::Presence, 0),
        };
        Self {
            parameter,
            direction,
            default,
        }
    }

    pub fn parameter(&self) -> Parameter {
        self.parameter
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Value in effect while no control is registered
    pub fn default_value(&self) -> usize {
        self.default
    }

    /// Whether a newly registered `a` should replace the current active `b`
    pub fn preferred(&self, a: usize, b: usize) -> bool {
        match self.direction {
            Direction::MinWins => a < b,
            Direction::MaxWins => a > b,
            Direction::Presence => false,
        }
    }

    /// Winning value among the remaining handles, `None` when there are none
    ///
    /// Uses the same direction as [`Policy::preferred`], so removal and
    /// insertion agree on the winner for every parameter.
    pub fn select(&self, handles: &BTreeSet<HandleKey>) -> Option<usize> {
        let winner = match self.direction {
            Direction::MaxWins => handles.last(),
            Direction::MinWins | Direction::Presence => handles.first(),
        };
        winner.map(|key| key.value)
    }

    /// Make `new_active` the stored value and forward it where needed
    ///
    /// Called with the storage lock held.
    pub(crate) fn apply_active(
        &self,
        state: &mut StorageState,
        new_active: usize,
        market: &MarketSlot,
    ) -> Deferred {
        let deferred = match self.parameter {
            Parameter::MaxConcurrency => {
                debug_assert!(new_active >= 1, "max concurrency must be at least 1");
                // one slot belongs to the external thread
                market.with_current(|m| m.set_active_worker_count(new_active.saturating_sub(1)));
                Deferred::Nothing
            }
            Parameter::SchedulerLifetimeExtension => {
                if new_active == 0 {
                    match state.pinned_market.take() {
                        Some(market) => Deferred::ReleaseMarket {
                            market,
                            blocking: false,
                        },
                        None => Deferred::Nothing,
                    }
                } else {
                    if state.pinned_market.is_none() {
                        state.pinned_market = market.with_current(|m| {
                            m.acquire_reference(true);
                            Arc::clone(m)
                        });
                    }
                    Deferred::Nothing
                }
            }
            Parameter::StackSize | Parameter::ExceptionTerminate => Deferred::Nothing,
        };

        state.active_value = new_active;
        metrics::gauge!("global_control_active_value", "parameter" => self.parameter.name())
            .set(new_active as f64);
        trace!("{} active value set to {}", self.parameter, new_active);

        deferred
    }

    /// Value reported to callers, given the stored active value
    pub(crate) fn observe(&self, stored: usize, market: &MarketSlot) -> usize {
        match self.parameter {
            Parameter::MaxConcurrency => {
                // non-zero only while a market is running
                let workers = market.with_current(|m| m.max_worker_count()).unwrap_or(0);
                if workers > 0 {
                    stored.min(workers + 1)
                } else {
                    stored
                }
            }
            _ => stored,
        }
    }
}
