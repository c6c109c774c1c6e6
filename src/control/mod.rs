// src/control/mod.rs
//! Global resource controls
//!
//! Independent, scoped constraints on runtime-wide parameters, resolved into
//! one active value per parameter:
//!
//! - **Parameter**: the closed set of governed knobs
//! - **Policy**: per-parameter default, winning direction and side effects
//! - **Storage**: active value plus ordered live handles, behind one lock
//! - **Registry**: the fixed table of storages and the lifecycle API
//! - **Handle**: scope guards that register on construction, unregister on drop
//!
//! # Architecture
//!
//! ```text
//! GlobalControl::new(p, v)            drop(GlobalControl)
//!          │                                  │
//!          ▼                                  ▼
//!   registry.create ──┐            ┌── registry.destroy
//!                     ▼            ▼
//!        ┌──────────────────────────────────────┐
//!        │ storages[p]  (one lock per parameter) │
//!        │   active_value                        │
//!        │   BTreeSet<(value, id)>               │
//!        └──────────────┬───────────────────────┘
//!                       │ apply_active
//!                       ▼
//!                 MarketSlot ──► Market
//! ```

pub mod handle;
pub mod parameter;
pub mod policy;
pub mod registry;
pub mod storage;

pub use handle::{ControlHandle, GlobalControl, SchedulerHandle};
pub use parameter::Parameter;
pub use policy::{Direction, Policy};
pub use registry::{ControlRegistry, ControlSnapshot};
pub use storage::{ControlStorage, HandleId, HandleKey};
