// src/runtime/mod.rs
//! Seams to the rest of the task runtime
//!
//! The control subsystem does not own threads. It reaches the outside world
//! through two narrow interfaces:
//!
//! - **Market**: the scheduler singleton that creates and retires workers
//! - **Platform**: default worker count and default worker stack size
//!
//! ```text
//!  GlobalControl guards ──► ControlRegistry ──► MarketSlot ──► dyn Market
//!                                │                  (lookup only, never owns
//!                                ▼                   the scheduler's lifetime)
//!                        PlatformDefaults
//! ```

pub mod market;
pub mod platform;

pub use market::{Market, MarketSlot};
pub use platform::{default_worker_count, PlatformDefaults, THREAD_STACK_SIZE};
