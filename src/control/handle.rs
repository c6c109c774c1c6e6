// src/control/handle.rs
//! Scoped control handles
//!
//! A [`GlobalControl`] registers its constraint when constructed and
//! unregisters it when dropped:
//!
//! ```no_run
//! use global_control::{GlobalControl, Parameter};
//!
//! # fn main() -> global_control::Result<()> {
//! let _limit = GlobalControl::new(Parameter::MaxConcurrency, 4)?;
//! assert!(GlobalControl::active_value(Parameter::MaxConcurrency) <= 4);
//! # Ok(())
//! # }
//! ```

use crate::control::parameter::Parameter;
use crate::control::registry::ControlRegistry;
use crate::control::storage::{HandleId, HandleKey};
use crate::utils::errors::Result;
use std::sync::Arc;

/// Descriptor of one constraint: what it limits, to what, and who it is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ControlHandle {
    parameter: Parameter,
    value: usize,
    id: HandleId,
}

impl ControlHandle {
    /// Build a descriptor with a fresh identity; does not register it
    pub fn new(parameter: Parameter, value: usize) -> Self {
        Self {
            parameter,
            value,
            id: HandleId::next(),
        }
    }

    pub fn parameter(&self) -> Parameter {
        self.parameter
    }

    pub fn value(&self) -> usize {
        self.value
    }

    pub fn id(&self) -> HandleId {
        self.id
    }

    pub(crate) fn key(&self) -> HandleKey {
        HandleKey::new(self.value, self.id)
    }
}

/// Scope guard holding one registered constraint
#[derive(Debug)]
pub struct GlobalControl {
    handle: ControlHandle,
    registry: Arc<ControlRegistry>,
    registered: bool,
}

impl GlobalControl {
    /// Constrain `parameter` in the process-wide registry
    pub fn new(parameter: Parameter, value: usize) -> Result<Self> {
        Self::with_registry(Arc::clone(ControlRegistry::global()), parameter, value)
    }

    /// Constrain `parameter` in a specific registry
    pub fn with_registry(
        registry: Arc<ControlRegistry>,
        parameter: Parameter,
        value: usize,
    ) -> Result<Self> {
        parameter.validate_value(value)?;
        let handle = ControlHandle::new(parameter, value);
        registry.create(&handle);
        Ok(Self {
            handle,
            registry,
            registered: true,
        })
    }

    /// Resolved value of `parameter` in the process-wide registry
    pub fn active_value(parameter: Parameter) -> usize {
        ControlRegistry::global().active_value(parameter)
    }

    pub fn parameter(&self) -> Parameter {
        self.handle.parameter()
    }

    pub fn value(&self) -> usize {
        self.handle.value()
    }

    pub fn handle(&self) -> &ControlHandle {
        &self.handle
    }

    pub fn registry(&self) -> &Arc<ControlRegistry> {
        &self.registry
    }

    pub fn is_registered(&self) -> bool {
        self.registered
    }
}

impl Drop for GlobalControl {
    fn drop(&mut self) {
        if self.registered {
            self.registry.destroy(&self.handle);
        }
    }
}

/// Keeps the scheduler alive until finalized or dropped
#[derive(Debug)]
pub struct SchedulerHandle {
    control: GlobalControl,
}

impl SchedulerHandle {
    pub fn new() -> Result<Self> {
        Self::with_registry(Arc::clone(ControlRegistry::global()))
    }

    pub fn with_registry(registry: Arc<ControlRegistry>) -> Result<Self> {
        let control =
            GlobalControl::with_registry(registry, Parameter::SchedulerLifetimeExtension, 1)?;
        Ok(Self { control })
    }

    /// Give up this handle's hold on the scheduler
    ///
    /// When it was the last one, the scheduler reference is released with
    /// `blocking` forwarded to the market. Returns `true` if this handle was the
    /// last and the release succeeded.
    pub fn finalize(mut self, blocking: bool) -> bool {
        self.control.registered = false;
        self.control
            .registry
            .finalize_scheduler(&self.control.handle, blocking)
    }

    pub fn is_active(&self) -> bool {
        self.control.is_registered()
    }
}
