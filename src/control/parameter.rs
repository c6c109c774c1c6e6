// src/control/parameter.rs
//! The closed set of runtime-wide parameters a control can constrain

use crate::utils::errors::{ControlError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Runtime-wide knob governed by global controls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(usize)]
pub enum Parameter {
    /// Upper bound on threads running tasks, external thread included
    MaxConcurrency = 0,
    /// Stack size of worker threads, in bytes
    StackSize = 1,
    /// 1 makes an uncaught task exception terminate the process
    ExceptionTerminate = 2,
    /// Any live control keeps the scheduler alive
    SchedulerLifetimeExtension = 3,
}

impl Parameter {
    pub const COUNT: usize = 4;

    pub const ALL: [Parameter; Parameter::COUNT] = [
        Parameter::MaxConcurrency,
        Parameter::StackSize,
        Parameter::ExceptionTerminate,
        Parameter::SchedulerLifetimeExtension,
    ];

    pub const fn index(self) -> usize {
        self as usize
    }

    pub const fn name(self) -> &'static str {
        match self {
            Parameter::MaxConcurrency => "max_concurrency",
            Parameter::StackSize => "stack_size",
            Parameter::ExceptionTerminate => "exception_terminate",
            Parameter::SchedulerLifetimeExtension => "scheduler_lifetime_extension",
        }
    }

    /// Check a requested value before it is registered
    pub fn validate_value(self, value: usize) -> Result<()> {
        let reason = match self {
            Parameter::MaxConcurrency if value == 0 => "concurrency must be at least 1",
            Parameter::SchedulerLifetimeExtension if value == 0 => {
                "lifetime extension must be non-zero"
            }
            _ => return Ok(()),
        };
        Err(ControlError::InvalidValue {
            parameter: self,
            value,
            reason,
        })
    }
}

impl TryFrom<usize> for Parameter {
    type Error = ControlError;

    fn try_from(index: usize) -> Result<Self> {
        Parameter::ALL
            .get(index)
            .copied()
            .ok_or(ControlError::InvalidParameter(index))
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_round_trip() {
        for (i, parameter) in Parameter::ALL.iter().enumerate() {
            assert_eq!(parameter.index(), i);
            assert_eq!(Parameter::try_from(i).unwrap(), *parameter);
        }
    }

    #[test]
    fn test_out_of_range_index() {
        let err = Parameter::try_from(Parameter::COUNT).unwrap_err();
        assert!(matches!(err, ControlError::InvalidParameter(4)));
        assert!(Parameter::try_from(usize::MAX).is_err());
    }

    #[test]
    fn test_value_validation() {
        assert!(Parameter::MaxConcurrency.validate_value(0).is_err());
        assert!(Parameter::MaxConcurrency.validate_value(1).is_ok());
        assert!(Parameter::SchedulerLifetimeExtension.validate_value(0).is_err());
        assert!(Parameter::StackSize.validate_value(0).is_ok());
        assert!(Parameter::ExceptionTerminate.validate_value(0).is_ok());
    }

    #[test]
    fn test_serde_names() {
        let json = serde_json::to_string(&Parameter::StackSize).unwrap();
        assert_eq!(json, "\"stack_size\"");
        let parsed: Parameter = serde_json::from_str("\"exception_terminate\"").unwrap();
        assert_eq!(parsed, Parameter::ExceptionTerminate);
        assert_eq!(Parameter::MaxConcurrency.to_string(), "max_concurrency");
    }
}
