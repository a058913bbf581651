//! ---
//! ems_section: "01-core-functionality"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Component fault states and their publication."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::FaultError;

/// Severity of a fault state. The discriminant is what goes on the bus.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FaultStateLevel {
    #[default]
    NoError = 0,
    Warning = 1,
    Error = 2,
}

impl FaultStateLevel {
    /// Numeric value published under `fault_state`.
    pub fn value(self) -> u8 {
        self as u8
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FaultStateLevel::NoError => "NO_ERROR",
            FaultStateLevel::Warning => "WARNING",
            FaultStateLevel::Error => "ERROR",
        }
    }

    pub fn is_fault(self) -> bool {
        self != FaultStateLevel::NoError
    }
}

impl fmt::Display for FaultStateLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<i64> for FaultStateLevel {
    type Error = FaultError;

    fn try_from(value: i64) -> Result<Self, FaultError> {
        match value {
            0 => Ok(FaultStateLevel::NoError),
            1 => Ok(FaultStateLevel::Warning),
            2 => Ok(FaultStateLevel::Error),
            other => Err(FaultError::UnknownLevel(other)),
        }
    }
}
