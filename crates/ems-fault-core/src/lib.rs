//! ---
//! ems_section: "01-core-functionality"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Component fault states and their publication."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
//! Fault reporting for energy-management components.
//!
//! Components (batteries, grid meters, inverters, charge points) describe
//! their health as a [`FaultState`]. Storing a fault state logs it and
//! publishes message and level under the component's topics on the bus.

pub mod component;
pub mod fault;
pub mod level;
pub mod registry;
pub mod reporter;
pub mod topic;

/// Shared result type for fault reporting operations.
pub type Result<T> = std::result::Result<T, FaultError>;

/// Errors raised while building or publishing fault states.
#[derive(Debug, thiserror::Error)]
pub enum FaultError {
    /// A component configuration mapping lacked a key or had a wrong value type.
    #[error("invalid component configuration: {0}")]
    InvalidComponentConfig(String),
    /// A numeric level outside the known range.
    #[error("unknown fault state level {0}")]
    UnknownLevel(i64),
    /// The bus refused the report.
    #[error(transparent)]
    Bus(#[from] ems_fault_bus::BusError),
}

pub use component::{ComponentInfo, ComponentType};
pub use fault::{FaultState, NO_ERROR_MESSAGE};
pub use level::FaultStateLevel;
pub use registry::ExceptionRegistry;
pub use reporter::{FaultReporter, ModeSource, RamdiskProbe};
pub use topic::{FaultTopics, PublishMode};
