//! ---
//! ems_section: "01-core-functionality"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Component fault states and their publication."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use ems_fault_logging::LogContext;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{FaultError, Result};

/// Kind of hardware component reporting a fault state.
///
/// Unknown type strings are kept verbatim in [`ComponentType::Other`] so that
/// new module types still get a topic.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ComponentType {
    /// Home battery storage.
    Bat,
    /// Grid or sub-meter.
    Counter,
    /// PV inverter.
    Inverter,
    /// Vehicle at a charge point.
    Vehicle,
    /// Any other module type.
    Other(String),
}

impl ComponentType {
    pub fn as_str(&self) -> &str {
        match self {
            ComponentType::Bat => "bat",
            ComponentType::Counter => "counter",
            ComponentType::Inverter => "inverter",
            ComponentType::Vehicle => "vehicle",
            ComponentType::Other(name) => name.as_str(),
        }
    }
}

impl From<&str> for ComponentType {
    fn from(value: &str) -> Self {
        match value {
            "bat" => ComponentType::Bat,
            "counter" => ComponentType::Counter,
            "inverter" => ComponentType::Inverter,
            "vehicle" => ComponentType::Vehicle,
            other => ComponentType::Other(other.to_owned()),
        }
    }
}

impl From<String> for ComponentType {
    fn from(value: String) -> Self {
        ComponentType::from(value.as_str())
    }
}

impl From<ComponentType> for String {
    fn from(value: ComponentType) -> Self {
        match value {
            ComponentType::Other(name) => name,
            known => known.as_str().to_owned(),
        }
    }
}

impl FromStr for ComponentType {
    type Err = Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(ComponentType::from(s))
    }
}

impl fmt::Display for ComponentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of the component a fault state belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentInfo {
    /// Numeric component id; some legacy components have none.
    pub id: Option<u32>,
    /// Display name used in log lines.
    pub name: String,
    /// Component type selecting the topic subsystem.
    #[serde(rename = "type")]
    pub component_type: ComponentType,
}

impl ComponentInfo {
    pub fn new(
        id: Option<u32>,
        name: impl Into<String>,
        component_type: impl Into<ComponentType>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            component_type: component_type.into(),
        }
    }

    /// Build from a component configuration mapping.
    ///
    /// The mapping must contain `id`, `name` and `type`. `id` may be `null`;
    /// other keys are ignored.
    pub fn from_component_config(config: &Value) -> Result<Self> {
        let map = config
            .as_object()
            .ok_or_else(|| invalid(format!("expected a mapping, got {config}")))?;

        let id = match map.get("id") {
            None => return Err(invalid("missing key `id`")),
            Some(Value::Null) => None,
            Some(value) => Some(
                value
                    .as_u64()
                    .and_then(|id| u32::try_from(id).ok())
                    .ok_or_else(|| {
                        invalid(format!("`id` must be an unsigned 32-bit integer, got {value}"))
                    })?,
            ),
        };
        let name = required_str(map, "name")?;
        let component_type = required_str(map, "type")?;

        Ok(Self::new(id, name, component_type))
    }

    /// Logging context naming this component.
    pub fn log_context(&self) -> LogContext<'_> {
        LogContext::new()
            .with_component(&self.name)
            .with_component_type(self.component_type.as_str())
            .with_component_id(self.id)
    }
}

fn required_str<'a>(map: &'a Map<String, Value>, key: &str) -> Result<&'a str> {
    match map.get(key) {
        None => Err(invalid(format!("missing key `{key}`"))),
        Some(Value::String(value)) => Ok(value.as_str()),
        Some(other) => Err(invalid(format!("`{key}` must be a string, got {other}"))),
    }
}

fn invalid(reason: impl Into<String>) -> FaultError {
    FaultError::InvalidComponentConfig(reason.into())
}
