//! ---
//! ems_section: "01-core-functionality"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Component fault states and their publication."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
//! Topic layout for fault states.
//!
//! Persistent mode publishes to
//! `openWB/set/<subsystem>/<id>/get/fault_str|fault_state`. Ramdisk mode keeps
//! the legacy flat layout, e.g. `openWB/set/houseBattery/2/faultStr` or
//! `openWB/set/lp/1/socFaultState` for charge points.

use ems_fault_bus::PublishChannel;
use serde::{Deserialize, Serialize};

use crate::component::{ComponentInfo, ComponentType};

/// Root shared by every fault topic.
pub const TOPIC_ROOT: &str = "openWB/set";

const RAMDISK_CHARGE_POINT: &str = "lp";

/// Which publish path and topic layout is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PublishMode {
    /// Long-lived client, hierarchical topics.
    #[default]
    Persistent,
    /// One-shot publishes, legacy ramdisk topics.
    Ramdisk,
}

impl PublishMode {
    pub fn from_ramdisk_flag(ramdisk: bool) -> Self {
        if ramdisk {
            PublishMode::Ramdisk
        } else {
            PublishMode::Persistent
        }
    }

    /// Bus channel used for this mode.
    pub fn channel(self) -> PublishChannel {
        match self {
            PublishMode::Persistent => PublishChannel::Persistent,
            PublishMode::Ramdisk => PublishChannel::Single,
        }
    }
}

/// Subsystem segment of the topic for a component type.
pub fn subsystem(component_type: &ComponentType, mode: PublishMode) -> &str {
    match (mode, component_type) {
        (PublishMode::Ramdisk, ComponentType::Bat) => "houseBattery",
        (PublishMode::Ramdisk, ComponentType::Counter) => "evu",
        (PublishMode::Ramdisk, ComponentType::Inverter) => "pv",
        (PublishMode::Ramdisk, ComponentType::Vehicle) => RAMDISK_CHARGE_POINT,
        (PublishMode::Persistent, ComponentType::Bat) => "bat",
        (PublishMode::Persistent, ComponentType::Counter) => "counter",
        (PublishMode::Persistent, ComponentType::Inverter) => "pv",
        (PublishMode::Persistent, ComponentType::Vehicle) => "vehicle",
        (_, ComponentType::Other(name)) => name.as_str(),
    }
}

/// The pair of topics a fault state is published to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaultTopics {
    /// Receives the message as a JSON string.
    pub fault_str: String,
    /// Receives the numeric level.
    pub fault_state: String,
}

impl FaultTopics {
    pub fn for_component(component: &ComponentInfo, mode: PublishMode) -> Self {
        let subsystem = subsystem(&component.component_type, mode);
        match mode {
            PublishMode::Persistent => {
                let base = match component.id {
                    Some(id) => format!("{TOPIC_ROOT}/{subsystem}/{id}/get"),
                    None => format!("{TOPIC_ROOT}/{subsystem}/get"),
                };
                Self {
                    fault_str: format!("{base}/fault_str"),
                    fault_state: format!("{base}/fault_state"),
                }
            }
            PublishMode::Ramdisk => {
                // Topic names are split mid-word: "<prefix>f" + "aultStr".
                let prefix = match component.id {
                    Some(id) if subsystem == RAMDISK_CHARGE_POINT => {
                        format!("{TOPIC_ROOT}/{subsystem}/{id}/socF")
                    }
                    Some(id) => format!("{TOPIC_ROOT}/{subsystem}/{id}/f"),
                    None => format!("{TOPIC_ROOT}/{subsystem}/f"),
                };
                Self {
                    fault_str: format!("{prefix}aultStr"),
                    fault_state: format!("{prefix}aultState"),
                }
            }
        }
    }
}
