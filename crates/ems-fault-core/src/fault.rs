//! ---
//! ems_section: "01-core-functionality"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Component fault states and their publication."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use std::backtrace::Backtrace;

use ems_fault_bus::Publisher;
use ems_fault_logging::fault_error;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::error;

use crate::component::ComponentInfo;
use crate::level::FaultStateLevel;
use crate::registry::ExceptionRegistry;
use crate::topic::{FaultTopics, PublishMode};
use crate::{FaultError, Result};

/// Message published for healthy components. Bus consumers match on it verbatim.
pub const NO_ERROR_MESSAGE: &str = "Kein Fehler.";

/// Health of a component: a message and a severity level.
///
/// Also an error type, so component code can bail out with `Err(FaultState)`
/// and have it reported unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{level}: {message}")]
pub struct FaultState {
    pub message: String,
    pub level: FaultStateLevel,
}

impl FaultState {
    pub fn new(message: impl Into<String>, level: FaultStateLevel) -> Self {
        Self {
            message: message.into(),
            level,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(message, FaultStateLevel::Error)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(message, FaultStateLevel::Warning)
    }

    pub fn no_error() -> Self {
        Self::new(NO_ERROR_MESSAGE, FaultStateLevel::NoError)
    }

    /// Fault state describing `error`, using the process-wide [`ExceptionRegistry`].
    ///
    /// `None` means the operation succeeded. A `FaultState` inside the error is
    /// returned as is; anything else is translated by the registry.
    pub fn from_exception(error: Option<anyhow::Error>) -> Self {
        ExceptionRegistry::global().from_exception(error)
    }

    /// Log and publish this fault state for `component`.
    ///
    /// Never fails: problems talking to the bus are logged and swallowed.
    pub fn store_error(
        &self,
        component: &ComponentInfo,
        publisher: &dyn Publisher,
        mode: PublishMode,
    ) {
        if let Err(err) = self.try_store(component, publisher, mode) {
            log_store_failure(component, &err);
        }
    }

    /// Publishes message and level; returns the number of messages sent.
    pub(crate) fn try_store(
        &self,
        component: &ComponentInfo,
        publisher: &dyn Publisher,
        mode: PublishMode,
    ) -> Result<u64> {
        if self.level.is_fault() {
            fault_error!(
                context = component.log_context(),
                "{}: FaultState {}, FaultStr {}, Traceback: \n{}",
                component.name,
                self.level,
                self.message,
                traceback()
            );
        }

        let topics = FaultTopics::for_component(component, mode);
        let message = json!(self.message);
        let level = json!(self.level.value());
        match mode {
            PublishMode::Ramdisk => {
                publisher.pub_single(&topics.fault_str, &message)?;
                publisher.pub_single(&topics.fault_state, &level)?;
            }
            PublishMode::Persistent => {
                publisher.publish(&topics.fault_str, &message)?;
                publisher.publish(&topics.fault_state, &level)?;
            }
        }
        Ok(2)
    }
}

/// Stack of the reporting call site, captured regardless of `RUST_BACKTRACE`.
fn traceback() -> Backtrace {
    Backtrace::force_capture()
}

pub(crate) fn log_store_failure(component: &ComponentInfo, err: &FaultError) {
    error!(
        component = %component.name,
        component_type = %component.component_type,
        error = %err,
        "failed to store fault state"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::backtrace::BacktraceStatus;
    use ems_fault_bus::{BusError, InMemoryPublisher, Payload, PublishChannel};

    struct BrokenPublisher;

    impl Publisher for BrokenPublisher {
        fn pub_single(&self, topic: &str, _payload: &Payload) -> ems_fault_bus::Result<()> {
            Err(BusError::Publish {
                topic: topic.to_owned(),
                reason: "broker gone".into(),
            })
        }

        fn publish(&self, _topic: &str, _payload: &Payload) -> ems_fault_bus::Result<()> {
            Err(BusError::Connection {
                host: "localhost".into(),
                port: 1883,
                reason: "refused".into(),
            })
        }

        fn name(&self) -> &'static str {
            "broken"
        }
    }

    fn battery() -> ComponentInfo {
        ComponentInfo::new(Some(2), "Speicher", "bat")
    }

    #[test]
    fn traceback_is_captured_without_rust_backtrace() {
        assert_eq!(traceback().status(), BacktraceStatus::Captured);
    }

    #[test]
    fn constructors_set_level_and_message() {
        let no_error = FaultState::no_error();
        assert_eq!(no_error.level, FaultStateLevel::NoError);
        assert_eq!(no_error.message, NO_ERROR_MESSAGE);
        assert_eq!(FaultState::warning("low soc").level, FaultStateLevel::Warning);
        assert_eq!(FaultState::error("offline").level, FaultStateLevel::Error);
    }

    #[test]
    fn from_exception_without_error_is_no_error() {
        assert_eq!(FaultState::from_exception(None), FaultState::no_error());
    }

    #[test]
    fn from_exception_returns_existing_fault_state() {
        let fault = FaultState::warning("Modul antwortet langsam");
        let translated = FaultState::from_exception(Some(anyhow::Error::new(fault.clone())));
        assert_eq!(translated, fault);
    }

    #[test]
    fn display_combines_level_and_message() {
        assert_eq!(FaultState::error("offline").to_string(), "ERROR: offline");
    }

    #[test]
    fn persistent_store_publishes_message_then_level() {
        let publisher = InMemoryPublisher::new();
        FaultState::error("Timeout").store_error(
            &battery(),
            &publisher,
            PublishMode::Persistent,
        );

        let messages = publisher.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].topic, "openWB/set/bat/2/get/fault_str");
        assert_eq!(messages[0].payload, json!("Timeout"));
        assert_eq!(messages[1].topic, "openWB/set/bat/2/get/fault_state");
        assert_eq!(messages[1].payload, json!(2));
        assert!(messages
            .iter()
            .all(|m| m.channel == PublishChannel::Persistent));
    }

    #[test]
    fn ramdisk_store_uses_single_publishes() {
        let publisher = InMemoryPublisher::new();
        FaultState::no_error().store_error(&battery(), &publisher, PublishMode::Ramdisk);

        let messages = publisher.messages();
        assert_eq!(messages[0].topic, "openWB/set/houseBattery/2/faultStr");
        assert_eq!(messages[0].payload, json!("Kein Fehler."));
        assert_eq!(messages[1].topic, "openWB/set/houseBattery/2/faultState");
        assert_eq!(messages[1].payload, json!(0));
        assert!(messages.iter().all(|m| m.channel == PublishChannel::Single));
    }

    #[test]
    fn store_error_swallows_publisher_failures() {
        let fault = FaultState::error("Verbindung fehlgeschlagen");
        fault.store_error(&battery(), &BrokenPublisher, PublishMode::Persistent);
        fault.store_error(&battery(), &BrokenPublisher, PublishMode::Ramdisk);
        assert!(fault
            .try_store(&battery(), &BrokenPublisher, PublishMode::Ramdisk)
            .is_err());
    }
}
