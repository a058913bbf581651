//! ---
//! ems_section: "15-testing-qa-runbook"
//! ems_subsection: "integration-tests"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Integration and validation tests for fault reporting."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use std::sync::Arc;

use ems_fault_bus::{InMemoryPublisher, PublishChannel};
use ems_fault_config::AppConfig;
use ems_fault_core::{
    ComponentInfo, ExceptionRegistry, FaultReporter, FaultState, FaultStateLevel, PublishMode,
    RamdiskProbe,
};
use serde_json::json;

#[derive(Debug, thiserror::Error)]
#[error("vehicle api returned 401")]
struct SocApiUnauthorized;

fn report_all(mode: PublishMode) -> Vec<String> {
    let publisher = InMemoryPublisher::new();
    let reporter = FaultReporter::new(Arc::new(publisher.clone()), mode);
    for (id, ty) in [(1, "bat"), (0, "counter"), (2, "inverter"), (3, "vehicle")] {
        let component = ComponentInfo::new(Some(id), format!("{ty}-{id}"), ty);
        reporter.report(&FaultState::warning("check"), &component);
    }
    publisher
        .messages()
        .into_iter()
        .filter(|m| m.payload == json!(1))
        .map(|m| m.topic)
        .collect()
}

#[test]
fn every_component_type_gets_its_topics_in_both_modes() {
    assert_eq!(
        report_all(PublishMode::Persistent),
        vec![
            "openWB/set/bat/1/get/fault_state",
            "openWB/set/counter/0/get/fault_state",
            "openWB/set/pv/2/get/fault_state",
            "openWB/set/vehicle/3/get/fault_state",
        ]
    );
    assert_eq!(
        report_all(PublishMode::Ramdisk),
        vec![
            "openWB/set/houseBattery/1/faultState",
            "openWB/set/evu/0/faultState",
            "openWB/set/pv/2/faultState",
            "openWB/set/lp/3/socFaultState",
        ]
    );
}

#[test]
fn configured_override_selects_single_publishes() {
    let config: AppConfig = "[publish]\nramdisk = true\n".parse().unwrap();
    let publisher = InMemoryPublisher::new();
    let reporter = FaultReporter::new(
        Arc::new(publisher.clone()),
        RamdiskProbe::from_config(&config.publish),
    );
    let meter = ComponentInfo::from_component_config(&json!({
        "id": null,
        "name": "EVU",
        "type": "counter"
    }))
    .unwrap();

    reporter.report(&FaultState::no_error(), &meter);

    let messages = publisher.messages();
    assert_eq!(messages.len(), 2);
    assert!(messages.iter().all(|m| m.channel == PublishChannel::Single));
    assert_eq!(
        publisher.retained("openWB/set/evu/faultStr"),
        Some(json!("Kein Fehler."))
    );
    assert_eq!(publisher.retained("openWB/set/evu/faultState"), Some(json!(0)));
}

#[test]
fn custom_registry_translates_module_errors() {
    let mut registry = ExceptionRegistry::with_defaults();
    registry.register(|_: &SocApiUnauthorized| {
        FaultState::error("Login at the vehicle API failed. Check credentials.")
    });

    let error = anyhow::Error::new(SocApiUnauthorized);
    let fault = registry.from_exception(Some(error));
    assert_eq!(fault.level, FaultStateLevel::Error);
    assert!(fault.message.starts_with("Login at the vehicle API failed"));

    let unhandled = FaultState::from_exception(Some(anyhow::Error::new(SocApiUnauthorized)));
    assert_eq!(unhandled.message, "vehicle api returned 401");
}
