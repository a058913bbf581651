//! ---
//! ems_section: "01-core-functionality"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Component fault states and their publication."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use std::path::PathBuf;
use std::sync::Arc;

use ems_fault_bus::{BusMetrics, Publisher};
use ems_fault_config::PublishConfig;
use ems_fault_logging::fault_debug;

use crate::component::ComponentInfo;
use crate::fault::{log_store_failure, FaultState};
use crate::topic::PublishMode;

/// Runtime source of the active [`PublishMode`], consulted on every report.
pub trait ModeSource: Send + Sync {
    fn publish_mode(&self) -> PublishMode;
}

impl ModeSource for PublishMode {
    fn publish_mode(&self) -> PublishMode {
        *self
    }
}

/// Detects ramdisk mode from a marker file unless an override is configured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RamdiskProbe {
    forced: Option<bool>,
    marker: PathBuf,
}

impl RamdiskProbe {
    pub fn new(marker: impl Into<PathBuf>) -> Self {
        Self {
            forced: None,
            marker: marker.into(),
        }
    }

    /// Probe that always answers `ramdisk`.
    pub fn forced(ramdisk: bool) -> Self {
        Self {
            forced: Some(ramdisk),
            marker: PathBuf::new(),
        }
    }

    pub fn from_config(config: &PublishConfig) -> Self {
        Self {
            forced: config.ramdisk,
            marker: config.ramdisk_marker.clone(),
        }
    }

    pub fn is_ramdisk_in_use(&self) -> bool {
        self.forced.unwrap_or_else(|| self.marker.is_file())
    }
}

impl ModeSource for RamdiskProbe {
    fn publish_mode(&self) -> PublishMode {
        PublishMode::from_ramdisk_flag(self.is_ramdisk_in_use())
    }
}

/// Publisher plus mode source: everything a component needs to report.
#[derive(Clone)]
pub struct FaultReporter {
    publisher: Arc<dyn Publisher>,
    mode: Arc<dyn ModeSource>,
    metrics: Option<BusMetrics>,
}

impl FaultReporter {
    pub fn new(publisher: Arc<dyn Publisher>, mode: impl ModeSource + 'static) -> Self {
        Self {
            publisher,
            mode: Arc::new(mode),
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: BusMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn publisher(&self) -> &Arc<dyn Publisher> {
        &self.publisher
    }

    pub fn publish_mode(&self) -> PublishMode {
        self.mode.publish_mode()
    }

    /// Store `fault` for `component`. Failures are logged, never returned.
    pub fn report(&self, fault: &FaultState, component: &ComponentInfo) {
        let mode = self.publish_mode();
        fault_debug!(
            context = component.log_context(),
            "reporting {} via {} ({:?})",
            fault.level,
            self.publisher.name(),
            mode
        );
        if let Some(metrics) = &self.metrics {
            metrics.observe_report(fault.level.as_str());
        }

        match fault.try_store(component, self.publisher.as_ref(), mode) {
            Ok(published) => {
                if let Some(metrics) = &self.metrics {
                    metrics.observe_published(mode.channel(), published);
                }
            }
            Err(err) => {
                log_store_failure(component, &err);
                if let Some(metrics) = &self.metrics {
                    metrics.observe_failure();
                }
            }
        }
    }

    /// Report the outcome of one component update cycle.
    ///
    /// `Ok` stores [`FaultState::no_error`] and hands the value back; `Err` is
    /// translated with [`FaultState::from_exception`] and stored.
    pub fn report_outcome<T>(
        &self,
        component: &ComponentInfo,
        outcome: anyhow::Result<T>,
    ) -> Option<T> {
        match outcome {
            Ok(value) => {
                self.report(&FaultState::no_error(), component);
                Some(value)
            }
            Err(err) => {
                self.report(&FaultState::from_exception(Some(err)), component);
                None
            }
        }
    }
}
