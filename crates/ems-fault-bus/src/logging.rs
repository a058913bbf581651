//! ---
//! ems_section: "02-messaging-ipc-data-model"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Bus publishers and codecs for fault states."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use prometheus::{IntCounter, IntCounterVec, Opts, Registry};
use tracing::debug;

use crate::publisher::{Payload, PublishChannel};

/// Emit a structured log entry for an outgoing bus message.
pub fn log_publish(channel: PublishChannel, topic: &str, payload: &Payload) {
    debug!(
        channel = channel.as_str(),
        topic,
        payload = %payload,
        "bus publish"
    );
}

/// Prometheus metric handles for fault reporting on the bus.
#[derive(Clone)]
pub struct BusMetrics {
    published: IntCounterVec,
    failures: IntCounter,
    reports: IntCounterVec,
}

impl BusMetrics {
    /// Register fault bus metrics with the provided registry.
    pub fn register(registry: &Registry) -> Result<Self, prometheus::Error> {
        let published = IntCounterVec::new(
            Opts::new(
                "fault_messages_published_total",
                "Fault messages handed to the bus, by publish channel",
            ),
            &["channel"],
        )?;
        let failures = IntCounter::with_opts(Opts::new(
            "fault_publish_failures_total",
            "Fault reports that could not be published",
        ))?;
        let reports = IntCounterVec::new(
            Opts::new(
                "fault_reports_total",
                "Fault states reported by components, by level",
            ),
            &["level"],
        )?;

        registry.register(Box::new(published.clone()))?;
        registry.register(Box::new(failures.clone()))?;
        registry.register(Box::new(reports.clone()))?;

        Ok(Self {
            published,
            failures,
            reports,
        })
    }

    /// Record `count` messages published over `channel`.
    pub fn observe_published(&self, channel: PublishChannel, count: u64) {
        self.published
            .with_label_values(&[channel.as_str()])
            .inc_by(count);
    }

    /// Record a report that failed to reach the bus.
    pub fn observe_failure(&self) {
        self.failures.inc();
    }

    /// Record a report at `level`.
    pub fn observe_report(&self, level: &str) {
        self.reports.with_label_values(&[level]).inc();
    }
}
