//! ---
//! ems_section: "02-messaging-ipc-data-model"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Bus publishers and codecs for fault states."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::logging::log_publish;
use crate::Result;

/// Payloads are JSON values; publishers encode them before they hit the wire.
pub type Payload = serde_json::Value;

/// Publisher abstraction shared by all bus backends.
///
/// Every message is published retained so late subscribers see the latest
/// fault state of a component.
pub trait Publisher: Send + Sync {
    /// Publish a single message over a short-lived connection.
    fn pub_single(&self, topic: &str, payload: &Payload) -> Result<()>;
    /// Publish a message through the long-lived client.
    fn publish(&self, topic: &str, payload: &Payload) -> Result<()>;
    /// Human-readable backend name for logging/metrics.
    fn name(&self) -> &'static str;
}

/// Path a message took onto the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PublishChannel {
    /// One-shot connection per message.
    Single,
    /// Shared long-lived client.
    Persistent,
}

impl PublishChannel {
    /// Label used in logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            PublishChannel::Single => "single",
            PublishChannel::Persistent => "persistent",
        }
    }
}

impl fmt::Display for PublishChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A message captured by [`InMemoryPublisher`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublishedMessage {
    /// Destination topic.
    pub topic: String,
    /// Payload as it would have been encoded.
    pub payload: Payload,
    /// Publish path used.
    pub channel: PublishChannel,
    /// Whether the broker would retain the message.
    pub retained: bool,
}

/// Publisher that records every message instead of sending it.
///
/// Used for dry runs and tests; clones share the same record.
#[derive(Clone, Default)]
pub struct InMemoryPublisher {
    messages: Arc<Mutex<Vec<PublishedMessage>>>,
}

impl InMemoryPublisher {
    /// Create an empty in-memory publisher.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything published so far, in publish order.
    pub fn messages(&self) -> Vec<PublishedMessage> {
        self.messages.lock().clone()
    }

    /// Remove and return everything published so far.
    pub fn drain(&self) -> Vec<PublishedMessage> {
        std::mem::take(&mut *self.messages.lock())
    }

    /// Most recent payload published to `topic`, mirroring broker retention.
    pub fn retained(&self, topic: &str) -> Option<Payload> {
        self.messages
            .lock()
            .iter()
            .rev()
            .find(|msg| msg.topic == topic && msg.retained)
            .map(|msg| msg.payload.clone())
    }

    fn record(&self, topic: &str, payload: &Payload, channel: PublishChannel) {
        log_publish(channel, topic, payload);
        self.messages.lock().push(PublishedMessage {
            topic: topic.to_owned(),
            payload: payload.clone(),
            channel,
            retained: true,
        });
    }
}

impl Publisher for InMemoryPublisher {
    fn pub_single(&self, topic: &str, payload: &Payload) -> Result<()> {
        self.record(topic, payload, PublishChannel::Single);
        Ok(())
    }

    fn publish(&self, topic: &str, payload: &Payload) -> Result<()> {
        self.record(topic, payload, PublishChannel::Persistent);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "in_memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn in_memory_publisher_records_both_channels() {
        let publisher = InMemoryPublisher::new();
        publisher
            .pub_single("openWB/set/evu/faultStr", &json!("Kein Fehler."))
            .unwrap();
        publisher
            .publish("openWB/set/counter/0/get/fault_state", &json!(0))
            .unwrap();

        let messages = publisher.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].channel, PublishChannel::Single);
        assert_eq!(messages[1].channel, PublishChannel::Persistent);
        assert!(messages.iter().all(|m| m.retained));
    }

    #[test]
    fn clones_share_the_record_and_drain_empties_it() {
        let publisher = InMemoryPublisher::new();
        let clone = publisher.clone();
        clone.publish("a/b", &json!(1)).unwrap();
        assert_eq!(publisher.drain().len(), 1);
        assert!(clone.messages().is_empty());
    }

    #[test]
    fn retained_returns_latest_payload_for_topic() {
        let publisher = InMemoryPublisher::new();
        publisher.publish("t", &json!(2)).unwrap();
        publisher.publish("t", &json!(0)).unwrap();
        publisher.publish("other", &json!(1)).unwrap();
        assert_eq!(publisher.retained("t"), Some(json!(0)));
        assert_eq!(publisher.retained("missing"), None);
    }
}
