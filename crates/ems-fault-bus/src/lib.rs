//! ---
//! ems_section: "02-messaging-ipc-data-model"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Bus publishers and codecs for fault states."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
#![warn(missing_docs)]

pub mod logging;
pub mod mqtt;
pub mod publisher;

/// Shared result type for bus operations.
pub type Result<T> = std::result::Result<T, BusError>;

/// Failures raised while talking to the message bus.
#[derive(Debug, thiserror::Error)]
pub enum BusError {
    /// The broker could not be reached or dropped the connection.
    #[error("failed to connect to broker {host}:{port}: {reason}")]
    Connection {
        /// Broker host name.
        host: String,
        /// Broker port.
        port: u16,
        /// Underlying client error.
        reason: String,
    },
    /// The client rejected or could not queue the publish request.
    #[error("failed to publish message to topic '{topic}': {reason}")]
    Publish {
        /// Topic the message was destined for.
        topic: String,
        /// Underlying client error.
        reason: String,
    },
    /// Broker settings failed validation.
    #[error("invalid broker configuration: {0}")]
    InvalidConfig(String),
    /// Payload could not be encoded.
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
    /// Wrapper for IO errors, e.g. when spawning the connection thread.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub use logging::{log_publish, BusMetrics};
pub use mqtt::{BrokerConfig, MqttPublisher};
pub use publisher::{InMemoryPublisher, Payload, PublishChannel, PublishedMessage, Publisher};
