//! ---
//! ems_section: "02-messaging-ipc-data-model"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Bus publishers and codecs for fault states."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
//! MQTT backend for [`Publisher`].
//!
//! Single publishes open a dedicated connection, send one retained message
//! and disconnect again. Persistent publishes go through one client that is
//! created on first use and driven by a background thread for the lifetime
//! of the publisher.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;
use rumqttc::{Client, Connection, Event, MqttOptions, Outgoing, QoS};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DurationSeconds};
use tracing::{debug, trace, warn};

use crate::logging::log_publish;
use crate::publisher::{Payload, PublishChannel, Publisher};
use crate::{BusError, Result};

const MIN_KEEP_ALIVE: Duration = Duration::from_secs(5);
const RECONNECT_BACKOFF: Duration = Duration::from_secs(1);
// one publish plus the disconnect request
const SINGLE_CAPACITY: usize = 2;

static SINGLE_CONNECTIONS: AtomicU64 = AtomicU64::new(0);

fn default_host() -> String {
    "localhost".to_owned()
}

fn default_port() -> u16 {
    1883
}

fn default_client_id() -> String {
    "ems-fault".to_owned()
}

fn default_keep_alive() -> Duration {
    Duration::from_secs(60)
}

fn default_capacity() -> usize {
    10
}

/// Broker connection settings.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrokerConfig {
    /// Broker host name or address.
    #[serde(default = "default_host")]
    pub host: String,
    /// Broker TCP port.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Client id of the persistent client; single publishes derive theirs from it.
    #[serde(default = "default_client_id")]
    pub client_id: String,
    /// MQTT keep-alive interval.
    #[serde(default = "default_keep_alive")]
    #[serde_as(as = "DurationSeconds<u64>")]
    pub keep_alive: Duration,
    /// Capacity of the persistent client's request queue.
    #[serde(default = "default_capacity")]
    pub capacity: usize,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            client_id: default_client_id(),
            keep_alive: default_keep_alive(),
            capacity: default_capacity(),
        }
    }
}

impl BrokerConfig {
    /// Check the settings against what the MQTT client accepts.
    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(BusError::InvalidConfig("broker host must not be empty".into()));
        }
        if self.client_id.is_empty() || self.client_id.starts_with(char::is_whitespace) {
            return Err(BusError::InvalidConfig(
                "client_id must be non-empty and must not start with whitespace".into(),
            ));
        }
        if self.port == 0 {
            return Err(BusError::InvalidConfig("broker port must not be 0".into()));
        }
        if self.keep_alive < MIN_KEEP_ALIVE {
            return Err(BusError::InvalidConfig(format!(
                "keep_alive must be at least {}s",
                MIN_KEEP_ALIVE.as_secs()
            )));
        }
        if self.capacity == 0 {
            return Err(BusError::InvalidConfig("capacity must be at least 1".into()));
        }
        Ok(())
    }

    fn mqtt_options(&self, client_id: String) -> MqttOptions {
        let mut options = MqttOptions::new(client_id, self.host.clone(), self.port);
        options.set_keep_alive(self.keep_alive);
        options.set_clean_session(true);
        options
    }

    fn connection_error(&self, reason: impl ToString) -> BusError {
        BusError::Connection {
            host: self.host.clone(),
            port: self.port,
            reason: reason.to_string(),
        }
    }
}

/// [`Publisher`] backed by an MQTT broker.
pub struct MqttPublisher {
    config: BrokerConfig,
    persistent: Mutex<Option<PersistentClient>>,
}

struct PersistentClient {
    client: Client,
    stop: Arc<AtomicBool>,
    stopped: Receiver<()>,
}

impl PersistentClient {
    fn request_stop(&self) {
        self.stop.store(true, Ordering::Release);
        if let Err(err) = self.client.try_disconnect() {
            debug!(error = %err, "disconnect not queued; event loop stops on its own");
        }
    }
}

impl MqttPublisher {
    /// Create a publisher. No connection is opened until the first publish.
    pub fn new(config: BrokerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            persistent: Mutex::new(None),
        })
    }

    /// Broker settings in use.
    pub fn config(&self) -> &BrokerConfig {
        &self.config
    }

    /// Disconnect the persistent client and wait up to `timeout` for queued
    /// messages to leave. Returns `false` if the connection did not wind down in
    /// time. A later publish starts a fresh client.
    pub fn shutdown(&self, timeout: Duration) -> bool {
        let Some(persistent) = self.persistent.lock().take() else {
            return true;
        };
        persistent.request_stop();
        let stopped = persistent.stopped.recv_timeout(timeout).is_ok();
        if !stopped {
            warn!(timeout = ?timeout, "persistent mqtt client still running after shutdown");
        }
        stopped
    }

    fn persistent_client(&self) -> Result<Client> {
        let mut guard = self.persistent.lock();
        if let Some(persistent) = guard.as_ref() {
            return Ok(persistent.client.clone());
        }

        let options = self.config.mqtt_options(self.config.client_id.clone());
        let (client, connection) = Client::new(options, self.config.capacity);
        let stop = Arc::new(AtomicBool::new(false));
        let (stopped_tx, stopped) = mpsc::channel();
        let driver = PersistentDriver {
            client: client.clone(),
            stop: Arc::clone(&stop),
            stopped: stopped_tx,
        };
        thread::Builder::new()
            .name("ems-fault-mqtt".into())
            .spawn(move || driver.run(connection))?;
        debug!(host = %self.config.host, port = self.config.port, "persistent mqtt client started");
        *guard = Some(PersistentClient {
            client: client.clone(),
            stop,
            stopped,
        });
        Ok(client)
    }

    fn single_client_id(&self) -> String {
        let sequence = SINGLE_CONNECTIONS.fetch_add(1, Ordering::Relaxed);
        format!("{}-single-{}-{}", self.config.client_id, std::process::id(), sequence)
    }
}

/// Event loop of the persistent client. Runs until the disconnect leaves the
/// client, or until a stop is requested while the broker is unreachable.
struct PersistentDriver {
    client: Client,
    stop: Arc<AtomicBool>,
    stopped: Sender<()>,
}

impl PersistentDriver {
    fn stopping(&self) -> bool {
        self.stop.load(Ordering::Acquire)
    }

    fn run(self, mut connection: Connection) {
        let mut disconnect_queued = false;
        for notification in connection.iter() {
            match notification {
                Ok(Event::Outgoing(Outgoing::Disconnect)) => break,
                Ok(event) => trace!(?event, "mqtt event"),
                Err(err) if self.stopping() => {
                    debug!(error = %err, "dropping unsent messages on shutdown");
                    break;
                }
                Err(err) => {
                    warn!(error = %err, "mqtt connection error; retrying");
                    thread::sleep(RECONNECT_BACKOFF);
                    if self.stopping() {
                        break;
                    }
                }
            }
            // the queue may have been full when the stop was requested
            if self.stopping() && !disconnect_queued {
                disconnect_queued = self.client.try_disconnect().is_ok();
            }
        }
        debug!("persistent mqtt client stopped");
        let _ = self.stopped.send(());
    }
}

fn encode(payload: &Payload) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(payload)?)
}

impl Publisher for MqttPublisher {
    fn pub_single(&self, topic: &str, payload: &Payload) -> Result<()> {
        let bytes = encode(payload)?;
        let options = self.config.mqtt_options(self.single_client_id());
        let (client, mut connection) = Client::new(options, SINGLE_CAPACITY);

        client
            .try_publish(topic, QoS::AtMostOnce, true, bytes)
            .map_err(|err| BusError::Publish {
                topic: topic.to_owned(),
                reason: err.to_string(),
            })?;
        client
            .try_disconnect()
            .map_err(|err| self.config.connection_error(err))?;

        for notification in connection.iter() {
            match notification {
                Ok(Event::Outgoing(Outgoing::Disconnect)) => break,
                Ok(event) => trace!(?event, "mqtt event"),
                Err(err) => return Err(self.config.connection_error(err)),
            }
        }

        log_publish(PublishChannel::Single, topic, payload);
        Ok(())
    }

    fn publish(&self, topic: &str, payload: &Payload) -> Result<()> {
        let bytes = encode(payload)?;
        let client = self.persistent_client()?;
        client
            .try_publish(topic, QoS::AtMostOnce, true, bytes)
            .map_err(|err| BusError::Publish {
                topic: topic.to_owned(),
                reason: err.to_string(),
            })?;
        log_publish(PublishChannel::Persistent, topic, payload);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "mqtt"
    }
}

impl Drop for MqttPublisher {
    fn drop(&mut self) {
        if let Some(persistent) = self.persistent.lock().take() {
            persistent.request_stop();
        }
    }
}
