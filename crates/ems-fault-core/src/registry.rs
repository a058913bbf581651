//! ---
//! ems_section: "01-core-functionality"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Component fault states and their publication."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
//! Translation of arbitrary errors into [`FaultState`]s.

use std::error::Error as StdError;
use std::fmt;
use std::io;

use ems_fault_bus::BusError;
use once_cell::sync::Lazy;

use crate::fault::FaultState;

type Handler = Box<dyn Fn(&(dyn StdError + 'static)) -> Option<FaultState> + Send + Sync>;

static DEFAULT_REGISTRY: Lazy<ExceptionRegistry> = Lazy::new(ExceptionRegistry::with_defaults);

/// Ordered set of per-type translators from errors to fault states.
///
/// Translation walks the error's source chain from the outermost error
/// inwards. A [`FaultState`] anywhere in the chain is returned unchanged;
/// otherwise the first link with a registered handler decides. Errors nobody
/// handles become [`FaultState::error`] with the rendered error chain.
#[derive(Default)]
pub struct ExceptionRegistry {
    handlers: Vec<Handler>,
}

impl ExceptionRegistry {
    /// Registry without any handlers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with handlers for I/O and bus errors.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry
            .register::<io::Error, _>(translate_io_error)
            .register::<BusError, _>(translate_bus_error);
        registry
    }

    /// Process-wide registry used by [`FaultState::from_exception`].
    pub fn global() -> &'static ExceptionRegistry {
        &DEFAULT_REGISTRY
    }

    /// Add a handler for errors of type `E`. Earlier registrations win.
    pub fn register<E, F>(&mut self, handler: F) -> &mut Self
    where
        E: StdError + 'static,
        F: Fn(&E) -> FaultState + Send + Sync + 'static,
    {
        self.handlers.push(Box::new(move |error: &(dyn StdError + 'static)| {
            error.downcast_ref::<E>().map(&handler)
        }));
        self
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// `None` maps to [`FaultState::no_error`], anything else to [`Self::translate`].
    pub fn from_exception(&self, error: Option<anyhow::Error>) -> FaultState {
        match error {
            None => FaultState::no_error(),
            Some(error) => self.translate(error),
        }
    }

    pub fn translate(&self, error: anyhow::Error) -> FaultState {
        let error = match error.downcast::<FaultState>() {
            Ok(fault) => return fault,
            Err(error) => error,
        };

        if let Some(fault) = error.chain().find_map(|cause| cause.downcast_ref::<FaultState>()) {
            return fault.clone();
        }
        for cause in error.chain() {
            if let Some(fault) = self.handlers.iter().find_map(|handler| handler(cause)) {
                return fault;
            }
        }

        FaultState::error(format!("{error:#}"))
    }
}

impl fmt::Debug for ExceptionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExceptionRegistry")
            .field("handlers", &self.handlers.len())
            .finish()
    }
}

fn translate_io_error(error: &io::Error) -> FaultState {
    match error.kind() {
        io::ErrorKind::ConnectionRefused
        | io::ErrorKind::ConnectionReset
        | io::ErrorKind::ConnectionAborted
        | io::ErrorKind::NotConnected
        | io::ErrorKind::AddrNotAvailable => FaultState::error(format!(
            "Connection to the device failed ({error}). Check address, port and network."
        )),
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => FaultState::error(format!(
            "The device did not answer in time ({error}). Check that it is powered and reachable."
        )),
        _ => FaultState::error(format!("I/O error: {error}")),
    }
}

fn translate_bus_error(error: &BusError) -> FaultState {
    match error {
        BusError::Connection { host, port, .. } => {
            FaultState::error(format!("Message broker {host}:{port} is unreachable."))
        }
        other => FaultState::error(format!("Message bus error: {other}")),
    }
}
