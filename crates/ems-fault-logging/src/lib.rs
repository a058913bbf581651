//! ---
//! ems_section: "03-persistence-logging"
//! ems_subsection: "module"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Structured logging adapters for fault reporting."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
#![warn(missing_docs)]

use std::path::PathBuf;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::{info, Level};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::daily;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::{Layer, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::Registry;

pub mod macros;

/// Environment variable consulted before `RUST_LOG` when building the filter.
pub const LOG_ENV: &str = "EMS_FAULT_LOG";

/// Initialize a baseline tracing subscriber suitable for development and CLI use.
pub fn init() {
    let _ = Registry::default()
        .with(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with(fmt::layer().with_writer(std::io::stderr))
        .try_init();
}

/// Output format of the stdout layer.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum LogFormat {
    /// One JSON object per line.
    #[default]
    StructuredJson,
    /// Human-readable multi-field output.
    Pretty,
}

fn default_logging_directory() -> PathBuf {
    PathBuf::from("target/logs")
}

/// Logging section of the application configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Directory receiving the daily rolling log files.
    #[serde(default = "default_logging_directory")]
    pub directory: PathBuf,
    /// Format used for stdout.
    #[serde(default)]
    pub format: LogFormat,
    /// Optional prefix for log file names; defaults to the service name.
    #[serde(default)]
    pub file_prefix: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: default_logging_directory(),
            format: LogFormat::default(),
            file_prefix: None,
        }
    }
}

impl LoggingConfig {
    /// File name (without the date suffix added by the appender) for `service_name`.
    pub fn file_name(&self, service_name: &str) -> String {
        let prefix = self.file_prefix.as_deref().unwrap_or(service_name);
        format!("{}-{}.log", prefix, service_name)
    }
}

/// Keeps the non-blocking writers alive; dropping it flushes pending lines.
#[must_use = "log lines are lost once the guard is dropped"]
pub struct LogGuard {
    _stdout: WorkerGuard,
    _file: WorkerGuard,
}

fn env_filter() -> EnvFilter {
    match std::env::var(LOG_ENV) {
        Ok(directive) => EnvFilter::try_new(&directive).unwrap_or_else(|err| {
            eprintln!("ignoring {LOG_ENV}={directive:?}: {err}");
            EnvFilter::new("info")
        }),
        Err(_) => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    }
}

/// Route fault reports to stdout and to a daily rolling JSON file.
///
/// The filter comes from `EMS_FAULT_LOG`, then `RUST_LOG`, then `info`. If a
/// global subscriber is already installed the new layers are discarded.
pub fn init_tracing(service_name: &str, config: &LoggingConfig) -> Result<LogGuard> {
    std::fs::create_dir_all(&config.directory)?;

    let (file_writer, file_guard) = tracing_appender::non_blocking(daily(
        &config.directory,
        config.file_name(service_name),
    ));
    let (stdout_writer, stdout_guard) = tracing_appender::non_blocking(std::io::stdout());

    let stdout_layer = match config.format {
        LogFormat::StructuredJson => fmt::layer()
            .json()
            .with_target(false)
            .with_writer(stdout_writer)
            .boxed(),
        LogFormat::Pretty => fmt::layer().with_writer(stdout_writer).boxed(),
    };
    let file_layer = fmt::layer()
        .json()
        .with_timer(fmt::time::UtcTime::rfc_3339())
        .with_writer(file_writer)
        .boxed();

    let installed = tracing_subscriber::registry()
        .with(env_filter())
        .with(stdout_layer)
        .with(file_layer)
        .try_init()
        .is_ok();
    if installed {
        info!(
            service = service_name,
            directory = %config.directory.display(),
            "fault logging ready"
        );
    }

    Ok(LogGuard {
        _stdout: stdout_guard,
        _file: file_guard,
    })
}

/// Component context attached to log events by the convenience macros.
#[derive(Debug, Default, Clone)]
pub struct LogContext<'a> {
    /// Human-readable component name.
    pub component: Option<&'a str>,
    /// Component type (`bat`, `counter`, ...).
    pub component_type: Option<&'a str>,
    /// Numeric component id, if the component has one.
    pub component_id: Option<u32>,
}

impl<'a> LogContext<'a> {
    /// Create an empty logging context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a component name.
    pub fn with_component(mut self, component: &'a str) -> Self {
        self.component = Some(component);
        self
    }

    /// Attach a component type.
    pub fn with_component_type(mut self, component_type: &'a str) -> Self {
        self.component_type = Some(component_type);
        self
    }

    /// Attach a component id.
    pub fn with_component_id(mut self, id: Option<u32>) -> Self {
        self.component_id = id;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn macros_emit_without_panic() {
        init();
        let ctx = LogContext::new()
            .with_component("Speicher")
            .with_component_type("bat")
            .with_component_id(Some(2));
        fault_info!(context = ctx.clone(), "component online");
        fault_debug!("debug message");
        fault_error!(context = ctx, "error code: {}", 42);
    }

    #[test]
    fn init_does_not_panic() {
        init();
        init();
    }

    #[test]
    fn file_name_prefers_configured_prefix() {
        let mut config = LoggingConfig::default();
        assert_eq!(config.file_name("faultctl"), "faultctl-faultctl.log");
        config.file_prefix = Some("site".into());
        assert_eq!(config.file_name("faultctl"), "site-faultctl.log");
    }

    #[test]
    fn logging_config_defaults_when_fields_missing() {
        let config: LoggingConfig = serde_json::from_str(r#"{"format":"pretty"}"#).unwrap();
        assert_eq!(config.format, LogFormat::Pretty);
        assert_eq!(config.directory, PathBuf::from("target/logs"));
        assert!(config.file_prefix.is_none());
    }

    #[test]
    fn init_tracing_creates_log_directory() {
        let dir = tempfile::tempdir().unwrap();
        let config = LoggingConfig {
            directory: dir.path().join("logs"),
            format: LogFormat::Pretty,
            file_prefix: None,
        };
        let _guard = init_tracing("test", &config).unwrap();
        assert!(config.directory.is_dir());
    }
}
