//! ---
//! ems_section: "05-networking-external-interfaces"
//! ems_subsection: "binary"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Control CLI for inspecting and reporting component fault states."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Result};
use clap::{Args, ValueEnum};
use ems_fault_bus::{InMemoryPublisher, MqttPublisher};
use ems_fault_config::AppConfig;
use ems_fault_core::{ComponentInfo, FaultReporter, FaultState, RamdiskProbe};
use ems_fault_logging::{self as logging, fault_info};
use tracing::{debug, warn};

const CONFIG_CANDIDATES: [&str; 2] = ["configs/ems-fault.toml", "/etc/ems-fault/config.toml"];
const SERVICE_NAME: &str = "ems-faultctl";
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LevelArg {
    NoError,
    Warning,
    Error,
}

/// Options for the `report` command.
#[derive(Debug, Args)]
pub struct ReportArgs {
    /// Component display name.
    #[arg(long)]
    pub name: String,
    /// Component type (bat, counter, inverter, vehicle, ...).
    #[arg(long = "type", value_name = "TYPE")]
    pub component_type: String,
    /// Numeric component id.
    #[arg(long)]
    pub id: Option<u32>,
    #[arg(long, value_enum)]
    pub level: LevelArg,
    /// Fault message; required for warnings and errors.
    #[arg(long)]
    pub message: Option<String>,
    /// Print the messages as JSON instead of publishing them.
    #[arg(long)]
    pub dry_run: bool,
    /// Path to the configuration file.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

pub fn run(args: ReportArgs) -> Result<()> {
    let fault = fault_state(args.level, args.message.as_deref())?;
    let component = ComponentInfo::new(
        args.id,
        args.name.as_str(),
        args.component_type.as_str(),
    );
    let config = load_config(args.config.as_deref())?;
    let probe = RamdiskProbe::from_config(&config.publish);

    // stdout carries the JSON dump in dry runs
    if args.dry_run {
        logging::init();
        let publisher = InMemoryPublisher::new();
        FaultReporter::new(Arc::new(publisher.clone()), probe).report(&fault, &component);
        println!("{}", serde_json::to_string_pretty(&publisher.messages())?);
        return Ok(());
    }

    let _log_guard = logging::init_tracing(SERVICE_NAME, &config.logging)?;
    let publisher = Arc::new(MqttPublisher::new(config.broker.clone())?);
    FaultReporter::new(publisher.clone(), probe).report(&fault, &component);
    if !publisher.shutdown(SHUTDOWN_TIMEOUT) {
        warn!(
            host = %config.broker.host,
            "broker connection did not close in time; messages may be lost"
        );
    }
    fault_info!(
        context = component.log_context(),
        "{} reported to {}:{}",
        fault.level,
        config.broker.host,
        config.broker.port
    );
    Ok(())
}

fn fault_state(level: LevelArg, message: Option<&str>) -> Result<FaultState> {
    Ok(match (level, message) {
        (LevelArg::NoError, _) => FaultState::no_error(),
        (LevelArg::Warning, Some(message)) => FaultState::warning(message),
        (LevelArg::Error, Some(message)) => FaultState::error(message),
        (_, None) => bail!("--message is required for warnings and errors"),
    })
}

fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    if let Some(path) = path {
        return AppConfig::from_path(path);
    }
    let env_set = std::env::var_os(AppConfig::ENV_CONFIG_PATH).is_some_and(|v| !v.is_empty());
    if env_set || CONFIG_CANDIDATES.iter().any(|c| Path::new(c).exists()) {
        let loaded = AppConfig::load_with_source(&CONFIG_CANDIDATES)?;
        debug!(source = %loaded.source.display(), "configuration loaded");
        return Ok(loaded.config);
    }
    debug!("no configuration file found; using defaults");
    Ok(AppConfig::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ems_fault_core::FaultStateLevel;

    #[test]
    fn warnings_and_errors_need_a_message() {
        assert!(fault_state(LevelArg::Error, None).is_err());
        assert_eq!(
            fault_state(LevelArg::Warning, Some("slow")).unwrap().level,
            FaultStateLevel::Warning
        );
        assert_eq!(
            fault_state(LevelArg::NoError, Some("ignored")).unwrap(),
            FaultState::no_error()
        );
    }

    #[test]
    fn explicit_config_path_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_config(Some(&dir.path().join("missing.toml"))).is_err());
    }
}
