//! ---
//! ems_section: "05-networking-external-interfaces"
//! ems_subsection: "integration-tests"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Control CLI for inspecting and reporting component fault states."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use assert_cmd::Command;
use predicates::prelude::*;

fn faultctl() -> Command {
    let mut cmd = Command::cargo_bin("ems-faultctl").expect("binary built");
    cmd.env_remove("EMS_FAULT_CONFIG");
    cmd
}

#[test]
fn topics_prints_persistent_layout() {
    faultctl()
        .args(["topics", "--type", "inverter", "--id", "3"])
        .assert()
        .success()
        .stdout("openWB/set/pv/3/get/fault_str\nopenWB/set/pv/3/get/fault_state\n");
}

#[test]
fn topics_prints_ramdisk_layout_for_vehicles() {
    faultctl()
        .args(["topics", "--type", "vehicle", "--id", "1", "--ramdisk"])
        .assert()
        .success()
        .stdout("openWB/set/lp/1/socFaultStr\nopenWB/set/lp/1/socFaultState\n");
}

#[test]
fn report_dry_run_prints_messages() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("fault.toml");
    std::fs::write(&config, "[publish]\nramdisk = true\n").unwrap();

    faultctl()
        .args(["report", "--name", "Speicher", "--type", "bat", "--id", "2"])
        .args(["--level", "error", "--message", "Keine Verbindung", "--dry-run"])
        .arg("--config")
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("openWB/set/houseBattery/2/faultStr"))
        .stdout(predicate::str::contains("\"Keine Verbindung\""))
        .stdout(predicate::str::contains("\"single\""));
}

#[test]
fn report_requires_message_for_errors() {
    faultctl()
        .args(["report", "--name", "EVU", "--type", "counter", "--level", "error", "--dry-run"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--message is required"));
}

#[test]
fn report_writes_configured_log_file_when_broker_is_down() {
    let dir = tempfile::tempdir().unwrap();
    let logs = dir.path().join("logs");
    let config = dir.path().join("fault.toml");
    std::fs::write(
        &config,
        format!(
            "[broker]\nhost = \"127.0.0.1\"\nport = 1\n\n\
             [publish]\nramdisk = true\n\n\
             [logging]\ndirectory = {:?}\nformat = \"pretty\"\n",
            logs.display().to_string()
        ),
    )
    .unwrap();

    faultctl()
        .env_remove("EMS_FAULT_LOG")
        .env_remove("RUST_LOG")
        .args(["report", "--name", "Wechselrichter", "--type", "inverter", "--id", "3"])
        .args(["--level", "error", "--message", "Modbus Timeout"])
        .arg("--config")
        .arg(&config)
        .timeout(std::time::Duration::from_secs(30))
        .assert()
        .success();

    let written: String = std::fs::read_dir(&logs)
        .unwrap()
        .map(|entry| std::fs::read_to_string(entry.unwrap().path()).unwrap())
        .collect();
    assert!(written.contains("Modbus Timeout"));
    assert!(written.contains("failed to store fault state"));
}
