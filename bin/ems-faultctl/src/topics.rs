//! ---
//! ems_section: "05-networking-external-interfaces"
//! ems_subsection: "binary"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Control CLI for inspecting and reporting component fault states."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use clap::Args;
use ems_fault_core::{ComponentInfo, FaultTopics, PublishMode};

/// Options for the `topics` command.
#[derive(Debug, Args)]
pub struct TopicsArgs {
    /// Component type (bat, counter, inverter, vehicle, ...).
    #[arg(long = "type", value_name = "TYPE")]
    pub component_type: String,
    /// Numeric component id.
    #[arg(long)]
    pub id: Option<u32>,
    /// Show the ramdisk layout instead of the persistent one.
    #[arg(long)]
    pub ramdisk: bool,
}

pub fn run(args: TopicsArgs) {
    let component = ComponentInfo::new(args.id, "", args.component_type.as_str());
    let mode = PublishMode::from_ramdisk_flag(args.ramdisk);
    let topics = FaultTopics::for_component(&component, mode);
    println!("{}", topics.fault_str);
    println!("{}", topics.fault_state);
}
