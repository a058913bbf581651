//! ---
//! ems_section: "05-networking-external-interfaces"
//! ems_subsection: "binary"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Control CLI for inspecting and reporting component fault states."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use anyhow::Result;
use clap::{Parser, Subcommand};
use ems_fault_logging as logging;

mod report;
mod topics;

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Component fault state utility",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    #[command(about = "Print the topics a component's fault state is published to")]
    Topics(topics::TopicsArgs),
    #[command(about = "Log and publish a fault state for a component")]
    Report(report::ReportArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Topics(args) => {
            logging::init();
            topics::run(args);
        }
        Commands::Report(args) => report::run(args)?,
    }
    Ok(())
}
