//! CLI command definitions
//!
//! Defines the clap commands for apiprobe.

use clap::Subcommand;
use std::path::PathBuf;

#[derive(Subcommand)]
pub enum Commands {
    /// Run a scenario against a server
    Run {
        /// Scenario YAML file (default: the bundled travel API scenario)
        scenario: Option<PathBuf>,

        /// Base URL probe paths are appended to (default: http://localhost:3000/api)
        #[arg(long)]
        base_url: Option<String>,

        /// Per-request timeout in seconds, for probes without their own
        #[arg(long)]
        timeout: Option<u64>,

        /// Run only these categories (repeatable)
        #[arg(long = "only", value_name = "CATEGORY")]
        only: Vec<String>,

        /// Skip these categories (repeatable)
        #[arg(long = "skip", value_name = "CATEGORY")]
        skip: Vec<String>,

        /// Configuration file (default: platform config dir)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Print the full ledger as JSON instead of the text summary
        #[arg(long)]
        json: bool,

        /// Also write the JSON ledger to this file
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// List the categories and probes of a scenario
    List {
        /// Scenario YAML file (default: the bundled travel API scenario)
        scenario: Option<PathBuf>,
    },

    /// Validate a scenario file without sending any request
    Check {
        /// Scenario YAML file (default: the bundled travel API scenario)
        scenario: Option<PathBuf>,
    },
}
