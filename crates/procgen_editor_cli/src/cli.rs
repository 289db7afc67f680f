// SPDX-License-Identifier: MIT OR Apache-2.0
//! Command line arguments.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Procedural texture node graph tool
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Increase logging verbosity (default: warn, -v: info, -vv: debug, -vvv+: trace)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count, global = true)]
    pub verbosity: u8,

    /// What to do
    #[command(subcommand)]
    pub command: Command,
}

/// Subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Load a graph, apply variable overrides and bring every node up to date
    Update(UpdateArgs),

    /// Print nodes, connections and variables of a graph
    Inspect {
        /// Graph file (.ron or .json)
        #[arg(value_name = "GRAPH")]
        graph: PathBuf,
    },

    /// Convert a graph between RON and JSON (chosen by extension)
    Convert {
        /// Source graph file
        #[arg(value_name = "IN")]
        input: PathBuf,
        /// Destination graph file
        #[arg(value_name = "OUT")]
        output: PathBuf,
    },

    /// List the built-in node types
    Types,
}

/// Arguments of `update`
#[derive(Args, Debug)]
pub struct UpdateArgs {
    /// Graph file (.ron or .json)
    #[arg(value_name = "GRAPH")]
    pub graph: PathBuf,

    /// Designer settings file (RON)
    #[arg(short = 's', long = "settings", value_name = "FILE")]
    pub settings: Option<PathBuf>,

    /// Set a variable before updating, e.g. `--set scale=4` or `--set tint=[1,0,0,1]`
    #[arg(long = "set", value_name = "NAME=VALUE")]
    pub set: Vec<String>,

    /// Save the updated graph here
    #[arg(short = 'o', long = "out", value_name = "FILE")]
    pub out: Option<PathBuf>,
}

impl Cli {
    /// Log level for the verbosity count
    pub fn log_level(&self) -> tracing::level_filters::LevelFilter {
        use tracing::level_filters::LevelFilter;
        match self.verbosity {
            0 => LevelFilter::WARN,
            1 => LevelFilter::INFO,
            2 => LevelFilter::DEBUG,
            _ => LevelFilter::TRACE,
        }
    }
}
