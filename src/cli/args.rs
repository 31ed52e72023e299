//! CLI argument definitions using clap

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand, ValueHint};

/// Hardware topology trees: synthetic machines, locality queries and affinity masks
#[derive(Parser, Debug)]
#[command(name = "topotree")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Synthetic description, e.g. "2 4 2" (overrides config)
    #[arg(short, long, global = true)]
    pub synthetic: Option<String>,

    /// Config file layered over the global one
    #[arg(short, long, global = true, value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    /// Debug level, repeat for more (-d info, -dd debug, -ddd trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub debug: u8,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the object tree
    Show {
        /// Hide cpusets
        #[arg(long)]
        no_cpuset: bool,
        /// Hide OS indices
        #[arg(long)]
        no_os_index: bool,
    },

    /// Summarize levels and the effective configuration
    Info,

    /// Run the consistency checker
    Check,

    /// List objects closest to OBJECT (same depth, by tree distance)
    Closest {
        /// Object as <depth>:<index> or <type>:<index>, e.g. pu:7
        object: String,
        /// Maximum number of results (default: closest.default_count)
        #[arg(short = 'n', long)]
        count: Option<usize>,
    },

    /// Show the common ancestor of two objects
    Ancestor {
        /// First object (<depth>:<index> or <type>:<index>)
        first: String,
        /// Second object
        second: String,
    },

    /// Show affinity and NUMA node masks for a cpuset
    Mask {
        /// Cpuset in list form, e.g. 0-3,8
        cpuset: String,
    },

    /// Generate shell completions
    Completion {
        /// Shell type
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}
