//! CLI argument definitions using clap

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueHint};

use crate::application::Strategy;
use crate::domain::CANONICAL_SIZE;

/// Walk binary trees concurrently and compare their in-order sequences
#[derive(Parser, Debug)]
#[command(name = "treewalk")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Debug output, repeat for more (-d info, -dd debug, -ddd trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub debug: u8,

    /// Config file layered over the global one
    #[arg(short, long, global = true, env = "TREEWALK_CONFIG", value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    /// Without a subcommand the two canonical comparisons are printed
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// How a tree is built from its seed.
#[derive(Args, Debug, Clone, Copy)]
pub struct TreeArgs {
    /// Number of nodes
    #[arg(short, long, default_value_t = CANONICAL_SIZE)]
    pub size: usize,

    /// Insert values in random order instead of building a balanced tree
    #[arg(long)]
    pub shuffle: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Compare two trees by their in-order values
    Same {
        /// Seed of the left tree
        #[arg(allow_negative_numbers = true)]
        seed_a: i32,
        /// Seed of the right tree
        #[arg(allow_negative_numbers = true)]
        seed_b: i32,
        #[command(flatten)]
        tree: TreeArgs,
        /// Drain order (overrides config)
        #[arg(long, value_enum)]
        strategy: Option<Strategy>,
        /// Receive exactly N values per tree (overrides config)
        #[arg(long, value_name = "N")]
        fixed: Option<usize>,
        /// Channel buffer size (overrides config)
        #[arg(long)]
        capacity: Option<usize>,
        /// Receive timeout in milliseconds (overrides config)
        #[arg(long, value_name = "MS")]
        timeout_ms: Option<u64>,
        /// Print both sequences and walker counts
        #[arg(short, long)]
        report: bool,
    },

    /// Print the values a walker streams for one tree
    Walk {
        #[arg(allow_negative_numbers = true)]
        seed: i32,
        #[command(flatten)]
        tree: TreeArgs,
    },

    /// Show a tree's shape
    Show {
        #[arg(allow_negative_numbers = true)]
        seed: i32,
        #[command(flatten)]
        tree: TreeArgs,
    },

    /// Manage settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Generate shell completions
    Completion {
        /// Shell type
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show effective settings
    Show,
    /// Print a commented template
    Template,
    /// Show global config location
    Path,
}
