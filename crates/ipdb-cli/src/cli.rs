//! CLI argument definitions for ipdb.
//!
//! Uses `clap` derive macros. Each command corresponds to a handler in the
//! [`super::commands`] module.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "ipdb",
    version,
    about = "Hierarchical dependency resolution for hardware IP lists",
    long_about = "ipdb reads a top-level ips_list.toml, expands the nested IP lists of every \
                  IP into a dependency tree and settles conflicting IP versions, interactively \
                  or automatically."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Show servers in IP labels
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Where the lists live and how many manifests to fetch at once.
#[derive(Args, Debug)]
pub struct ListArgs {
    /// Directory holding ips_list.toml (defaults to the current directory)
    #[arg(short = 'p', long)]
    pub list_path: Option<PathBuf>,

    /// Maximum number of nested IP lists read concurrently
    #[arg(short, long)]
    pub jobs: Option<usize>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Produce the flat IP list, optionally resolving nested dependencies
    Resolve {
        #[command(flatten)]
        list: ListArgs,
        /// Build the dependency tree without resolving conflicts
        #[arg(long)]
        build_deps_tree: bool,
        /// Build the dependency tree and resolve conflicts
        #[arg(long)]
        resolve_conflicts: bool,
        /// Ignore the hierarchical settings of the global config
        #[arg(long, conflicts_with_all = ["build_deps_tree", "resolve_conflicts"])]
        flat: bool,
        /// Never prompt; take the first-discovered candidate of every conflict
        #[arg(short, long)]
        yes: bool,
        /// Never prompt; keep the top-level list if any conflict is found
        #[arg(long, conflicts_with = "yes")]
        flat_on_conflict: bool,
        /// Only emit IPs targeting this domain
        #[arg(long)]
        domain: Option<String>,
        /// Enable an alternative IP (repeatable)
        #[arg(long = "alternative")]
        alternatives: Vec<String>,
        /// Write the list to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Save the database cache (default .cached_ipdb.json)
        #[arg(long, num_args = 0..=1, default_missing_value = ipdb_core::snapshot::CACHE_FILE)]
        save_cache: Option<PathBuf>,
        /// Load the database cache instead of reading the lists
        #[arg(long, num_args = 0..=1, default_missing_value = ipdb_core::snapshot::CACHE_FILE)]
        load_cache: Option<PathBuf>,
    },

    /// Display the IP dependency tree
    Tree {
        #[command(flatten)]
        list: ListArgs,
        /// Maximum depth to display
        #[arg(short, long)]
        depth: Option<usize>,
        /// Emit Graphviz dot
        #[arg(long)]
        dot: bool,
    },

    /// List conflicting IP versions with where they come from
    Conflicts {
        #[command(flatten)]
        list: ListArgs,
    },
}

pub fn parse() -> Cli {
    Cli::parse()
}
