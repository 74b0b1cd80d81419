//! Command dispatch and handler modules.

mod resolve;
mod tree;

use std::path::PathBuf;

use ipdb_core::config::GlobalConfig;
use ipdb_util::errors::IpdbError;
use miette::Result;

use crate::cli::{Cli, Command, ListArgs};

/// Route a parsed CLI invocation to the appropriate command handler.
pub async fn dispatch(cli: Cli) -> Result<()> {
    let config = GlobalConfig::load()?;
    let verbose = cli.verbose || config.resolve.verbose;
    match cli.command {
        Command::Resolve {
            list,
            build_deps_tree,
            resolve_conflicts,
            flat,
            yes,
            flat_on_conflict,
            domain,
            alternatives,
            output,
            save_cache,
            load_cache,
        } => {
            resolve::exec(
                &config,
                resolve::ResolveArgs {
                    list,
                    build_deps_tree,
                    resolve_conflicts,
                    flat,
                    yes,
            flat_on_conflict,
                    domain,
                    alternatives,
                    output,
                    save_cache,
                    load_cache,
                    verbose,
                },
            )
            .await
        }
        Command::Tree { list, depth, dot } => tree::exec(&config, list, depth, dot, verbose).await,
        Command::Conflicts { list } => tree::conflicts(&config, list, verbose).await,
    }
}

/// The list directory, defaulting to the current one.
fn list_path(args: &ListArgs) -> Result<PathBuf> {
    match &args.list_path {
        Some(path) => Ok(path.clone()),
        None => Ok(std::env::current_dir().map_err(IpdbError::Io)?),
    }
}

fn jobs(args: &ListArgs, config: &GlobalConfig) -> usize {
    args.jobs.unwrap_or(config.resolve.jobs as usize)
}
