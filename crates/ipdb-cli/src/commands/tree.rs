//! Handlers for `ipdb tree` and `ipdb conflicts`.

use ipdb_core::config::GlobalConfig;
use ipdb_ops::ops_tree::{self, TreeOptions};
use miette::Result;

use crate::cli::ListArgs;

pub async fn exec(
    config: &GlobalConfig,
    list: ListArgs,
    depth: Option<usize>,
    dot: bool,
    verbose: bool,
) -> Result<()> {
    let list_path = super::list_path(&list)?;
    let opts = TreeOptions {
        depth,
        dot,
        verbose,
        jobs: super::jobs(&list, config),
    };
    ops_tree::tree(&list_path, config, &opts).await
}

pub async fn conflicts(config: &GlobalConfig, list: ListArgs, verbose: bool) -> Result<()> {
    let list_path = super::list_path(&list)?;
    ops_tree::conflicts(&list_path, config, verbose, super::jobs(&list, config)).await
}
