//! Operation: display the dependency tree and its conflicts.

use std::path::Path;
use std::sync::Arc;

use ipdb_core::config::GlobalConfig;
use ipdb_resolver::conflict::aggregate;
use ipdb_resolver::graph::DependencyTree;
use ipdb_resolver::source::ManifestSource;
use ipdb_util::errors::IpdbResult;

use crate::ops_resolve::{build_tree, load_lists};

/// Options for `ipdb tree`.
#[derive(Debug, Clone, Default)]
pub struct TreeOptions {
    /// Maximum tree depth to display.
    pub depth: Option<usize>,
    /// Emit Graphviz dot instead of text.
    pub dot: bool,
    /// Show servers in labels.
    pub verbose: bool,
    pub jobs: usize,
}

async fn load_tree(
    list_path: &Path,
    config: &GlobalConfig,
    source: Arc<dyn ManifestSource>,
    jobs: usize,
) -> IpdbResult<DependencyTree> {
    let (ip_list, _) = load_lists(list_path, &config.defaults)?;
    Ok(build_tree(ip_list, source, jobs).await?)
}

/// Render the dependency tree of the IPs listed under `list_path`.
pub async fn render_tree(
    list_path: &Path,
    config: &GlobalConfig,
    source: Arc<dyn ManifestSource>,
    opts: &TreeOptions,
) -> IpdbResult<String> {
    let tree = load_tree(list_path, config, source, opts.jobs).await?;
    if opts.dot {
        Ok(tree.to_dot())
    } else {
        Ok(tree.print_tree(opts.depth, opts.verbose))
    }
}

/// Render every conflict of the dependency tree, without resolving anything.
pub async fn render_conflicts(
    list_path: &Path,
    config: &GlobalConfig,
    source: Arc<dyn ManifestSource>,
    verbose: bool,
    jobs: usize,
) -> IpdbResult<String> {
    let tree = load_tree(list_path, config, source, jobs).await?;
    let groups = aggregate(&tree);
    Ok(groups.report(&tree, verbose).to_string())
}

/// Print the dependency tree.
pub async fn tree(list_path: &Path, config: &GlobalConfig, opts: &TreeOptions) -> IpdbResult<()> {
    let source = crate::local_source(list_path, config);
    print!("{}", render_tree(list_path, config, source, opts).await?);
    Ok(())
}

/// Print the conflict groups.
pub async fn conflicts(
    list_path: &Path,
    config: &GlobalConfig,
    verbose: bool,
    jobs: usize,
) -> IpdbResult<()> {
    let source = crate::local_source(list_path, config);
    print!(
        "{}",
        render_conflicts(list_path, config, source, verbose, jobs).await?
    );
    Ok(())
}
