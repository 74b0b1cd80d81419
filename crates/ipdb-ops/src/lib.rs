pub mod ops_resolve;
pub mod ops_tree;
pub mod prompt;

use std::path::Path;
use std::sync::Arc;

use ipdb_core::config::GlobalConfig;
use ipdb_resolver::source::{DirectorySource, ManifestSource};

/// Manifest source reading nested IP lists from the checkouts below the ips directory.
pub fn local_source(list_path: &Path, config: &GlobalConfig) -> Arc<dyn ManifestSource> {
    Arc::new(DirectorySource::new(
        list_path.join(&config.dirs.ips),
        config.defaults.clone(),
    ))
}
