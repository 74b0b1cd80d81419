//! Operation: load the IP lists and run the hierarchical flow.
//!
//! The flat flow passes the top-level `ips_list.toml` through unchanged. The
//! hierarchical flow expands it into a dependency tree, groups the tree by IP
//! name and asks a [`Decider`] to settle every conflict. The resolved list
//! then replaces the top-level one.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use ipdb_core::config::{DefaultsConfig, DirsConfig, GlobalConfig};
use ipdb_core::manifest::{IpList, IPS_LIST_FILE, RTL_LIST_FILE};
use ipdb_core::package::PackageReference;
use ipdb_core::snapshot::DatabaseSnapshot;
use ipdb_resolver::builder::TreeBuilder;
use ipdb_resolver::conflict::aggregate;
use ipdb_resolver::graph::DependencyTree;
use ipdb_resolver::policy::{CancelFlag, Decider, Resolution, ResolutionPolicy};
use ipdb_resolver::source::ManifestSource;
use ipdb_util::errors::{IpdbError, IpdbResult};
use ipdb_util::progress::{spinner, status, status_info, status_warn};

/// Options for opening an IP database.
#[derive(Debug, Clone)]
pub struct DatabaseOptions {
    /// Directory holding the top-level `ips_list.toml` and `rtl_list.toml`.
    pub list_path: PathBuf,
    pub build_deps_tree: bool,
    pub resolve_conflicts: bool,
    /// Restore a previously saved database instead of reading the lists.
    pub load_cache: Option<PathBuf>,
    pub verbose: bool,
    pub jobs: usize,
}

impl DatabaseOptions {
    /// Options taken from the `[resolve]` section of the global config.
    pub fn from_config(list_path: impl Into<PathBuf>, config: &GlobalConfig) -> Self {
        Self {
            list_path: list_path.into(),
            build_deps_tree: config.resolve.build_deps_tree,
            resolve_conflicts: config.resolve.resolve_conflicts,
            load_cache: None,
            verbose: config.resolve.verbose,
            jobs: config.resolve.jobs as usize,
        }
    }

    pub fn hierarchical(&self) -> bool {
        self.build_deps_tree || self.resolve_conflicts
    }

    /// Whether conflicts will be put to a decider, and so can be cancelled.
    pub fn asks_for_conflicts(&self) -> bool {
        self.resolve_conflicts && self.load_cache.is_none()
    }
}

/// How the current IP list was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Top-level list, as read.
    Flat,
    /// Tree built but conflicts left alone; the list is still the top-level one.
    TreeOnly,
    /// List replaced by the resolved tree.
    Hierarchical { conflicts: usize },
    /// Resolution was cancelled; the top-level list was kept.
    FellBackToFlat,
    /// Restored from a database cache.
    Cached,
}

/// The IP lists of a project after the configured flow has run.
#[derive(Debug)]
pub struct IpDatabase {
    pub list_path: PathBuf,
    pub dirs: DirsConfig,
    pub ip_list: Vec<PackageReference>,
    pub rtl_list: Option<Vec<PackageReference>>,
    pub tree: Option<DependencyTree>,
    pub flow: Flow,
}

impl IpDatabase {
    /// Load the lists under `options.list_path` and run the configured flow.
    pub async fn open(
        options: &DatabaseOptions,
        config: &GlobalConfig,
        source: Arc<dyn ManifestSource>,
        decider: &mut dyn Decider,
        cancel: CancelFlag,
    ) -> IpdbResult<Self> {
        if let Some(cache) = &options.load_cache {
            return Self::from_cache(&options.list_path, cache);
        }

        let (ip_list, rtl_list) = load_lists(&options.list_path, &config.defaults)?;
        let mut db = Self {
            list_path: options.list_path.clone(),
            dirs: config.dirs.clone(),
            ip_list,
            rtl_list,
            tree: None,
            flow: Flow::Flat,
        };
        if !options.hierarchical() {
            return Ok(db);
        }

        let tree = build_tree(db.ip_list.clone(), source, options.jobs).await?;
        db.flow = Flow::TreeOnly;
        if options.resolve_conflicts {
            let groups = aggregate(&tree);
            let conflicts = groups.conflict_count();
            match ResolutionPolicy::with_cancel_flag(cancel).resolve(&tree, &groups, decider) {
                Resolution::Resolved(list) => {
                    status("Resolved", &format!("{} ips ({conflicts} conflicts)", list.len()));
                    db.ip_list = list;
                    db.flow = Flow::Hierarchical { conflicts };
                }
                Resolution::Aborted => {
                    status_warn(
                        "Escaped",
                        "from IP choice, switching from hierarchical IP flow to flat IP flow",
                    );
                    db.flow = Flow::FellBackToFlat;
                }
            }
        }
        db.tree = Some(tree);
        Ok(db)
    }

    fn from_cache(list_path: &Path, cache: &Path) -> IpdbResult<Self> {
        let path = list_path.join(cache);
        let snapshot = DatabaseSnapshot::load(&path)?;
        status_info(
            "Loaded",
            &format!(
                "{} ips from cache {}",
                snapshot.ip_list.len(),
                path.display()
            ),
        );
        Ok(Self {
            list_path: list_path.to_path_buf(),
            dirs: snapshot.dirs(),
            ip_list: snapshot.ip_list,
            rtl_list: snapshot.rtl_list,
            tree: None,
            flow: Flow::Cached,
        })
    }

    pub fn snapshot(&self) -> DatabaseSnapshot {
        DatabaseSnapshot::new(&self.dirs, self.ip_list.clone(), self.rtl_list.clone())
    }

    /// Save the database, relative to the list directory.
    pub fn save_cache(&self, cache: &Path) -> IpdbResult<PathBuf> {
        let path = self.list_path.join(cache);
        self.snapshot().save(&path)?;
        status("Saved", &format!("database cache to {}", path.display()));
        Ok(path)
    }

    /// The IPs an exporter should emit.
    ///
    /// Without a target domain every domain matches. Without selected
    /// alternatives the list is not filtered on alternatives at all.
    pub fn export_list(&self, domain: Option<&str>, alternatives: &[String]) -> IpList {
        let selected: Vec<PackageReference> = self
            .ip_list
            .iter()
            .filter(|r| r.in_domain(domain))
            .filter(|r| alternatives.is_empty() || r.alternative_enabled(alternatives))
            .cloned()
            .collect();
        IpList::from_references(&selected)
    }
}

/// Read `ips_list.toml` and the optional `rtl_list.toml` from `list_path`.
///
/// A missing IP list is an empty project.
pub fn load_lists(
    list_path: &Path,
    defaults: &DefaultsConfig,
) -> Result<(Vec<PackageReference>, Option<Vec<PackageReference>>), IpdbError> {
    let ips = match IpList::load_optional(&list_path.join(IPS_LIST_FILE))? {
        Some(list) => list,
        None => {
            tracing::warn!("No {IPS_LIST_FILE} in {}", list_path.display());
            IpList::default()
        }
    };
    for name in ips.duplicate_names() {
        tracing::warn!("ip '{name}' is listed more than once in {IPS_LIST_FILE}, keeping the last entry");
    }
    let rtl = IpList::load_optional(&list_path.join(RTL_LIST_FILE))?
        .map(|list| list.references(defaults));
    Ok((dedup_by_name(ips.references(defaults)), rtl))
}

/// One entry per name: first position, last definition.
fn dedup_by_name(references: Vec<PackageReference>) -> Vec<PackageReference> {
    let mut out: Vec<PackageReference> = Vec::with_capacity(references.len());
    for reference in references {
        match out.iter_mut().find(|r| r.name == reference.name) {
            Some(slot) => *slot = reference,
            None => out.push(reference),
        }
    }
    out
}

/// Expand `roots` into the full dependency tree.
pub async fn build_tree(
    roots: Vec<PackageReference>,
    source: Arc<dyn ManifestSource>,
    jobs: usize,
) -> Result<DependencyTree, IpdbError> {
    let sp = spinner("Retrieving ips_list.toml dependency list for all IPs (may take some time)...");
    let result = TreeBuilder::new(source).jobs(jobs).build(roots).await;
    sp.finish_and_clear();
    let tree = result?;
    status("Generated", &format!("IP dependency tree ({} ips)", tree.len()));
    Ok(tree)
}
