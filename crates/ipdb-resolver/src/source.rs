//! Where nested manifests come from.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use ipdb_core::config::DefaultsConfig;
use ipdb_core::manifest::{IpList, IPS_LIST_FILE};
use ipdb_core::package::PackageReference;
use ipdb_util::errors::IpdbError;

/// Provides the direct dependencies of an IP.
///
/// `Ok(None)` means the IP carries no nested manifest and is a leaf. `Err`
/// is a hard failure that aborts the whole tree build.
pub trait ManifestSource: Send + Sync {
    fn fetch(&self, reference: &PackageReference)
        -> Result<Option<Vec<PackageReference>>, IpdbError>;
}

/// Reads nested manifests from local IP checkouts: `<ips_dir>/<path>/ips_list.toml`.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    ips_dir: PathBuf,
    defaults: DefaultsConfig,
}

impl DirectorySource {
    pub fn new(ips_dir: impl Into<PathBuf>, defaults: DefaultsConfig) -> Self {
        Self {
            ips_dir: ips_dir.into(),
            defaults,
        }
    }

    pub fn ips_dir(&self) -> &Path {
        &self.ips_dir
    }
}

impl ManifestSource for DirectorySource {
    fn fetch(
        &self,
        reference: &PackageReference,
    ) -> Result<Option<Vec<PackageReference>>, IpdbError> {
        let manifest = reference.source_dir(&self.ips_dir)?.join(IPS_LIST_FILE);
        match IpList::load_optional(&manifest)? {
            Some(list) => {
                tracing::debug!("{reference}: {} entries in {}", list.len(), manifest.display());
                Ok(Some(list.references(&self.defaults)))
            }
            None => {
                tracing::debug!("{reference}: no nested manifest");
                Ok(None)
            }
        }
    }
}

/// In-memory manifests keyed by `name@commit`.
///
/// Unknown IPs are leaves. Failures can be registered to stand in for an
/// unreachable remote.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    manifests: HashMap<String, Vec<PackageReference>>,
    failures: HashMap<String, String>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the nested manifest of `name` at `commit`.
    pub fn with_manifest(
        mut self,
        name: &str,
        commit: &str,
        dependencies: Vec<PackageReference>,
    ) -> Self {
        self.manifests.insert(key(name, commit), dependencies);
        self
    }

    /// Make fetching `name` at `commit` fail with `message`.
    pub fn with_failure(mut self, name: &str, commit: &str, message: &str) -> Self {
        self.failures.insert(key(name, commit), message.to_string());
        self
    }
}

impl ManifestSource for MemorySource {
    fn fetch(
        &self,
        reference: &PackageReference,
    ) -> Result<Option<Vec<PackageReference>>, IpdbError> {
        let k = key(&reference.name, &reference.commit);
        if let Some(message) = self.failures.get(&k) {
            return Err(IpdbError::Fetch {
                package: reference.name.clone(),
                message: message.clone(),
            });
        }
        Ok(self.manifests.get(&k).cloned())
    }
}

fn key(name: &str, commit: &str) -> String {
    format!("{name}@{commit}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn memory_source_unknown_is_leaf() {
        let source = MemorySource::new();
        let r = PackageReference::new("a", "v1");
        assert!(source.fetch(&r).unwrap().is_none());
    }

    #[test]
    fn memory_source_is_keyed_by_commit() {
        let source = MemorySource::new().with_manifest(
            "a",
            "v1",
            vec![PackageReference::new("b", "v1")],
        );
        assert_eq!(
            source
                .fetch(&PackageReference::new("a", "v1"))
                .unwrap()
                .map(|deps| deps.len()),
            Some(1)
        );
        assert!(source
            .fetch(&PackageReference::new("a", "v2"))
            .unwrap()
            .is_none());
    }

    #[test]
    fn directory_source_reads_checkout() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("axi/axi_node");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join(IPS_LIST_FILE),
            "[[ip]]\nname = \"axi_slice\"\ncommit = \"v1.1.0\"\n",
        )
        .unwrap();

        let source = DirectorySource::new(tmp.path(), DefaultsConfig::default());
        let r = PackageReference::new("axi_node", "v1").with_path("axi/axi_node");
        let deps = source.fetch(&r).unwrap().unwrap();
        assert_eq!(deps.len(), 1);
        assert_eq!(deps[0].name, "axi_slice");
        assert_eq!(deps[0].group.as_deref(), Some("pulp-platform"));
    }

    #[test]
    fn directory_source_missing_manifest_is_leaf() {
        let tmp = TempDir::new().unwrap();
        let source = DirectorySource::new(tmp.path(), DefaultsConfig::default());
        let r = PackageReference::new("apb_gpio", "v1");
        assert!(source.fetch(&r).unwrap().is_none());
    }

    #[test]
    fn directory_source_malformed_manifest_errors() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("broken");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(IPS_LIST_FILE), "[[ip]\nname=").unwrap();

        let source = DirectorySource::new(tmp.path(), DefaultsConfig::default());
        let err = source
            .fetch(&PackageReference::new("broken", "v1"))
            .unwrap_err();
        assert!(matches!(err, IpdbError::Manifest { .. }), "got: {err}");
    }
}
