//! On-disk cache of a resolved IP database.

use std::path::Path;

use ipdb_util::errors::IpdbError;
use serde::{Deserialize, Serialize};

use crate::config::DirsConfig;
use crate::package::PackageReference;

/// Default file name of the database cache.
pub const CACHE_FILE: &str = ".cached_ipdb.json";

/// Everything needed to regenerate scripts without re-resolving the hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseSnapshot {
    pub ips_dir: String,
    pub rtl_dir: String,
    pub vsim_dir: String,
    pub fpgasim_dir: String,
    pub ip_list: Vec<PackageReference>,
    pub rtl_list: Option<Vec<PackageReference>>,
}

impl DatabaseSnapshot {
    pub fn new(
        dirs: &DirsConfig,
        ip_list: Vec<PackageReference>,
        rtl_list: Option<Vec<PackageReference>>,
    ) -> Self {
        Self {
            ips_dir: dirs.ips.clone(),
            rtl_dir: dirs.rtl.clone(),
            vsim_dir: dirs.vsim.clone(),
            fpgasim_dir: dirs.fpgasim.clone(),
            ip_list,
            rtl_list,
        }
    }

    /// Directories recorded in the snapshot.
    pub fn dirs(&self) -> DirsConfig {
        DirsConfig {
            ips: self.ips_dir.clone(),
            rtl: self.rtl_dir.clone(),
            vsim: self.vsim_dir.clone(),
            fpgasim: self.fpgasim_dir.clone(),
        }
    }

    /// Write the snapshot as indented JSON.
    pub fn save(&self, path: &Path) -> Result<(), IpdbError> {
        let json = serde_json::to_string_pretty(self).map_err(|e| IpdbError::Cache {
            message: format!("Failed to serialize database: {e}"),
        })?;
        ipdb_util::fs::write_with_parents(path, &json).map_err(|e| IpdbError::Cache {
            message: format!("Failed to write {}: {e}", path.display()),
        })?;
        tracing::debug!("Saved database cache to {}", path.display());
        Ok(())
    }

    /// Read a snapshot previously written by [`DatabaseSnapshot::save`].
    pub fn load(path: &Path) -> Result<Self, IpdbError> {
        let content = std::fs::read_to_string(path).map_err(|e| IpdbError::Cache {
            message: format!("Failed to read {}: {e}", path.display()),
        })?;
        serde_json::from_str(&content).map_err(|e| IpdbError::Cache {
            message: format!("Failed to parse {}: {e}", path.display()),
        })
    }
}
