//! The `ips_list.toml` / `rtl_list.toml` manifest format.
//!
//! A manifest is an ordered array of `[[ip]]` tables. Order is significant:
//! it fixes the order of children in the dependency tree.
//!
//! ```toml
//! [[ip]]
//! name = "axi_node"
//! commit = "v1.1.4"
//! domain = ["soc", "cluster"]
//!
//! [[ip]]
//! name = "riscv"
//! path = "cores/riscv"
//! alternatives = ["riscv", "zero-riscy"]
//! ```

use std::collections::BTreeSet;
use std::path::Path;

use ipdb_util::errors::IpdbError;
use serde::{Deserialize, Serialize};

use crate::config::DefaultsConfig;
use crate::package::{one_or_many, PackageReference};

/// File name of the top-level and nested IP manifests.
pub const IPS_LIST_FILE: &str = "ips_list.toml";
/// File name of the local RTL manifest.
pub const RTL_LIST_FILE: &str = "rtl_list.toml";

/// Parsed content of an IP list manifest.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IpList {
    #[serde(default)]
    pub ip: Vec<IpEntry>,
}

/// A single `[[ip]]` table as written by the user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IpEntry {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commit: Option<String>,
    #[serde(
        default,
        deserialize_with = "one_or_many",
        skip_serializing_if = "Option::is_none"
    )]
    pub domain: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alternatives: Option<BTreeSet<String>>,
}

impl IpEntry {
    /// Turn the entry into a reference, filling unset fields from `defaults`.
    pub fn to_reference(&self, defaults: &DefaultsConfig) -> PackageReference {
        PackageReference {
            name: self.name.clone(),
            path: self.path.clone().unwrap_or_else(|| self.name.clone()),
            server: self.server.clone(),
            group: self.group.clone(),
            commit: self
                .commit
                .clone()
                .unwrap_or_else(|| defaults.commit.clone()),
            domain: self.domain.clone(),
            alternatives: self.alternatives.clone(),
        }
        .with_defaults(defaults)
    }
}

impl From<&PackageReference> for IpEntry {
    fn from(r: &PackageReference) -> Self {
        Self {
            name: r.name.clone(),
            path: (r.path != r.name).then(|| r.path.clone()),
            server: r.server.clone(),
            group: r.group.clone(),
            commit: Some(r.commit.clone()),
            domain: r.domain.clone(),
            alternatives: r.alternatives.clone(),
        }
    }
}

impl IpList {
    /// Load and parse an IP list from the given path.
    pub fn from_path(path: &Path) -> Result<Self, IpdbError> {
        let content = std::fs::read_to_string(path).map_err(|e| IpdbError::Manifest {
            message: format!("Failed to read {}: {e}", path.display()),
        })?;
        Self::parse(&content).map_err(|e| IpdbError::Manifest {
            message: format!("{}: {e}", path.display()),
        })
    }

    /// Load an IP list, returning `None` when the file does not exist.
    pub fn load_optional(path: &Path) -> Result<Option<Self>, IpdbError> {
        match ipdb_util::fs::read_optional(path)? {
            Some(content) => Self::parse(&content)
                .map(Some)
                .map_err(|e| IpdbError::Manifest {
                    message: format!("{}: {e}", path.display()),
                }),
            None => Ok(None),
        }
    }

    /// Parse an IP list from TOML text.
    pub fn parse(content: &str) -> Result<Self, IpdbError> {
        let list: Self = toml::from_str(content).map_err(|e| IpdbError::Manifest {
            message: format!("Failed to parse IP list: {e}"),
        })?;
        if let Some(pos) = list.ip.iter().position(|e| e.name.trim().is_empty()) {
            return Err(IpdbError::Manifest {
                message: format!("ip entry #{} has an empty name", pos + 1),
            });
        }
        Ok(list)
    }

    /// Build a manifest that lists exactly `references`, in order.
    pub fn from_references(references: &[PackageReference]) -> Self {
        Self {
            ip: references.iter().map(IpEntry::from).collect(),
        }
    }

    /// Resolve every entry to a [`PackageReference`], preserving order.
    pub fn references(&self, defaults: &DefaultsConfig) -> Vec<PackageReference> {
        self.ip.iter().map(|e| e.to_reference(defaults)).collect()
    }

    /// Names that appear more than once, in order of their second appearance.
    pub fn duplicate_names(&self) -> Vec<&str> {
        let mut seen = BTreeSet::new();
        let mut dups = Vec::new();
        for entry in &self.ip {
            if !seen.insert(entry.name.as_str()) && !dups.contains(&entry.name.as_str()) {
                dups.push(entry.name.as_str());
            }
        }
        dups
    }

    /// Serialize the list to a pretty-printed TOML string.
    pub fn to_string_pretty(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    pub fn len(&self) -> usize {
        self.ip.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ip.is_empty()
    }
}
