use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};

use ipdb_util::errors::IpdbError;
use serde::{Deserialize, Deserializer, Serialize};

use crate::config::DefaultsConfig;

/// Placeholder path whose real location comes from the environment variable
/// of the same name.
pub const SITE_DEPENDENT_PATH: &str = "$SITE_DEPENDENT_PATH";

/// One dependency binding: which IP, where it lives, and at which revision.
///
/// `commit` is an opaque branch, tag or hash. It is compared for equality and
/// passed through verbatim, never ordered.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PackageReference {
    pub name: String,
    pub path: String,
    #[serde(default)]
    pub server: Option<String>,
    #[serde(default)]
    pub group: Option<String>,
    pub commit: String,
    #[serde(default, deserialize_with = "one_or_many")]
    pub domain: Option<Vec<String>>,
    #[serde(default)]
    pub alternatives: Option<BTreeSet<String>>,
}

impl PackageReference {
    /// A reference located at `path = name` with no remote or tags set.
    pub fn new(name: impl Into<String>, commit: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            path: name.clone(),
            name,
            server: None,
            group: None,
            commit: commit.into(),
            domain: None,
            alternatives: None,
        }
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    pub fn with_server(mut self, server: impl Into<String>) -> Self {
        self.server = Some(server.into());
        self
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    pub fn with_domain<I, S>(mut self, domain: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.domain = Some(domain.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_alternatives<I, S>(mut self, alternatives: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.alternatives = Some(alternatives.into_iter().map(Into::into).collect());
        self
    }

    /// Fill in `server` and `group` from the configured defaults when absent.
    pub fn with_defaults(mut self, defaults: &DefaultsConfig) -> Self {
        if self.server.is_none() {
            self.server = Some(defaults.server.clone());
        }
        if self.group.is_none() {
            self.group = Some(defaults.group.clone());
        }
        self
    }

    /// Human-readable coordinates used when presenting conflicts.
    ///
    /// `group/name @ commit`, prefixed with `server:` when `verbose` is set.
    pub fn label(&self, verbose: bool) -> String {
        let group = self.group.as_deref().unwrap_or("?");
        if verbose {
            let server = self.server.as_deref().unwrap_or("?");
            format!("{server}:{group}/{} @ {}", self.name, self.commit)
        } else {
            format!("{group}/{} @ {}", self.name, self.commit)
        }
    }

    /// Whether this IP takes part in a build targeting `domain`.
    ///
    /// No target domain, or an untagged IP, always matches.
    pub fn in_domain(&self, domain: Option<&str>) -> bool {
        match (domain, &self.domain) {
            (None, _) | (_, None) => true,
            (Some(target), Some(tags)) => tags.iter().any(|t| t == target),
        }
    }

    /// Whether this IP is enabled given the set of `selected` alternatives.
    ///
    /// IPs without an alternatives group are always enabled. Otherwise the
    /// IP's own name must be selected and belong to its alternatives group.
    pub fn alternative_enabled(&self, selected: &[String]) -> bool {
        match &self.alternatives {
            None => true,
            Some(group) => {
                group.contains(&self.name) && selected.iter().any(|s| *s == self.name)
            }
        }
    }

    /// Directory holding this IP's sources below `ips_dir`.
    ///
    /// A path of `$SITE_DEPENDENT_PATH` is taken from the environment instead.
    pub fn source_dir(&self, ips_dir: &Path) -> Result<PathBuf, IpdbError> {
        if self.path == SITE_DEPENDENT_PATH {
            return std::env::var("SITE_DEPENDENT_PATH")
                .map(PathBuf::from)
                .map_err(|_| IpdbError::Config {
                    message: format!(
                        "ip '{}' uses {SITE_DEPENDENT_PATH} but the SITE_DEPENDENT_PATH environment variable is not set",
                        self.name
                    ),
                });
        }
        Ok(ips_dir.join(&self.path))
    }
}

impl fmt::Display for PackageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.name, self.commit)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

/// Accept `domain = "soc"` as well as `domain = ["soc", "cluster"]`.
pub(crate) fn one_or_many<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<OneOrMany> = Option::deserialize(deserializer)?;
    Ok(value.map(|v| match v {
        OneOrMany::One(s) => vec![s],
        OneOrMany::Many(v) => v,
    }))
}
