use std::path::{Path, PathBuf};

use ipdb_util::errors::IpdbError;
use serde::{Deserialize, Serialize};

/// Global user configuration loaded from `~/.ipdb/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GlobalConfig {
    #[serde(default)]
    pub defaults: DefaultsConfig,

    #[serde(default)]
    pub dirs: DirsConfig,

    #[serde(default)]
    pub resolve: ResolveConfig,
}

/// Remote coordinates applied to IPs that do not name their own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefaultsConfig {
    #[serde(default = "default_server")]
    pub server: String,
    #[serde(default = "default_group")]
    pub group: String,
    #[serde(default = "default_commit")]
    pub commit: String,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            server: default_server(),
            group: default_group(),
            commit: default_commit(),
        }
    }
}

fn default_server() -> String {
    "git@github.com".to_string()
}

fn default_group() -> String {
    "pulp-platform".to_string()
}

fn default_commit() -> String {
    "master".to_string()
}

/// Deployment directories from `[dirs]`, relative to the IP list location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirsConfig {
    #[serde(default = "default_ips_dir")]
    pub ips: String,
    #[serde(default = "default_rtl_dir")]
    pub rtl: String,
    #[serde(default = "default_vsim_dir")]
    pub vsim: String,
    #[serde(default = "default_fpgasim_dir")]
    pub fpgasim: String,
}

impl Default for DirsConfig {
    fn default() -> Self {
        Self {
            ips: default_ips_dir(),
            rtl: default_rtl_dir(),
            vsim: default_vsim_dir(),
            fpgasim: default_fpgasim_dir(),
        }
    }
}

fn default_ips_dir() -> String {
    "./fe/ips".to_string()
}

fn default_rtl_dir() -> String {
    "./fe/rtl".to_string()
}

fn default_vsim_dir() -> String {
    "./fe/sim".to_string()
}

fn default_fpgasim_dir() -> String {
    "./fpga/sim".to_string()
}

/// Hierarchical flow settings from `[resolve]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolveConfig {
    /// Maximum number of nested manifests fetched at once.
    #[serde(default = "default_jobs")]
    pub jobs: u32,
    #[serde(default, rename = "build-deps-tree")]
    pub build_deps_tree: bool,
    #[serde(default, rename = "resolve-conflicts")]
    pub resolve_conflicts: bool,
    #[serde(default)]
    pub verbose: bool,
}

impl Default for ResolveConfig {
    fn default() -> Self {
        Self {
            jobs: default_jobs(),
            build_deps_tree: false,
            resolve_conflicts: false,
            verbose: false,
        }
    }
}

fn default_jobs() -> u32 {
    std::thread::available_parallelism()
        .map(|n| n.get() as u32)
        .unwrap_or(4)
}

impl GlobalConfig {
    /// Load the global configuration from `~/.ipdb/config.toml`, or return defaults if the file doesn't exist.
    pub fn load() -> Result<Self, IpdbError> {
        Self::load_from(&Self::default_path())
    }

    /// Load the configuration from `path`, falling back to defaults when the file is absent.
    pub fn load_from(path: &Path) -> Result<Self, IpdbError> {
        let content = ipdb_util::fs::read_optional(path).map_err(|e| IpdbError::Config {
            message: format!("Failed to read {}: {e}", path.display()),
        })?;
        match content {
            Some(content) => toml::from_str(&content).map_err(|e| IpdbError::Config {
                message: format!("Failed to parse {}: {e}", path.display()),
            }),
            None => {
                tracing::debug!("No config at {}, using defaults", path.display());
                Ok(Self::default())
            }
        }
    }

    /// Returns the default path to the global config file.
    pub fn default_path() -> PathBuf {
        dirs_path().join("config.toml")
    }
}

/// Returns the path to the ipdb data directory (`~/.ipdb/`).
pub fn dirs_path() -> PathBuf {
    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .unwrap_or_else(|_| ".".to_string());
    Path::new(&home).join(".ipdb")
}
