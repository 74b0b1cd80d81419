//! Core data types for the ipdb tool.
//!
//! This crate defines the data model shared by the resolver and the
//! downstream exporters: package references, the `ips_list.toml` manifest
//! format, global configuration, and the on-disk database cache.
//!
//! This crate is intentionally free of async code and network I/O.

pub mod config;
pub mod manifest;
pub mod package;
pub mod snapshot;
