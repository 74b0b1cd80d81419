//! Hierarchical IP resolution engine.
//!
//! The pipeline has three stages, each producing new data for the next:
//! [`builder::TreeBuilder`] expands nested manifests into a
//! [`graph::DependencyTree`], [`conflict::aggregate`] groups every occurrence
//! of each IP name, and [`policy::ResolutionPolicy`] picks one occurrence per
//! name to produce the flat IP list.

pub mod builder;
pub mod conflict;
pub mod graph;
pub mod policy;
pub mod source;
