//! Hierarchical metadata extracted from stored radar files.
//!
//! Provides the group/attribute/dataset node tree, path-addressed
//! accessors over it, and content hashing for duplicate detection.

pub mod hasher;
pub mod metadata;
pub mod node;

pub use hasher::MetadataHasher;
pub use metadata::Metadata;
pub use node::{NodeId, NodeKind};
