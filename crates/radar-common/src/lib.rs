//! Shared types for the radar-metadb workspace.
//!
//! Provides the common error taxonomy, the dynamically typed attribute
//! value, and path handling used by the metadata tree and query engine.

pub mod error;
pub mod path;
pub mod value;

pub use error::{RadarError, RadarResult};
pub use path::{join_path, normalize_path, split_path};
pub use value::Value;
