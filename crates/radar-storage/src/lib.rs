//! Relational storage for radar-metadb.
//!
//! Provides the PostgreSQL schema and catalog, file/node persistence,
//! source and filter managers, physical content storage backends, and
//! execution of translated queries.

pub mod catalog;
pub mod content;
pub mod db;
pub mod exec;
pub mod files;
pub mod filters;
pub mod sources;

pub use catalog::Catalog;
pub use content::{BlobStorage, ContentStorage, LargeObjectStorage};
pub use exec::{execute_attribute_query, execute_file_query, ResultRow};
pub use files::{FileEntry, NewFileEntry};
pub use filters::FilterManager;
pub use sources::{Source, SourceManager};
