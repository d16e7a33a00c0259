//! Metadata extraction seam.

use std::path::Path;

use radar_common::RadarResult;
use radar_metadata::Metadata;

/// Converts a radar file on disk into its metadata tree.
///
/// The HDF5/ODIM_H5 reader lives outside this workspace; the backend
/// only consumes the resulting tree. Implementations should wrap their
/// library errors in `RadarError::Other` via `anyhow`.
pub trait MetadataExtractor: Send + Sync {
    fn extract(&self, path: &Path) -> RadarResult<Metadata>;
}

impl<F> MetadataExtractor for F
where
    F: Fn(&Path) -> RadarResult<Metadata> + Send + Sync,
{
    fn extract(&self, path: &Path) -> RadarResult<Metadata> {
        self(path)
    }
}
