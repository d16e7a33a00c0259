//! Content hashing for duplicate detection.

use sha1::{Digest, Sha1};

use crate::metadata::Metadata;
use crate::node::NodeKind;

/// Reserved bookkeeping subtree, excluded from hashing.
///
/// The `/_bdb` group carries stored timestamps and the hash itself, so
/// including it would make every store unique and defeat deduplication.
const RESERVED_PREFIX: &str = "/_bdb";

/// Hashes the attribute content of a metadata tree.
///
/// Every attribute node contributes `path=value`; the strings are sorted
/// lexicographically and the SHA-1 digest of their concatenation is
/// returned as lowercase hex. The digest therefore depends only on the
/// set of (path, value) pairs, never on insertion or traversal order.
#[derive(Debug, Default)]
pub struct MetadataHasher;

impl MetadataHasher {
    pub fn new() -> Self {
        Self
    }

    pub fn hash(&self, metadata: &Metadata) -> String {
        let mut attribute_strings = Vec::new();
        for id in metadata.iternodes() {
            if let NodeKind::Attribute(value) = metadata.kind(id) {
                let path = metadata.path(id);
                if path == RESERVED_PREFIX || path.starts_with("/_bdb/") {
                    continue;
                }
                attribute_strings.push(format!("{}={}", path, value));
            }
        }
        attribute_strings.sort();

        let mut digest = Sha1::new();
        for s in &attribute_strings {
            digest.update(s.as_bytes());
        }
        digest
            .finalize()
            .iter()
            .map(|byte| format!("{:02x}", byte))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveTime};
    use radar_common::Value;

    fn sample_metadata() -> Metadata {
        let mut meta = Metadata::new();
        meta.set_attribute("/what/source", Value::from("WMO:02606"))
            .unwrap();
        meta.set_attribute(
            "/what/date",
            Value::Date(NaiveDate::from_ymd_opt(2000, 1, 2).unwrap()),
        )
        .unwrap();
        meta.set_attribute(
            "/what/time",
            Value::Time(NaiveTime::from_hms_opt(12, 5, 0).unwrap()),
        )
        .unwrap();
        meta.set_attribute("/what/object", Value::from("pvol")).unwrap();
        meta
    }

    #[test]
    fn test_known_digest() {
        let meta = sample_metadata();
        assert_eq!(
            MetadataHasher::new().hash(&meta),
            "2fe7e00e5c5fb6fa98c8b07154d1e4d2fcde7811"
        );
    }

    #[test]
    fn test_digest_changes_with_value() {
        let mut meta = sample_metadata();
        meta.set_attribute(
            "/what/date",
            Value::Date(NaiveDate::from_ymd_opt(2001, 1, 2).unwrap()),
        )
        .unwrap();
        assert_eq!(
            MetadataHasher::new().hash(&meta),
            "469fa750ff4f575f1c30c794bb80e16a6a99ed2c"
        );
    }

    #[test]
    fn test_deeper_tree_digest() {
        let mut meta = sample_metadata();
        meta.set_attribute("/dataset1/where/xsize", Value::Long(240))
            .unwrap();
        meta.set_attribute("/dataset1/where/ysize", Value::Long(240))
            .unwrap();
        assert_eq!(
            MetadataHasher::new().hash(&meta),
            "db5d8c0a63a4dab35bf7f395f2fbb1086b55c58c"
        );
    }

    #[test]
    fn test_insertion_order_independence() {
        let mut reordered = Metadata::new();
        reordered.set_attribute("/what/object", Value::from("pvol")).unwrap();
        reordered
            .set_attribute(
                "/what/time",
                Value::Time(NaiveTime::from_hms_opt(12, 5, 0).unwrap()),
            )
            .unwrap();
        reordered
            .set_attribute(
                "/what/date",
                Value::Date(NaiveDate::from_ymd_opt(2000, 1, 2).unwrap()),
            )
            .unwrap();
        reordered
            .set_attribute("/what/source", Value::from("WMO:02606"))
            .unwrap();

        let hasher = MetadataHasher::new();
        assert_eq!(hasher.hash(&sample_metadata()), hasher.hash(&reordered));
    }

    #[test]
    fn test_reserved_subtree_excluded() {
        let plain = sample_metadata();
        let mut stamped = sample_metadata();
        stamped
            .set_bdb_uuid("0e50c59f-bbbd-4ce2-93ea-47ec0ab18ce2")
            .unwrap();
        stamped.set_bdb_metadata_hash("feedface").unwrap();
        stamped
            .set_bdb_stored_date(NaiveDate::from_ymd_opt(2024, 6, 1).unwrap())
            .unwrap();

        let hasher = MetadataHasher::new();
        assert_eq!(hasher.hash(&plain), hasher.hash(&stamped));
    }

    #[test]
    fn test_group_only_changes_ignored() {
        let plain = sample_metadata();
        let mut with_group = sample_metadata();
        with_group
            .add_node("/", "dataset1", NodeKind::Group)
            .unwrap();

        let hasher = MetadataHasher::new();
        assert_eq!(hasher.hash(&plain), hasher.hash(&with_group));
    }
}
