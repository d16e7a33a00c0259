//! Common test fixtures for radar-metadb tests.
//!
//! This module provides pre-built metadata trees representing typical
//! ODIM_H5 radar files, so tests across crates share one idea of what a
//! stored file looks like.

use chrono::{NaiveDate, NaiveTime};

use radar_common::Value;
use radar_metadata::{Metadata, NodeKind};

/// Source attribute string for the Ängelholm radar used by the polar
/// volume fixtures.
pub const SEANG_SOURCE: &str = "NOD:seang,WMO:02606";

/// Source attribute string for a second radar, for multi-source tests.
pub const SEARL_SOURCE: &str = "NOD:searl,WMO:02451";

/// A minimal metadata tree: just the `/what` header attributes.
pub fn minimal_metadata(source: &str, date: NaiveDate, time: NaiveTime) -> Metadata {
    let mut meta = Metadata::new();
    meta.set_attribute("/what/object", Value::from("pvol")).unwrap();
    meta.set_attribute("/what/source", Value::from(source)).unwrap();
    meta.set_attribute("/what/date", Value::Date(date)).unwrap();
    meta.set_attribute("/what/time", Value::Time(time)).unwrap();
    meta
}

/// A polar volume with two elevation sweeps.
///
/// Both datasets carry `where/xsize`/`where/ysize`, so unaggregated joins
/// over those paths fan out to two rows per file.
pub fn polar_volume_metadata(source: &str, date: NaiveDate, time: NaiveTime) -> Metadata {
    let mut meta = minimal_metadata(source, date, time);

    for (dataset, elangle) in [("dataset1", 0.5_f64), ("dataset2", 1.0_f64)] {
        let base = format!("/{}", dataset);
        meta.add_node("/", dataset, NodeKind::Group).unwrap();
        meta.add_node(&base, "where", NodeKind::Group).unwrap();
        meta.set_attribute(&format!("{}/where/xsize", base), Value::Long(240))
            .unwrap();
        meta.set_attribute(&format!("{}/where/ysize", base), Value::Long(240))
            .unwrap();
        meta.set_attribute(&format!("{}/where/elangle", base), Value::Double(elangle))
            .unwrap();
        meta.add_node(&base, "data1", NodeKind::Dataset).unwrap();
    }

    meta
}

/// The default polar volume used across suites: seang, 2000-01-02 12:05.
pub fn default_polar_volume() -> Metadata {
    polar_volume_metadata(
        SEANG_SOURCE,
        NaiveDate::from_ymd_opt(2000, 1, 2).unwrap(),
        NaiveTime::from_hms_opt(12, 5, 0).unwrap(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_polar_volume_shape() {
        let meta = default_polar_volume();
        assert_eq!(meta.what_object(), Some("pvol"));
        assert_eq!(meta.what_source(), Some(SEANG_SOURCE));
        assert_eq!(
            meta.attribute("/dataset1/where/xsize"),
            Some(&Value::Long(240))
        );
        assert_eq!(
            meta.attribute("/dataset2/where/elangle"),
            Some(&Value::Double(1.0))
        );
    }

    #[test]
    fn test_minimal_has_no_datasets() {
        let meta = minimal_metadata(
            SEARL_SOURCE,
            NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            NaiveTime::from_hms_opt(0, 0, 0).unwrap(),
        );
        assert!(meta.find_node("/dataset1").is_none());
    }
}
