//! Node path handling.
//!
//! Metadata node paths look like HDF5 paths: `/what/object`,
//! `/dataset1/where/xsize`. Normalization collapses redundant separators
//! and `.`/`..` segments so that lookups are insensitive to how the caller
//! spelled the path.

/// Normalize a node path.
///
/// Collapses repeated `/`, resolves `.` and `..` segments, strips any
/// trailing separator and guarantees a single leading `/`. `..` at the
/// root stays at the root.
pub fn normalize_path(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    let mut out = String::with_capacity(path.len() + 1);
    out.push('/');
    out.push_str(&segments.join("/"));
    out
}

/// Split a path into its non-empty segments, normalizing first.
pub fn split_path(path: &str) -> Vec<String> {
    normalize_path(path)
        .split('/')
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}

/// Join a parent path and a child name.
pub fn join_path(parent: &str, name: &str) -> String {
    if parent.ends_with('/') {
        format!("{}{}", parent, name)
    } else {
        format!("{}/{}", parent, name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_basic() {
        assert_eq!(normalize_path("/what/object"), "/what/object");
        assert_eq!(normalize_path("what/object"), "/what/object");
        assert_eq!(normalize_path("//what///object/"), "/what/object");
    }

    #[test]
    fn test_normalize_dots() {
        assert_eq!(normalize_path("/what/./object"), "/what/object");
        assert_eq!(normalize_path("/what/../where/xsize"), "/where/xsize");
        assert_eq!(normalize_path("/../.."), "/");
        assert_eq!(normalize_path("."), "/");
    }

    #[test]
    fn test_normalize_idempotent() {
        for p in ["/a/b/c", "a//b/./c", "/a/../b", "", "/"] {
            let once = normalize_path(p);
            assert_eq!(normalize_path(&once), once);
        }
    }

    #[test]
    fn test_split() {
        assert_eq!(split_path("/what/object"), vec!["what", "object"]);
        assert!(split_path("/").is_empty());
    }

    #[test]
    fn test_join() {
        assert_eq!(join_path("/", "what"), "/what");
        assert_eq!(join_path("/what", "object"), "/what/object");
    }
}
