//! Path confinement
//!
//! Caller-supplied paths are forced under a single confinement root by
//! construction: separators are normalized, leading separators stripped, and
//! any `.` or `..` segment rejected outright. There is no canonicalize-and-
//! compare step, so the check cannot be raced or confused by symlinks.

use crate::error::{Error, Result};

/// Rewrite a caller-supplied relative path under the confinement root
///
/// Returns `<root>/<joined-segments>`. Empty segments (doubled separators)
/// are dropped; `.` and `..` segments are rejected.
pub fn sanitize(root: &str, raw: &str) -> Result<String> {
    let normalized = raw.replace('\\', "/");
    let trimmed = normalized.trim_start_matches('/');

    let mut segments: Vec<&str> = Vec::new();
    for segment in trimmed.split('/') {
        if segment.is_empty() {
            continue;
        }
        if segment == "." || segment == ".." {
            return Err(Error::Quota(format!(
                "invalid path {:?}: '.' and '..' segments are not allowed",
                raw
            )));
        }
        segments.push(segment);
    }

    if segments.is_empty() {
        return Err(Error::Quota(format!(
            "invalid path {:?}: no usable path segments",
            raw
        )));
    }

    Ok(format!("{}/{}", root.trim_end_matches('/'), segments.join("/")))
}

/// Every intermediate directory of a sanitized path, shallowest first
///
/// For `/work/a/b/c.txt` this yields `/work/a` and `/work/a/b`. The root
/// itself is assumed to exist.
pub fn parent_directories(root: &str, sanitized: &str) -> Vec<String> {
    let root = root.trim_end_matches('/');
    let Some(relative) = sanitized.strip_prefix(root).map(|r| r.trim_start_matches('/')) else {
        return Vec::new();
    };

    let mut dirs = Vec::new();
    let mut prefix = root.to_string();
    let segments: Vec<&str> = relative.split('/').collect();
    for segment in &segments[..segments.len().saturating_sub(1)] {
        prefix = format!("{}/{}", prefix, segment);
        dirs.push(prefix.clone());
    }
    dirs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_path() {
        assert_eq!(sanitize("/work", "data.csv").unwrap(), "/work/data.csv");
    }

    #[test]
    fn test_nested_path() {
        assert_eq!(
            sanitize("/work", "subdir/nested/file.txt").unwrap(),
            "/work/subdir/nested/file.txt"
        );
    }

    #[test]
    fn test_leading_separators_stripped() {
        assert_eq!(sanitize("/work", "/etc/passwd").unwrap(), "/work/etc/passwd");
        assert_eq!(sanitize("/work", "///a/b").unwrap(), "/work/a/b");
    }

    #[test]
    fn test_backslashes_normalized() {
        assert_eq!(sanitize("/work", "a\\b\\c.txt").unwrap(), "/work/a/b/c.txt");
    }

    #[test]
    fn test_doubled_separators_collapsed() {
        assert_eq!(sanitize("/work", "a//b").unwrap(), "/work/a/b");
    }

    #[test]
    fn test_dotdot_rejected() {
        assert!(sanitize("/work", "../escape.txt").is_err());
        assert!(sanitize("/work", "a/../b").is_err());
        assert!(sanitize("/work", "..\\windows").is_err());
    }

    #[test]
    fn test_dot_rejected() {
        assert!(sanitize("/work", "./file.txt").is_err());
        assert!(sanitize("/work", "a/./b").is_err());
    }

    #[test]
    fn test_no_segments_rejected() {
        assert!(sanitize("/work", "/").is_err());
        assert!(sanitize("/work", "///").is_err());
    }

    #[test]
    fn test_parent_directories() {
        assert_eq!(
            parent_directories("/work", "/work/a/b/c.txt"),
            vec!["/work/a".to_string(), "/work/a/b".to_string()]
        );
        assert!(parent_directories("/work", "/work/top.txt").is_empty());
    }
}
