//! File quota enforcement
//!
//! Validates the entire file mapping of a request before a single byte is
//! written: file count, per-file size, and aggregate size. Validation is
//! all-or-nothing — a rejected request leaves the guest filesystem untouched.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{Error, Result};
use crate::sandbox::path;

/// Quotas applied to the injected-file mapping of one request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileQuota {
    /// Maximum number of files per request
    #[serde(default = "default_max_files")]
    pub max_files: usize,
    /// Maximum encoded size of a single file, in bytes
    #[serde(default = "default_max_file_bytes")]
    pub max_file_bytes: usize,
    /// Maximum aggregate encoded size across all files, in bytes
    #[serde(default = "default_max_total_bytes")]
    pub max_total_bytes: usize,
}

impl Default for FileQuota {
    fn default() -> Self {
        FileQuota {
            max_files: default_max_files(),
            max_file_bytes: default_max_file_bytes(),
            max_total_bytes: default_max_total_bytes(),
        }
    }
}

fn default_max_files() -> usize {
    100
}

fn default_max_file_bytes() -> usize {
    1_000_000
}

fn default_max_total_bytes() -> usize {
    10_000_000
}

/// A file entry that has passed both the path sandbox and the quota checks
///
/// Produced only for a fully valid batch; never partially committed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedFile {
    /// Path as supplied by the caller
    pub original_path: String,
    /// Absolute path under the confinement root
    pub sandbox_path: String,
    /// File contents
    pub contents: String,
}

/// Validate a request's file mapping against the quota
///
/// Checks run in order, failing fast on the first violation: file count,
/// empty path, path sanitization, per-file size, aggregate size. On success
/// every entry is returned with its sandboxed absolute path.
pub fn validate(
    files: &BTreeMap<String, String>,
    root: &str,
    quota: &FileQuota,
) -> Result<Vec<ValidatedFile>> {
    if files.len() > quota.max_files {
        return Err(Error::Quota(format!(
            "too many files: {} (max {})",
            files.len(),
            quota.max_files
        )));
    }

    let mut validated = Vec::with_capacity(files.len());
    let mut total_bytes = 0usize;

    for (raw_path, contents) in files {
        if raw_path.is_empty() {
            return Err(Error::Quota("empty file path".to_string()));
        }

        let sandbox_path = path::sanitize(root, raw_path)?;

        let size = contents.len();
        if size > quota.max_file_bytes {
            return Err(Error::Quota(format!(
                "file {:?} is too large: {} bytes (max {})",
                raw_path, size, quota.max_file_bytes
            )));
        }

        total_bytes += size;
        if total_bytes > quota.max_total_bytes {
            return Err(Error::Quota(format!(
                "files exceed total size limit: {} bytes (max {})",
                total_bytes, quota.max_total_bytes
            )));
        }

        validated.push(ValidatedFile {
            original_path: raw_path.clone(),
            sandbox_path,
            contents: contents.clone(),
        });
    }

    Ok(validated)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn files(entries: &[(&str, &str)]) -> BTreeMap<String, String> {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_valid_batch() {
        let quota = FileQuota::default();
        let batch = files(&[("a.txt", "alpha"), ("sub/b.txt", "beta")]);
        let validated = validate(&batch, "/work", &quota).unwrap();
        assert_eq!(validated.len(), 2);
        assert_eq!(validated[0].sandbox_path, "/work/a.txt");
        assert_eq!(validated[1].sandbox_path, "/work/sub/b.txt");
        assert_eq!(validated[1].contents, "beta");
    }

    #[test]
    fn test_empty_mapping() {
        let quota = FileQuota::default();
        let validated = validate(&BTreeMap::new(), "/work", &quota).unwrap();
        assert!(validated.is_empty());
    }

    #[test]
    fn test_too_many_files() {
        let quota = FileQuota::default();
        let batch: BTreeMap<String, String> = (0..101)
            .map(|i| (format!("f{}.txt", i), String::new()))
            .collect();
        let err = validate(&batch, "/work", &quota).unwrap_err();
        assert!(err.to_string().contains("too many files"));
    }

    #[test]
    fn test_single_file_too_large() {
        let quota = FileQuota::default();
        let batch = files(&[("big.bin", &"x".repeat(1_000_001))]);
        let err = validate(&batch, "/work", &quota).unwrap_err();
        assert!(err.to_string().contains("too large"));
    }

    #[test]
    fn test_file_at_limit_is_accepted() {
        let quota = FileQuota::default();
        let batch = files(&[("exact.bin", &"x".repeat(1_000_000))]);
        assert!(validate(&batch, "/work", &quota).is_ok());
    }

    #[test]
    fn test_aggregate_too_large() {
        let quota = FileQuota::default();
        // 11 files of 1,000,000 bytes each crosses the 10,000,000 aggregate
        let chunk = "y".repeat(1_000_000);
        let batch: BTreeMap<String, String> = (0..11)
            .map(|i| (format!("part{:02}.bin", i), chunk.clone()))
            .collect();
        let err = validate(&batch, "/work", &quota).unwrap_err();
        assert!(err.to_string().contains("total size"));
    }

    #[test]
    fn test_empty_path_rejected() {
        let quota = FileQuota::default();
        let batch = files(&[("", "content")]);
        let err = validate(&batch, "/work", &quota).unwrap_err();
        assert!(err.to_string().contains("empty file path"));
    }

    #[test]
    fn test_traversal_rejected() {
        let quota = FileQuota::default();
        let batch = files(&[("../outside.txt", "content")]);
        assert!(validate(&batch, "/work", &quota).is_err());
    }

    #[test]
    fn test_size_counts_encoded_bytes() {
        let quota = FileQuota {
            max_files: 100,
            max_file_bytes: 3,
            max_total_bytes: 100,
        };
        // 'é' is two bytes in UTF-8, so "éé" is 4 encoded bytes
        let batch = files(&[("u.txt", "éé")]);
        assert!(validate(&batch, "/work", &quota).is_err());
    }
}
