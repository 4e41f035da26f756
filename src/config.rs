//! Configuration for the bridge service
//!
//! Limits and workspace settings are loaded with layered precedence:
//! 1. Config file (JSON5 or TOML) if one is given and exists, otherwise defaults
//! 2. `PYBRIDGE_*` environment variable overrides (highest precedence)

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{Error, Result};
use crate::sandbox::FileQuota;

/// Top-level bridge configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Confinement root inside the guest filesystem; every injected file
    /// resolves under this directory
    #[serde(default = "default_work_root")]
    pub work_root: String,
    /// Resource limits
    #[serde(default)]
    pub limits: Limits,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        BridgeConfig {
            work_root: default_work_root(),
            limits: Limits::default(),
        }
    }
}

/// Resource limits enforced per request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Limits {
    /// Maximum length of a single request line, in characters
    #[serde(default = "default_max_line_chars")]
    pub max_line_chars: usize,
    /// Per-channel cap on captured stdout/stderr, in characters
    #[serde(default = "default_max_capture_chars")]
    pub max_capture_chars: usize,
    /// Injected-file quotas
    #[serde(default)]
    pub quota: FileQuota,
}

impl Default for Limits {
    fn default() -> Self {
        Limits {
            max_line_chars: default_max_line_chars(),
            max_capture_chars: default_max_capture_chars(),
            quota: FileQuota::default(),
        }
    }
}

fn default_work_root() -> String {
    "/work".to_string()
}

fn default_max_line_chars() -> usize {
    1_000_000
}

fn default_max_capture_chars() -> usize {
    10_000
}

/// Load configuration with layered precedence
///
/// Reads the file at `path` when given and present, falls back to defaults,
/// then applies environment variable overrides on top.
pub fn load(path: Option<&Path>) -> Result<BridgeConfig> {
    let mut config = match path {
        Some(p) if p.exists() => load_from_path(p)?,
        _ => BridgeConfig::default(),
    };

    apply_env_overrides(&mut config);

    Ok(config)
}

/// Load configuration from a specific path
///
/// The format is chosen by extension: `.toml` parses as TOML, anything else
/// as JSON5 (a superset of plain JSON).
pub fn load_from_path(path: &Path) -> Result<BridgeConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::Config(format!("failed to read config file {}: {}", path.display(), e))
    })?;

    if path.extension().is_some_and(|ext| ext == "toml") {
        toml::from_str(&content).map_err(|e| Error::Config(format!("invalid TOML config: {}", e)))
    } else {
        json5::from_str(&content).map_err(|e| Error::Config(format!("invalid JSON config: {}", e)))
    }
}

/// Apply `PYBRIDGE_*` environment variable overrides
pub fn apply_env_overrides(config: &mut BridgeConfig) {
    if let Ok(root) = std::env::var("PYBRIDGE_WORK_ROOT") {
        if !root.trim().is_empty() {
            config.work_root = root;
        }
    }
    override_usize("PYBRIDGE_MAX_LINE_CHARS", &mut config.limits.max_line_chars);
    override_usize("PYBRIDGE_MAX_OUTPUT_CHARS", &mut config.limits.max_capture_chars);
    override_usize("PYBRIDGE_MAX_FILES", &mut config.limits.quota.max_files);
    override_usize("PYBRIDGE_MAX_FILE_BYTES", &mut config.limits.quota.max_file_bytes);
    override_usize("PYBRIDGE_MAX_TOTAL_BYTES", &mut config.limits.quota.max_total_bytes);
}

fn override_usize(name: &str, slot: &mut usize) {
    if let Ok(raw) = std::env::var(name) {
        if let Ok(value) = raw.trim().parse::<usize>() {
            *slot = value;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = BridgeConfig::default();
        assert_eq!(config.work_root, "/work");
        assert_eq!(config.limits.max_line_chars, 1_000_000);
        assert_eq!(config.limits.max_capture_chars, 10_000);
        assert_eq!(config.limits.quota.max_files, 100);
        assert_eq!(config.limits.quota.max_file_bytes, 1_000_000);
        assert_eq!(config.limits.quota.max_total_bytes, 10_000_000);
    }

    #[test]
    fn test_partial_json_config() {
        let config: BridgeConfig =
            json5::from_str(r#"{ work_root: "/scratch", limits: { max_capture_chars: 500 } }"#)
                .unwrap();
        assert_eq!(config.work_root, "/scratch");
        assert_eq!(config.limits.max_capture_chars, 500);
        // Unset fields keep their defaults
        assert_eq!(config.limits.max_line_chars, 1_000_000);
        assert_eq!(config.limits.quota.max_files, 100);
    }

    #[test]
    fn test_partial_toml_config() {
        let config: BridgeConfig = toml::from_str(
            "work_root = \"/tmp/guest\"\n[limits.quota]\nmax_files = 5\n",
        )
        .unwrap();
        assert_eq!(config.work_root, "/tmp/guest");
        assert_eq!(config.limits.quota.max_files, 5);
        assert_eq!(config.limits.quota.max_file_bytes, 1_000_000);
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let config = load(Some(Path::new("/nonexistent/pybridge.json"))).unwrap();
        assert_eq!(config.work_root, "/work");
    }
}
