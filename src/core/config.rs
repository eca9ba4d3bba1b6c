//! Runner configuration.
//!
//! A discovery file (`.trunksync.json` in the working directory) tunes how
//! the svn client is invoked. A missing or malformed discovery file silently
//! yields defaults; an explicitly requested file that cannot be read or
//! parsed is an error.

use crate::core::error::TrunksyncError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const CONFIG_FILE_NAME: &str = ".trunksync.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Binary invoked for all repository operations.
    pub svn_bin: String,
    /// Fail on missing credentials instead of prompting.
    pub non_interactive: bool,
    /// Accept server certificates without prompting.
    pub trust_server_cert: bool,
    /// When set, every reconcile appends one JSONL event to this file.
    pub events_log: Option<PathBuf>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        RunnerConfig {
            svn_bin: "svn".to_string(),
            non_interactive: true,
            trust_server_cert: false,
            events_log: None,
        }
    }
}

/// Resolve the runner configuration for a run rooted at `dir`.
pub fn load_config(explicit: Option<&Path>, dir: &Path) -> Result<RunnerConfig, TrunksyncError> {
    if let Some(path) = explicit {
        let content = std::fs::read_to_string(path).map_err(TrunksyncError::IoError)?;
        return serde_json::from_str(&content)
            .map_err(|e| TrunksyncError::ConfigError(format!("{}: {}", path.display(), e)));
    }
    Ok(maybe_load_config(dir))
}

fn maybe_load_config(dir: &Path) -> RunnerConfig {
    let path = dir.join(CONFIG_FILE_NAME);
    if !path.exists() {
        return RunnerConfig::default();
    }
    let Ok(content) = std::fs::read_to_string(&path) else {
        return RunnerConfig::default();
    };
    serde_json::from_str(&content).unwrap_or_else(|_| RunnerConfig::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn defaults_when_no_discovery_file() {
        let tmp = tempdir().unwrap();
        let cfg = load_config(None, tmp.path()).unwrap();
        assert_eq!(cfg.svn_bin, "svn");
        assert!(cfg.non_interactive);
        assert!(!cfg.trust_server_cert);
        assert!(cfg.events_log.is_none());
    }

    #[test]
    fn malformed_discovery_file_falls_back_to_defaults() {
        let tmp = tempdir().unwrap();
        std::fs::write(tmp.path().join(CONFIG_FILE_NAME), "{not json").unwrap();
        let cfg = load_config(None, tmp.path()).unwrap();
        assert_eq!(cfg.svn_bin, "svn");
    }

    #[test]
    fn partial_discovery_file_keeps_remaining_defaults() {
        let tmp = tempdir().unwrap();
        std::fs::write(
            tmp.path().join(CONFIG_FILE_NAME),
            r#"{"svn_bin": "/opt/svn/bin/svn"}"#,
        )
        .unwrap();
        let cfg = load_config(None, tmp.path()).unwrap();
        assert_eq!(cfg.svn_bin, "/opt/svn/bin/svn");
        assert!(cfg.non_interactive);
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let tmp = tempdir().unwrap();
        let missing = tmp.path().join("nope.json");
        assert!(load_config(Some(&missing), tmp.path()).is_err());
    }

    #[test]
    fn explicit_malformed_file_is_an_error() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("broken.json");
        std::fs::write(&path, "][").unwrap();
        assert!(load_config(Some(&path), tmp.path()).is_err());
    }
}
