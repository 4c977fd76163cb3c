use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ErrorCode;

/// Project config location relative to the workspace root.
pub const CONFIG_PATH: &str = ".wrk/config.toml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Read { path: PathBuf, source: io::Error },

    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

impl ConfigError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Read { .. } => ErrorCode::ConfigReadFailed,
            Self::Parse { .. } => ErrorCode::ConfigParseError,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectConfig {
    #[serde(default)]
    pub queue: QueueConfig,
    #[serde(default)]
    pub state: StateConfig,
    #[serde(default)]
    pub reconcile: ReconcileConfig,
    #[serde(default)]
    pub scan: ScanConfig,
    #[serde(default)]
    pub lock: LockConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueConfig {
    #[serde(default = "default_queue_root")]
    pub root: PathBuf,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            root: default_queue_root(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateConfig {
    #[serde(default = "default_state_dir")]
    pub dir: PathBuf,
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            dir: default_state_dir(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileConfig {
    /// Rewrite `complete`/`closed`/... to `done` during ordinary reconciliation.
    #[serde(default = "default_true")]
    pub normalize_synonyms: bool,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            normalize_synonyms: default_true(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanConfig {
    #[serde(default = "default_working_stale_days")]
    pub working_stale_days: u32,
    #[serde(default = "default_blocked_stale_days")]
    pub blocked_stale_days: u32,
    #[serde(default = "default_required_fields")]
    pub required_fields: Vec<String>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            working_stale_days: default_working_stale_days(),
            blocked_stale_days: default_blocked_stale_days(),
            required_fields: default_required_fields(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockConfig {
    #[serde(default = "default_lock_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_lock_timeout_ms(),
        }
    }
}

impl LockConfig {
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl ProjectConfig {
    /// Queue root resolved against the workspace, unless already absolute.
    #[must_use]
    pub fn queue_root(&self, workspace: &Path) -> PathBuf {
        workspace.join(&self.queue.root)
    }

    #[must_use]
    pub fn state_dir(&self, workspace: &Path) -> PathBuf {
        workspace.join(&self.state.dir)
    }
}

/// Load `<workspace>/.wrk/config.toml`, falling back to defaults when absent.
pub fn load_project_config(workspace: &Path) -> Result<ProjectConfig, ConfigError> {
    let path = workspace.join(CONFIG_PATH);
    if !path.exists() {
        return Ok(ProjectConfig::default());
    }

    let content = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
        path: path.clone(),
        source,
    })?;

    toml::from_str::<ProjectConfig>(&content).map_err(|source| ConfigError::Parse { path, source })
}

fn default_true() -> bool {
    true
}

fn default_queue_root() -> PathBuf {
    PathBuf::from("work-queue")
}

fn default_state_dir() -> PathBuf {
    PathBuf::from(".claude/state")
}

fn default_working_stale_days() -> u32 {
    7
}

fn default_blocked_stale_days() -> u32 {
    14
}

fn default_required_fields() -> Vec<String> {
    ["priority", "complexity", "route", "provider"]
        .into_iter()
        .map(str::to_string)
        .collect()
}

fn default_lock_timeout_ms() -> u64 {
    2000
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_config_uses_defaults() {
        let temp = TempDir::new().expect("tmp");
        let cfg = load_project_config(temp.path()).expect("load");
        assert_eq!(cfg, ProjectConfig::default());
        assert!(cfg.reconcile.normalize_synonyms);
        assert_eq!(cfg.scan.working_stale_days, 7);
        assert_eq!(cfg.scan.blocked_stale_days, 14);
        assert_eq!(cfg.scan.required_fields.len(), 4);
        assert_eq!(cfg.lock.timeout(), Duration::from_millis(2000));
        assert_eq!(cfg.queue_root(temp.path()), temp.path().join("work-queue"));
    }

    #[test]
    fn partial_sections_keep_remaining_defaults() {
        let temp = TempDir::new().expect("tmp");
        std::fs::create_dir_all(temp.path().join(".wrk")).expect("dir");
        std::fs::write(
            temp.path().join(CONFIG_PATH),
            "[reconcile]\nnormalize_synonyms = false\n\n[scan]\nworking_stale_days = 3\n\n[queue]\nroot = \"/srv/queue\"\n",
        )
        .expect("write");

        let cfg = load_project_config(temp.path()).expect("load");
        assert!(!cfg.reconcile.normalize_synonyms);
        assert_eq!(cfg.scan.working_stale_days, 3);
        assert_eq!(cfg.scan.blocked_stale_days, 14);
        assert_eq!(cfg.queue_root(temp.path()), PathBuf::from("/srv/queue"));
        assert_eq!(cfg.state.dir, PathBuf::from(".claude/state"));
    }

    #[test]
    fn invalid_toml_is_a_config_parse_error() {
        let temp = TempDir::new().expect("tmp");
        std::fs::create_dir_all(temp.path().join(".wrk")).expect("dir");
        std::fs::write(temp.path().join(CONFIG_PATH), "[scan\n").expect("write");

        let err = load_project_config(temp.path()).unwrap_err();
        assert_eq!(err.code(), ErrorCode::ConfigParseError);
    }

    #[test]
    fn unreadable_config_is_a_read_failure() {
        let temp = TempDir::new().expect("tmp");
        std::fs::create_dir_all(temp.path().join(CONFIG_PATH)).expect("dir in place of file");

        let err = load_project_config(temp.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
        assert_eq!(err.code(), ErrorCode::ConfigReadFailed);
        assert_eq!(err.code().kind(), "io_error");
    }
}
