//! Store configuration: parsing, defaults, and environment lookup.
//!
//! A store is described by a small TOML document:
//!
//! ```toml
//! default_prune = true        # prune history on write unless told otherwise
//! lock_timeout_ms = 2000      # optional; omit to wait indefinitely
//!
//! [backend]
//! kind = "fs"                 # or "memory"
//! root = "./stock_db"
//! fsync = true
//! ```
//!
//! Entrypoints:
//! - Parse from a TOML string: [`load_config_str`]
//! - Parse from a file path: [`load_config_path`]
//! - Resolve from the environment: [`StoreConfig::from_env`]

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use shared_utils::env::{get_env_path, get_env_var_opt};

use crate::backend::{FsBackend, KvBackend, MemoryBackend};
use crate::error::{StoreError, StoreResult};

/// Env var holding the path of a TOML config file.
pub const ENV_CONFIG_PATH: &str = "SERIES_STORE_CONFIG";
/// Env var holding a filesystem root (used when no config file is given).
pub const ENV_ROOT: &str = "SERIES_STORE_ROOT";

fn default_true() -> bool {
    true
}

/// Top-level store settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StoreConfig {
    /// Prune flag used by [`Store::write_default`](crate::Store::write_default).
    #[serde(default = "default_true")]
    pub default_prune: bool,
    /// Upper bound on waiting for a symbol's write lock, in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lock_timeout_ms: Option<u64>,
    /// Where data lives.
    #[serde(default)]
    pub backend: BackendConfig,
}

/// Persistence medium selection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BackendConfig {
    /// Volatile in-process storage.
    #[default]
    Memory,
    /// One file per key below `root`.
    Fs {
        /// Root directory (created if missing).
        root: PathBuf,
        /// Sync each file before it is renamed into place.
        #[serde(default = "default_true")]
        fsync: bool,
    },
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            default_prune: true,
            lock_timeout_ms: None,
            backend: BackendConfig::Memory,
        }
    }
}

impl StoreConfig {
    /// Filesystem-backed config with defaults for everything else.
    pub fn fs(root: impl Into<PathBuf>) -> Self {
        Self {
            backend: BackendConfig::Fs {
                root: root.into(),
                fsync: true,
            },
            ..Self::default()
        }
    }

    /// Resolves configuration from the environment.
    ///
    /// Precedence: `SERIES_STORE_CONFIG` (a TOML file) → `SERIES_STORE_ROOT`
    /// (filesystem root, other settings default) → in-memory default.
    pub fn from_env() -> StoreResult<Self> {
        let cfg_err = |e: shared_utils::ConfigError| StoreError::Config(e.to_string());

        if let Some(path) = get_env_path(ENV_CONFIG_PATH).map_err(cfg_err)? {
            return load_config_path(path);
        }
        if let Some(root) = get_env_var_opt(ENV_ROOT).map_err(cfg_err)? {
            return Ok(Self::fs(root));
        }
        Ok(Self::default())
    }

    /// Write-lock bound as a [`Duration`].
    pub fn lock_timeout(&self) -> Option<Duration> {
        self.lock_timeout_ms.map(Duration::from_millis)
    }

    /// Instantiates the configured backend.
    pub fn open_backend(&self) -> StoreResult<Arc<dyn KvBackend>> {
        Ok(match &self.backend {
            BackendConfig::Memory => Arc::new(MemoryBackend::new()),
            BackendConfig::Fs { root, fsync } => Arc::new(FsBackend::open(root.clone(), *fsync)?),
        })
    }
}

/// Parses a [`StoreConfig`] from TOML text.
///
/// Errors:
/// - TOML syntax errors
/// - Unknown keys at the top level
/// - An `fs` backend with an empty `root`
pub fn load_config_str(toml_str: &str) -> StoreResult<StoreConfig> {
    let cfg: StoreConfig = toml::from_str(toml_str)
        .map_err(|e| StoreError::Config(format!("failed to parse store config: {e}")))?;
    if let BackendConfig::Fs { root, .. } = &cfg.backend {
        if root.as_os_str().is_empty() {
            return Err(StoreError::Config("backend.root cannot be empty".into()));
        }
    }
    Ok(cfg)
}

/// Reads, then parses, a TOML config file.
pub fn load_config_path(path: impl AsRef<Path>) -> StoreResult<StoreConfig> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)
        .map_err(|e| StoreError::Config(format!("read config file {}: {e}", path.display())))?;
    load_config_str(&text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_document_parses() {
        let cfg = load_config_str(
            r#"
            default_prune = false
            lock_timeout_ms = 250
            [backend]
            kind = "fs"
            root = "./stock_db"
            "#,
        )
        .unwrap();
        assert!(!cfg.default_prune);
        assert_eq!(cfg.lock_timeout(), Some(Duration::from_millis(250)));
        assert_eq!(
            cfg.backend,
            BackendConfig::Fs {
                root: PathBuf::from("./stock_db"),
                fsync: true
            }
        );
    }

    #[test]
    fn empty_document_is_in_memory_with_pruning() {
        let cfg = load_config_str("").unwrap();
        assert_eq!(cfg, StoreConfig::default());
        assert!(cfg.default_prune);
        assert!(cfg.lock_timeout().is_none());
    }

    #[test]
    fn unknown_top_level_key_is_rejected() {
        let err = load_config_str("defualt_prune = true").unwrap_err();
        assert!(matches!(err, StoreError::Config(ref m) if m.contains("parse")));
    }

    #[test]
    fn empty_fs_root_is_rejected() {
        let err = load_config_str("[backend]\nkind = \"fs\"\nroot = \"\"\n").unwrap_err();
        assert!(err.to_string().contains("backend.root"));
    }

    #[test]
    fn config_file_round_trip() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("store.toml");
        let cfg = StoreConfig::fs(dir.path().join("db"));
        std::fs::write(&path, toml::to_string(&cfg).unwrap()).unwrap();
        assert_eq!(load_config_path(&path).unwrap(), cfg);
        assert!(load_config_path(dir.path().join("missing.toml")).is_err());
    }
}
