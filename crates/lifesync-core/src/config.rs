//! Configuration module for LifeSync.
//!
//! Provides typed configuration structs that map to the YAML configuration file,
//! with loading, validation, defaults, and a builder pattern for programmatic use.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::local_store::DEFAULT_SNAPSHOT_KEY;

// ---------------------------------------------------------------------------
// Config struct with sub-sections
// ---------------------------------------------------------------------------

/// Top-level configuration for LifeSync.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub sync: SyncConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
}

/// Remote synchronization settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Whether the sync session manager runs at all.
    pub enabled: bool,
    /// Milliseconds of quiet after the last durable change before the
    /// remote write fires.
    pub debounce_ms: u64,
}

/// Local durable storage settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory of the file-backed key-value store.
    pub dir: PathBuf,
    /// Key under which the local snapshot is stored.
    pub snapshot_key: String,
}

/// Logging / tracing settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: `trace`, `debug`, `info`, `warn`, or `error`.
    pub level: String,
}

// ---------------------------------------------------------------------------
// Config::load()
// ---------------------------------------------------------------------------

impl Config {
    /// Load configuration from a YAML file at `path`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Try to load from `path`; fall back to [`Config::default`] on any error.
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_default()
    }

    /// Write the configuration as YAML to `path`, creating parent directories.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    /// Platform-appropriate default path for the configuration file.
    ///
    /// Typically `$XDG_CONFIG_HOME/lifesync/config.yaml` on Linux.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("lifesync")
            .join("config.yaml")
    }
}

impl SyncConfig {
    /// The debounce window as a [`Duration`].
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            debounce_ms: 1000,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            dir: dirs::data_local_dir()
                .unwrap_or_else(|| PathBuf::from("~/.local/share"))
                .join("lifesync")
                .join("state"),
            snapshot_key: DEFAULT_SNAPSHOT_KEY.to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config::validate()
// ---------------------------------------------------------------------------

/// A single validation error found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path to the offending field, e.g. `"sync.debounce_ms"`.
    pub field: String,
    /// Human-readable explanation.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Valid values for `logging.level`.
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Upper bound for `sync.debounce_ms` (one minute).
const MAX_DEBOUNCE_MS: u64 = 60_000;

impl Config {
    /// Validate the configuration and return all errors found.
    ///
    /// An empty vector means the configuration is valid.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        // --- sync ---
        if self.sync.debounce_ms == 0 {
            errors.push(ValidationError {
                field: "sync.debounce_ms".into(),
                message: "must be greater than 0".into(),
            });
        } else if self.sync.debounce_ms > MAX_DEBOUNCE_MS {
            errors.push(ValidationError {
                field: "sync.debounce_ms".into(),
                message: format!("must not exceed {MAX_DEBOUNCE_MS}"),
            });
        }

        // --- storage ---
        if self.storage.snapshot_key.trim().is_empty() {
            errors.push(ValidationError {
                field: "storage.snapshot_key".into(),
                message: "must not be empty".into(),
            });
        } else if self
            .storage
            .snapshot_key
            .contains(|c: char| c == '/' || c == '\\')
        {
            errors.push(ValidationError {
                field: "storage.snapshot_key".into(),
                message: format!(
                    "must not contain path separators: '{}'",
                    self.storage.snapshot_key
                ),
            });
        }
        if self.storage.dir.as_os_str().is_empty() {
            errors.push(ValidationError {
                field: "storage.dir".into(),
                message: "must not be empty".into(),
            });
        }

        // --- logging ---
        if !VALID_LOG_LEVELS.contains(&self.logging.level.as_str()) {
            errors.push(ValidationError {
                field: "logging.level".into(),
                message: format!(
                    "invalid level '{}'; valid options: {}",
                    self.logging.level,
                    VALID_LOG_LEVELS.join(", ")
                ),
            });
        }

        errors
    }
}

// ---------------------------------------------------------------------------
// ConfigBuilder
// ---------------------------------------------------------------------------

/// Builder for constructing a [`Config`] programmatically.
///
/// Starts from [`Config::default`] and allows selective overrides.
///
/// # Example
///
/// ```rust
/// use lifesync_core::config::ConfigBuilder;
///
/// let config = ConfigBuilder::new()
///     .sync_debounce_ms(250)
///     .logging_level("debug")
///     .build();
/// assert_eq!(config.sync.debounce_ms, 250);
/// ```
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    pub fn sync_enabled(mut self, enabled: bool) -> Self {
        self.config.sync.enabled = enabled;
        self
    }

    pub fn sync_debounce_ms(mut self, ms: u64) -> Self {
        self.config.sync.debounce_ms = ms;
        self
    }

    pub fn storage_dir(mut self, dir: PathBuf) -> Self {
        self.config.storage.dir = dir;
        self
    }

    pub fn storage_snapshot_key(mut self, key: impl Into<String>) -> Self {
        self.config.storage.snapshot_key = key.into();
        self
    }

    pub fn logging_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    pub fn build(self) -> Config {
        self.config
    }

    /// Build and validate in one step. Returns `Err` with the list of
    /// validation errors if the configuration is invalid.
    pub fn build_validated(self) -> Result<Config, Vec<ValidationError>> {
        let config = self.build();
        let errors = config.validate();
        if errors.is_empty() {
            Ok(config)
        } else {
            Err(errors)
        }
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    // -- Defaults --

    #[test]
    fn default_config_has_sensible_values() {
        let cfg = Config::default();
        assert!(cfg.sync.enabled);
        assert_eq!(cfg.sync.debounce_ms, 1000);
        assert_eq!(cfg.sync.debounce(), Duration::from_secs(1));
        assert_eq!(cfg.storage.snapshot_key, "lifesync.snapshot");
        assert!(cfg.storage.dir.to_string_lossy().contains("lifesync"));
        assert_eq!(cfg.logging.level, "info");
    }

    #[test]
    fn default_config_passes_validation() {
        let errors = Config::default().validate();
        assert!(errors.is_empty(), "unexpected validation errors: {errors:?}");
    }

    // -- Loading --

    #[test]
    fn load_from_yaml_file() {
        let yaml = r#"
sync:
  enabled: false
  debounce_ms: 250
storage:
  dir: /tmp/lifesync-test
  snapshot_key: device.snapshot
logging:
  level: debug
"#;
        let mut tmp = tempfile::NamedTempFile::new().expect("create temp file");
        tmp.write_all(yaml.as_bytes()).unwrap();
        tmp.flush().unwrap();

        let cfg = Config::load(tmp.path()).expect("load config");
        assert!(!cfg.sync.enabled);
        assert_eq!(cfg.sync.debounce_ms, 250);
        assert_eq!(cfg.storage.dir, PathBuf::from("/tmp/lifesync-test"));
        assert_eq!(cfg.storage.snapshot_key, "device.snapshot");
        assert_eq!(cfg.logging.level, "debug");
    }

    #[test]
    fn partial_yaml_fills_defaults() {
        let mut tmp = tempfile::NamedTempFile::new().expect("create temp file");
        tmp.write_all(b"sync:\n  debounce_ms: 500\n").unwrap();
        tmp.flush().unwrap();

        let cfg = Config::load(tmp.path()).expect("load config");
        assert_eq!(cfg.sync.debounce_ms, 500);
        assert!(cfg.sync.enabled);
        assert_eq!(cfg.logging.level, "info");
    }

    #[test]
    fn load_or_default_returns_default_on_missing_file() {
        let cfg = Config::load_or_default(Path::new("/nonexistent/config.yaml"));
        assert_eq!(cfg, Config::default());
    }

    #[test]
    fn load_returns_error_on_invalid_yaml() {
        let mut tmp = tempfile::NamedTempFile::new().expect("create temp file");
        tmp.write_all(b"not: [valid: yaml: {{{").unwrap();
        tmp.flush().unwrap();

        assert!(Config::load(tmp.path()).is_err());
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.yaml");
        let cfg = ConfigBuilder::new().sync_debounce_ms(42).build();

        cfg.save(&path).unwrap();

        assert_eq!(Config::load(&path).unwrap(), cfg);
    }

    // -- Validation --

    #[test]
    fn validate_catches_zero_debounce() {
        let mut cfg = Config::default();
        cfg.sync.debounce_ms = 0;
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field == "sync.debounce_ms"));
    }

    #[test]
    fn validate_catches_huge_debounce() {
        let mut cfg = Config::default();
        cfg.sync.debounce_ms = MAX_DEBOUNCE_MS + 1;
        let errors = cfg.validate();
        assert!(errors
            .iter()
            .any(|e| e.field == "sync.debounce_ms" && e.message.contains("must not exceed")));
    }

    #[test]
    fn validate_catches_bad_snapshot_key() {
        let mut cfg = Config::default();
        cfg.storage.snapshot_key = "  ".to_string();
        assert!(cfg
            .validate()
            .iter()
            .any(|e| e.field == "storage.snapshot_key"));

        cfg.storage.snapshot_key = "../escape".to_string();
        assert!(cfg
            .validate()
            .iter()
            .any(|e| e.field == "storage.snapshot_key" && e.message.contains("separators")));
    }

    #[test]
    fn validate_catches_invalid_log_level() {
        let mut cfg = Config::default();
        cfg.logging.level = "verbose".to_string();
        let errors = cfg.validate();
        assert!(errors.iter().any(|e| e.field == "logging.level"));
    }

    // -- Builder --

    #[test]
    fn builder_validated_rejects_invalid() {
        let result = ConfigBuilder::new().sync_debounce_ms(0).build_validated();
        assert!(result.is_err());
    }

    #[test]
    fn builder_overrides_fields() {
        let cfg = ConfigBuilder::new()
            .sync_enabled(false)
            .storage_dir(PathBuf::from("/data"))
            .storage_snapshot_key("k")
            .logging_level("warn")
            .build_validated()
            .unwrap();
        assert!(!cfg.sync.enabled);
        assert_eq!(cfg.storage.dir, PathBuf::from("/data"));
        assert_eq!(cfg.storage.snapshot_key, "k");
        assert_eq!(cfg.logging.level, "warn");
    }
}
