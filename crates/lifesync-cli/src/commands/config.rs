//! Config command - View and manage LifeSync configuration
//!
//! Provides the `lifesync config` CLI command which:
//! 1. Shows the effective configuration (YAML or JSON)
//! 2. Sets individual values via dot-notation keys
//! 3. Validates the configuration file and reports errors
//! 4. Writes a default configuration file

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Subcommand;
use lifesync_core::config::Config;
use tracing::info;

use crate::output::{get_formatter, OutputFormat};

/// Config subcommands
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Display current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key (e.g., "sync.debounce_ms")
        key: String,
        /// New value
        value: String,
    },
    /// Validate configuration file
    Validate,
    /// Write the default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

impl ConfigCommand {
    /// Execute the config command
    pub async fn execute(&self, config_path: &Path, format: OutputFormat) -> Result<()> {
        match self {
            ConfigCommand::Show => self.execute_show(config_path, format),
            ConfigCommand::Set { key, value } => self.execute_set(config_path, key, value, format),
            ConfigCommand::Validate => self.execute_validate(config_path, format),
            ConfigCommand::Init { force } => self.execute_init(config_path, *force, format),
        }
    }

    fn execute_show(&self, config_path: &Path, format: OutputFormat) -> Result<()> {
        let formatter = get_formatter(format);
        let config = Config::load_or_default(config_path);

        info!(config_path = %config_path.display(), "Showing configuration");

        if format.is_json() {
            let json = serde_json::to_value(&config)
                .context("Failed to serialize configuration to JSON")?;
            formatter.print_json(&json);
        } else {
            formatter.success(&format!("Configuration ({})", config_path.display()));
            formatter.info("");

            let yaml = serde_yaml::to_string(&config)
                .context("Failed to serialize configuration to YAML")?;
            for line in yaml.lines() {
                formatter.info(line);
            }
        }

        Ok(())
    }

    fn execute_set(
        &self,
        config_path: &Path,
        key: &str,
        value: &str,
        format: OutputFormat,
    ) -> Result<()> {
        let formatter = get_formatter(format);
        let mut config = Config::load_or_default(config_path);

        info!(key = %key, value = %value, "Setting configuration value");

        if let Err(e) = apply_config_value(&mut config, key, value) {
            if format.is_json() {
                formatter.print_json(&serde_json::json!({
                    "success": false,
                    "key": key,
                    "value": value,
                    "error": e.to_string(),
                }));
            } else {
                formatter.error(&format!("Failed to set '{}': {}", key, e));
                formatter.info("");
                formatter.info("Supported keys:");
                formatter.info("  sync.enabled          - true|false");
                formatter.info("  sync.debounce_ms      - Milliseconds before a remote write");
                formatter.info("  storage.dir           - Local state directory");
                formatter.info("  storage.snapshot_key  - Key of the local snapshot");
                formatter.info("  logging.level         - trace|debug|info|warn|error");
            }
            return Ok(());
        }

        let errors: Vec<String> = config.validate().iter().map(|e| e.to_string()).collect();
        if !errors.is_empty() {
            if format.is_json() {
                formatter.print_json(&serde_json::json!({
                    "success": false,
                    "key": key,
                    "value": value,
                    "errors": errors,
                }));
            } else {
                formatter.error(&format!("Invalid value for '{}': {}", key, errors.join("; ")));
            }
            return Ok(());
        }

        config
            .save(config_path)
            .context("Failed to write configuration file")?;

        if format.is_json() {
            formatter.print_json(&serde_json::json!({
                "success": true,
                "key": key,
                "value": value,
                "config_path": config_path.display().to_string(),
            }));
        } else {
            formatter.success(&format!("Set {} = {}", key, value));
            formatter.info(&format!("Saved to {}", config_path.display()));
        }

        Ok(())
    }

    fn execute_validate(&self, config_path: &Path, format: OutputFormat) -> Result<()> {
        let formatter = get_formatter(format);

        let config = match Config::load(config_path) {
            Ok(cfg) => cfg,
            Err(e) => {
                let message = if config_path.exists() {
                    format!("Failed to parse configuration: {e}")
                } else {
                    "Configuration file not found. Using defaults.".to_string()
                };
                if format.is_json() {
                    formatter.print_json(&serde_json::json!({
                        "valid": false,
                        "config_path": config_path.display().to_string(),
                        "errors": [message],
                    }));
                } else if config_path.exists() {
                    formatter.error(&message);
                    formatter.info(&format!("File: {}", config_path.display()));
                } else {
                    formatter.info(&format!(
                        "Configuration file not found at {}",
                        config_path.display()
                    ));
                    formatter.info("Using default configuration. Run 'lifesync config init' to create one.");
                }
                return Ok(());
            }
        };

        info!(config_path = %config_path.display(), "Validating configuration");

        let errors = config.validate();

        if format.is_json() {
            let error_strings: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            formatter.print_json(&serde_json::json!({
                "valid": errors.is_empty(),
                "config_path": config_path.display().to_string(),
                "errors": error_strings,
            }));
        } else if errors.is_empty() {
            formatter.success("Configuration is valid");
            formatter.info(&format!("File: {}", config_path.display()));
        } else {
            formatter.error(&format!(
                "Configuration has {} error{}:",
                errors.len(),
                if errors.len() == 1 { "" } else { "s" }
            ));
            formatter.info(&format!("File: {}", config_path.display()));
            formatter.info("");
            for error in &errors {
                formatter.info(&format!("  {} - {}", error.field, error.message));
            }
        }

        Ok(())
    }

    fn execute_init(&self, config_path: &Path, force: bool, format: OutputFormat) -> Result<()> {
        let formatter = get_formatter(format);

        if config_path.exists() && !force {
            formatter.warn(&format!(
                "{} already exists; use --force to overwrite",
                config_path.display()
            ));
            return Ok(());
        }

        Config::default()
            .save(config_path)
            .context("Failed to write configuration file")?;
        info!(config_path = %config_path.display(), "Wrote default configuration");

        if format.is_json() {
            formatter.print_json(&serde_json::json!({
                "success": true,
                "config_path": config_path.display().to_string(),
            }));
        } else {
            formatter.success(&format!("Wrote default configuration to {}", config_path.display()));
        }

        Ok(())
    }
}

/// Apply a dot-notation key/value pair to a Config struct
fn apply_config_value(config: &mut Config, key: &str, value: &str) -> Result<()> {
    match key {
        // --- sync ---
        "sync.enabled" => {
            config.sync.enabled = value
                .parse::<bool>()
                .context("Expected true or false for sync.enabled")?;
        }
        "sync.debounce_ms" => {
            config.sync.debounce_ms = value
                .parse::<u64>()
                .context("Expected a positive integer for sync.debounce_ms")?;
        }

        // --- storage ---
        "storage.dir" => {
            config.storage.dir = PathBuf::from(value);
        }
        "storage.snapshot_key" => {
            config.storage.snapshot_key = value.to_string();
        }

        // --- logging ---
        "logging.level" => {
            config.logging.level = value.to_string();
        }

        _ => {
            anyhow::bail!("Unknown configuration key: '{}'", key);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_apply_sync_enabled() {
        let mut config = Config::default();
        apply_config_value(&mut config, "sync.enabled", "false").unwrap();
        assert!(!config.sync.enabled);
    }

    #[test]
    fn test_apply_debounce() {
        let mut config = Config::default();
        apply_config_value(&mut config, "sync.debounce_ms", "250").unwrap();
        assert_eq!(config.sync.debounce_ms, 250);
    }

    #[test]
    fn test_apply_storage_dir() {
        let mut config = Config::default();
        apply_config_value(&mut config, "storage.dir", "/tmp/lifesync").unwrap();
        assert_eq!(config.storage.dir, PathBuf::from("/tmp/lifesync"));
    }

    #[test]
    fn test_apply_logging_level() {
        let mut config = Config::default();
        apply_config_value(&mut config, "logging.level", "debug").unwrap();
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_apply_rejects_bad_number() {
        let mut config = Config::default();
        assert!(apply_config_value(&mut config, "sync.debounce_ms", "soon").is_err());
    }

    #[test]
    fn test_apply_unknown_key() {
        let mut config = Config::default();
        assert!(apply_config_value(&mut config, "sync.root", "/x").is_err());
    }

    #[tokio::test]
    async fn test_init_then_set_round_trip() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("lifesync").join("config.yaml");

        ConfigCommand::Init { force: false }
            .execute(&path, OutputFormat::Json)
            .await
            .unwrap();
        assert_eq!(Config::load(&path).unwrap(), Config::default());

        ConfigCommand::Set {
            key: "sync.debounce_ms".to_string(),
            value: "400".to_string(),
        }
        .execute(&path, OutputFormat::Json)
        .await
        .unwrap();
        assert_eq!(Config::load(&path).unwrap().sync.debounce_ms, 400);
    }

    #[tokio::test]
    async fn test_set_invalid_value_is_not_saved() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.yaml");

        ConfigCommand::Set {
            key: "logging.level".to_string(),
            value: "loud".to_string(),
        }
        .execute(&path, OutputFormat::Json)
        .await
        .unwrap();

        assert!(!path.exists());
    }
}
