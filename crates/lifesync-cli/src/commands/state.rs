//! State command - Inspect or clear the locally persisted state
//!
//! Reads the local snapshot from the file-backed store configured under
//! `storage.dir` / `storage.snapshot_key`.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Subcommand;
use lifesync_core::config::Config;
use lifesync_core::domain::Domain;
use lifesync_core::local_store::LocalRecord;
use lifesync_core::LocalSnapshotStore;
use lifesync_store::FileKeyValueStore;
use tracing::info;

use crate::output::{get_formatter, OutputFormat};

/// State subcommands
#[derive(Debug, Subcommand)]
pub enum StateCommand {
    /// Print the locally persisted durable state
    Show {
        /// Only print this domain (tasks, habits, routines, preferences)
        #[arg(long)]
        domain: Option<String>,
    },
    /// Delete the locally persisted state
    Reset,
}

impl StateCommand {
    pub async fn execute(&self, config: &Config, format: OutputFormat) -> Result<()> {
        let local = open_local_store(config)?;
        match self {
            StateCommand::Show { domain } => {
                let domain = domain
                    .as_deref()
                    .map(str::parse::<Domain>)
                    .transpose()
                    .context("Unknown domain")?;
                execute_show(&local, domain, format)
            }
            StateCommand::Reset => execute_reset(&local, format),
        }
    }
}

fn open_local_store(config: &Config) -> Result<LocalSnapshotStore> {
    let kv = FileKeyValueStore::open(&config.storage.dir).with_context(|| {
        format!(
            "Failed to open local store at {}",
            config.storage.dir.display()
        )
    })?;
    Ok(LocalSnapshotStore::new(
        Arc::new(kv),
        config.storage.snapshot_key.clone(),
    ))
}

fn execute_show(
    local: &LocalSnapshotStore,
    domain: Option<Domain>,
    format: OutputFormat,
) -> Result<()> {
    let formatter = get_formatter(format);

    let Some(record) = local.read_record() else {
        if format.is_json() {
            formatter.print_json(&serde_json::json!({ "stored": false }));
        } else {
            formatter.info("No local state stored yet");
        }
        return Ok(());
    };

    info!(key = %local.key(), "Showing local state");

    if let Some(domain) = domain {
        if !domain.policy().is_persisted() {
            formatter.warn(&format!("Domain '{domain}' is never persisted"));
            return Ok(());
        }
        let value = record
            .state
            .get(domain)
            .cloned()
            .unwrap_or(serde_json::Value::Null);
        if format.is_json() {
            formatter.print_json(&value);
        } else {
            formatter.success(&format!("{domain}"));
            let pretty = serde_json::to_string_pretty(&value).context("Failed to format domain")?;
            for line in pretty.lines() {
                formatter.info(line);
            }
        }
        return Ok(());
    }

    if format.is_json() {
        let json = serde_json::to_value(&record).context("Failed to serialize local state")?;
        formatter.print_json(&json);
    } else {
        formatter.success(&format!("Local state (saved {})", record.saved_at.to_rfc3339()));
        if let Some(owner) = &record.owner {
            formatter.field("owner", owner.as_str());
        }
        for (domain, summary) in summarize(&record) {
            formatter.field(domain.as_str(), &summary);
        }
    }

    Ok(())
}

fn execute_reset(local: &LocalSnapshotStore, format: OutputFormat) -> Result<()> {
    let formatter = get_formatter(format);
    local.clear().context("Failed to clear local state")?;
    info!(key = %local.key(), "Cleared local state");

    if format.is_json() {
        formatter.print_json(&serde_json::json!({ "success": true, "key": local.key() }));
    } else {
        formatter.success("Local state cleared");
    }
    Ok(())
}

/// One entry per stored domain: item count for lists, field count otherwise
fn summarize(record: &LocalRecord) -> Vec<(Domain, String)> {
    record
        .state
        .domains()
        .map(|(domain, value)| {
            let summary = match value {
                serde_json::Value::Array(items) => format!("{} item(s)", items.len()),
                serde_json::Value::Object(fields) => format!("{} field(s)", fields.len()),
                other => other.to_string(),
            };
            (domain, summary)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use lifesync_core::domain::{Action, Task};
    use lifesync_core::ports::NoopObserver;
    use lifesync_core::StateContainer;
    use tempfile::TempDir;

    use super::*;

    fn config_in(dir: &TempDir) -> Config {
        let mut config = Config::default();
        config.storage.dir = dir.path().join("state");
        config
    }

    #[test]
    fn test_summarize_counts_items() {
        let tmp = TempDir::new().unwrap();
        let config = config_in(&tmp);
        let local = open_local_store(&config).unwrap();

        let mut container =
            StateContainer::new(Some(local.clone()), Arc::new(NoopObserver)).unwrap();
        container.mark_rendered();
        container.dispatch(Action::AddTask(Task::new("a")));
        container.dispatch(Action::AddTask(Task::new("b")));

        let record = local.read_record().unwrap();
        let summary = summarize(&record);
        assert!(summary.contains(&(Domain::Tasks, "2 item(s)".to_string())));
        assert!(summary.iter().any(|(domain, _)| *domain == Domain::Preferences));
    }

    #[tokio::test]
    async fn test_reset_clears_snapshot() {
        let tmp = TempDir::new().unwrap();
        let config = config_in(&tmp);
        let local = open_local_store(&config).unwrap();
        let mut container =
            StateContainer::new(Some(local.clone()), Arc::new(NoopObserver)).unwrap();
        container.mark_rendered();
        container.dispatch(Action::AddTask(Task::new("a")));
        assert!(local.read_record().is_some());

        StateCommand::Reset
            .execute(&config, OutputFormat::Json)
            .await
            .unwrap();

        assert!(local.read_record().is_none());
    }

    #[tokio::test]
    async fn test_show_rejects_unknown_domain() {
        let tmp = TempDir::new().unwrap();
        let result = StateCommand::Show {
            domain: Some("budgets".to_string()),
        }
        .execute(&config_in(&tmp), OutputFormat::Json)
        .await;
        assert!(result.is_err());
    }
}
