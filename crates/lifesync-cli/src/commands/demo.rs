//! Demo command - Two devices replicating through an in-memory remote
//!
//! Starts two sync session managers signed in as the same identity, each
//! with its own state container and in-memory local store. Device A adds
//! tasks; device B converges through its remote subscription.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use lifesync_core::config::Config;
use lifesync_core::domain::{Action, IdentityId, Task};
use lifesync_core::ports::{IKeyValueStore, IRemoteStore, NoopObserver};
use lifesync_core::{LocalSnapshotStore, SharedStateContainer, StateContainer};
use lifesync_remote::InMemoryRemoteStore;
use lifesync_store::MemoryKeyValueStore;
use lifesync_sync::{IdentitySource, SyncError, SyncSessionManager, SyncStatus};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::output::{get_formatter, OutputFormat};

/// Pause between two edits on device A
const EDIT_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Debug, Args)]
pub struct DemoCommand {
    /// Number of tasks device A adds
    #[arg(long, default_value_t = 5)]
    edits: usize,

    /// Identity both devices sign in as
    #[arg(long, default_value = "demo-user")]
    identity: String,
}

/// One simulated device
struct Device {
    name: &'static str,
    container: SharedStateContainer,
    status: watch::Receiver<SyncStatus>,
    task: JoinHandle<Result<(), SyncError>>,
    _identity: IdentitySource,
}

impl Device {
    fn start(
        name: &'static str,
        remote: &InMemoryRemoteStore,
        identity: &IdentityId,
        config: &Config,
        shutdown: &CancellationToken,
    ) -> Result<Self> {
        let kv: Arc<dyn IKeyValueStore> = Arc::new(MemoryKeyValueStore::new());
        let local = LocalSnapshotStore::new(kv, config.storage.snapshot_key.clone());
        let container = SharedStateContainer::new(
            StateContainer::new(Some(local), Arc::new(NoopObserver))
                .context("Failed to create state container")?,
        );
        container.mark_rendered();

        let source = IdentitySource::with_initial(Some(identity.clone()));
        let manager = SyncSessionManager::from_config(
            container.clone(),
            Arc::new(remote.clone()) as Arc<dyn IRemoteStore>,
            source.subscribe(),
            &config.sync,
        );
        let status = manager.status();
        let task = tokio::spawn(manager.run(shutdown.child_token()));

        Ok(Self {
            name,
            container,
            status,
            task,
            _identity: source,
        })
    }

    fn version(&self) -> u64 {
        self.status.borrow().version().map_or(0, |v| v.get())
    }

    fn task_count(&self) -> usize {
        self.container.read(|s| s.tasks.len())
    }

    fn final_status(&self) -> (&'static str, SyncStatus, usize) {
        (self.name, self.status.borrow().clone(), self.task_count())
    }

    fn summary(&self) -> serde_json::Value {
        serde_json::json!({
            "device": self.name,
            "status": *self.status.borrow(),
            "tasks": self.task_count(),
        })
    }
}

impl DemoCommand {
    pub async fn execute(&self, config: &Config, format: OutputFormat) -> Result<()> {
        let formatter = get_formatter(format);

        if !config.sync.enabled {
            formatter.warn("Sync is disabled in the configuration (sync.enabled = false)");
            return Ok(());
        }
        let errors = config.validate();
        if !errors.is_empty() {
            let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            anyhow::bail!("Invalid configuration: {}", messages.join("; "));
        }

        let identity = IdentityId::new(self.identity.as_str()).context("Invalid identity")?;
        let remote = InMemoryRemoteStore::new();
        let shutdown = CancellationToken::new();

        info!(identity = %identity, edits = self.edits, "Starting two-device demo");

        let device_a = Device::start("a", &remote, &identity, config, &shutdown)?;
        let device_b = Device::start("b", &remote, &identity, config, &shutdown)?;
        tokio::time::sleep(EDIT_INTERVAL).await;

        for i in 1..=self.edits {
            device_a
                .container
                .dispatch(Action::AddTask(Task::new(format!("Demo task {i}"))));
            formatter.info(&format!("device a: added 'Demo task {i}'"));
            tokio::time::sleep(EDIT_INTERVAL).await;
        }

        let expected = device_a.task_count();
        let timeout = config.sync.debounce() * 3 + Duration::from_secs(2);
        let converged = tokio::time::timeout(timeout, async {
            while device_b.task_count() != expected || device_a.version() != device_b.version() {
                tokio::time::sleep(EDIT_INTERVAL).await;
            }
        })
        .await
        .is_ok();

        shutdown.cancel();
        for device in [&device_a, &device_b] {
            info!(device = device.name, tasks = device.task_count(), "Device final state");
        }
        let summaries = [device_a.summary(), device_b.summary()];
        let finals = [device_a.final_status(), device_b.final_status()];
        device_a.task.await.context("Device a task panicked")??;
        device_b.task.await.context("Device b task panicked")??;

        let puts = remote.puts();
        if format.is_json() {
            formatter.print_json(&serde_json::json!({
                "identity": identity.as_str(),
                "converged": converged,
                "remote_writes": puts.len(),
                "remote_version": remote.document(&identity).map(|d| d.version.get()),
                "devices": summaries,
            }));
        } else {
            if converged {
                formatter.success("Devices converged");
            } else {
                formatter.error("Devices did not converge before the timeout");
            }
            formatter.field("remote writes", &puts.len().to_string());
            if let Some(document) = remote.document(&identity) {
                formatter.field("remote version", &format!("v{}", document.version));
            }
            for (name, status, tasks) in &finals {
                formatter.sync_status(&format!("device {name}"), status);
                formatter.field("  tasks", &tasks.to_string());
            }
        }

        Ok(())
    }
}
