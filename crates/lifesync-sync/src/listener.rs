//! Remote listener version guard
//!
//! A notification is applied only if its version is strictly greater than
//! the session's `local_version`. Everything else, including the echo of
//! this session's own write, is discarded without touching the state tree.

use lifesync_core::domain::{Action, Snapshot, Version};
use lifesync_core::SharedStateContainer;
use tracing::debug;

/// What the guard did with one notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteOutcome {
    /// Hydrated the tree and moved `local_version` from `from` to `to`
    Applied { from: Version, to: Version },
    /// Not newer than `local`; nothing changed
    Discarded { local: Version, remote: Version },
}

impl RemoteOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied { .. })
    }
}

/// Applies `snapshot` to `container` if it is newer than `local_version`
pub fn apply_remote(
    container: &SharedStateContainer,
    local_version: &mut Version,
    snapshot: Snapshot,
) -> RemoteOutcome {
    let remote = snapshot.version;
    if remote <= *local_version {
        debug!(local = %local_version, remote = %remote, "Discarding stale or echoed snapshot");
        return RemoteOutcome::Discarded {
            local: *local_version,
            remote,
        };
    }

    let from = *local_version;
    container.dispatch(Action::Hydrate(snapshot.state));
    *local_version = remote;
    RemoteOutcome::Applied { from, to: remote }
}

#[cfg(test)]
mod tests {
    use lifesync_core::domain::{Domain, DurablePartition, Task};
    use lifesync_core::StateContainer;

    use super::*;

    fn container_with_task(title: &str) -> SharedStateContainer {
        let shared = SharedStateContainer::new(StateContainer::in_memory().unwrap());
        shared.dispatch(Action::AddTask(Task::new(title)));
        shared
    }

    fn snapshot_with_task(title: &str, version: u64) -> Snapshot {
        let tasks = serde_json::to_value(vec![Task::new(title)]).unwrap();
        Snapshot::new(
            DurablePartition::new().with_domain(Domain::Tasks, tasks),
            Version::new(version),
        )
    }

    #[test]
    fn test_newer_snapshot_is_applied() {
        let container = container_with_task("local");
        let mut version = Version::new(5);

        let outcome = apply_remote(&container, &mut version, snapshot_with_task("remote", 6));

        assert_eq!(
            outcome,
            RemoteOutcome::Applied {
                from: Version::new(5),
                to: Version::new(6)
            }
        );
        assert_eq!(version, Version::new(6));
        assert_eq!(container.read(|s| s.tasks[0].title.clone()), "remote");
    }

    #[test]
    fn test_equal_or_older_snapshot_is_discarded() {
        let container = container_with_task("local");
        let before = container.state();
        let mut version = Version::new(5);

        for remote in [5, 4, 0] {
            let outcome =
                apply_remote(&container, &mut version, snapshot_with_task("remote", remote));
            assert!(!outcome.is_applied());
        }

        assert_eq!(version, Version::new(5));
        assert_eq!(container.state(), before);
    }
}
