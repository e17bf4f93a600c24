//! Version-stamped writer
//!
//! Bookkeeping for the remote writes of one session. The writer owns no
//! tasks or timers itself: the manager polls [`VersionStampedWriter::deadline`]
//! in its event loop, calls [`fire`](VersionStampedWriter::fire) when it
//! elapses and reports the outcome through
//! [`complete`](VersionStampedWriter::complete).
//!
//! ```text
//! schedule ──→ deadline = now + window (reset on every call)
//! deadline ──→ fire: local_version += 1 ──→ put(snapshot, local_version)
//! put done ──→ complete: on failure roll local_version back
//! ```
//!
//! At most one write is in flight; a deadline that elapses meanwhile queues
//! a single follow-up write, started as soon as the in-flight one finishes.

use std::time::Duration;

use lifesync_core::domain::Version;
use tokio::time::Instant;
use tracing::debug;

/// Result of a [`VersionStampedWriter::fire`] call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FireOutcome {
    /// Write `version` now
    Write(Version),
    /// A write is already in flight; a follow-up is queued
    Queued,
    /// Nothing was scheduled
    Idle,
}

/// Debounce and version bookkeeping for one session's remote writes
#[derive(Debug)]
pub struct VersionStampedWriter {
    window: Duration,
    deadline: Option<Instant>,
    in_flight: Option<Version>,
    rewrite_pending: bool,
}

impl VersionStampedWriter {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            deadline: None,
            in_flight: None,
            rewrite_pending: false,
        }
    }

    /// When the pending write is due, if one is scheduled
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Version of the write currently in flight
    pub fn in_flight(&self) -> Option<Version> {
        self.in_flight
    }

    /// Whether a write is scheduled or queued behind the one in flight
    pub fn is_pending(&self) -> bool {
        self.deadline.is_some() || self.rewrite_pending
    }

    /// Schedules a write one window after `now`, replacing any earlier
    /// deadline
    pub fn schedule(&mut self, now: Instant) {
        let deadline = now + self.window;
        debug!(
            window_ms = self.window.as_millis() as u64,
            rescheduled = self.deadline.is_some(),
            "Remote write scheduled"
        );
        self.deadline = Some(deadline);
    }

    /// Consumes the elapsed deadline
    ///
    /// Advances `local_version` and returns the version to write, unless a
    /// write is still in flight.
    pub fn fire(&mut self, local_version: &mut Version) -> FireOutcome {
        if self.deadline.take().is_none() {
            return FireOutcome::Idle;
        }
        if let Some(in_flight) = self.in_flight {
            debug!(in_flight = %in_flight, "Write in flight, queueing follow-up");
            self.rewrite_pending = true;
            return FireOutcome::Queued;
        }

        *local_version = local_version.next();
        self.in_flight = Some(*local_version);
        FireOutcome::Write(*local_version)
    }

    /// Records the outcome of the write of `version`
    ///
    /// A failed write rolls `local_version` back to the value before
    /// [`fire`](Self::fire), unless a newer remote snapshot has moved it
    /// in the meantime. A queued follow-up becomes due at `now`.
    pub fn complete(
        &mut self,
        version: Version,
        succeeded: bool,
        local_version: &mut Version,
        now: Instant,
    ) {
        if self.in_flight == Some(version) {
            self.in_flight = None;
        }

        if !succeeded && *local_version == version {
            *local_version = version.prev();
        }

        if self.rewrite_pending && self.in_flight.is_none() {
            self.rewrite_pending = false;
            self.deadline = Some(now);
        }
    }

    /// Drops any pending deadline and queued follow-up
    pub fn cancel(&mut self) {
        self.deadline = None;
        self.rewrite_pending = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOW: Duration = Duration::from_millis(1000);

    #[test]
    fn test_fire_without_schedule_is_idle() {
        let mut writer = VersionStampedWriter::new(WINDOW);
        let mut version = Version::new(3);
        assert_eq!(writer.fire(&mut version), FireOutcome::Idle);
        assert_eq!(version, Version::new(3));
    }

    #[test]
    fn test_schedule_resets_deadline() {
        let mut writer = VersionStampedWriter::new(WINDOW);
        let t0 = Instant::now();
        writer.schedule(t0);
        writer.schedule(t0 + Duration::from_millis(400));
        assert_eq!(
            writer.deadline(),
            Some(t0 + Duration::from_millis(1400))
        );
    }

    #[test]
    fn test_fire_advances_version() {
        let mut writer = VersionStampedWriter::new(WINDOW);
        let mut version = Version::new(5);
        writer.schedule(Instant::now());

        assert_eq!(writer.fire(&mut version), FireOutcome::Write(Version::new(6)));
        assert_eq!(version, Version::new(6));
        assert_eq!(writer.in_flight(), Some(Version::new(6)));
        assert!(writer.deadline().is_none());
    }

    #[test]
    fn test_failure_rolls_back() {
        let mut writer = VersionStampedWriter::new(WINDOW);
        let mut version = Version::new(5);
        writer.schedule(Instant::now());
        writer.fire(&mut version);

        writer.complete(Version::new(6), false, &mut version, Instant::now());

        assert_eq!(version, Version::new(5));
        assert!(writer.in_flight().is_none());
    }

    #[test]
    fn test_failure_keeps_newer_remote_version() {
        let mut writer = VersionStampedWriter::new(WINDOW);
        let mut version = Version::new(5);
        writer.schedule(Instant::now());
        writer.fire(&mut version);
        // a remote snapshot v9 was applied while the write was in flight
        version = Version::new(9);

        writer.complete(Version::new(6), false, &mut version, Instant::now());

        assert_eq!(version, Version::new(9));
    }

    #[test]
    fn test_success_keeps_version() {
        let mut writer = VersionStampedWriter::new(WINDOW);
        let mut version = Version::ZERO;
        writer.schedule(Instant::now());
        writer.fire(&mut version);

        writer.complete(Version::new(1), true, &mut version, Instant::now());

        assert_eq!(version, Version::new(1));
    }

    #[test]
    fn test_fire_during_write_queues_one_follow_up() {
        let mut writer = VersionStampedWriter::new(WINDOW);
        let mut version = Version::ZERO;
        let t0 = Instant::now();
        writer.schedule(t0);
        assert_eq!(writer.fire(&mut version), FireOutcome::Write(Version::new(1)));

        writer.schedule(t0);
        assert_eq!(writer.fire(&mut version), FireOutcome::Queued);
        writer.schedule(t0);
        assert_eq!(writer.fire(&mut version), FireOutcome::Queued);
        assert_eq!(version, Version::new(1));

        let done_at = t0 + Duration::from_millis(2500);
        writer.complete(Version::new(1), true, &mut version, done_at);

        assert_eq!(writer.deadline(), Some(done_at));
        assert_eq!(writer.fire(&mut version), FireOutcome::Write(Version::new(2)));
    }

    #[test]
    fn test_cancel_clears_pending_work() {
        let mut writer = VersionStampedWriter::new(WINDOW);
        writer.schedule(Instant::now());
        assert!(writer.is_pending());

        writer.cancel();

        assert!(!writer.is_pending());
        assert!(writer.deadline().is_none());
    }
}
