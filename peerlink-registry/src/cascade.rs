//! Dependent-record cleanup after a device is removed.
//!
//! Removing a device leaves three kinds of records pointing at it: its
//! network connections, its transfer-group assignees, and (through the
//! assignees) transfer groups that may now have nobody left in them. The
//! [`CascadeEngine`] deletes the first two and collapses exactly those
//! groups whose last assignee was the removed device.
//!
//! Every step is idempotent, so running the cascade again for a device that
//! is already gone is a no-op. A failing step is retried when the failure is
//! transient and otherwise recorded in the [`CascadeReport`]; it never stops
//! the remaining steps.

use crate::collaborators::{PictureStore, TransferGroupDirectory};
use crate::config::RegistryConfig;
use crate::locks::GroupLocks;
use peerlink_storage::{picture_id_for, ConnectionStore, StorageError, StorageResult};
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// How often a step with a retryable failure is attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first. Treated as 1 if zero.
    pub attempts: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            backoff: Duration::from_millis(50),
        }
    }
}

impl RetryPolicy {
    /// Single attempt, no waiting.
    pub fn none() -> Self {
        Self {
            attempts: 1,
            backoff: Duration::ZERO,
        }
    }
}

impl From<&RegistryConfig> for RetryPolicy {
    fn from(config: &RegistryConfig) -> Self {
        Self {
            attempts: config.group_cleanup_attempts,
            backoff: config.retry_backoff(),
        }
    }
}

/// The part of a cascade a failure belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CascadeStep {
    Connections,
    Assignees,
    Group(i64),
}

impl fmt::Display for CascadeStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CascadeStep::Connections => write!(f, "connections"),
            CascadeStep::Assignees => write!(f, "assignees"),
            CascadeStep::Group(id) => write!(f, "group {id}"),
        }
    }
}

/// A cascade step that gave up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CascadeFailure {
    pub step: CascadeStep,
    pub error: String,
    pub attempts: u32,
}

/// What a cascade did for one device.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CascadeReport {
    pub device_id: String,
    /// Whether the device row was present when removal was requested.
    pub device_existed: bool,
    pub picture_removed: bool,
    pub connections_removed: usize,
    pub assignees_removed: usize,
    /// Groups deleted because the device was their last assignee.
    pub groups_removed: Vec<i64>,
    /// Groups still claimed by other devices.
    pub groups_retained: Vec<i64>,
    /// Candidate groups that had already disappeared.
    pub groups_missing: Vec<i64>,
    pub failures: Vec<CascadeFailure>,
}

impl CascadeReport {
    fn new(device_id: &str) -> Self {
        Self {
            device_id: device_id.to_string(),
            ..Self::default()
        }
    }

    /// True when at least one step failed and dependent rows may remain.
    pub fn is_partial(&self) -> bool {
        !self.failures.is_empty()
    }

    fn fail(&mut self, step: CascadeStep, error: &StorageError, attempts: u32) {
        warn!(
            "cascade step {step} for device {} failed after {attempts} attempt(s): {error}",
            self.device_id
        );
        self.failures.push(CascadeFailure {
            step,
            error: error.to_string(),
            attempts,
        });
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GroupOutcome {
    Removed,
    Retained,
    Missing,
}

/// Deletes connections, assignees and orphaned groups of removed devices.
pub struct CascadeEngine {
    connections: ConnectionStore,
    groups: Arc<dyn TransferGroupDirectory>,
    pictures: Arc<dyn PictureStore>,
    locks: GroupLocks,
    retry: RetryPolicy,
}

impl CascadeEngine {
    pub fn new(
        connections: ConnectionStore,
        groups: Arc<dyn TransferGroupDirectory>,
        pictures: Arc<dyn PictureStore>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            connections,
            groups,
            pictures,
            locks: GroupLocks::new(),
            retry,
        }
    }

    /// Cleans up everything that referenced `device_id`.
    ///
    /// The device row must already be gone (or never have existed).
    pub fn on_device_removed(&self, device_id: &str) -> CascadeReport {
        let mut report = CascadeReport::new(device_id);

        report.picture_removed = self.remove_picture(device_id);

        match self.retrying(|| self.connections.remove_all_for_device(device_id)) {
            Ok(removed) => report.connections_removed = removed,
            Err((error, attempts)) => {
                report.fail(CascadeStep::Connections, &error, attempts);
            }
        }

        let candidates = self.release_assignees(device_id, &mut report);

        for group_id in candidates {
            match self.retrying(|| self.collapse_if_orphaned(group_id)) {
                Ok(GroupOutcome::Removed) => report.groups_removed.push(group_id),
                Ok(GroupOutcome::Retained) => report.groups_retained.push(group_id),
                Ok(GroupOutcome::Missing) => report.groups_missing.push(group_id),
                Err((error, attempts)) => {
                    report.fail(CascadeStep::Group(group_id), &error, attempts);
                }
            }
        }

        if report.is_partial() {
            warn!(
                "partial cascade for device {device_id}: {} step(s) failed",
                report.failures.len()
            );
        } else {
            info!(
                "cascade for device {device_id}: {} connection(s), {} assignee(s), {} group(s) removed",
                report.connections_removed,
                report.assignees_removed,
                report.groups_removed.len()
            );
        }
        report
    }

    /// Best-effort; a missing or undeletable picture never fails the cascade.
    fn remove_picture(&self, device_id: &str) -> bool {
        let picture_id = picture_id_for(device_id);
        match self.pictures.delete_picture(&picture_id) {
            Ok(()) => true,
            Err(e) if e.is_not_found() => {
                debug!("no profile picture {picture_id} to remove");
                false
            }
            Err(e) => {
                warn!("failed to remove profile picture {picture_id}: {e}");
                false
            }
        }
    }

    /// Deletes the device's assignees and returns the groups they pointed at.
    fn release_assignees(&self, device_id: &str, report: &mut CascadeReport) -> BTreeSet<i64> {
        let mut candidates = BTreeSet::new();

        let assignees = match self.retrying(|| self.groups.assignees_for_device(device_id)) {
            Ok(assignees) => assignees,
            Err((error, attempts)) => {
                report.fail(CascadeStep::Assignees, &error, attempts);
                return candidates;
            }
        };

        for assignee in &assignees {
            match self.retrying(|| self.groups.remove_assignee(assignee)) {
                Ok(removed) => {
                    if removed {
                        report.assignees_removed += 1;
                    }
                    candidates.insert(assignee.group_id);
                }
                Err((error, attempts)) => {
                    report.fail(CascadeStep::Assignees, &error, attempts);
                }
            }
        }
        candidates
    }

    fn collapse_if_orphaned(&self, group_id: i64) -> StorageResult<GroupOutcome> {
        self.locks.with_group(group_id, || -> StorageResult<GroupOutcome> {
            if !self.groups.group_exists(group_id)? {
                debug!("group {group_id} already gone");
                return Ok(GroupOutcome::Missing);
            }

            let remaining = self.groups.count_assignees(group_id)?;
            if remaining > 0 {
                debug!("group {group_id} kept, {remaining} assignee(s) remain");
                return Ok(GroupOutcome::Retained);
            }

            if self.groups.remove_group_if_orphaned(group_id)? {
                debug!("group {group_id} orphaned, removed");
                Ok(GroupOutcome::Removed)
            } else if self.groups.group_exists(group_id)? {
                // An assignee arrived between the count and the delete.
                Ok(GroupOutcome::Retained)
            } else {
                Ok(GroupOutcome::Missing)
            }
        })
    }

    fn retrying<T>(
        &self,
        mut op: impl FnMut() -> StorageResult<T>,
    ) -> Result<T, (StorageError, u32)> {
        let max_attempts = self.retry.attempts.max(1);
        let mut attempt = 1;
        loop {
            match op() {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && attempt < max_attempts => {
                    debug!(
                        "attempt {attempt}/{max_attempts} failed, retrying in {:?}: {e}",
                        self.retry.backoff
                    );
                    std::thread::sleep(self.retry.backoff);
                    attempt += 1;
                }
                Err(e) => return Err((e, attempt)),
            }
        }
    }
}
