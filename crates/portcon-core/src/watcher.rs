//! In-memory registry of the latest version per scenario name.
//!
//! Each registry entry is a [`tokio::sync::watch`] channel holding the
//! newest version published for that name. Waiters subscribe to the entry
//! and sleep until a publish moves the value past their baseline, so there is
//! no poll interval and no wake-up that does not carry a new value.
//!
//! The registry mutex guards only the name -> channel map. It is a
//! synchronous lock held just long enough to find or create an entry, never
//! across an await, so [`VersionWatcher::publish`] completes without
//! yielding once a version has been committed.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::watch;

use crate::error::ScenarioError;

/// Tracks the latest known version of every scenario and lets callers block
/// until it advances.
#[derive(Debug)]
pub struct VersionWatcher {
    registry: Mutex<HashMap<String, Arc<watch::Sender<i64>>>>,
    max_wait: Duration,
}

impl VersionWatcher {
    /// Create an empty watcher whose waits give up after `max_wait`.
    pub fn new(max_wait: Duration) -> Self {
        Self {
            registry: Mutex::new(HashMap::new()),
            max_wait,
        }
    }

    /// Longest a single [`wait`](Self::wait) blocks.
    pub const fn max_wait(&self) -> Duration {
        self.max_wait
    }

    /// Record `version` as the latest for `name` and wake its waiters.
    ///
    /// Overwrites whatever was stored before.
    pub fn publish(&self, name: &str, version: i64) {
        let sender = self.entry(name);
        let previous = sender.send_replace(version);
        tracing::debug!(
            name,
            version,
            previous,
            waiters = sender.receiver_count(),
            "Published scenario version"
        );
    }

    /// Raise the stored version for `name` to at least `version`.
    ///
    /// Used to seed the registry from a fresh repository read. A lower value
    /// than the one already stored is ignored so a slow reader cannot undo a
    /// publish that raced ahead of it.
    pub fn observe(&self, name: &str, version: i64) {
        let sender = self.entry(name);
        sender.send_if_modified(|current| {
            if version > *current {
                *current = version;
                true
            } else {
                false
            }
        });
    }

    /// Latest version recorded for `name`, if the name has been seen.
    pub fn latest(&self, name: &str) -> Option<i64> {
        let registry = self.registry.lock().unwrap_or_else(PoisonError::into_inner);
        registry.get(name).map(|sender| *sender.borrow())
    }

    /// Block until `name` moves past the caller's baseline.
    ///
    /// `current` is the scenario's version as just read from the repository.
    /// The baseline is `since`, or `current` when `since` is `0`. Returns at
    /// once with `current` when it is already past the baseline; otherwise
    /// returns the first registry value greater than the baseline.
    ///
    /// # Errors
    ///
    /// Returns [`ScenarioError::Timeout`] when no such version appears
    /// within [`max_wait`](Self::max_wait).
    pub async fn wait(&self, name: &str, since: i64, current: i64) -> Result<i64, ScenarioError> {
        let baseline = if since == 0 { current } else { since };
        if current > baseline {
            return Ok(current);
        }

        let sender = self.entry(name);
        let mut receiver = sender.subscribe();

        // `wait_for` checks the stored value before sleeping, so a publish
        // that landed before `subscribe` is not missed.
        let outcome = tokio::time::timeout(self.max_wait, async {
            receiver
                .wait_for(|version| *version > baseline)
                .await
                .map(|version| *version)
        })
        .await;

        match outcome {
            Ok(Ok(version)) => {
                tracing::debug!(name, since = baseline, version, "Watch fired");
                Ok(version)
            }
            // The channel cannot close while `sender` is held, so only the
            // deadline ends the wait without a version.
            Ok(Err(_)) | Err(_) => {
                tracing::warn!(
                    name,
                    since = baseline,
                    max_wait_ms = u64::try_from(self.max_wait.as_millis()).unwrap_or(u64::MAX),
                    "Watch timed out"
                );
                Err(ScenarioError::Timeout {
                    name: name.to_owned(),
                    since: baseline,
                })
            }
        }
    }

    /// Find or create the registry entry for `name`.
    fn entry(&self, name: &str) -> Arc<watch::Sender<i64>> {
        let mut registry = self.registry.lock().unwrap_or_else(PoisonError::into_inner);
        let sender = registry
            .entry(name.to_owned())
            .or_insert_with(|| Arc::new(watch::channel(0).0));
        Arc::clone(sender)
    }
}
