// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Reentrant, strength-leveled relation lock table
//!
//! Each transaction may hold several modes on the same tag, and each mode is
//! reference counted. A request is granted when no *other* lock group holds a
//! conflicting mode. Transactions in the same group never conflict with each
//! other, which lets a worker act on behalf of the transaction that spawned it.

use super::mode::{LockMode, LockTag};
use crate::error::LockError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::Notify;

/// Transaction identifier
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct XactId(pub u64);

impl fmt::Display for XactId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "xact-{}", self.0)
    }
}

/// Result of a lock request that did not fail
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AcquireOutcome {
    /// Newly granted to this transaction
    Acquired,
    /// This transaction already held the mode; its count was bumped
    AlreadyHeld,
    /// Another group holds a conflicting mode (non-blocking requests only)
    WouldBlock,
}

type Grants = HashMap<XactId, HashMap<LockMode, u32>>;

#[derive(Debug, Default)]
struct LockTable {
    locks: HashMap<LockTag, Grants>,
    /// member -> group leader
    groups: HashMap<XactId, XactId>,
}

impl LockTable {
    fn leader(&self, xact: XactId) -> XactId {
        self.groups.get(&xact).copied().unwrap_or(xact)
    }

    fn try_grant(&mut self, xact: XactId, tag: LockTag, mode: LockMode) -> AcquireOutcome {
        let leader = self.leader(xact);
        let blocked = self.locks.get(&tag).is_some_and(|grants| {
            grants.iter().any(|(holder, modes)| {
                self.leader(*holder) != leader && modes.keys().any(|held| held.conflicts_with(mode))
            })
        });

        let count = self
            .locks
            .get(&tag)
            .and_then(|grants| grants.get(&xact))
            .and_then(|modes| modes.get(&mode))
            .copied()
            .unwrap_or(0);
        if count > 0 {
            self.bump(xact, tag, mode);
            return AcquireOutcome::AlreadyHeld;
        }
        if blocked {
            return AcquireOutcome::WouldBlock;
        }
        self.bump(xact, tag, mode);
        AcquireOutcome::Acquired
    }

    fn bump(&mut self, xact: XactId, tag: LockTag, mode: LockMode) {
        *self
            .locks
            .entry(tag)
            .or_default()
            .entry(xact)
            .or_default()
            .entry(mode)
            .or_default() += 1;
    }

    fn release(&mut self, xact: XactId, tag: LockTag, mode: LockMode) -> bool {
        let Some(grants) = self.locks.get_mut(&tag) else {
            return false;
        };
        let Some(modes) = grants.get_mut(&xact) else {
            return false;
        };
        let Some(count) = modes.get_mut(&mode) else {
            return false;
        };
        *count -= 1;
        if *count == 0 {
            modes.remove(&mode);
        }
        if modes.is_empty() {
            grants.remove(&xact);
        }
        if grants.is_empty() {
            self.locks.remove(&tag);
        }
        true
    }

    fn release_all(&mut self, xact: XactId) -> usize {
        let mut released = 0;
        self.locks.retain(|_, grants| {
            if let Some(modes) = grants.remove(&xact) {
                released += modes.values().map(|n| *n as usize).sum::<usize>();
            }
            !grants.is_empty()
        });
        self.groups.remove(&xact);
        released
    }
}

/// Process-wide lock manager shared by every transaction
#[derive(Debug, Default)]
pub struct LockManager {
    table: Mutex<LockTable>,
    released: Notify,
    next_xact: AtomicU64,
}

impl LockManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a fresh transaction id
    pub fn next_xact_id(&self) -> XactId {
        XactId(self.next_xact.fetch_add(1, Ordering::Relaxed) + 1)
    }

    fn table(&self) -> std::sync::MutexGuard<'_, LockTable> {
        self.table.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Put `member` in `leader`'s lock group until it releases everything
    pub fn join_group(&self, member: XactId, leader: XactId) {
        let mut table = self.table();
        let leader = table.leader(leader);
        table.groups.insert(member, leader);
    }

    /// Request `mode` on `tag` without waiting
    pub fn try_lock(&self, xact: XactId, tag: LockTag, mode: LockMode) -> AcquireOutcome {
        let outcome = self.table().try_grant(xact, tag, mode);
        tracing::trace!(%xact, %tag, %mode, ?outcome, "try lock");
        outcome
    }

    /// Request `mode` on `tag`, waiting up to `timeout` for conflicting holders
    pub async fn lock(
        &self,
        xact: XactId,
        tag: LockTag,
        mode: LockMode,
        timeout: Duration,
    ) -> Result<AcquireOutcome, LockError> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            // Register interest before checking so a release in between is not lost.
            let notified = self.released.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            match self.try_lock(xact, tag, mode) {
                AcquireOutcome::WouldBlock => {}
                outcome => return Ok(outcome),
            }

            tracing::debug!(%xact, %tag, %mode, "waiting for lock");
            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return Err(LockError::NotAcquired {
                    tag,
                    mode,
                    waited: timeout,
                });
            }
        }
    }

    /// Drop one reference to `mode` on `tag`; false if it was not held
    pub fn unlock(&self, xact: XactId, tag: LockTag, mode: LockMode) -> bool {
        let released = self.table().release(xact, tag, mode);
        if released {
            self.released.notify_waiters();
        }
        released
    }

    /// Release every lock held by `xact` and leave its group
    pub fn release_all(&self, xact: XactId) -> usize {
        let released = self.table().release_all(xact);
        if released > 0 {
            tracing::trace!(%xact, released, "released locks");
        }
        self.released.notify_waiters();
        released
    }

    /// Modes `xact` currently holds on `tag`, weakest first
    pub fn held(&self, xact: XactId, tag: LockTag) -> Vec<LockMode> {
        let table = self.table();
        let mut modes: Vec<LockMode> = table
            .locks
            .get(&tag)
            .and_then(|grants| grants.get(&xact))
            .map(|modes| modes.keys().copied().collect())
            .unwrap_or_default();
        modes.sort();
        modes
    }

    pub fn holds(&self, xact: XactId, tag: LockTag, mode: LockMode) -> bool {
        self.held(xact, tag).contains(&mode)
    }

    /// Number of transactions holding anything on `tag`
    pub fn holder_count(&self, tag: LockTag) -> usize {
        self.table().locks.get(&tag).map_or(0, |grants| grants.len())
    }
}

#[cfg(test)]
#[path = "manager_tests.rs"]
mod tests;
