// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Transactions and the relation lock helpers used by partition creation

use super::manager::{AcquireOutcome, LockManager, XactId};
use super::mode::{LockMode, LockTag};
use crate::error::LockError;
use crate::relation::{DatabaseId, RelId};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Transaction isolation level, weakest first
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IsolationLevel {
    #[default]
    ReadCommitted,
    RepeatableRead,
    Serializable,
}

/// A unit of work holding relation locks until it ends
///
/// Locks taken through a transaction are released on [`commit`](Self::commit),
/// [`abort`](Self::abort), or drop.
#[derive(Debug)]
pub struct Transaction {
    id: XactId,
    database: DatabaseId,
    isolation: IsolationLevel,
    locks: Arc<LockManager>,
    lock_timeout: Duration,
    finished: bool,
}

impl Transaction {
    pub fn begin(
        locks: Arc<LockManager>,
        database: DatabaseId,
        isolation: IsolationLevel,
        lock_timeout: Duration,
    ) -> Self {
        let id = locks.next_xact_id();
        tracing::trace!(xact = %id, %database, ?isolation, "begin");
        Self {
            id,
            database,
            isolation,
            locks,
            lock_timeout,
            finished: false,
        }
    }

    /// Begin a transaction in `leader`'s lock group
    ///
    /// Its locks never conflict with the leader's, so it can create
    /// partitions while the leader keeps holding its own relation locks.
    pub fn begin_in_group(leader: &Transaction, isolation: IsolationLevel) -> Self {
        let xact = Self::begin(
            Arc::clone(&leader.locks),
            leader.database,
            isolation,
            leader.lock_timeout,
        );
        xact.locks.join_group(xact.id, leader.id);
        xact
    }

    pub fn id(&self) -> XactId {
        self.id
    }

    pub fn database(&self) -> DatabaseId {
        self.database
    }

    pub fn isolation(&self) -> IsolationLevel {
        self.isolation
    }

    pub fn lock_timeout(&self) -> Duration {
        self.lock_timeout
    }

    pub fn lock_manager(&self) -> &Arc<LockManager> {
        &self.locks
    }

    fn tag(&self, relid: RelId) -> LockTag {
        LockTag::relation(self.database, relid)
    }

    /// Blocking lock on `relid`, bounded by the transaction's lock timeout
    pub async fn lock_relation(&self, relid: RelId, mode: LockMode) -> Result<(), LockError> {
        self.locks
            .lock(self.id, self.tag(relid), mode, self.lock_timeout)
            .await
            .map(|_| ())
    }

    pub fn unlock_relation(&self, relid: RelId, mode: LockMode) {
        self.locks.unlock(self.id, self.tag(relid), mode);
    }

    /// Serialize partition-set changes of `relid` against other creators
    pub async fn lock_partitioned_relation(&self, relid: RelId) -> Result<(), LockError> {
        self.lock_relation(relid, LockMode::ShareUpdateExclusive).await
    }

    pub fn unlock_partitioned_relation(&self, relid: RelId) {
        self.unlock_relation(relid, LockMode::ShareUpdateExclusive);
    }

    /// Block concurrent modification of `relid`'s rows
    pub async fn lock_relation_data(&self, relid: RelId) -> Result<(), LockError> {
        self.lock_relation(relid, LockMode::Share).await
    }

    pub fn unlock_relation_data(&self, relid: RelId) {
        self.unlock_relation(relid, LockMode::Share);
    }

    /// Whether this transaction already holds a lock on `relid` that would
    /// conflict with partition creation (ShareUpdateExclusive or stronger)
    ///
    /// Side-effect free: trial grants are released before returning.
    pub fn has_conflicting_lock(&self, relid: RelId) -> bool {
        let tag = self.tag(relid);
        LockMode::ShareUpdateExclusive.at_least().any(|mode| {
            match self.locks.try_lock(self.id, tag, mode) {
                AcquireOutcome::AlreadyHeld => {
                    self.locks.unlock(self.id, tag, mode);
                    true
                }
                AcquireOutcome::Acquired => {
                    self.locks.unlock(self.id, tag, mode);
                    false
                }
                AcquireOutcome::WouldBlock => false,
            }
        })
    }

    /// Whether another transaction is modifying `relid` right now
    pub fn is_relation_being_modified(&self, relid: RelId) -> bool {
        let tag = self.tag(relid);
        match self.locks.try_lock(self.id, tag, LockMode::Exclusive) {
            AcquireOutcome::Acquired | AcquireOutcome::AlreadyHeld => {
                self.locks.unlock(self.id, tag, LockMode::Exclusive);
                false
            }
            AcquireOutcome::WouldBlock => true,
        }
    }

    /// True when the isolation level is read committed or weaker
    pub fn is_isolation_read_committed(&self) -> bool {
        self.isolation <= IsolationLevel::ReadCommitted
    }

    pub fn commit(mut self) {
        tracing::trace!(xact = %self.id, "commit");
        self.finish();
    }

    pub fn abort(mut self) {
        tracing::trace!(xact = %self.id, "abort");
        self.finish();
    }

    fn finish(&mut self) {
        if !self.finished {
            self.finished = true;
            self.locks.release_all(self.id);
        }
    }
}

impl Drop for Transaction {
    fn drop(&mut self) {
        self.finish();
    }
}

#[cfg(test)]
#[path = "xact_tests.rs"]
mod tests;
