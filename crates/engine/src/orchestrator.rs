// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Partition creation orchestration
//!
//! When an insert finds no partition for its key, the orchestrator decides
//! whether the creating transaction can do the work itself or has to hand it
//! to an isolated worker, then creates the partition under the relation's
//! edit lock. Creation is idempotent: the search is repeated after the lock
//! is taken, and a partition created by someone else in the meantime is
//! adopted instead of duplicated.

use crate::error::{EngineError, PolicyError};
use crate::runtime::Context;
use crate::worker;
use partix_core::{
    search_range_partition, CreationError, PartRelationInfo, PartType, RelId, SearchMiss,
    SearchOutcome, Transaction, Value,
};
use std::fmt;
use std::sync::Arc;
use tracing::Instrument;

/// Where a partition gets created
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CreationPath {
    /// In the transaction that found the missing partition
    Inline,
    /// In a separate, independently committed worker transaction
    Isolated,
}

impl fmt::Display for CreationPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CreationPath::Inline => f.write_str("inline"),
            CreationPath::Isolated => f.write_str("isolated"),
        }
    }
}

/// Phase of one creation event
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CreationPhase {
    /// An insert walk found no owning partition
    Detected { miss: SearchMiss },
    Deciding,
    CreatingInline,
    CreatingIsolated,
    /// The value now has an owner; `created` is false when another session won
    Registered { child: RelId, created: bool },
    Failed { reason: String },
}

impl CreationPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            CreationPhase::Registered { .. } | CreationPhase::Failed { .. }
        )
    }

    /// Pure transition function - returns new phase and effects
    ///
    /// Inputs that do not apply to the current phase leave it unchanged and
    /// produce no effects.
    pub fn transition(&self, input: CreationInput) -> (CreationPhase, Vec<CreationEffect>) {
        match (self, input) {
            (CreationPhase::Detected { .. }, CreationInput::Decide) => {
                (CreationPhase::Deciding, vec![])
            }

            (CreationPhase::Deciding, CreationInput::Decided(CreationPath::Inline)) => {
                (CreationPhase::CreatingInline, vec![CreationEffect::RunInline])
            }

            (CreationPhase::Deciding, CreationInput::Decided(CreationPath::Isolated)) => {
                (CreationPhase::CreatingIsolated, vec![CreationEffect::SpawnIsolated])
            }

            (
                CreationPhase::CreatingInline | CreationPhase::CreatingIsolated,
                CreationInput::Created { child, created },
            ) => (
                CreationPhase::Registered { child, created },
                vec![CreationEffect::Completed {
                    child,
                    adopted: !created,
                }],
            ),

            (phase, CreationInput::Fail { reason }) if !phase.is_terminal() => (
                CreationPhase::Failed {
                    reason: reason.clone(),
                },
                vec![CreationEffect::Aborted { reason }],
            ),

            (phase, _) => (phase.clone(), vec![]),
        }
    }
}

impl fmt::Display for CreationPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CreationPhase::Detected { .. } => f.write_str("detected"),
            CreationPhase::Deciding => f.write_str("deciding"),
            CreationPhase::CreatingInline => f.write_str("creating_inline"),
            CreationPhase::CreatingIsolated => f.write_str("creating_isolated"),
            CreationPhase::Registered { .. } => f.write_str("registered"),
            CreationPhase::Failed { .. } => f.write_str("failed"),
        }
    }
}

/// Inputs that drive a creation event
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CreationInput {
    Decide,
    Decided(CreationPath),
    Created { child: RelId, created: bool },
    Fail { reason: String },
}

/// Work requested by a transition
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CreationEffect {
    RunInline,
    SpawnIsolated,
    Completed { child: RelId, adopted: bool },
    Aborted { reason: String },
}

/// Outcome of a creation attempt under the relation edit lock
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CreationOutcome {
    pub child: RelId,
    /// False when the partition already existed after the re-check
    pub created: bool,
}

/// Inline creation is only safe in a read-committed transaction that holds
/// nothing on the parent that partition creation would conflict with.
pub fn decide_path(spawn_using_worker: bool, xact: &Transaction, parent: RelId) -> CreationPath {
    if !spawn_using_worker {
        return CreationPath::Inline;
    }
    if xact.is_isolation_read_committed() && !xact.has_conflicting_lock(parent) {
        CreationPath::Inline
    } else {
        CreationPath::Isolated
    }
}

/// Drives partition creation for missing keys
#[derive(Clone)]
pub struct Orchestrator {
    ctx: Arc<Context>,
}

impl Orchestrator {
    pub(crate) fn new(ctx: Arc<Context>) -> Self {
        Self { ctx }
    }

    /// Make sure a partition of `parent` owns `value`, creating one if needed
    pub async fn ensure_partition(
        &self,
        xact: &Transaction,
        parent: RelId,
        value: &Value,
        miss: SearchMiss,
    ) -> Result<RelId, EngineError> {
        let span = tracing::info_span!("partition.ensure", %parent, %value, xact = %xact.id());
        self.run_event(xact, parent, value, miss).instrument(span).await
    }

    async fn run_event(
        &self,
        xact: &Transaction,
        parent: RelId,
        value: &Value,
        miss: SearchMiss,
    ) -> Result<RelId, EngineError> {
        let phase = CreationPhase::Detected { miss };
        let (phase, _) = phase.transition(CreationInput::Decide);

        let path = decide_path(self.ctx.config.spawn_using_worker, xact, parent);
        tracing::debug!(%path, ?miss, "creating partition");
        let (phase, effects) = phase.transition(CreationInput::Decided(path));

        let mut result = Err(EngineError::InvalidTransition(phase.to_string()));
        for effect in effects {
            result = match effect {
                CreationEffect::RunInline => self.create_partitions_internal(xact, parent, value).await,
                CreationEffect::SpawnIsolated => {
                    worker::create_partitions_isolated(self.clone(), xact, parent, value.clone())
                        .await
                }
                _ => continue,
            };
        }

        let input = match &result {
            Ok(outcome) => CreationInput::Created {
                child: outcome.child,
                created: outcome.created,
            },
            Err(e) => CreationInput::Fail {
                reason: e.to_string(),
            },
        };
        let (_, effects) = phase.transition(input);
        for effect in effects {
            match effect {
                CreationEffect::Completed { child, adopted } => {
                    tracing::debug!(%child, adopted, "partition ready");
                    return Ok(child);
                }
                CreationEffect::Aborted { reason } => {
                    tracing::error!(%reason, "partition creation failed");
                }
                _ => {}
            }
        }
        result.map(|outcome| outcome.child)
    }

    /// Create the partition(s) for `value` while holding the relation edit lock
    ///
    /// The lock is released before returning, whatever the outcome.
    pub async fn create_partitions_internal(
        &self,
        xact: &Transaction,
        parent: RelId,
        value: &Value,
    ) -> Result<CreationOutcome, EngineError> {
        if let Err(e) = xact.lock_partitioned_relation(parent).await {
            tracing::warn!(error = %e, "could not lock partitioned relation");
            return Err(e.into());
        }
        let result = self.create_locked(xact, parent, value).await;
        xact.unlock_partitioned_relation(parent);
        result
    }

    async fn create_locked(
        &self,
        xact: &Transaction,
        parent: RelId,
        value: &Value,
    ) -> Result<CreationOutcome, EngineError> {
        let registry = &self.ctx.deps.registry;
        let fresh = registry.load_partition_descriptors(parent).await?;
        if fresh.part_type() != PartType::Range {
            return Err(PolicyError::NotRange(parent).into());
        }
        value.check_type(fresh.key_type)?;

        let miss = match search(value, &fresh) {
            SearchOutcome::Found(index) => {
                tracing::debug!("concurrent creation lost; adopting existing partition");
                let child = self.adopt(xact, fresh, index).await?;
                return Ok(CreationOutcome {
                    child,
                    created: false,
                });
            }
            SearchOutcome::Gap => SearchMiss::Gap,
            SearchOutcome::OutOfRange => SearchMiss::OutOfRange,
        };

        let planned = self.ctx.deps.policy.plan(value, &fresh, miss)?;
        let mut created = 0;
        for interval in planned {
            let child = registry.next_child_id().await?;
            match registry
                .register_partition(parent, interval.clone(), child)
                .await
            {
                Ok(()) => {
                    tracing::info!(%child, %interval, "created partition");
                    created += 1;
                }
                Err(CreationError::Overlap { existing, .. }) => {
                    tracing::debug!(%existing, %interval, "interval already covered");
                    registry.release_child_id(child).await;
                }
                Err(e) => return Err(e.into()),
            }
        }

        let cache = self.ctx.deps.state.database(xact.database()).await?;
        let edit = cache.edit().await;
        let info = registry.load_partition_descriptors(parent).await?;
        let published = edit.publish(info);
        drop(edit);
        match search(value, &published) {
            SearchOutcome::Found(index) => {
                let child = published
                    .child_at(index)
                    .ok_or(EngineError::Unroutable(parent))?;
                Ok(CreationOutcome {
                    child,
                    created: created > 0,
                })
            }
            SearchOutcome::Gap | SearchOutcome::OutOfRange => Err(PolicyError::DoesNotCover {
                value: value.to_string(),
            }
            .into()),
        }
    }

    /// Use the partition someone else created, refreshing a stale cache entry
    async fn adopt(
        &self,
        xact: &Transaction,
        fresh: PartRelationInfo,
        index: usize,
    ) -> Result<RelId, EngineError> {
        let parent = fresh.parent;
        let child = fresh.child_at(index).ok_or(EngineError::Unroutable(parent))?;
        let cache = self.ctx.deps.state.database(xact.database()).await?;
        let stale = cache
            .get(parent)
            .is_none_or(|cached| cached.ranges() != fresh.ranges());
        if stale {
            cache.edit().await.publish(fresh);
        }
        Ok(child)
    }
}

fn search(value: &Value, info: &PartRelationInfo) -> SearchOutcome {
    search_range_partition(value, info.comparator(), info.ranges())
}

#[cfg(test)]
#[path = "orchestrator_tests.rs"]
mod tests;
