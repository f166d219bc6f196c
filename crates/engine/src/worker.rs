// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Isolated partition creation
//!
//! Runs creation in its own read-committed transaction on a spawned task.
//! The worker joins the caller's lock group, so locks the caller already holds
//! on the parent do not block it, and it commits on its own: the partition
//! survives even if the caller later aborts.

use crate::error::EngineError;
use crate::orchestrator::{CreationOutcome, Orchestrator};
use partix_core::{IsolationLevel, RelId, Transaction, Value};
use tracing::Instrument;

/// Create the partition for `value` in a worker transaction and wait for it
pub async fn create_partitions_isolated(
    orchestrator: Orchestrator,
    caller: &Transaction,
    parent: RelId,
    value: Value,
) -> Result<CreationOutcome, EngineError> {
    let worker_xact = Transaction::begin_in_group(caller, IsolationLevel::ReadCommitted);
    let span = tracing::info_span!("partition.worker", xact = %worker_xact.id());

    let handle = tokio::spawn(
        async move {
            let result = orchestrator
                .create_partitions_internal(&worker_xact, parent, &value)
                .await;
            match &result {
                Ok(_) => worker_xact.commit(),
                Err(e) => {
                    tracing::warn!(error = %e, "partition worker aborting");
                    worker_xact.abort();
                }
            }
            result
        }
        .instrument(span),
    );

    handle
        .await
        .map_err(|e| EngineError::WorkerFailed(e.to_string()))?
}
