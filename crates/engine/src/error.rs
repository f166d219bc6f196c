// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the partition engine

use partix_core::{CreationError, LockError, RegistryError, RelId, StateError, ValueError};
use thiserror::Error;

/// Failures of the bound policy
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PolicyError {
    #[error("relation {0} has no range interval to create partitions with")]
    NoInterval(RelId),
    #[error("relation {0} is not range partitioned")]
    NotRange(RelId),
    #[error("covering the value needs more than {limit} new partitions of {parent}")]
    TooManyPartitions { parent: RelId, limit: usize },
    #[error("planned partitions do not cover {value}")]
    DoesNotCover { value: String },
    #[error(transparent)]
    Value(#[from] ValueError),
}

/// Errors that can occur while routing, pruning or creating partitions
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error(transparent)]
    Lock(#[from] LockError),
    #[error("partition creation failed: {0}")]
    Creation(#[from] CreationError),
    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),
    #[error("bound policy error: {0}")]
    Policy(#[from] PolicyError),
    #[error(transparent)]
    State(#[from] StateError),
    #[error(transparent)]
    Value(#[from] ValueError),
    #[error("relation {0} is not partitioned")]
    NotPartitioned(RelId),
    #[error("partitioning is disabled")]
    Disabled,
    #[error("partitioning key must not be NULL")]
    NullKey,
    #[error("no single partition of {0} accepts the row")]
    Unroutable(RelId),
    #[error("relation {0} is being modified concurrently")]
    BeingModified(RelId),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("partition worker failed: {0}")]
    WorkerFailed(String),
    #[error("invalid creation transition from {0}")]
    InvalidTransition(String),
}
