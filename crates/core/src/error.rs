// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types shared across the partitioning core

use crate::lock::{LockMode, LockTag};
use crate::relation::RelId;
use crate::value::KeyType;
use std::time::Duration;
use thiserror::Error;

/// Errors raised while parsing, typing or stepping partition key values
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueError {
    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },
    #[error("invalid {key_type} literal: {raw}")]
    Parse { key_type: KeyType, raw: String },
    #[error("invalid interval {raw}: {reason}")]
    InvalidInterval { raw: String, reason: String },
    #[error("stepping {value} by {interval} overflows")]
    Overflow { value: String, interval: String },
}

/// Errors raised when a range sequence violates its ordering invariants
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RelationError {
    #[error("partition {child} has an empty interval")]
    EmptyInterval { child: RelId },
    #[error("partition {right} overlaps partition {left}")]
    Overlap { left: RelId, right: RelId },
    #[error("partition {0} appears more than once")]
    DuplicateChild(RelId),
    #[error("partition {child}: {source}")]
    KeyType {
        child: RelId,
        #[source]
        source: ValueError,
    },
    #[error("range interval does not match key type: {0}")]
    Interval(#[source] ValueError),
}

/// Structural creation failures reported by the registry
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CreationError {
    #[error("invalid bound for {parent}: {reason}")]
    InvalidBound { parent: RelId, reason: String },
    #[error("interval overlaps existing partition {existing} of {parent}")]
    Overlap { parent: RelId, existing: RelId },
    #[error("partition id {0} is already in use")]
    DuplicateChild(RelId),
    #[error("relation {0} is not partitioned")]
    UnknownParent(RelId),
    #[error("relation {0} is not range partitioned")]
    NotRangePartitioned(RelId),
    #[error("relation {0} is not hash partitioned")]
    NotHashPartitioned(RelId),
    #[error("storage error: {0}")]
    Storage(String),
}

/// Failures of the registry's configuration surface
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("relation {0} is not partitioned")]
    UnknownParent(RelId),
    #[error("relation {0} is already partitioned")]
    AlreadyPartitioned(RelId),
    #[error("invalid partition descriptors: {0}")]
    Relation(#[from] RelationError),
    #[error("storage error: {0}")]
    Storage(String),
}

/// Lock manager errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LockError {
    #[error("could not obtain {mode:?} lock on {tag} within {waited:?}")]
    NotAcquired {
        tag: LockTag,
        mode: LockMode,
        waited: Duration,
    },
}

/// Shared coordination state errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateError {
    #[error("shared partitioning state has been shut down")]
    ShutDown,
    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),
}
