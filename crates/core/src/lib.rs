// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! partix-core: partition descriptors, search, pruning and coordination
//!
//! Everything here is independent of how partitions are stored or created:
//! - typed key values and half-open partition ranges
//! - binary range search and the predicate pruning walker
//! - the relation lock manager and transactions
//! - the shared, versioned cache of published partition descriptors

pub mod error;
pub mod expr;
pub mod lock;
pub mod rangeset;
pub mod registry;
pub mod relation;
pub mod search;
pub mod state;
pub mod value;
pub mod walker;

pub use error::{CreationError, LockError, RegistryError, RelationError, StateError, ValueError};
pub use expr::{CmpOp, ConstEvaluator, Expr, Operand, ParamEvaluator};
pub use lock::{AcquireOutcome, IsolationLevel, LockManager, LockMode, LockTag, Transaction, XactId};
pub use rangeset::{IndexRange, RangeSet};
pub use registry::{PartitionConfig, PartitionRegistry};
pub use relation::{
    DatabaseId, Interval, PartRelationInfo, PartStrategy, PartType, RangeEntry, RelId,
};
pub use search::{
    search_range_partition, select_hash_partition, select_range_partitions, SearchMiss,
    SearchOutcome, Selection, Strategy,
};
pub use state::{DatabaseCache, EditGuard, SharedState};
pub use value::{KeyType, RangeInterval, Value};
pub use walker::{
    prune, walk_expr_tree, InsertTarget, PruneResult, WalkerContext, WrapperNode,
    DEFAULT_UNKNOWN_SELECTIVITY,
};
