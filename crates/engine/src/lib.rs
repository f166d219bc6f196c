// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! partix execution engine: insert routing, pruning and on-demand partition creation

mod config;
mod error;
mod orchestrator;
mod partitioner;
mod policy;
mod pruner;
mod router;
mod runtime;
mod worker;

pub use config::{EngineConfig, DEFAULT_LOCK_TIMEOUT, DEFAULT_MAX_PARTITIONS_PER_EVENT};
pub use error::{EngineError, PolicyError};
pub use orchestrator::{
    decide_path, CreationEffect, CreationInput, CreationOutcome, CreationPath, CreationPhase,
    Orchestrator,
};
pub use partitioner::Partitioner;
pub use policy::{BoundPolicy, IntervalPolicy};
pub use pruner::Pruner;
pub use router::Router;
pub use runtime::{Runtime, RuntimeDeps};
