// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Relation locking
//!
//! A small lock manager with the usual eight relation lock strengths, plus
//! the transaction helpers partition creation relies on.

mod manager;
mod mode;
mod xact;

pub use manager::{AcquireOutcome, LockManager, XactId};
pub use mode::{LockMode, LockTag};
pub use xact::{IsolationLevel, Transaction};
