// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! partix-storage: durable partition registry
//!
//! Registry changes are appended to a JSON-lines write-ahead log and folded
//! into a [`MaterializedCatalog`] on replay.

mod catalog;
mod operation;
mod state;
mod wal;

pub use catalog::{Catalog, FIRST_CHILD_ID};
pub use operation::RegistryOp;
pub use state::{CatalogEntry, MaterializedCatalog};
pub use wal::{Wal, WalError};
