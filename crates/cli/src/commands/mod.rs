// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! CLI command implementations

pub mod drop;
pub mod init;
pub mod prune;
pub mod route;
pub mod show;

use crate::config::CliConfig;
use anyhow::{Context, Result};
use partix_core::{
    DatabaseId, IsolationLevel, KeyType, LockManager, RelId, SharedState, Transaction, Value,
};
use partix_engine::{IntervalPolicy, Runtime, RuntimeDeps};
use partix_storage::Catalog;
use std::sync::Arc;

/// Engine runtime over the on-disk registry
pub struct Env {
    pub runtime: Runtime,
    pub database: DatabaseId,
}

impl Env {
    pub fn open(config: &CliConfig) -> Result<Self> {
        let wal = &config.storage.wal;
        if let Some(dir) = wal.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("creating {}", dir.display()))?;
        }
        let catalog =
            Catalog::open(wal).with_context(|| format!("opening registry {}", wal.display()))?;

        let deps = RuntimeDeps {
            locks: Arc::new(LockManager::new()),
            state: Arc::new(SharedState::new()),
            registry: Arc::new(catalog),
            policy: Arc::new(IntervalPolicy::new(config.engine.max_partitions_per_event)),
        };
        Ok(Self {
            runtime: Runtime::new(deps, config.engine.clone()),
            database: DatabaseId(config.storage.database),
        })
    }

    pub fn begin(&self) -> Transaction {
        self.runtime
            .begin(self.database, IsolationLevel::ReadCommitted)
    }

    /// Key type of a partitioned relation
    pub async fn key_type(&self, parent: RelId) -> Result<KeyType> {
        Ok(self.runtime.relation(self.database, parent).await?.key_type)
    }
}

/// Parse a command-line key literal; `NULL` in any case is the null key
pub fn parse_key(key_type: KeyType, raw: &str) -> Result<Value> {
    if raw.eq_ignore_ascii_case("null") {
        return Ok(Value::Null);
    }
    Ok(key_type.parse_value(raw)?)
}
