// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! WAL-backed partition registry
//!
//! Every change is validated against the materialized state, appended to the
//! WAL, and only then applied in memory. A registration is therefore either
//! fully durable or not visible at all.

use crate::operation::RegistryOp;
use crate::state::{CatalogEntry, MaterializedCatalog};
use crate::wal::{Wal, WalError};
use async_trait::async_trait;
use partix_core::{
    CreationError, DatabaseId, Interval, PartRelationInfo, PartType, PartitionConfig,
    PartitionRegistry, RegistryError, RelationError, RelId,
};
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Mutex;

/// First relation id handed out to partitions
pub const FIRST_CHILD_ID: u32 = 16384;

struct CatalogInner {
    wal: Option<Wal>,
    state: MaterializedCatalog,
    next_child: u32,
    /// Allocated ids handed back unused, reissued lowest first
    released: BTreeSet<u32>,
}

impl CatalogInner {
    fn persist(&mut self, op: RegistryOp) -> Result<(), WalError> {
        if let Some(wal) = self.wal.as_mut() {
            let seq = wal.append(&op)?;
            tracing::trace!(seq, parent = %op.parent(), "logged registry op");
        }
        self.state.apply(&op);
        Ok(())
    }
}

/// Partition registry persisted in a write-ahead log
pub struct Catalog {
    inner: Mutex<CatalogInner>,
}

impl Catalog {
    /// Open the catalog at `path`, replaying any existing log
    ///
    /// Fails with [`WalError::Locked`] while another catalog has the same
    /// log open. The lock is released when the catalog is dropped.
    pub fn open(path: &Path) -> Result<Self, WalError> {
        let wal = Wal::open(path)?;
        let ops = Wal::replay(path)?;
        let mut state = MaterializedCatalog::default();
        for op in &ops {
            state.apply(op);
        }
        tracing::debug!(path = %path.display(), ops = ops.len(), "opened catalog");
        Ok(Self::with_state(Some(wal), state))
    }

    /// Catalog that keeps everything in memory
    pub fn in_memory() -> Self {
        Self::with_state(None, MaterializedCatalog::default())
    }

    fn with_state(wal: Option<Wal>, state: MaterializedCatalog) -> Self {
        let next_child = state
            .max_relid
            .map_or(FIRST_CHILD_ID, |max| max.0.saturating_add(1).max(FIRST_CHILD_ID));
        Self {
            inner: Mutex::new(CatalogInner {
                wal,
                state,
                next_child,
                released: BTreeSet::new(),
            }),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, CatalogInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Registry row of `parent` and its partitions
    pub fn entry(&self, parent: RelId) -> Option<CatalogEntry> {
        self.lock().state.get(parent).cloned()
    }

    /// Managed parents of `database`
    pub fn parents(&self, database: DatabaseId) -> Vec<RelId> {
        self.lock()
            .state
            .configs(database)
            .into_iter()
            .map(|config| config.parent)
            .collect()
    }
}

fn storage(e: WalError) -> String {
    e.to_string()
}

#[async_trait]
impl PartitionRegistry for Catalog {
    async fn load_config(&self, database: DatabaseId) -> Result<Vec<PartitionConfig>, RegistryError> {
        Ok(self.lock().state.configs(database))
    }

    async fn load_partition_descriptors(
        &self,
        parent: RelId,
    ) -> Result<PartRelationInfo, RegistryError> {
        let inner = self.lock();
        let entry = inner
            .state
            .get(parent)
            .ok_or(RegistryError::UnknownParent(parent))?;
        entry.descriptor()
    }

    async fn add_config(&self, config: PartitionConfig) -> Result<(), RegistryError> {
        let mut inner = self.lock();
        if inner.state.uses_relid(config.parent) {
            return Err(RegistryError::AlreadyPartitioned(config.parent));
        }
        if let (PartType::Range, Some(interval)) = (config.part_type, &config.interval) {
            interval
                .validate(config.key_type)
                .map_err(|e| RegistryError::Relation(RelationError::Interval(e)))?;
        }
        inner
            .persist(RegistryOp::config_added(&config))
            .map_err(|e| RegistryError::Storage(storage(e)))?;
        tracing::info!(parent = %config.parent, part_type = %config.part_type, "added partitioning config");
        Ok(())
    }

    async fn remove_config(&self, parent: RelId) -> Result<(), RegistryError> {
        let mut inner = self.lock();
        if inner.state.get(parent).is_none() {
            return Err(RegistryError::UnknownParent(parent));
        }
        inner
            .persist(RegistryOp::ConfigRemoved { parent })
            .map_err(|e| RegistryError::Storage(storage(e)))?;
        tracing::info!(%parent, "removed partitioning config");
        Ok(())
    }

    async fn next_child_id(&self) -> Result<RelId, RegistryError> {
        let mut inner = self.lock();
        while let Some(id) = inner.released.pop_first() {
            if !inner.state.uses_relid(RelId(id)) {
                return Ok(RelId(id));
            }
        }
        loop {
            let candidate = RelId(inner.next_child);
            inner.next_child = inner
                .next_child
                .checked_add(1)
                .ok_or_else(|| RegistryError::Storage("relation ids exhausted".to_string()))?;
            if !inner.state.uses_relid(candidate) {
                return Ok(candidate);
            }
        }
    }

    async fn release_child_id(&self, child: RelId) {
        let mut inner = self.lock();
        if child.0 < inner.next_child && !inner.state.uses_relid(child) {
            inner.released.insert(child.0);
        }
    }

    async fn register_partition(
        &self,
        parent: RelId,
        interval: Interval,
        child: RelId,
    ) -> Result<(), CreationError> {
        let mut inner = self.lock();
        inner.state.check_range(parent, &interval, child)?;
        inner
            .persist(RegistryOp::PartitionCreated {
                parent,
                child,
                min: interval.min.clone(),
                max: interval.max.clone(),
            })
            .map_err(|e| CreationError::Storage(storage(e)))?;
        tracing::debug!(%parent, %child, %interval, "registered partition");
        Ok(())
    }

    async fn register_hash_partition(
        &self,
        parent: RelId,
        child: RelId,
    ) -> Result<(), CreationError> {
        let mut inner = self.lock();
        inner.state.check_hash(parent, child)?;
        inner
            .persist(RegistryOp::HashPartitionCreated { parent, child })
            .map_err(|e| CreationError::Storage(storage(e)))?;
        tracing::debug!(%parent, %child, "registered hash partition");
        Ok(())
    }
}

#[cfg(test)]
#[path = "catalog_tests.rs"]
mod tests;
