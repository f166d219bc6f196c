// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared partitioning state
//!
//! Holds the published [`PartRelationInfo`] of every partitioned relation,
//! grouped per database. Readers load descriptors without locking; writers
//! swap in a new descriptor while holding the database's edit lock.
//!
//! Lock order: `init_lock`, then a database's `load_config_lock`, then its
//! `edit_partitions_lock`.

use crate::error::{RegistryError, StateError};
use crate::registry::PartitionRegistry;
use crate::relation::{DatabaseId, PartRelationInfo, RelId};
use arc_swap::ArcSwap;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use tokio::sync::{Mutex, MutexGuard};

/// Process-wide coordination state, created once by the host
#[derive(Debug, Default)]
pub struct SharedState {
    init_lock: Mutex<()>,
    databases: RwLock<HashMap<DatabaseId, Arc<DatabaseCache>>>,
    shut_down: AtomicBool,
}

impl SharedState {
    pub fn new() -> Self {
        Self::default()
    }

    fn check_open(&self) -> Result<(), StateError> {
        if self.shut_down.load(Ordering::Acquire) {
            return Err(StateError::ShutDown);
        }
        Ok(())
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::Acquire)
    }

    /// Cache of `database`, created on first use
    pub async fn database(&self, database: DatabaseId) -> Result<Arc<DatabaseCache>, StateError> {
        self.check_open()?;
        if let Some(cache) = self.lookup(database) {
            return Ok(cache);
        }

        let _init = self.init_lock.lock().await;
        self.check_open()?;
        let mut databases = self.databases.write().unwrap_or_else(|e| e.into_inner());
        let cache = databases
            .entry(database)
            .or_insert_with(|| {
                tracing::debug!(%database, "initialized partition cache");
                Arc::new(DatabaseCache::new(database))
            })
            .clone();
        Ok(cache)
    }

    fn lookup(&self, database: DatabaseId) -> Option<Arc<DatabaseCache>> {
        self.databases
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&database)
            .cloned()
    }

    /// Rebuild every descriptor of `database` from the registry
    pub async fn reload(
        &self,
        database: DatabaseId,
        registry: &dyn PartitionRegistry,
    ) -> Result<Arc<DatabaseCache>, StateError> {
        let cache = self.database(database).await?;
        cache.reload(registry).await?;
        self.check_open()?;
        Ok(cache)
    }

    /// Mark the state closed and drop every cache
    pub fn shutdown(&self) {
        self.shut_down.store(true, Ordering::Release);
        self.databases
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
        tracing::info!("partitioning state shut down");
    }
}

/// Published descriptors of one database
#[derive(Debug)]
pub struct DatabaseCache {
    database: DatabaseId,
    load_config_lock: Mutex<()>,
    edit_partitions_lock: Mutex<()>,
    relations: RwLock<HashMap<RelId, Arc<ArcSwap<PartRelationInfo>>>>,
    loaded: AtomicBool,
}

impl DatabaseCache {
    fn new(database: DatabaseId) -> Self {
        Self {
            database,
            load_config_lock: Mutex::new(()),
            edit_partitions_lock: Mutex::new(()),
            relations: RwLock::new(HashMap::new()),
            loaded: AtomicBool::new(false),
        }
    }

    pub fn database(&self) -> DatabaseId {
        self.database
    }

    /// True once the configuration has been loaded from the registry
    pub fn is_loaded(&self) -> bool {
        self.loaded.load(Ordering::Acquire)
    }

    /// Current descriptor of `parent`, if it is partitioned
    pub fn get(&self, parent: RelId) -> Option<Arc<PartRelationInfo>> {
        self.relations
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&parent)
            .map(|slot| slot.load_full())
    }

    /// Partitioned relations known to this cache, in id order
    pub fn relations(&self) -> Vec<RelId> {
        let mut relids: Vec<RelId> = self
            .relations
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .keys()
            .copied()
            .collect();
        relids.sort();
        relids
    }

    /// Take the edit-partitions lock; publication goes through the guard
    pub async fn edit(&self) -> EditGuard<'_> {
        EditGuard {
            cache: self,
            _lock: self.edit_partitions_lock.lock().await,
        }
    }

    /// Replace the cached descriptors with the registry's current view
    ///
    /// The registry is read under the edit lock, so a partition published by
    /// a concurrent creation is never replaced by an older snapshot.
    pub async fn reload(&self, registry: &dyn PartitionRegistry) -> Result<usize, RegistryError> {
        let _load = self.load_config_lock.lock().await;
        let edit = self.edit().await;
        let configs = registry.load_config(self.database).await?;
        let mut fresh = Vec::with_capacity(configs.len());
        for config in &configs {
            fresh.push(registry.load_partition_descriptors(config.parent).await?);
        }

        let keep: Vec<RelId> = fresh.iter().map(|info| info.parent).collect();
        for stale in self.relations().into_iter().filter(|r| !keep.contains(r)) {
            edit.remove(stale);
        }
        let count = fresh.len();
        for info in fresh {
            edit.publish(info);
        }
        self.loaded.store(true, Ordering::Release);
        tracing::debug!(database = %self.database, relations = count, "loaded partitioning config");
        Ok(count)
    }
}

/// Proof of holding a database's edit-partitions lock
pub struct EditGuard<'a> {
    cache: &'a DatabaseCache,
    _lock: MutexGuard<'a, ()>,
}

impl EditGuard<'_> {
    /// Swap in `info` as the current descriptor of its parent
    ///
    /// The published version is one past the replaced descriptor's.
    pub fn publish(&self, mut info: PartRelationInfo) -> Arc<PartRelationInfo> {
        let parent = info.parent;
        let mut relations = self
            .cache
            .relations
            .write()
            .unwrap_or_else(|e| e.into_inner());
        let published = match relations.get(&parent) {
            Some(slot) => {
                info.version = slot.load().version + 1;
                let published = Arc::new(info);
                slot.store(Arc::clone(&published));
                published
            }
            None => {
                info.version = 1;
                let published = Arc::new(info);
                relations.insert(parent, Arc::new(ArcSwap::new(Arc::clone(&published))));
                published
            }
        };
        tracing::info!(
            database = %self.cache.database,
            %parent,
            version = published.version,
            partitions = published.nparts(),
            "published partitions"
        );
        published
    }

    /// Evict `parent`; false if it was not cached
    pub fn remove(&self, parent: RelId) -> bool {
        self.cache
            .relations
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&parent)
            .is_some()
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
