// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Initial partitioning of a relation and removal from management

use crate::error::{EngineError, PolicyError};
use crate::runtime::Context;
use partix_core::{
    Interval, KeyType, PartRelationInfo, PartitionConfig, RangeInterval, RelId, Transaction, Value,
};
use std::sync::Arc;

#[derive(Clone)]
pub struct Partitioner {
    ctx: Arc<Context>,
}

/// Shape of the partitions to set up
enum Layout {
    /// Adjacent intervals, computed before anything is written
    Range {
        ranges: Vec<Interval>,
    },
    Hash {
        count: usize,
    },
}

impl Partitioner {
    pub(crate) fn new(ctx: Arc<Context>) -> Self {
        Self { ctx }
    }

    /// Partition `parent` into `count` consecutive ranges of `interval` from `start`
    ///
    /// With `count == 0` only the configuration is written; the first insert
    /// then creates an aligned partition.
    #[allow(clippy::too_many_arguments)]
    pub async fn create_range_partitions(
        &self,
        xact: &Transaction,
        parent: RelId,
        key_column: &str,
        key_type: KeyType,
        start: Value,
        interval: RangeInterval,
        count: usize,
    ) -> Result<Arc<PartRelationInfo>, EngineError> {
        start.check_type(key_type)?;
        interval.validate(key_type)?;
        self.check_count(parent, count)?;
        let ranges = consecutive_ranges(start, interval, count)?;
        let config = PartitionConfig::range(
            xact.database(),
            parent,
            key_column,
            key_type,
            Some(interval),
        );
        self.partition(xact, config, Layout::Range { ranges }).await
    }

    /// Partition `parent` into `count` hash buckets
    pub async fn create_hash_partitions(
        &self,
        xact: &Transaction,
        parent: RelId,
        key_column: &str,
        key_type: KeyType,
        count: usize,
    ) -> Result<Arc<PartRelationInfo>, EngineError> {
        if count == 0 {
            return Err(EngineError::InvalidArgument(
                "hash partitioning needs at least one partition".to_string(),
            ));
        }
        self.check_count(parent, count)?;
        let config = PartitionConfig::hash(xact.database(), parent, key_column, key_type);
        self.partition(xact, config, Layout::Hash { count }).await
    }

    fn check_count(&self, parent: RelId, count: usize) -> Result<(), EngineError> {
        let limit = self.ctx.config.max_partitions_per_event;
        if count > limit {
            return Err(PolicyError::TooManyPartitions { parent, limit }.into());
        }
        Ok(())
    }

    async fn partition(
        &self,
        xact: &Transaction,
        config: PartitionConfig,
        layout: Layout,
    ) -> Result<Arc<PartRelationInfo>, EngineError> {
        let parent = config.parent;
        xact.lock_partitioned_relation(parent).await?;
        let result = self.partition_locked(xact, config, layout).await;
        xact.unlock_partitioned_relation(parent);
        result
    }

    async fn partition_locked(
        &self,
        xact: &Transaction,
        config: PartitionConfig,
        layout: Layout,
    ) -> Result<Arc<PartRelationInfo>, EngineError> {
        let parent = config.parent;
        if xact.is_relation_being_modified(parent) {
            return Err(EngineError::BeingModified(parent));
        }
        xact.lock_relation_data(parent).await?;
        let result = self.register(config, layout).await;
        xact.unlock_relation_data(parent);
        let info = result?;

        let cache = self.ctx.deps.state.database(xact.database()).await?;
        let published = cache.edit().await.publish(info);
        Ok(published)
    }

    /// Write the configuration and every partition, or nothing
    ///
    /// A registry failure part way through removes the configuration again.
    async fn register(
        &self,
        config: PartitionConfig,
        layout: Layout,
    ) -> Result<PartRelationInfo, EngineError> {
        let registry = &self.ctx.deps.registry;
        let parent = config.parent;
        registry.add_config(config).await?;
        let filled = match layout {
            Layout::Range { ranges } => self.register_ranges(parent, ranges).await,
            Layout::Hash { count } => self.register_buckets(parent, count).await,
        };
        if let Err(e) = filled {
            tracing::warn!(%parent, error = %e, "partitioning failed, removing config");
            if let Err(undo) = registry.remove_config(parent).await {
                tracing::error!(%parent, error = %undo, "could not remove partial config");
            }
            return Err(e);
        }

        tracing::info!(%parent, "partitioned relation");
        Ok(registry.load_partition_descriptors(parent).await?)
    }

    async fn register_ranges(&self, parent: RelId, ranges: Vec<Interval>) -> Result<(), EngineError> {
        let registry = &self.ctx.deps.registry;
        for range in ranges {
            let child = registry.next_child_id().await?;
            if let Err(e) = registry.register_partition(parent, range, child).await {
                registry.release_child_id(child).await;
                return Err(e.into());
            }
        }
        Ok(())
    }

    async fn register_buckets(&self, parent: RelId, count: usize) -> Result<(), EngineError> {
        let registry = &self.ctx.deps.registry;
        for _ in 0..count {
            let child = registry.next_child_id().await?;
            if let Err(e) = registry.register_hash_partition(parent, child).await {
                registry.release_child_id(child).await;
                return Err(e.into());
            }
        }
        Ok(())
    }

    /// Stop managing `parent` and evict it from the cache
    pub async fn drop_config(&self, xact: &Transaction, parent: RelId) -> Result<(), EngineError> {
        xact.lock_partitioned_relation(parent).await?;
        let result = self.drop_locked(xact, parent).await;
        xact.unlock_partitioned_relation(parent);
        result
    }

    async fn drop_locked(&self, xact: &Transaction, parent: RelId) -> Result<(), EngineError> {
        self.ctx.deps.registry.remove_config(parent).await?;
        let cache = self.ctx.deps.state.database(xact.database()).await?;
        cache.edit().await.remove(parent);
        Ok(())
    }
}

/// `count` adjacent intervals of width `interval` starting at `start`
fn consecutive_ranges(
    start: Value,
    interval: RangeInterval,
    count: usize,
) -> Result<Vec<Interval>, EngineError> {
    let mut ranges = Vec::with_capacity(count);
    let mut min = start;
    for _ in 0..count {
        let max = interval.add_to(&min)?;
        ranges.push(Interval::new(min, max.clone()));
        min = max;
    }
    Ok(ranges)
}
