// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Persistent partition registry interface
//!
//! The registry is the durable record of which relations are partitioned and
//! which partitions exist. Cached descriptors are rebuilt from it.

use crate::error::{CreationError, RegistryError};
use crate::relation::{DatabaseId, Interval, PartRelationInfo, PartType, RelId};
use crate::value::{KeyType, RangeInterval};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One row of the partitioning configuration
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionConfig {
    pub database: DatabaseId,
    pub parent: RelId,
    pub key_column: String,
    pub key_type: KeyType,
    pub part_type: PartType,
    /// Step for automatically created range partitions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval: Option<RangeInterval>,
}

impl PartitionConfig {
    pub fn range(
        database: DatabaseId,
        parent: RelId,
        key_column: impl Into<String>,
        key_type: KeyType,
        interval: Option<RangeInterval>,
    ) -> Self {
        Self {
            database,
            parent,
            key_column: key_column.into(),
            key_type,
            part_type: PartType::Range,
            interval,
        }
    }

    pub fn hash(
        database: DatabaseId,
        parent: RelId,
        key_column: impl Into<String>,
        key_type: KeyType,
    ) -> Self {
        Self {
            database,
            parent,
            key_column: key_column.into(),
            key_type,
            part_type: PartType::Hash,
            interval: None,
        }
    }
}

/// Durable store of partitioning configuration and partitions
#[async_trait]
pub trait PartitionRegistry: Send + Sync {
    /// Configuration rows for every partitioned relation of `database`
    async fn load_config(&self, database: DatabaseId) -> Result<Vec<PartitionConfig>, RegistryError>;

    /// Build a fresh descriptor for `parent` from the persisted state
    async fn load_partition_descriptors(&self, parent: RelId)
        -> Result<PartRelationInfo, RegistryError>;

    async fn add_config(&self, config: PartitionConfig) -> Result<(), RegistryError>;

    /// Forget `parent`'s configuration and partitions
    async fn remove_config(&self, parent: RelId) -> Result<(), RegistryError>;

    /// Allocate an unused relation id for a new partition
    async fn next_child_id(&self) -> Result<RelId, RegistryError>;

    /// Return an id from [`next_child_id`](Self::next_child_id) that was never registered
    async fn release_child_id(&self, _child: RelId) {}

    /// Record a range partition; fails if it would overlap an existing one
    async fn register_partition(
        &self,
        parent: RelId,
        interval: Interval,
        child: RelId,
    ) -> Result<(), CreationError>;

    /// Append a bucket to a hash-partitioned relation
    async fn register_hash_partition(&self, parent: RelId, child: RelId)
        -> Result<(), CreationError>;
}
