// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Materialized registry state from WAL replay

use crate::operation::RegistryOp;
use partix_core::{
    CreationError, DatabaseId, Interval, PartRelationInfo, PartType, PartitionConfig, RangeEntry,
    RegistryError, RelId,
};
use std::collections::BTreeMap;

/// A partitioned relation and its partitions
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogEntry {
    pub config: PartitionConfig,
    /// Range partitions in registration order
    pub ranges: Vec<RangeEntry>,
    /// Hash buckets; bucket `i` is `hash_children[i]`
    pub hash_children: Vec<RelId>,
}

impl CatalogEntry {
    fn new(config: PartitionConfig) -> Self {
        Self {
            config,
            ranges: Vec::new(),
            hash_children: Vec::new(),
        }
    }

    /// Build the cache descriptor for this relation
    pub fn descriptor(&self) -> Result<PartRelationInfo, RegistryError> {
        let config = &self.config;
        let info = match config.part_type {
            PartType::Range => PartRelationInfo::new_range(
                config.parent,
                config.key_column.clone(),
                config.key_type,
                self.ranges.clone(),
                config.interval,
            )?,
            PartType::Hash => PartRelationInfo::new_hash(
                config.parent,
                config.key_column.clone(),
                config.key_type,
                self.hash_children.clone(),
            )?,
        };
        Ok(info)
    }

    fn children(&self) -> impl Iterator<Item = RelId> + '_ {
        self.ranges
            .iter()
            .map(|re| re.child)
            .chain(self.hash_children.iter().copied())
    }
}

/// Materialized state built from registry operations
#[derive(Debug, Default)]
pub struct MaterializedCatalog {
    pub relations: BTreeMap<RelId, CatalogEntry>,
    /// Highest relation id ever seen, including removed ones
    pub max_relid: Option<RelId>,
}

impl MaterializedCatalog {
    pub fn get(&self, parent: RelId) -> Option<&CatalogEntry> {
        self.relations.get(&parent)
    }

    /// Configuration rows belonging to `database`
    pub fn configs(&self, database: DatabaseId) -> Vec<PartitionConfig> {
        self.relations
            .values()
            .filter(|entry| entry.config.database == database)
            .map(|entry| entry.config.clone())
            .collect()
    }

    /// True when `relid` is a managed parent or one of its partitions
    pub fn uses_relid(&self, relid: RelId) -> bool {
        self.relations.contains_key(&relid)
            || self
                .relations
                .values()
                .any(|entry| entry.children().any(|child| child == relid))
    }

    /// Check a range partition can be registered as-is
    pub fn check_range(
        &self,
        parent: RelId,
        interval: &Interval,
        child: RelId,
    ) -> Result<(), CreationError> {
        let entry = self
            .relations
            .get(&parent)
            .ok_or(CreationError::UnknownParent(parent))?;
        if entry.config.part_type != PartType::Range {
            return Err(CreationError::NotRangePartitioned(parent));
        }
        for bound in [&interval.min, &interval.max] {
            bound
                .check_type(entry.config.key_type)
                .map_err(|e| CreationError::InvalidBound {
                    parent,
                    reason: e.to_string(),
                })?;
        }
        if interval.min >= interval.max {
            return Err(CreationError::InvalidBound {
                parent,
                reason: format!("empty interval {interval}"),
            });
        }
        if self.uses_relid(child) {
            return Err(CreationError::DuplicateChild(child));
        }
        if let Some(existing) = entry
            .ranges
            .iter()
            .find(|re| re.interval().overlaps(interval))
        {
            return Err(CreationError::Overlap {
                parent,
                existing: existing.child,
            });
        }
        Ok(())
    }

    /// Check a hash bucket can be appended
    pub fn check_hash(&self, parent: RelId, child: RelId) -> Result<(), CreationError> {
        let entry = self
            .relations
            .get(&parent)
            .ok_or(CreationError::UnknownParent(parent))?;
        if entry.config.part_type != PartType::Hash {
            return Err(CreationError::NotHashPartitioned(parent));
        }
        if self.uses_relid(child) {
            return Err(CreationError::DuplicateChild(child));
        }
        Ok(())
    }

    fn observe(&mut self, relid: RelId) {
        if self.max_relid.is_none_or(|max| relid > max) {
            self.max_relid = Some(relid);
        }
    }

    /// Apply an operation to update the state
    ///
    /// Operations on unknown parents are ignored; validation happens before
    /// an operation is logged.
    pub fn apply(&mut self, op: &RegistryOp) {
        match op {
            RegistryOp::ConfigAdded {
                database,
                parent,
                key_column,
                key_type,
                part_type,
                interval,
            } => {
                self.observe(*parent);
                let config = PartitionConfig {
                    database: *database,
                    parent: *parent,
                    key_column: key_column.clone(),
                    key_type: *key_type,
                    part_type: *part_type,
                    interval: *interval,
                };
                self.relations.insert(*parent, CatalogEntry::new(config));
            }

            RegistryOp::PartitionCreated {
                parent,
                child,
                min,
                max,
            } => {
                self.observe(*child);
                if let Some(entry) = self.relations.get_mut(parent) {
                    entry
                        .ranges
                        .push(RangeEntry::new(min.clone(), max.clone(), *child));
                }
            }

            RegistryOp::HashPartitionCreated { parent, child } => {
                self.observe(*child);
                if let Some(entry) = self.relations.get_mut(parent) {
                    entry.hash_children.push(*child);
                }
            }

            RegistryOp::ConfigRemoved { parent } => {
                self.relations.remove(parent);
            }
        }
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
