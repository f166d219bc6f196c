// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Partitioned relation descriptors
//!
//! A [`PartRelationInfo`] is immutable once built. Changing a relation's
//! partition set means building a new instance and publishing it in place of
//! the old one, so readers holding the previous `Arc` keep a consistent view.

use crate::error::RelationError;
use crate::value::{KeyType, RangeInterval, Value};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

/// Relation identifier (parents and partitions share one id space)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RelId(pub u32);

impl fmt::Display for RelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Database identifier
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DatabaseId(pub u32);

impl fmt::Display for DatabaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Partitioning strategy of a parent relation
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PartType {
    Range,
    Hash,
}

impl fmt::Display for PartType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PartType::Range => f.write_str("range"),
            PartType::Hash => f.write_str("hash"),
        }
    }
}

/// Half-open value interval `[min, max)`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interval {
    pub min: Value,
    pub max: Value,
}

impl Interval {
    pub fn new(min: Value, max: Value) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, value: &Value) -> bool {
        &self.min <= value && value < &self.max
    }

    /// True when the two intervals share at least one point
    pub fn overlaps(&self, other: &Interval) -> bool {
        self.min < other.max && other.min < self.max
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.min, self.max)
    }
}

/// One range partition: its interval and the child relation holding it
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangeEntry {
    pub min: Value,
    pub max: Value,
    pub child: RelId,
}

impl RangeEntry {
    pub fn new(min: Value, max: Value, child: RelId) -> Self {
        Self { min, max, child }
    }

    pub fn from_interval(interval: Interval, child: RelId) -> Self {
        Self {
            min: interval.min,
            max: interval.max,
            child,
        }
    }

    pub fn interval(&self) -> Interval {
        Interval::new(self.min.clone(), self.max.clone())
    }

    pub fn contains(&self, value: &Value) -> bool {
        &self.min <= value && value < &self.max
    }
}

/// Strategy-specific partition layout
#[derive(Clone, Debug, PartialEq)]
pub enum PartStrategy {
    Range {
        ranges: Arc<[RangeEntry]>,
        interval: Option<RangeInterval>,
    },
    Hash {
        children: Arc<[RelId]>,
    },
}

/// Everything the search and pruning code needs to know about one parent
#[derive(Clone, Debug, PartialEq)]
pub struct PartRelationInfo {
    pub parent: RelId,
    pub key_column: String,
    pub key_type: KeyType,
    pub strategy: PartStrategy,
    /// Bumped on every publication of this relation
    pub version: u64,
}

impl PartRelationInfo {
    /// Build a range-partitioned descriptor, sorting and validating `ranges`
    pub fn new_range(
        parent: RelId,
        key_column: impl Into<String>,
        key_type: KeyType,
        ranges: Vec<RangeEntry>,
        interval: Option<RangeInterval>,
    ) -> Result<Self, RelationError> {
        if let Some(interval) = &interval {
            interval
                .validate(key_type)
                .map_err(RelationError::Interval)?;
        }
        let ranges = validate_ranges(key_type, ranges)?;
        Ok(Self {
            parent,
            key_column: key_column.into(),
            key_type,
            strategy: PartStrategy::Range {
                ranges: ranges.into(),
                interval,
            },
            version: 0,
        })
    }

    /// Build a hash-partitioned descriptor; bucket `i` lives in `children[i]`
    pub fn new_hash(
        parent: RelId,
        key_column: impl Into<String>,
        key_type: KeyType,
        children: Vec<RelId>,
    ) -> Result<Self, RelationError> {
        let mut seen = HashSet::new();
        for child in &children {
            if !seen.insert(*child) {
                return Err(RelationError::DuplicateChild(*child));
            }
        }
        Ok(Self {
            parent,
            key_column: key_column.into(),
            key_type,
            strategy: PartStrategy::Hash {
                children: children.into(),
            },
            version: 0,
        })
    }

    pub fn part_type(&self) -> PartType {
        match self.strategy {
            PartStrategy::Range { .. } => PartType::Range,
            PartStrategy::Hash { .. } => PartType::Hash,
        }
    }

    /// Range sequence; empty for hash-partitioned relations
    pub fn ranges(&self) -> &[RangeEntry] {
        match &self.strategy {
            PartStrategy::Range { ranges, .. } => &ranges[..],
            PartStrategy::Hash { .. } => &[],
        }
    }

    pub fn interval(&self) -> Option<RangeInterval> {
        match &self.strategy {
            PartStrategy::Range { interval, .. } => *interval,
            PartStrategy::Hash { .. } => None,
        }
    }

    pub fn nparts(&self) -> usize {
        match &self.strategy {
            PartStrategy::Range { ranges, .. } => ranges.len(),
            PartStrategy::Hash { children } => children.len(),
        }
    }

    /// Child relation at partition position `index`
    pub fn child_at(&self, index: usize) -> Option<RelId> {
        match &self.strategy {
            PartStrategy::Range { ranges, .. } => ranges.get(index).map(|re| re.child),
            PartStrategy::Hash { children } => children.get(index).copied(),
        }
    }

    /// All children in partition order
    pub fn children(&self) -> Vec<RelId> {
        (0..self.nparts())
            .filter_map(|index| self.child_at(index))
            .collect()
    }

    /// Comparator over this relation's key values
    pub fn comparator(&self) -> fn(&Value, &Value) -> Ordering {
        <Value as Ord>::cmp
    }

    /// Rebuild the descriptor with `added` ranges merged in
    pub fn with_ranges_added(&self, added: &[RangeEntry]) -> Result<Self, RelationError> {
        let mut ranges = self.ranges().to_vec();
        ranges.extend_from_slice(added);
        let mut rebuilt = Self::new_range(
            self.parent,
            self.key_column.clone(),
            self.key_type,
            ranges,
            self.interval(),
        )?;
        rebuilt.version = self.version;
        Ok(rebuilt)
    }
}

/// Sort `ranges` by lower bound and check the sequence invariants
pub fn validate_ranges(
    key_type: KeyType,
    mut ranges: Vec<RangeEntry>,
) -> Result<Vec<RangeEntry>, RelationError> {
    let mut seen = HashSet::new();
    for re in &ranges {
        for bound in [&re.min, &re.max] {
            bound
                .check_type(key_type)
                .map_err(|source| RelationError::KeyType {
                    child: re.child,
                    source,
                })?;
        }
        if re.min >= re.max {
            return Err(RelationError::EmptyInterval { child: re.child });
        }
        if !seen.insert(re.child) {
            return Err(RelationError::DuplicateChild(re.child));
        }
    }

    ranges.sort_by(|a, b| a.min.cmp(&b.min));
    for pair in ranges.windows(2) {
        if let [left, right] = pair {
            if right.min < left.max {
                return Err(RelationError::Overlap {
                    left: left.child,
                    right: right.child,
                });
            }
        }
    }
    Ok(ranges)
}

#[cfg(test)]
#[path = "relation_tests.rs"]
mod tests;
