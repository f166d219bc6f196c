// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Range and hash partition search
//!
//! [`search_range_partition`] is the single answer to "which partition owns
//! this value". Insert routing and pruning both go through it, so they can
//! never disagree about ownership.

use crate::rangeset::RangeSet;
use crate::relation::RangeEntry;
use crate::value::Value;
use std::cmp::Ordering;

/// Result of locating a value in a range sequence
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SearchOutcome {
    /// The partition at this position contains the value
    Found(usize),
    /// The value lies between two partitions
    Gap,
    /// The value is below the first or at/above the last partition
    OutOfRange,
}

impl SearchOutcome {
    pub fn miss(self) -> Option<SearchMiss> {
        match self {
            SearchOutcome::Found(_) => None,
            SearchOutcome::Gap => Some(SearchMiss::Gap),
            SearchOutcome::OutOfRange => Some(SearchMiss::OutOfRange),
        }
    }
}

/// Why no partition owns a value
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SearchMiss {
    Gap,
    OutOfRange,
}

/// Comparison strategy, mirroring a btree operator class
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Strategy {
    Less,
    LessEqual,
    Equal,
    GreaterEqual,
    Greater,
}

impl Strategy {
    /// Strategy for the same comparison with its operands swapped
    pub fn commute(self) -> Self {
        match self {
            Strategy::Less => Strategy::Greater,
            Strategy::LessEqual => Strategy::GreaterEqual,
            Strategy::Equal => Strategy::Equal,
            Strategy::GreaterEqual => Strategy::LessEqual,
            Strategy::Greater => Strategy::Less,
        }
    }
}

/// Partitions that may hold rows matching `key <strategy> value`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Selection {
    pub rangeset: RangeSet,
    /// The searched value itself falls into a coverage hole
    pub found_gap: bool,
    /// Set for equality lookups that matched no partition
    pub miss: Option<SearchMiss>,
}

/// Locate the partition whose `[min, max)` contains `value`. O(log n).
pub fn search_range_partition<F>(value: &Value, cmp: F, ranges: &[RangeEntry]) -> SearchOutcome
where
    F: Fn(&Value, &Value) -> Ordering,
{
    let (Some(first), Some(last)) = (ranges.first(), ranges.last()) else {
        return SearchOutcome::OutOfRange;
    };
    if cmp(value, &first.min) == Ordering::Less || cmp(value, &last.max) != Ordering::Less {
        return SearchOutcome::OutOfRange;
    }

    // Number of entries starting at or before the value; at least one here.
    let starting_before = ranges.partition_point(|re| cmp(&re.min, value) != Ordering::Greater);
    let Some(candidate) = starting_before.checked_sub(1) else {
        return SearchOutcome::OutOfRange;
    };
    match ranges.get(candidate) {
        Some(re) if cmp(value, &re.max) == Ordering::Less => SearchOutcome::Found(candidate),
        _ => SearchOutcome::Gap,
    }
}

/// Select the contiguous run of partitions that can satisfy the comparison
///
/// Boundaries follow the half-open convention: `key >= v` with `v` equal to a
/// partition's `max` starts at the next partition, and `key < v` with `v`
/// equal to a partition's `min` stops before it.
pub fn select_range_partitions<F>(
    value: &Value,
    cmp: F,
    ranges: &[RangeEntry],
    strategy: Strategy,
) -> Selection
where
    F: Fn(&Value, &Value) -> Ordering,
{
    let outcome = search_range_partition(value, &cmp, ranges);
    let found_gap = outcome == SearchOutcome::Gap;

    let rangeset = match strategy {
        Strategy::Equal => match outcome {
            SearchOutcome::Found(index) => RangeSet::single(index),
            SearchOutcome::Gap | SearchOutcome::OutOfRange => RangeSet::empty(),
        },
        Strategy::Less => {
            let count = ranges.partition_point(|re| cmp(&re.min, value) == Ordering::Less);
            prefix(count)
        }
        Strategy::LessEqual => {
            let count = ranges.partition_point(|re| cmp(&re.min, value) != Ordering::Greater);
            prefix(count)
        }
        Strategy::Greater | Strategy::GreaterEqual => {
            let start = ranges.partition_point(|re| cmp(&re.max, value) != Ordering::Greater);
            suffix(start, ranges.len())
        }
    };

    let miss = match strategy {
        Strategy::Equal => outcome.miss(),
        _ => None,
    };

    Selection {
        rangeset,
        found_gap,
        miss,
    }
}

fn prefix(count: usize) -> RangeSet {
    match count {
        0 => RangeSet::empty(),
        n => RangeSet::span(0, n - 1),
    }
}

fn suffix(start: usize, len: usize) -> RangeSet {
    if start >= len {
        RangeSet::empty()
    } else {
        RangeSet::span(start, len - 1)
    }
}

/// Hash of a key value, stable across processes
pub fn hash_value(value: &Value) -> u32 {
    crc32fast::hash(&value.canonical_bytes())
}

/// Map a key hash onto one of `partitions` buckets
pub fn make_hash(hash: u32, partitions: u32) -> u32 {
    hash.checked_rem(partitions).unwrap_or(0)
}

/// Bucket holding `value` in a hash-partitioned relation with `nparts` children
pub fn select_hash_partition(value: &Value, nparts: usize) -> Option<usize> {
    let partitions = u32::try_from(nparts).ok().filter(|n| *n > 0)?;
    usize::try_from(make_hash(hash_value(value), partitions)).ok()
}

#[cfg(test)]
#[path = "search_tests.rs"]
mod tests;
