// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Sets of partition positions stored as inclusive index ranges

use std::fmt;

/// Inclusive range of partition positions `[lower, upper]`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IndexRange {
    pub lower: usize,
    pub upper: usize,
}

impl IndexRange {
    pub fn new(lower: usize, upper: usize) -> Self {
        Self {
            lower: lower.min(upper),
            upper: lower.max(upper),
        }
    }

    pub fn len(&self) -> usize {
        self.upper - self.lower + 1
    }

    pub fn contains(&self, index: usize) -> bool {
        self.lower <= index && index <= self.upper
    }
}

/// Normalized set of partition positions
///
/// Ranges are kept sorted, disjoint and non-adjacent, so two sets holding the
/// same positions always compare equal.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RangeSet {
    ranges: Vec<IndexRange>,
}

impl RangeSet {
    pub fn empty() -> Self {
        Self { ranges: Vec::new() }
    }

    /// Every position of a relation with `nparts` partitions
    pub fn complete(nparts: usize) -> Self {
        match nparts {
            0 => Self::empty(),
            n => Self::span(0, n - 1),
        }
    }

    pub fn single(index: usize) -> Self {
        Self::span(index, index)
    }

    pub fn span(lower: usize, upper: usize) -> Self {
        Self {
            ranges: vec![IndexRange::new(lower, upper)],
        }
    }

    pub fn from_indices(indices: impl IntoIterator<Item = usize>) -> Self {
        Self::normalize(
            indices
                .into_iter()
                .map(|index| IndexRange::new(index, index))
                .collect(),
        )
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Number of positions in the set
    pub fn len(&self) -> usize {
        self.ranges.iter().map(IndexRange::len).sum()
    }

    pub fn contains(&self, index: usize) -> bool {
        self.ranges.iter().any(|range| range.contains(index))
    }

    pub fn ranges(&self) -> &[IndexRange] {
        &self.ranges
    }

    pub fn first(&self) -> Option<usize> {
        self.ranges.first().map(|range| range.lower)
    }

    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.ranges.iter().flat_map(|range| range.lower..=range.upper)
    }

    pub fn union(&self, other: &RangeSet) -> RangeSet {
        let mut ranges = self.ranges.clone();
        ranges.extend_from_slice(&other.ranges);
        Self::normalize(ranges)
    }

    pub fn intersect(&self, other: &RangeSet) -> RangeSet {
        let mut out = Vec::new();
        let (mut i, mut j) = (0, 0);
        while let (Some(a), Some(b)) = (self.ranges.get(i), other.ranges.get(j)) {
            let lower = a.lower.max(b.lower);
            let upper = a.upper.min(b.upper);
            if lower <= upper {
                out.push(IndexRange { lower, upper });
            }
            if a.upper < b.upper {
                i += 1;
            } else {
                j += 1;
            }
        }
        Self { ranges: out }
    }

    fn normalize(mut ranges: Vec<IndexRange>) -> RangeSet {
        ranges.sort_by_key(|range| range.lower);
        let mut merged: Vec<IndexRange> = Vec::with_capacity(ranges.len());
        for range in ranges {
            match merged.last_mut() {
                Some(last) if range.lower <= last.upper.saturating_add(1) => {
                    last.upper = last.upper.max(range.upper);
                }
                _ => merged.push(range),
            }
        }
        RangeSet { ranges: merged }
    }
}

impl fmt::Display for RangeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (n, range) in self.ranges.iter().enumerate() {
            if n > 0 {
                f.write_str(", ")?;
            }
            if range.lower == range.upper {
                write!(f, "{}", range.lower)?;
            } else {
                write!(f, "{}-{}", range.lower, range.upper)?;
            }
        }
        f.write_str("}")
    }
}

#[cfg(test)]
#[path = "rangeset_tests.rs"]
mod tests;
