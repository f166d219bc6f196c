// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Where new range partitions go
//!
//! A [`BoundPolicy`] turns "no partition owns this value" into the list of
//! intervals to create. The default [`IntervalPolicy`] steps by the relation's
//! configured interval.

use crate::error::PolicyError;
use partix_core::{Interval, PartRelationInfo, PartType, RangeInterval, SearchMiss, Value};

/// Decides the intervals of partitions created for a missing value
pub trait BoundPolicy: Send + Sync {
    /// Intervals to create, ascending, so that one of them contains `value`
    fn plan(
        &self,
        value: &Value,
        info: &PartRelationInfo,
        miss: SearchMiss,
    ) -> Result<Vec<Interval>, PolicyError>;
}

/// Fixed-width partitions aligned on the relation's interval
#[derive(Clone, Debug)]
pub struct IntervalPolicy {
    max_partitions: usize,
}

impl IntervalPolicy {
    pub fn new(max_partitions: usize) -> Self {
        Self { max_partitions }
    }

    fn step(info: &PartRelationInfo) -> Result<RangeInterval, PolicyError> {
        info.interval().ok_or(PolicyError::NoInterval(info.parent))
    }

    fn too_many(&self, info: &PartRelationInfo) -> PolicyError {
        PolicyError::TooManyPartitions {
            parent: info.parent,
            limit: self.max_partitions,
        }
    }

    /// First partition of an empty relation
    fn initial(&self, value: &Value, info: &PartRelationInfo) -> Result<Vec<Interval>, PolicyError> {
        let step = Self::step(info)?;
        let start = match (value, step) {
            (Value::Int(v), RangeInterval::Int(width)) => {
                let start = v
                    .checked_sub(v.rem_euclid(width))
                    .ok_or_else(|| PolicyError::DoesNotCover {
                        value: value.to_string(),
                    })?;
                Value::Int(start)
            }
            _ => value.clone(),
        };
        let end = step.add_to(&start)?;
        Ok(vec![Interval::new(start, end)])
    }

    /// Consecutive partitions from the last `max` up to the value
    fn append(
        &self,
        value: &Value,
        from: &Value,
        info: &PartRelationInfo,
    ) -> Result<Vec<Interval>, PolicyError> {
        let step = Self::step(info)?;
        let mut planned = Vec::new();
        let mut cursor = from.clone();
        loop {
            if planned.len() >= self.max_partitions {
                return Err(self.too_many(info));
            }
            let next = step.add_to(&cursor)?;
            let covers = value < &next;
            planned.push(Interval::new(cursor, next.clone()));
            if covers {
                return Ok(planned);
            }
            cursor = next;
        }
    }

    /// Consecutive partitions from the first `min` down to the value
    fn prepend(
        &self,
        value: &Value,
        from: &Value,
        info: &PartRelationInfo,
    ) -> Result<Vec<Interval>, PolicyError> {
        let step = Self::step(info)?;
        let mut planned = Vec::new();
        let mut cursor = from.clone();
        loop {
            if planned.len() >= self.max_partitions {
                return Err(self.too_many(info));
            }
            let prev = step.sub_from(&cursor)?;
            let covers = value >= &prev;
            planned.push(Interval::new(prev.clone(), cursor));
            if covers {
                planned.reverse();
                return Ok(planned);
            }
            cursor = prev;
        }
    }

    /// The hole between the neighbours of `value`
    fn fill_gap(&self, value: &Value, info: &PartRelationInfo) -> Result<Vec<Interval>, PolicyError> {
        let ranges = info.ranges();
        let after = ranges.partition_point(|re| &re.min <= value);
        let (Some(prev), Some(next)) = (
            after.checked_sub(1).and_then(|i| ranges.get(i)),
            ranges.get(after),
        ) else {
            return Err(PolicyError::DoesNotCover {
                value: value.to_string(),
            });
        };
        Ok(vec![Interval::new(prev.max.clone(), next.min.clone())])
    }
}

impl Default for IntervalPolicy {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_MAX_PARTITIONS_PER_EVENT)
    }
}

impl BoundPolicy for IntervalPolicy {
    fn plan(
        &self,
        value: &Value,
        info: &PartRelationInfo,
        miss: SearchMiss,
    ) -> Result<Vec<Interval>, PolicyError> {
        if info.part_type() != PartType::Range {
            return Err(PolicyError::NotRange(info.parent));
        }
        value.check_type(info.key_type)?;

        let ranges = info.ranges();
        let planned = match (ranges.first(), ranges.last(), miss) {
            (Some(_), Some(_), SearchMiss::Gap) => self.fill_gap(value, info)?,
            (Some(first), Some(_), SearchMiss::OutOfRange) if value < &first.min => {
                self.prepend(value, &first.min, info)?
            }
            (Some(_), Some(last), SearchMiss::OutOfRange) => self.append(value, &last.max, info)?,
            _ => self.initial(value, info)?,
        };

        if !planned.iter().any(|interval| interval.contains(value)) {
            return Err(PolicyError::DoesNotCover {
                value: value.to_string(),
            });
        }
        Ok(planned)
    }
}

#[cfg(test)]
#[path = "policy_tests.rs"]
mod tests;
