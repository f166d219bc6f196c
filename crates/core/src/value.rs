// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Partition key values, key types and range intervals
//!
//! Values order by variant first and payload second. Callers check a value's
//! type against the relation's key type at the boundary, so within a single
//! range sequence the order is the key type's natural order.

use crate::error::ValueError;
use chrono::{Datelike, Days, Months, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Type of a partitioning key column
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyType {
    Int,
    Date,
}

impl KeyType {
    pub fn name(self) -> &'static str {
        match self {
            KeyType::Int => "int",
            KeyType::Date => "date",
        }
    }

    /// Parse a textual literal as a value of this type
    pub fn parse_value(self, raw: &str) -> Result<Value, ValueError> {
        let trimmed = raw.trim();
        let parsed = match self {
            KeyType::Int => trimmed.parse::<i64>().ok().map(Value::Int),
            KeyType::Date => NaiveDate::parse_from_str(trimmed, DATE_FORMAT)
                .ok()
                .map(Value::Date),
        };
        parsed.ok_or_else(|| ValueError::Parse {
            key_type: self,
            raw: raw.to_string(),
        })
    }
}

impl fmt::Display for KeyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for KeyType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "int" | "integer" | "bigint" => Ok(KeyType::Int),
            "date" => Ok(KeyType::Date),
            other => Err(format!("unknown key type: {other}")),
        }
    }
}

/// A partitioning key value
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum Value {
    Null,
    Int(i64),
    Date(NaiveDate),
}

impl Value {
    pub fn key_type(&self) -> Option<KeyType> {
        match self {
            Value::Null => None,
            Value::Int(_) => Some(KeyType::Int),
            Value::Date(_) => Some(KeyType::Date),
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.key_type().map_or("null", KeyType::name)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Ensure this value can be compared against keys of `key_type`
    pub fn check_type(&self, key_type: KeyType) -> Result<(), ValueError> {
        if self.key_type() == Some(key_type) {
            Ok(())
        } else {
            Err(ValueError::TypeMismatch {
                expected: key_type.name(),
                found: self.type_name(),
            })
        }
    }

    /// Stable byte encoding used as input to the partition hash
    pub fn canonical_bytes(&self) -> Vec<u8> {
        match self {
            Value::Null => Vec::new(),
            Value::Int(v) => v.to_le_bytes().to_vec(),
            Value::Date(d) => i64::from(d.num_days_from_ce()).to_le_bytes().to_vec(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::Int(v) => write!(f, "{v}"),
            Value::Date(d) => write!(f, "{}", d.format(DATE_FORMAT)),
        }
    }
}

/// Width of automatically created range partitions
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "unit", content = "step", rename_all = "lowercase")]
pub enum RangeInterval {
    Int(i64),
    Days(u64),
    Months(u32),
}

impl RangeInterval {
    /// Parse `"10"` for integer keys, `"7 days"` / `"1 month"` for date keys
    pub fn parse(key_type: KeyType, raw: &str) -> Result<Self, ValueError> {
        let invalid = |reason: &str| ValueError::InvalidInterval {
            raw: raw.to_string(),
            reason: reason.to_string(),
        };
        let mut parts = raw.split_whitespace();
        let amount = parts.next().ok_or_else(|| invalid("empty interval"))?;
        let unit = parts.next();
        if parts.next().is_some() {
            return Err(invalid("expected `<amount> [unit]`"));
        }

        let interval = match (key_type, unit) {
            (KeyType::Int, None) => {
                RangeInterval::Int(amount.parse().map_err(|_| invalid("not an integer"))?)
            }
            (KeyType::Int, Some(_)) => return Err(invalid("integer keys take a bare step")),
            (KeyType::Date, Some(unit)) => {
                let unit = unit.to_ascii_lowercase();
                match unit.trim_end_matches('s') {
                    "day" => RangeInterval::Days(
                        amount.parse().map_err(|_| invalid("not a day count"))?,
                    ),
                    "week" => RangeInterval::Days(
                        amount
                            .parse::<u64>()
                            .map_err(|_| invalid("not a week count"))?
                            .saturating_mul(7),
                    ),
                    "month" => RangeInterval::Months(
                        amount.parse().map_err(|_| invalid("not a month count"))?,
                    ),
                    "year" => RangeInterval::Months(
                        amount
                            .parse::<u32>()
                            .map_err(|_| invalid("not a year count"))?
                            .saturating_mul(12),
                    ),
                    _ => return Err(invalid("unknown unit")),
                }
            }
            (KeyType::Date, None) => return Err(invalid("date keys need a unit")),
        };
        interval.validate(key_type)?;
        Ok(interval)
    }

    /// Check the interval is positive and applies to `key_type`
    pub fn validate(&self, key_type: KeyType) -> Result<(), ValueError> {
        let positive = match self {
            RangeInterval::Int(step) => *step > 0,
            RangeInterval::Days(days) => *days > 0,
            RangeInterval::Months(months) => *months > 0,
        };
        if !positive {
            return Err(ValueError::InvalidInterval {
                raw: self.to_string(),
                reason: "interval must be positive".to_string(),
            });
        }
        let expected = match self {
            RangeInterval::Int(_) => KeyType::Int,
            RangeInterval::Days(_) | RangeInterval::Months(_) => KeyType::Date,
        };
        if expected != key_type {
            return Err(ValueError::TypeMismatch {
                expected: key_type.name(),
                found: expected.name(),
            });
        }
        Ok(())
    }

    /// `value + interval`
    pub fn add_to(&self, value: &Value) -> Result<Value, ValueError> {
        let stepped = match (self, value) {
            (RangeInterval::Int(step), Value::Int(v)) => v.checked_add(*step).map(Value::Int),
            (RangeInterval::Days(days), Value::Date(d)) => {
                d.checked_add_days(Days::new(*days)).map(Value::Date)
            }
            (RangeInterval::Months(months), Value::Date(d)) => {
                d.checked_add_months(Months::new(*months)).map(Value::Date)
            }
            _ => return Err(self.mismatch(value)),
        };
        stepped.ok_or_else(|| self.overflow(value))
    }

    /// `value - interval`
    pub fn sub_from(&self, value: &Value) -> Result<Value, ValueError> {
        let stepped = match (self, value) {
            (RangeInterval::Int(step), Value::Int(v)) => v.checked_sub(*step).map(Value::Int),
            (RangeInterval::Days(days), Value::Date(d)) => {
                d.checked_sub_days(Days::new(*days)).map(Value::Date)
            }
            (RangeInterval::Months(months), Value::Date(d)) => {
                d.checked_sub_months(Months::new(*months)).map(Value::Date)
            }
            _ => return Err(self.mismatch(value)),
        };
        stepped.ok_or_else(|| self.overflow(value))
    }

    fn mismatch(&self, value: &Value) -> ValueError {
        let expected = match self {
            RangeInterval::Int(_) => KeyType::Int,
            RangeInterval::Days(_) | RangeInterval::Months(_) => KeyType::Date,
        };
        ValueError::TypeMismatch {
            expected: expected.name(),
            found: value.type_name(),
        }
    }

    fn overflow(&self, value: &Value) -> ValueError {
        ValueError::Overflow {
            value: value.to_string(),
            interval: self.to_string(),
        }
    }
}

impl fmt::Display for RangeInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RangeInterval::Int(step) => write!(f, "{step}"),
            RangeInterval::Days(days) => write!(f, "{days} days"),
            RangeInterval::Months(months) => write!(f, "{months} months"),
        }
    }
}

#[cfg(test)]
#[path = "value_tests.rs"]
mod tests;
