//! Row predicates with a whole-page fast-accept check against statistics.
//!
//! `all_satisfy` must never return `true` for a page containing a row the point predicate
//! rejects. The page reader trusts it and skips per-row evaluation when it holds.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::statistics::{Statistics, StatisticsSource};
use crate::types::{Binary, Timestamp, Value};

/// Predicate over `(timestamp, value)` rows, one entry point per physical value kind.
pub trait Filter: fmt::Debug + Send + Sync {
    /// Whether every row of the page described by `source` is known to satisfy the filter.
    fn all_satisfy(&self, source: &dyn StatisticsSource) -> bool;

    fn satisfy_boolean(&self, time: Timestamp, value: bool) -> bool;

    fn satisfy_integer(&self, time: Timestamp, value: i32) -> bool;

    fn satisfy_long(&self, time: Timestamp, value: i64) -> bool;

    fn satisfy_float(&self, time: Timestamp, value: f32) -> bool;

    fn satisfy_double(&self, time: Timestamp, value: f64) -> bool;

    fn satisfy_binary(&self, time: Timestamp, value: &Binary) -> bool;
}

/// Combines an optional existing filter with another one (logical AND).
pub fn and(existing: Option<Box<dyn Filter>>, next: Box<dyn Filter>) -> Box<dyn Filter> {
    match existing {
        Some(left) => Box::new(AndFilter::new(left, next)),
        None => next,
    }
}

/// Comparison operator. Serde: lower-case string (e.g. `"gt"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompareOp {
    Gt,
    GtEq,
    Lt,
    LtEq,
    Eq,
    NotEq,
}

impl CompareOp {
    #[inline]
    fn test(self, ord: Ordering) -> bool {
        match self {
            CompareOp::Gt => ord == Ordering::Greater,
            CompareOp::GtEq => ord != Ordering::Less,
            CompareOp::Lt => ord == Ordering::Less,
            CompareOp::LtEq => ord != Ordering::Greater,
            CompareOp::Eq => ord == Ordering::Equal,
            CompareOp::NotEq => ord != Ordering::Equal,
        }
    }

    /// Whether every value in `[min, max]` satisfies `value <op> operand`.
    /// `min_ord`/`max_ord` are `min.cmp(operand)` and `max.cmp(operand)`.
    fn holds_for_range(self, min_ord: Ordering, max_ord: Ordering) -> bool {
        match self {
            CompareOp::Gt | CompareOp::GtEq => self.test(min_ord),
            CompareOp::Lt | CompareOp::LtEq => self.test(max_ord),
            CompareOp::Eq => min_ord == Ordering::Equal && max_ord == Ordering::Equal,
            CompareOp::NotEq => min_ord == Ordering::Greater || max_ord == Ordering::Less,
        }
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CompareOp::Gt => ">",
            CompareOp::GtEq => ">=",
            CompareOp::Lt => "<",
            CompareOp::LtEq => "<=",
            CompareOp::Eq => "=",
            CompareOp::NotEq => "!=",
        };
        f.write_str(s)
    }
}

// --- Time filter ---

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TimePredicate {
    Compare(CompareOp, Timestamp),
    Between(Timestamp, Timestamp),
}

/// Predicate on the timestamp only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeFilter {
    predicate: TimePredicate,
}

impl TimeFilter {
    pub fn compare(op: CompareOp, time: Timestamp) -> Self {
        Self {
            predicate: TimePredicate::Compare(op, time),
        }
    }

    pub fn gt(time: Timestamp) -> Self {
        Self::compare(CompareOp::Gt, time)
    }

    pub fn lt(time: Timestamp) -> Self {
        Self::compare(CompareOp::Lt, time)
    }

    /// Closed interval `[min, max]`.
    pub fn between(min: Timestamp, max: Timestamp) -> Self {
        Self {
            predicate: TimePredicate::Between(min, max),
        }
    }

    #[inline]
    fn test(&self, time: Timestamp) -> bool {
        match self.predicate {
            TimePredicate::Compare(op, operand) => op.test(time.cmp(&operand)),
            TimePredicate::Between(min, max) => min <= time && time <= max,
        }
    }
}

impl Filter for TimeFilter {
    fn all_satisfy(&self, source: &dyn StatisticsSource) -> bool {
        let Some(stats) = source.time_statistics() else {
            return false;
        };
        match self.predicate {
            TimePredicate::Compare(op, operand) => op.holds_for_range(
                stats.start_time.cmp(&operand),
                stats.end_time.cmp(&operand),
            ),
            TimePredicate::Between(min, max) => min <= stats.start_time && stats.end_time <= max,
        }
    }

    fn satisfy_boolean(&self, time: Timestamp, _value: bool) -> bool {
        self.test(time)
    }

    fn satisfy_integer(&self, time: Timestamp, _value: i32) -> bool {
        self.test(time)
    }

    fn satisfy_long(&self, time: Timestamp, _value: i64) -> bool {
        self.test(time)
    }

    fn satisfy_float(&self, time: Timestamp, _value: f32) -> bool {
        self.test(time)
    }

    fn satisfy_double(&self, time: Timestamp, _value: f64) -> bool {
        self.test(time)
    }

    fn satisfy_binary(&self, time: Timestamp, _value: &Binary) -> bool {
        self.test(time)
    }
}

// --- Value filter ---

/// Predicate `value <op> operand`. Rows whose kind differs from the operand's never match.
#[derive(Debug, Clone, PartialEq)]
pub struct ValueFilter {
    op: CompareOp,
    operand: Value,
}

impl ValueFilter {
    pub fn new(op: CompareOp, operand: Value) -> Self {
        Self { op, operand }
    }

    pub fn gt(operand: Value) -> Self {
        Self::new(CompareOp::Gt, operand)
    }

    pub fn eq(operand: Value) -> Self {
        Self::new(CompareOp::Eq, operand)
    }

    pub fn op(&self) -> CompareOp {
        self.op
    }

    pub fn operand(&self) -> &Value {
        &self.operand
    }

    #[inline]
    fn test_ord(&self, ord: Option<Ordering>) -> bool {
        ord.map_or(false, |o| self.op.test(o))
    }

    fn range_satisfies(&self, stats: &Statistics) -> bool {
        let (Some(min), Some(max)) = (&stats.min_value, &stats.max_value) else {
            return false;
        };
        match (min.compare(&self.operand), max.compare(&self.operand)) {
            (Some(min_ord), Some(max_ord)) => self.op.holds_for_range(min_ord, max_ord),
            _ => false,
        }
    }
}

impl Filter for ValueFilter {
    fn all_satisfy(&self, source: &dyn StatisticsSource) -> bool {
        source
            .statistics()
            .map_or(false, |stats| self.range_satisfies(stats))
    }

    fn satisfy_boolean(&self, _time: Timestamp, value: bool) -> bool {
        match &self.operand {
            Value::Boolean(o) => self.test_ord(Some(value.cmp(o))),
            _ => false,
        }
    }

    fn satisfy_integer(&self, _time: Timestamp, value: i32) -> bool {
        match &self.operand {
            Value::Int32(o) => self.test_ord(Some(value.cmp(o))),
            _ => false,
        }
    }

    fn satisfy_long(&self, _time: Timestamp, value: i64) -> bool {
        match &self.operand {
            Value::Int64(o) => self.test_ord(Some(value.cmp(o))),
            _ => false,
        }
    }

    fn satisfy_float(&self, _time: Timestamp, value: f32) -> bool {
        match &self.operand {
            Value::Float(o) => self.test_ord(value.partial_cmp(o)),
            _ => false,
        }
    }

    fn satisfy_double(&self, _time: Timestamp, value: f64) -> bool {
        match &self.operand {
            Value::Double(o) => self.test_ord(value.partial_cmp(o)),
            _ => false,
        }
    }

    fn satisfy_binary(&self, _time: Timestamp, value: &Binary) -> bool {
        match &self.operand {
            Value::Binary(o) => self.test_ord(Some(value.cmp(o))),
            _ => false,
        }
    }
}

// --- Combinators ---

#[derive(Debug)]
pub struct AndFilter {
    left: Box<dyn Filter>,
    right: Box<dyn Filter>,
}

impl AndFilter {
    pub fn new(left: Box<dyn Filter>, right: Box<dyn Filter>) -> Self {
        Self { left, right }
    }
}

impl Filter for AndFilter {
    fn all_satisfy(&self, source: &dyn StatisticsSource) -> bool {
        self.left.all_satisfy(source) && self.right.all_satisfy(source)
    }

    fn satisfy_boolean(&self, time: Timestamp, value: bool) -> bool {
        self.left.satisfy_boolean(time, value) && self.right.satisfy_boolean(time, value)
    }

    fn satisfy_integer(&self, time: Timestamp, value: i32) -> bool {
        self.left.satisfy_integer(time, value) && self.right.satisfy_integer(time, value)
    }

    fn satisfy_long(&self, time: Timestamp, value: i64) -> bool {
        self.left.satisfy_long(time, value) && self.right.satisfy_long(time, value)
    }

    fn satisfy_float(&self, time: Timestamp, value: f32) -> bool {
        self.left.satisfy_float(time, value) && self.right.satisfy_float(time, value)
    }

    fn satisfy_double(&self, time: Timestamp, value: f64) -> bool {
        self.left.satisfy_double(time, value) && self.right.satisfy_double(time, value)
    }

    fn satisfy_binary(&self, time: Timestamp, value: &Binary) -> bool {
        self.left.satisfy_binary(time, value) && self.right.satisfy_binary(time, value)
    }
}

#[derive(Debug)]
pub struct OrFilter {
    left: Box<dyn Filter>,
    right: Box<dyn Filter>,
}

impl OrFilter {
    pub fn new(left: Box<dyn Filter>, right: Box<dyn Filter>) -> Self {
        Self { left, right }
    }
}

impl Filter for OrFilter {
    fn all_satisfy(&self, source: &dyn StatisticsSource) -> bool {
        self.left.all_satisfy(source) || self.right.all_satisfy(source)
    }

    fn satisfy_boolean(&self, time: Timestamp, value: bool) -> bool {
        self.left.satisfy_boolean(time, value) || self.right.satisfy_boolean(time, value)
    }

    fn satisfy_integer(&self, time: Timestamp, value: i32) -> bool {
        self.left.satisfy_integer(time, value) || self.right.satisfy_integer(time, value)
    }

    fn satisfy_long(&self, time: Timestamp, value: i64) -> bool {
        self.left.satisfy_long(time, value) || self.right.satisfy_long(time, value)
    }

    fn satisfy_float(&self, time: Timestamp, value: f32) -> bool {
        self.left.satisfy_float(time, value) || self.right.satisfy_float(time, value)
    }

    fn satisfy_double(&self, time: Timestamp, value: f64) -> bool {
        self.left.satisfy_double(time, value) || self.right.satisfy_double(time, value)
    }

    fn satisfy_binary(&self, time: Timestamp, value: &Binary) -> bool {
        self.left.satisfy_binary(time, value) || self.right.satisfy_binary(time, value)
    }
}
