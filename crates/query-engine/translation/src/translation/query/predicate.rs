//! The compiled form of a query tree.
//!
//! A predicate is a boolean structure over field paths, independent of how a backend evaluates it.

use std::collections::BTreeSet;
use std::fmt;

use query_engine_models::BaseComparator;

/// A comparison between a field and a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ComparisonOperator {
    Equals,
    LessThan,
    LessThanOrEqualTo,
    GreaterThan,
    GreaterThanOrEqualTo,
    Contains,
    StartsWith,
    EndsWith,
}

impl ComparisonOperator {
    /// The operator comparing with a value; null checks have none.
    pub fn from_base(base: BaseComparator) -> Option<ComparisonOperator> {
        match base {
            BaseComparator::Equals => Some(ComparisonOperator::Equals),
            BaseComparator::LessThan => Some(ComparisonOperator::LessThan),
            BaseComparator::LessThanOrEqualTo => Some(ComparisonOperator::LessThanOrEqualTo),
            BaseComparator::GreaterThan => Some(ComparisonOperator::GreaterThan),
            BaseComparator::GreaterThanOrEqualTo => Some(ComparisonOperator::GreaterThanOrEqualTo),
            BaseComparator::Contains => Some(ComparisonOperator::Contains),
            BaseComparator::StartsWith => Some(ComparisonOperator::StartsWith),
            BaseComparator::EndsWith => Some(ComparisonOperator::EndsWith),
            BaseComparator::IsNull => None,
        }
    }

    pub fn base(self) -> BaseComparator {
        match self {
            ComparisonOperator::Equals => BaseComparator::Equals,
            ComparisonOperator::LessThan => BaseComparator::LessThan,
            ComparisonOperator::LessThanOrEqualTo => BaseComparator::LessThanOrEqualTo,
            ComparisonOperator::GreaterThan => BaseComparator::GreaterThan,
            ComparisonOperator::GreaterThanOrEqualTo => BaseComparator::GreaterThanOrEqualTo,
            ComparisonOperator::Contains => BaseComparator::Contains,
            ComparisonOperator::StartsWith => BaseComparator::StartsWith,
            ComparisonOperator::EndsWith => BaseComparator::EndsWith,
        }
    }
}

/// A duration in the representation PostgreSQL keeps for intervals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Interval {
    pub months: i32,
    pub days: i32,
    pub microseconds: i64,
}

impl Interval {
    const MICROSECONDS_PER_DAY: i64 = 86_400_000_000;

    /// The length used to order intervals, counting a month as 30 days.
    pub fn total_microseconds(&self) -> i128 {
        (i128::from(self.months) * 30 + i128::from(self.days))
            * i128::from(Self::MICROSECONDS_PER_DAY)
            + i128::from(self.microseconds)
    }
}

/// Renders as interval input PostgreSQL accepts, e.g. `0 mons 14 days 0 microseconds`.
impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} mons {} days {} microseconds",
            self.months, self.days, self.microseconds
        )
    }
}

/// A value compared against, after units conversion.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Compared as typed, in the type of the field.
    String(String),
    Float(f64),
    Interval(Interval),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => write!(f, "{s}"),
            Value::Float(n) => write!(f, "{n}"),
            Value::Interval(interval) => write!(f, "{interval}"),
        }
    }
}

/// A boolean filter over field paths.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    And {
        left: Box<Predicate>,
        right: Box<Predicate>,
    },
    Or {
        left: Box<Predicate>,
        right: Box<Predicate>,
    },
    Not(Box<Predicate>),
    Compare {
        path: String,
        operator: ComparisonOperator,
        value: Value,
    },
    IsNull {
        path: String,
    },
}

impl Predicate {
    pub fn and(left: Predicate, right: Predicate) -> Predicate {
        Predicate::And {
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn or(left: Predicate, right: Predicate) -> Predicate {
        Predicate::Or {
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn negate(predicate: Predicate) -> Predicate {
        Predicate::Not(Box::new(predicate))
    }

    /// Every field path the predicate refers to.
    pub fn paths(&self) -> BTreeSet<&str> {
        let mut paths = BTreeSet::new();
        self.collect_paths(&mut paths);
        paths
    }

    fn collect_paths<'a>(&'a self, paths: &mut BTreeSet<&'a str>) {
        match self {
            Predicate::And { left, right } | Predicate::Or { left, right } => {
                left.collect_paths(paths);
                right.collect_paths(paths);
            }
            Predicate::Not(predicate) => predicate.collect_paths(paths),
            Predicate::Compare { path, .. } | Predicate::IsNull { path } => {
                paths.insert(path.as_str());
            }
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::And { left, right } => write!(f, "({left} AND {right})"),
            Predicate::Or { left, right } => write!(f, "({left} OR {right})"),
            Predicate::Not(predicate) => write!(f, "NOT {predicate}"),
            Predicate::Compare {
                path,
                operator,
                value,
            } => write!(f, "{path} {} {value:?}", operator.base().name()),
            Predicate::IsNull { path } => write!(f, "{path} isnull"),
        }
    }
}
