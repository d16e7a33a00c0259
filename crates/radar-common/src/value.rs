//! Dynamically typed attribute and query values.

use std::cmp::Ordering;
use std::fmt;

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};

use crate::error::{RadarError, RadarResult};

/// A dynamically typed value.
///
/// Attribute nodes persist the scalar subset (`Long`, `Double`, `Str`,
/// `Bool`, `Date`, `Time`); the remaining variants show up during query
/// evaluation and result decoding only.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Long(i64),
    Double(f64),
    Str(String),
    Bool(bool),
    Date(NaiveDate),
    Time(NaiveTime),
    DateTime(NaiveDateTime),
    Interval(Duration),
    List(Vec<Value>),
}

impl Value {
    /// Short type name used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Long(_) => "long",
            Value::Double(_) => "double",
            Value::Str(_) => "string",
            Value::Bool(_) => "bool",
            Value::Date(_) => "date",
            Value::Time(_) => "time",
            Value::DateTime(_) => "datetime",
            Value::Interval(_) => "interval",
            Value::List(_) => "list",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// True for the scalar kinds an attribute node may carry.
    pub fn is_attribute_scalar(&self) -> bool {
        matches!(
            self,
            Value::Long(_)
                | Value::Double(_)
                | Value::Str(_)
                | Value::Bool(_)
                | Value::Date(_)
                | Value::Time(_)
        )
    }

    pub fn as_long(&self) -> RadarResult<i64> {
        match self {
            Value::Long(v) => Ok(*v),
            other => Err(RadarError::Value(format!(
                "expected long, got {}",
                other.type_name()
            ))),
        }
    }

    pub fn as_double(&self) -> RadarResult<f64> {
        match self {
            Value::Double(v) => Ok(*v),
            Value::Long(v) => Ok(*v as f64),
            other => Err(RadarError::Value(format!(
                "expected double, got {}",
                other.type_name()
            ))),
        }
    }

    pub fn as_str(&self) -> RadarResult<&str> {
        match self {
            Value::Str(v) => Ok(v),
            other => Err(RadarError::Value(format!(
                "expected string, got {}",
                other.type_name()
            ))),
        }
    }

    pub fn as_bool(&self) -> RadarResult<bool> {
        match self {
            Value::Bool(v) => Ok(*v),
            other => Err(RadarError::Value(format!(
                "expected bool, got {}",
                other.type_name()
            ))),
        }
    }

    /// Compare two values, coercing across the numeric kinds.
    ///
    /// Returns `None` when the kinds are not comparable (including any
    /// comparison against `Null`).
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        use Value::*;
        match (self, other) {
            (Long(a), Long(b)) => Some(a.cmp(b)),
            (Long(a), Double(b)) => (*a as f64).partial_cmp(b),
            (Double(a), Long(b)) => a.partial_cmp(&(*b as f64)),
            (Double(a), Double(b)) => a.partial_cmp(b),
            (Str(a), Str(b)) => Some(a.cmp(b)),
            (Bool(a), Bool(b)) => Some(a.cmp(b)),
            (Date(a), Date(b)) => Some(a.cmp(b)),
            (Time(a), Time(b)) => Some(a.cmp(b)),
            (DateTime(a), DateTime(b)) => Some(a.cmp(b)),
            (Interval(a), Interval(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    /// Canonical rendering, shared by the metadata hasher.
    ///
    /// Dates render as `YYYYMMDD`, times as `HHMMSS`, datetimes as
    /// `YYYYMMDDTHHMMSS` (the ODIM string conventions).
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Long(v) => write!(f, "{}", v),
            Value::Double(v) => write!(f, "{}", v),
            Value::Str(v) => write!(f, "{}", v),
            Value::Bool(v) => write!(f, "{}", v),
            Value::Date(v) => write!(f, "{}", v.format("%Y%m%d")),
            Value::Time(v) => write!(f, "{}", v.format("%H%M%S")),
            Value::DateTime(v) => write!(f, "{}", v.format("%Y%m%dT%H%M%S")),
            Value::Interval(v) => write!(f, "{}s", v.num_seconds()),
            Value::List(items) => {
                write!(f, "(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, ")")
            }
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Long(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Long(v as i64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<NaiveDate> for Value {
    fn from(v: NaiveDate) -> Self {
        Value::Date(v)
    }
}

impl From<NaiveTime> for Value {
    fn from(v: NaiveTime) -> Self {
        Value::Time(v)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(v: NaiveDateTime) -> Self {
        Value::DateTime(v)
    }
}
