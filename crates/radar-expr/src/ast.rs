//! Expression AST and builder functions.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Timelike};

use radar_common::{RadarError, Value};

/// An expression node.
///
/// A call is a [`Expression::List`] whose head is a [`Expression::Symbol`];
/// any other list is plain data. Temporal literals are represented as
/// tagged calls (`(date y m d)` and friends) so they survive the JSON wire
/// format unchanged.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Symbol(String),
    Literal(Value),
    List(Vec<Expression>),
}

impl Expression {
    pub fn symbol(name: impl Into<String>) -> Self {
        Expression::Symbol(name.into())
    }

    pub fn literal(value: impl Into<Value>) -> Self {
        Expression::Literal(value.into())
    }

    /// The head symbol, if this is a call form.
    pub fn call_op(&self) -> Option<&str> {
        match self {
            Expression::List(items) => match items.first() {
                Some(Expression::Symbol(op)) => Some(op),
                _ => None,
            },
            _ => None,
        }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Symbol(s) => write!(f, "{}", s),
            Expression::Literal(Value::Str(s)) => write!(f, "{:?}", s),
            Expression::Literal(v) => write!(f, "{}", v),
            Expression::List(items) => {
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

/// The typed value column an attribute reference selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeType {
    Long,
    Double,
    String,
    Bool,
    Date,
    Time,
}

impl AttributeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttributeType::Long => "long",
            AttributeType::Double => "double",
            AttributeType::String => "string",
            AttributeType::Bool => "bool",
            AttributeType::Date => "date",
            AttributeType::Time => "time",
        }
    }
}

impl FromStr for AttributeType {
    type Err = RadarError;

    fn from_str(s: &str) -> Result<Self, RadarError> {
        match s {
            "long" => Ok(AttributeType::Long),
            "double" => Ok(AttributeType::Double),
            "string" => Ok(AttributeType::String),
            "bool" | "boolean" => Ok(AttributeType::Bool),
            "date" => Ok(AttributeType::Date),
            "time" => Ok(AttributeType::Time),
            other => Err(RadarError::Value(format!(
                "unknown attribute type: {:?}",
                other
            ))),
        }
    }
}

impl fmt::Display for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Builder functions for the operator vocabulary.
///
/// These are the only sanctioned way to construct call forms; the JSON
/// round-trip property is stated over ASTs built from them.
pub mod builders {
    use super::*;

    pub fn call(op: &str, args: Vec<Expression>) -> Expression {
        let mut items = Vec::with_capacity(args.len() + 1);
        items.push(Expression::symbol(op));
        items.extend(args);
        Expression::List(items)
    }

    fn binary(op: &str, lhs: Expression, rhs: Expression) -> Expression {
        call(op, vec![lhs, rhs])
    }

    /// Reference to an attribute column, e.g. `attribute("where/xsize",
    /// AttributeType::Long)`.
    pub fn attribute(name: &str, ty: AttributeType) -> Expression {
        call(
            "attr",
            vec![Expression::literal(name), Expression::literal(ty.as_str())],
        )
    }

    /// Literal wrapper converting temporal values into their tagged call
    /// forms; scalar values stay plain literals.
    pub fn literal(value: Value) -> Expression {
        match value {
            Value::Date(d) => date(d.year(), d.month(), d.day()),
            Value::Time(t) => time(t.hour(), t.minute(), t.second()),
            Value::DateTime(dt) => datetime(
                dt.year(),
                dt.month(),
                dt.day(),
                dt.hour(),
                dt.minute(),
                dt.second(),
            ),
            Value::Interval(d) => {
                let days = d.num_days();
                let seconds = (d - chrono::Duration::days(days)).num_seconds();
                interval(days, seconds)
            }
            other => Expression::Literal(other),
        }
    }

    pub fn date(year: i32, month: u32, day: u32) -> Expression {
        call(
            "date",
            vec![
                Expression::literal(year as i64),
                Expression::literal(month as i64),
                Expression::literal(day as i64),
            ],
        )
    }

    pub fn time(hour: u32, minute: u32, second: u32) -> Expression {
        call(
            "time",
            vec![
                Expression::literal(hour as i64),
                Expression::literal(minute as i64),
                Expression::literal(second as i64),
            ],
        )
    }

    pub fn datetime(year: i32, month: u32, day: u32, hour: u32, minute: u32, second: u32) -> Expression {
        call(
            "datetime",
            vec![
                Expression::literal(year as i64),
                Expression::literal(month as i64),
                Expression::literal(day as i64),
                Expression::literal(hour as i64),
                Expression::literal(minute as i64),
                Expression::literal(second as i64),
            ],
        )
    }

    /// Time delta literal as `(interval days seconds)`.
    pub fn interval(days: i64, seconds: i64) -> Expression {
        call(
            "interval",
            vec![Expression::literal(days), Expression::literal(seconds)],
        )
    }

    // === Comparison ===

    pub fn eq(lhs: Expression, rhs: Expression) -> Expression {
        binary("=", lhs, rhs)
    }

    pub fn ne(lhs: Expression, rhs: Expression) -> Expression {
        binary("!=", lhs, rhs)
    }

    pub fn lt(lhs: Expression, rhs: Expression) -> Expression {
        binary("<", lhs, rhs)
    }

    pub fn gt(lhs: Expression, rhs: Expression) -> Expression {
        binary(">", lhs, rhs)
    }

    pub fn le(lhs: Expression, rhs: Expression) -> Expression {
        binary("<=", lhs, rhs)
    }

    pub fn ge(lhs: Expression, rhs: Expression) -> Expression {
        binary(">=", lhs, rhs)
    }

    // === Boolean ===

    pub fn and(lhs: Expression, rhs: Expression) -> Expression {
        binary("and", lhs, rhs)
    }

    pub fn or(lhs: Expression, rhs: Expression) -> Expression {
        binary("or", lhs, rhs)
    }

    pub fn not(expr: Expression) -> Expression {
        call("not", vec![expr])
    }

    // === Arithmetic ===

    pub fn add(lhs: Expression, rhs: Expression) -> Expression {
        binary("+", lhs, rhs)
    }

    pub fn sub(lhs: Expression, rhs: Expression) -> Expression {
        binary("-", lhs, rhs)
    }

    pub fn mul(lhs: Expression, rhs: Expression) -> Expression {
        binary("*", lhs, rhs)
    }

    pub fn div(lhs: Expression, rhs: Expression) -> Expression {
        binary("/", lhs, rhs)
    }

    // === Membership & matching ===

    /// Membership test against a data list of alternatives.
    pub fn is_in(needle: Expression, alternatives: Vec<Expression>) -> Expression {
        call("in", vec![needle, Expression::List(alternatives)])
    }

    /// Pattern match where `*` is the wildcard meta-character.
    pub fn like(lhs: Expression, pattern: &str) -> Expression {
        binary("like", lhs, Expression::literal(pattern))
    }

    /// Half-open interval test: `low <= x < high`.
    pub fn between(x: Expression, low: Expression, high: Expression) -> Expression {
        call("between", vec![x, low, high])
    }

    // === Ordering ===

    pub fn asc(expr: Expression) -> Expression {
        call("asc", vec![expr])
    }

    pub fn desc(expr: Expression) -> Expression {
        call("desc", vec![expr])
    }

    // === Aggregates ===

    pub fn min(expr: Expression) -> Expression {
        call("min", vec![expr])
    }

    pub fn max(expr: Expression) -> Expression {
        call("max", vec![expr])
    }

    pub fn sum(expr: Expression) -> Expression {
        call("sum", vec![expr])
    }

    pub fn count(expr: Expression) -> Expression {
        call("count", vec![expr])
    }
}
