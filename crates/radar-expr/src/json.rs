//! JSON wire format for expressions.
//!
//! Symbols serialize as `["symbol", name]` and lists as `["list", ...]`
//! so that literal JSON arrays never collide with call forms. This format
//! is shared with persisted filters and any HTTP client, so it must stay
//! bit-exact.

use chrono::{Datelike, Timelike};
use serde_json::{json, Value as Json};

use radar_common::{RadarError, RadarResult, Value};

use crate::ast::{builders, Expression};

/// Convert an expression into its tagged JSON form.
pub fn wrap_json(expr: &Expression) -> Json {
    match expr {
        Expression::Symbol(name) => json!(["symbol", name]),
        Expression::List(items) => {
            let mut out = Vec::with_capacity(items.len() + 1);
            out.push(json!("list"));
            out.extend(items.iter().map(wrap_json));
            Json::Array(out)
        }
        Expression::Literal(value) => wrap_value(value),
    }
}

fn wrap_value(value: &Value) -> Json {
    match value {
        Value::Null => Json::Null,
        Value::Long(v) => json!(v),
        Value::Double(v) => json!(v),
        Value::Str(v) => json!(v),
        Value::Bool(v) => json!(v),
        // Temporal literals travel as their tagged call forms.
        Value::Date(d) => wrap_json(&builders::date(d.year(), d.month(), d.day())),
        Value::Time(t) => wrap_json(&builders::time(t.hour(), t.minute(), t.second())),
        Value::DateTime(dt) => wrap_json(&builders::datetime(
            dt.year(),
            dt.month(),
            dt.day(),
            dt.hour(),
            dt.minute(),
            dt.second(),
        )),
        Value::Interval(d) => {
            let days = d.num_days();
            let seconds = (*d - chrono::Duration::days(days)).num_seconds();
            wrap_json(&builders::interval(days, seconds))
        }
        Value::List(items) => {
            let mut out = Vec::with_capacity(items.len() + 1);
            out.push(json!("list"));
            out.extend(items.iter().map(wrap_value));
            Json::Array(out)
        }
    }
}

/// Parse the tagged JSON form back into an expression.
///
/// The exact inverse of [`wrap_json`]; any shape outside the format is a
/// value error.
pub fn unwrap_json(json: &Json) -> RadarResult<Expression> {
    match json {
        Json::Null => Ok(Expression::Literal(Value::Null)),
        Json::Bool(v) => Ok(Expression::Literal(Value::Bool(*v))),
        Json::Number(n) => {
            if let Some(v) = n.as_i64() {
                Ok(Expression::Literal(Value::Long(v)))
            } else if let Some(v) = n.as_f64() {
                Ok(Expression::Literal(Value::Double(v)))
            } else {
                Err(RadarError::Value(format!("unrepresentable number: {}", n)))
            }
        }
        Json::String(s) => Ok(Expression::Literal(Value::Str(s.clone()))),
        Json::Array(items) => {
            let tag = items.first().and_then(Json::as_str).ok_or_else(|| {
                RadarError::Value(format!("expected tagged array, got {}", json))
            })?;
            match tag {
                "symbol" => match items.as_slice() {
                    [_, Json::String(name)] => Ok(Expression::Symbol(name.clone())),
                    _ => Err(RadarError::Value(format!(
                        "malformed symbol form: {}",
                        json
                    ))),
                },
                "list" => items[1..]
                    .iter()
                    .map(unwrap_json)
                    .collect::<RadarResult<Vec<_>>>()
                    .map(Expression::List),
                other => Err(RadarError::Value(format!(
                    "unknown tag {:?} in {}",
                    other, json
                ))),
            }
        }
        Json::Object(_) => Err(RadarError::Value(format!(
            "objects have no expression form: {}",
            json
        ))),
    }
}
