//! Bottom-up expression evaluation through a typed dispatch table.

use std::cmp::Ordering;
use std::collections::HashMap;

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};

use radar_common::{RadarError, RadarResult, Value};

use crate::ast::Expression;

/// An operand type an [`Evaluator`] can produce.
///
/// Literals and plain data lists are lifted into the operand domain;
/// everything else is produced by registered procedures.
pub trait Operand: Sized {
    fn from_value(value: &Value) -> RadarResult<Self>;
    fn from_list(items: Vec<Self>) -> RadarResult<Self>;
}

impl Operand for Value {
    fn from_value(value: &Value) -> RadarResult<Value> {
        Ok(value.clone())
    }

    fn from_list(items: Vec<Value>) -> RadarResult<Value> {
        Ok(Value::List(items))
    }
}

/// A registered operator implementation.
pub type Procedure<T> = Box<dyn Fn(Vec<T>) -> RadarResult<T>>;

/// Maps operator names to procedures and drives evaluation.
///
/// Evaluation is bottom-up: operands are evaluated before the procedure
/// named by the call head is applied. Unknown operators and bare symbols
/// outside call position are evaluation errors; a list not headed by a
/// symbol evaluates element-wise to a data list; the empty list evaluates
/// to itself.
pub struct Evaluator<T> {
    procedures: HashMap<String, Procedure<T>>,
}

impl<T> Default for Evaluator<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Evaluator<T> {
    pub fn new() -> Self {
        Self {
            procedures: HashMap::new(),
        }
    }

    pub fn register<F>(&mut self, name: &str, procedure: F)
    where
        F: Fn(Vec<T>) -> RadarResult<T> + 'static,
    {
        self.procedures.insert(name.to_string(), Box::new(procedure));
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.procedures.contains_key(name)
    }
}

impl<T: Operand> Evaluator<T> {
    pub fn evaluate(&self, expr: &Expression) -> RadarResult<T> {
        match expr {
            Expression::Literal(value) => T::from_value(value),
            Expression::Symbol(name) => {
                if self.is_registered(name) {
                    Err(RadarError::Evaluation(format!(
                        "procedure {:?} used outside call position",
                        name
                    )))
                } else {
                    Err(RadarError::Evaluation(format!(
                        "unknown procedure: {:?}",
                        name
                    )))
                }
            }
            Expression::List(items) => {
                if items.is_empty() {
                    return T::from_list(Vec::new());
                }
                if let Expression::Symbol(op) = &items[0] {
                    let procedure = self.procedures.get(op).ok_or_else(|| {
                        RadarError::Evaluation(format!("unknown procedure: {:?}", op))
                    })?;
                    let args = items[1..]
                        .iter()
                        .map(|item| self.evaluate(item))
                        .collect::<RadarResult<Vec<T>>>()?;
                    procedure(args)
                } else {
                    let values = items
                        .iter()
                        .map(|item| self.evaluate(item))
                        .collect::<RadarResult<Vec<T>>>()?;
                    T::from_list(values)
                }
            }
        }
    }
}

/// Pull an exact number of operands out of an argument list.
pub fn arity<T, const N: usize>(op: &str, args: Vec<T>) -> RadarResult<[T; N]> {
    let len = args.len();
    args.try_into().map_err(|_| {
        RadarError::Evaluation(format!(
            "{} expects {} operands, got {}",
            op, N, len
        ))
    })
}

/// Glob match where `*` matches any run of characters.
pub fn glob_match(text: &str, pattern: &str) -> bool {
    fn inner(text: &[u8], pattern: &[u8]) -> bool {
        match pattern.split_first() {
            None => text.is_empty(),
            Some((b'*', rest)) => {
                (0..=text.len()).any(|skip| inner(&text[skip..], rest))
            }
            Some((c, rest)) => match text.split_first() {
                Some((t, text_rest)) => t == c && inner(text_rest, rest),
                None => false,
            },
        }
    }
    inner(text.as_bytes(), pattern.as_bytes())
}

fn numeric_pair(op: &str, a: &Value, b: &Value) -> RadarResult<(f64, f64, bool)> {
    match (a, b) {
        (Value::Long(x), Value::Long(y)) => Ok((*x as f64, *y as f64, true)),
        (Value::Long(x), Value::Double(y)) => Ok((*x as f64, *y, false)),
        (Value::Double(x), Value::Long(y)) => Ok((*x, *y as f64, false)),
        (Value::Double(x), Value::Double(y)) => Ok((*x, *y, false)),
        _ => Err(RadarError::Evaluation(format!(
            "{} expects numeric operands, got {} and {}",
            op,
            a.type_name(),
            b.type_name()
        ))),
    }
}

fn arithmetic(op: &'static str, args: Vec<Value>) -> RadarResult<Value> {
    let [a, b] = arity::<_, 2>(op, args)?;
    // Temporal shifts by an interval go through chrono.
    match (&a, &b, op) {
        (Value::Date(d), Value::Interval(iv), "+") => return Ok(Value::Date(*d + *iv)),
        (Value::Date(d), Value::Interval(iv), "-") => return Ok(Value::Date(*d - *iv)),
        (Value::DateTime(dt), Value::Interval(iv), "+") => return Ok(Value::DateTime(*dt + *iv)),
        (Value::DateTime(dt), Value::Interval(iv), "-") => return Ok(Value::DateTime(*dt - *iv)),
        _ => {}
    }
    let (x, y, integral) = numeric_pair(op, &a, &b)?;
    let result = match op {
        "+" => x + y,
        "-" => x - y,
        "*" => x * y,
        "/" => {
            if y == 0.0 {
                return Err(RadarError::Evaluation("division by zero".into()));
            }
            x / y
        }
        _ => unreachable!(),
    };
    if integral && op != "/" {
        Ok(Value::Long(result as i64))
    } else if integral {
        // Integer division truncates, matching SQL semantics.
        Ok(Value::Long((x as i64) / (y as i64)))
    } else {
        Ok(Value::Double(result))
    }
}

fn comparison(op: &'static str, args: Vec<Value>) -> RadarResult<Value> {
    let [a, b] = arity::<_, 2>(op, args)?;
    let ordering = a.compare(&b);
    // Incomparable kinds (including null) satisfy no comparison.
    let result = match (op, ordering) {
        (_, None) => false,
        ("=", Some(o)) => o == Ordering::Equal,
        ("!=", Some(o)) => o != Ordering::Equal,
        ("<", Some(o)) => o == Ordering::Less,
        (">", Some(o)) => o == Ordering::Greater,
        ("<=", Some(o)) => o != Ordering::Greater,
        (">=", Some(o)) => o != Ordering::Less,
        _ => unreachable!(),
    };
    Ok(Value::Bool(result))
}

/// An evaluator over in-memory values implementing the full operator
/// vocabulary, used for abstract evaluation and property tests.
pub fn standard_evaluator() -> Evaluator<Value> {
    let mut ev = Evaluator::new();

    for op in ["+", "-", "*", "/"] {
        ev.register(op, move |args| arithmetic(op, args));
    }
    for op in ["=", "!=", "<", ">", "<=", ">="] {
        ev.register(op, move |args| comparison(op, args));
    }

    ev.register("and", |args| {
        let [a, b] = arity::<_, 2>("and", args)?;
        Ok(Value::Bool(a.as_bool()? && b.as_bool()?))
    });
    ev.register("or", |args| {
        let [a, b] = arity::<_, 2>("or", args)?;
        Ok(Value::Bool(a.as_bool()? || b.as_bool()?))
    });
    ev.register("not", |args| {
        let [a] = arity::<_, 1>("not", args)?;
        Ok(Value::Bool(!a.as_bool()?))
    });

    ev.register("in", |args| {
        let [needle, haystack] = arity::<_, 2>("in", args)?;
        let items = match haystack {
            Value::List(items) => items,
            other => {
                return Err(RadarError::Evaluation(format!(
                    "in expects a list, got {}",
                    other.type_name()
                )))
            }
        };
        let found = items
            .iter()
            .any(|item| needle.compare(item) == Some(Ordering::Equal));
        Ok(Value::Bool(found))
    });

    ev.register("like", |args| {
        let [text, pattern] = arity::<_, 2>("like", args)?;
        Ok(Value::Bool(glob_match(text.as_str()?, pattern.as_str()?)))
    });

    // Half-open: low <= x < high.
    ev.register("between", |args| {
        let [x, low, high] = arity::<_, 3>("between", args)?;
        let ge_low = matches!(
            low.compare(&x),
            Some(Ordering::Less) | Some(Ordering::Equal)
        );
        let lt_high = x.compare(&high) == Some(Ordering::Less);
        Ok(Value::Bool(ge_low && lt_high))
    });

    ev.register("min", |args| fold_aggregate("min", args));
    ev.register("max", |args| fold_aggregate("max", args));
    ev.register("sum", |args| fold_aggregate("sum", args));
    ev.register("count", |args| {
        let [list] = arity::<_, 1>("count", args)?;
        match list {
            Value::List(items) => Ok(Value::Long(items.len() as i64)),
            _ => Ok(Value::Long(1)),
        }
    });

    ev.register("date", |args| {
        let [y, m, d] = arity::<_, 3>("date", args)?;
        NaiveDate::from_ymd_opt(y.as_long()? as i32, m.as_long()? as u32, d.as_long()? as u32)
            .map(Value::Date)
            .ok_or_else(|| RadarError::Evaluation("invalid date literal".into()))
    });
    ev.register("time", |args| {
        let [h, m, s] = arity::<_, 3>("time", args)?;
        NaiveTime::from_hms_opt(h.as_long()? as u32, m.as_long()? as u32, s.as_long()? as u32)
            .map(Value::Time)
            .ok_or_else(|| RadarError::Evaluation("invalid time literal".into()))
    });
    ev.register("datetime", |args| {
        let [y, mo, d, h, mi, s] = arity::<_, 6>("datetime", args)?;
        let date =
            NaiveDate::from_ymd_opt(y.as_long()? as i32, mo.as_long()? as u32, d.as_long()? as u32);
        let time =
            NaiveTime::from_hms_opt(h.as_long()? as u32, mi.as_long()? as u32, s.as_long()? as u32);
        match (date, time) {
            (Some(date), Some(time)) => Ok(Value::DateTime(NaiveDateTime::new(date, time))),
            _ => Err(RadarError::Evaluation("invalid datetime literal".into())),
        }
    });
    ev.register("interval", |args| {
        let [days, seconds] = arity::<_, 2>("interval", args)?;
        Ok(Value::Interval(
            Duration::days(days.as_long()?) + Duration::seconds(seconds.as_long()?),
        ))
    });

    ev
}

fn fold_aggregate(op: &'static str, args: Vec<Value>) -> RadarResult<Value> {
    let [arg] = arity::<_, 1>(op, args)?;
    let items = match arg {
        Value::List(items) if !items.is_empty() => items,
        Value::List(_) => return Ok(Value::Null),
        scalar => return Ok(scalar),
    };
    let mut acc = items[0].clone();
    for item in &items[1..] {
        acc = match op {
            "min" => {
                if item.compare(&acc) == Some(Ordering::Less) {
                    item.clone()
                } else {
                    acc
                }
            }
            "max" => {
                if item.compare(&acc) == Some(Ordering::Greater) {
                    item.clone()
                } else {
                    acc
                }
            }
            "sum" => arithmetic("+", vec![acc, item.clone()])?,
            _ => unreachable!(),
        };
    }
    Ok(acc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::builders::*;
    use crate::ast::Expression;

    fn eval(expr: &Expression) -> RadarResult<Value> {
        standard_evaluator().evaluate(expr)
    }

    #[test]
    fn test_literal_self_evaluates() {
        assert_eq!(
            eval(&Expression::literal(42i64)).unwrap(),
            Value::Long(42)
        );
    }

    #[test]
    fn test_arithmetic() {
        assert_eq!(
            eval(&add(Expression::literal(1i64), Expression::literal(2i64))).unwrap(),
            Value::Long(3)
        );
        assert_eq!(
            eval(&mul(Expression::literal(2i64), Expression::literal(0.5))).unwrap(),
            Value::Double(1.0)
        );
        assert_eq!(
            eval(&div(Expression::literal(7i64), Expression::literal(2i64))).unwrap(),
            Value::Long(3)
        );
        assert!(eval(&div(Expression::literal(1i64), Expression::literal(0i64))).is_err());
    }

    #[test]
    fn test_comparisons_coerce() {
        assert_eq!(
            eval(&eq(Expression::literal(2i64), Expression::literal(2.0))).unwrap(),
            Value::Bool(true)
        );
        assert_eq!(
            eval(&lt(Expression::literal(1i64), Expression::literal(2i64))).unwrap(),
            Value::Bool(true)
        );
        // Incomparable kinds satisfy nothing.
        assert_eq!(
            eval(&eq(Expression::literal(1i64), Expression::literal("1"))).unwrap(),
            Value::Bool(false)
        );
    }

    #[test]
    fn test_boolean_ops() {
        let t = Expression::literal(true);
        let f = Expression::literal(false);
        assert_eq!(eval(&and(t.clone(), f.clone())).unwrap(), Value::Bool(false));
        assert_eq!(eval(&or(t.clone(), f.clone())).unwrap(), Value::Bool(true));
        assert_eq!(eval(&not(f)).unwrap(), Value::Bool(true));
    }

    #[test]
    fn test_membership() {
        let e = is_in(
            Expression::literal("seang"),
            vec![Expression::literal("seang"), Expression::literal("searl")],
        );
        assert_eq!(eval(&e).unwrap(), Value::Bool(true));

        let miss = is_in(Expression::literal("sease"), vec![Expression::literal("seang")]);
        assert_eq!(eval(&miss).unwrap(), Value::Bool(false));
    }

    #[test]
    fn test_like_glob() {
        assert!(glob_match("WMO:02606", "WMO:*"));
        assert!(glob_match("seang", "*ang"));
        assert!(glob_match("seang", "se*g"));
        assert!(!glob_match("seang", "se*x"));
        assert!(glob_match("", "*"));

        let e = like(Expression::literal("WMO:02606"), "WMO:*");
        assert_eq!(eval(&e).unwrap(), Value::Bool(true));
    }

    #[test]
    fn test_between_half_open() {
        let probe = |x: i64| {
            eval(&between(
                Expression::literal(x),
                Expression::literal(1i64),
                Expression::literal(5i64),
            ))
            .unwrap()
        };
        assert_eq!(probe(0), Value::Bool(false));
        assert_eq!(probe(1), Value::Bool(true)); // low bound inclusive
        assert_eq!(probe(4), Value::Bool(true));
        assert_eq!(probe(5), Value::Bool(false)); // high bound exclusive
    }

    #[test]
    fn test_temporal_literals() {
        assert_eq!(
            eval(&date(2000, 1, 2)).unwrap(),
            Value::Date(NaiveDate::from_ymd_opt(2000, 1, 2).unwrap())
        );
        assert_eq!(
            eval(&time(12, 5, 0)).unwrap(),
            Value::Time(NaiveTime::from_hms_opt(12, 5, 0).unwrap())
        );
        assert!(eval(&date(2000, 13, 1)).is_err());
    }

    #[test]
    fn test_temporal_arithmetic() {
        let shifted = eval(&add(date(2000, 1, 2), interval(1, 0))).unwrap();
        assert_eq!(
            shifted,
            Value::Date(NaiveDate::from_ymd_opt(2000, 1, 3).unwrap())
        );
    }

    #[test]
    fn test_aggregates_fold_lists() {
        let list = Expression::List(vec![
            Expression::literal(3i64),
            Expression::literal(1i64),
            Expression::literal(2i64),
        ]);
        assert_eq!(eval(&min(list.clone())).unwrap(), Value::Long(1));
        assert_eq!(eval(&max(list.clone())).unwrap(), Value::Long(3));
        assert_eq!(eval(&sum(list.clone())).unwrap(), Value::Long(6));
        assert_eq!(eval(&count(list)).unwrap(), Value::Long(3));
    }

    #[test]
    fn test_unknown_operator() {
        let e = call("frobnicate", vec![Expression::literal(1i64)]);
        assert!(matches!(
            eval(&e).unwrap_err(),
            RadarError::Evaluation(_)
        ));
    }

    #[test]
    fn test_bare_symbol_errors() {
        assert!(eval(&Expression::symbol("min")).is_err());
        assert!(eval(&Expression::symbol("nonexistent")).is_err());
    }

    #[test]
    fn test_arity_mismatch() {
        let e = call("not", vec![Expression::literal(true), Expression::literal(true)]);
        assert!(matches!(
            eval(&e).unwrap_err(),
            RadarError::Evaluation(_)
        ));
    }

    #[test]
    fn test_data_list_evaluates_elementwise() {
        let e = Expression::List(vec![
            add(Expression::literal(1i64), Expression::literal(1i64)),
            Expression::literal(3i64),
        ]);
        assert_eq!(
            eval(&e).unwrap(),
            Value::List(vec![Value::Long(2), Value::Long(3)])
        );
    }

    #[test]
    fn test_empty_list_self_evaluates() {
        assert_eq!(
            eval(&Expression::List(vec![])).unwrap(),
            Value::List(vec![])
        );
    }
}
