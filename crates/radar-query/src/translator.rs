//! Expression-to-SQL translation.
//!
//! A specialized evaluator walks the query ASTs and produces SQL
//! fragments instead of values. Attribute references grow the join graph
//! as they are resolved; each distinct attribute path joins exactly once
//! per statement, so repeated references share their joins.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};

use radar_common::{normalize_path, split_path, RadarError, RadarResult, Value};
use radar_expr::eval::arity;
use radar_expr::{AttributeType, Evaluator, Expression, Operand};

use crate::query::{AttributeQuery, FileQuery};
use crate::sql::{Direction, FromClause, JoinKind, SelectStatement, SqlFrag};

/// Operand domain of the SQL evaluator.
#[derive(Debug, Clone)]
enum SqlOperand {
    /// A literal that has not been bound yet; procedures that need raw
    /// values (attribute names, pattern strings) read it directly.
    Literal(Value),
    /// A SQL expression fragment.
    Frag(SqlFrag),
    /// A data list, as consumed by `in`.
    List(Vec<SqlOperand>),
    /// A direction-tagged ordering term produced by `asc`/`desc`.
    Ordered(SqlFrag, Direction),
}

impl Operand for SqlOperand {
    fn from_value(value: &Value) -> RadarResult<SqlOperand> {
        Ok(SqlOperand::Literal(value.clone()))
    }

    fn from_list(items: Vec<SqlOperand>) -> RadarResult<SqlOperand> {
        Ok(SqlOperand::List(items))
    }
}

impl SqlOperand {
    fn into_frag(self) -> RadarResult<SqlFrag> {
        match self {
            SqlOperand::Literal(Value::List(_)) => Err(RadarError::Evaluation(
                "list literal cannot be used as a scalar".into(),
            )),
            SqlOperand::Literal(value) => Ok(SqlFrag::bind(value)),
            SqlOperand::Frag(frag) => Ok(frag),
            SqlOperand::List(_) => Err(RadarError::Evaluation(
                "data list cannot be used as a scalar".into(),
            )),
            SqlOperand::Ordered(..) => Err(RadarError::Evaluation(
                "ordering term cannot be used as a value".into(),
            )),
        }
    }

    fn literal_str(&self) -> RadarResult<&str> {
        match self {
            SqlOperand::Literal(Value::Str(s)) => Ok(s),
            other => Err(RadarError::Evaluation(format!(
                "expected a string literal, got {:?}",
                other
            ))),
        }
    }

    fn literal_long(&self) -> RadarResult<i64> {
        match self {
            SqlOperand::Literal(Value::Long(v)) => Ok(*v),
            other => Err(RadarError::Evaluation(format!(
                "expected an integer literal, got {:?}",
                other
            ))),
        }
    }
}

/// Physical columns addressable without joining the node table.
const SPECIALIZED_COLUMNS: &[(&str, &str)] = &[
    ("file:uuid", "files.uuid"),
    ("file:stored_date", "files.stored_date"),
    ("file:stored_time", "files.stored_time"),
    ("file:size", "files.size"),
    ("what/object", "files.what_object"),
    ("what/date", "files.what_date"),
    ("what/time", "files.what_time"),
];

/// Join bookkeeping shared by the attribute-resolution procedures.
struct JoinState {
    from: FromClause,
    source_kv_aliases: HashMap<String, String>,
    attr_value_aliases: HashMap<String, String>,
    counter: usize,
}

impl JoinState {
    fn new() -> Self {
        Self {
            from: FromClause::new("files"),
            source_kv_aliases: HashMap::new(),
            attr_value_aliases: HashMap::new(),
            counter: 0,
        }
    }

    /// Resolve an `attr(name, type)` reference to a column fragment,
    /// growing the join graph as needed.
    fn resolve_attribute(&mut self, name: &str, ty: AttributeType) -> RadarResult<SqlFrag> {
        if let Some(key) = name
            .strip_prefix("what/source:")
            .or_else(|| name.strip_prefix("_bdb/source:"))
        {
            return Ok(self.source_column(key));
        }
        if let Some((_, column)) = SPECIALIZED_COLUMNS.iter().find(|(n, _)| *n == name) {
            return Ok(SqlFrag::raw(*column));
        }
        self.node_attribute_column(name, ty)
    }

    fn ensure_sources(&mut self) {
        if !self.from.contains("sources") {
            self.from.join(
                JoinKind::Inner,
                "sources",
                None,
                SqlFrag::raw("sources.id = files.source_id"),
            );
        }
    }

    /// Source sub-attribute: `_name` is the source name itself, anything
    /// else reads the key/value table through a per-key outer join.
    fn source_column(&mut self, key: &str) -> SqlFrag {
        self.ensure_sources();
        if key == "_name" {
            return SqlFrag::raw("sources.name");
        }
        if let Some(alias) = self.source_kv_aliases.get(key) {
            return SqlFrag::raw(format!("{}.value", alias));
        }
        let mut alias = format!("src_{}", sanitize_alias(key));
        if self.from.contains(&alias) {
            // Two distinct keys collapsed to the same sanitized alias.
            alias = format!("{}_{}", alias, self.counter);
            self.counter += 1;
        }
        self.from.join(
            JoinKind::LeftOuter,
            "source_kvs",
            Some(&alias),
            SqlFrag {
                sql: format!("{0}.source_id = sources.id AND {0}.key = ?", alias),
                params: vec![Value::from(key)],
            },
        );
        self.source_kv_aliases.insert(key.to_string(), alias.clone());
        SqlFrag::raw(format!("{}.value", alias))
    }

    /// Generic attribute path: match the node by name and its parent by
    /// name, then read the typed value column. Missing or wrong-typed
    /// attributes surface as NULL through the outer joins.
    fn node_attribute_column(&mut self, name: &str, ty: AttributeType) -> RadarResult<SqlFrag> {
        let path = normalize_path(name);
        let segments = split_path(&path);
        let (attr_name, groups) = segments.split_last().ok_or_else(|| {
            RadarError::Lookup(format!("empty attribute path: {:?}", name))
        })?;
        let parent_name = groups.last().ok_or_else(|| {
            RadarError::Lookup(format!("attribute {:?} has no parent group", path))
        })?;

        if let Some(alias) = self.attr_value_aliases.get(&path) {
            return Ok(value_column(alias, ty));
        }

        let idx = self.counter;
        self.counter += 1;
        let node_alias = format!("node{}", idx);
        let parent_alias = format!("parent{}", idx);
        let value_alias = format!("value{}", idx);

        if !self.from.contains(&node_alias) {
            self.from.join(
                JoinKind::LeftOuter,
                "nodes",
                Some(&node_alias),
                SqlFrag {
                    sql: format!(
                        "{0}.file_id = files.id AND {0}.name = ?",
                        node_alias
                    ),
                    params: vec![Value::from(attr_name.as_str())],
                },
            );
            self.from.join(
                JoinKind::LeftOuter,
                "nodes",
                Some(&parent_alias),
                SqlFrag {
                    sql: format!(
                        "{0}.id = {1}.parent_id AND {0}.name = ?",
                        parent_alias, node_alias
                    ),
                    params: vec![Value::from(parent_name.as_str())],
                },
            );
            self.from.join(
                JoinKind::LeftOuter,
                "attribute_values",
                Some(&value_alias),
                SqlFrag::raw(format!("{}.node_id = {}.id", value_alias, node_alias)),
            );
        }

        self.attr_value_aliases.insert(path, value_alias.clone());
        Ok(value_column(&value_alias, ty))
    }
}

fn value_column(alias: &str, ty: AttributeType) -> SqlFrag {
    SqlFrag::raw(format!("{}.value_{}", alias, ty.as_str()))
}

fn sanitize_alias(key: &str) -> String {
    key.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect()
}

/// One translation pass: an evaluator wired to shared join state.
struct Translator {
    evaluator: Evaluator<SqlOperand>,
    state: Rc<RefCell<JoinState>>,
}

impl Translator {
    fn new() -> Self {
        let state = Rc::new(RefCell::new(JoinState::new()));
        let mut evaluator: Evaluator<SqlOperand> = Evaluator::new();

        {
            let state = Rc::clone(&state);
            evaluator.register("attr", move |args| {
                let [name, ty] = arity::<_, 2>("attr", args)?;
                let ty: AttributeType = ty.literal_str()?.parse()?;
                state
                    .borrow_mut()
                    .resolve_attribute(name.literal_str()?, ty)
                    .map(SqlOperand::Frag)
            });
        }

        for (op, sql_op) in [("+", "+"), ("-", "-"), ("*", "*"), ("/", "/")] {
            evaluator.register(op, move |args| {
                let [lhs, rhs] = arity::<_, 2>(op, args)?;
                Ok(SqlOperand::Frag(SqlFrag::infix(
                    sql_op,
                    lhs.into_frag()?,
                    rhs.into_frag()?,
                )))
            });
        }

        for (op, sql_op) in [
            ("=", "="),
            ("!=", "!="),
            ("<", "<"),
            (">", ">"),
            ("<=", "<="),
            (">=", ">="),
        ] {
            evaluator.register(op, move |args| {
                let [lhs, rhs] = arity::<_, 2>(op, args)?;
                Ok(SqlOperand::Frag(SqlFrag::infix(
                    sql_op,
                    lhs.into_frag()?,
                    rhs.into_frag()?,
                )))
            });
        }

        for (op, sql_op) in [("and", "AND"), ("or", "OR")] {
            evaluator.register(op, move |args| {
                let [lhs, rhs] = arity::<_, 2>(op, args)?;
                Ok(SqlOperand::Frag(SqlFrag::infix(
                    sql_op,
                    lhs.into_frag()?,
                    rhs.into_frag()?,
                )))
            });
        }
        evaluator.register("not", |args| {
            let [arg] = arity::<_, 1>("not", args)?;
            Ok(SqlOperand::Frag(SqlFrag::negate(arg.into_frag()?)))
        });

        // `*` is the expression wildcard; SQL LIKE wants `%`.
        evaluator.register("like", |args| {
            let [lhs, pattern] = arity::<_, 2>("like", args)?;
            let translated = pattern.literal_str()?.replace('*', "%");
            Ok(SqlOperand::Frag(SqlFrag::infix(
                "LIKE",
                lhs.into_frag()?,
                SqlFrag::bind(Value::Str(translated)),
            )))
        });

        evaluator.register("in", |args| {
            let [needle, haystack] = arity::<_, 2>("in", args)?;
            let items = match haystack {
                SqlOperand::List(items) => items,
                SqlOperand::Literal(Value::List(values)) => values
                    .into_iter()
                    .map(SqlOperand::Literal)
                    .collect(),
                other => {
                    return Err(RadarError::Evaluation(format!(
                        "in expects a list, got {:?}",
                        other
                    )))
                }
            };
            if items.is_empty() {
                // Nothing is a member of the empty list.
                return Ok(SqlOperand::Frag(SqlFrag::raw("FALSE")));
            }
            let needle = needle.into_frag()?;
            let mut sql = format!("{} IN (", needle.sql);
            let mut params = needle.params;
            for (i, item) in items.into_iter().enumerate() {
                let frag = item.into_frag()?;
                if i > 0 {
                    sql.push_str(", ");
                }
                sql.push_str(&frag.sql);
                params.extend(frag.params);
            }
            sql.push(')');
            Ok(SqlOperand::Frag(SqlFrag { sql, params }))
        });

        // Half-open: low <= x < high.
        evaluator.register("between", |args| {
            let [x, low, high] = arity::<_, 3>("between", args)?;
            let x = x.into_frag()?;
            let lower = SqlFrag::infix("<=", low.into_frag()?, x.clone());
            let upper = SqlFrag::infix("<", x, high.into_frag()?);
            Ok(SqlOperand::Frag(SqlFrag::infix("AND", lower, upper)))
        });

        evaluator.register("asc", |args| {
            let [arg] = arity::<_, 1>("asc", args)?;
            Ok(SqlOperand::Ordered(arg.into_frag()?, Direction::Asc))
        });
        evaluator.register("desc", |args| {
            let [arg] = arity::<_, 1>("desc", args)?;
            Ok(SqlOperand::Ordered(arg.into_frag()?, Direction::Desc))
        });

        for agg in ["min", "max", "sum", "count"] {
            evaluator.register(agg, move |args| {
                let [arg] = arity::<_, 1>(agg, args)?;
                Ok(SqlOperand::Frag(SqlFrag::func(agg, arg.into_frag()?)))
            });
        }

        evaluator.register("date", |args| {
            let [y, m, d] = arity::<_, 3>("date", args)?;
            NaiveDate::from_ymd_opt(
                y.literal_long()? as i32,
                m.literal_long()? as u32,
                d.literal_long()? as u32,
            )
            .map(|date| SqlOperand::Literal(Value::Date(date)))
            .ok_or_else(|| RadarError::Evaluation("invalid date literal".into()))
        });
        evaluator.register("time", |args| {
            let [h, m, s] = arity::<_, 3>("time", args)?;
            NaiveTime::from_hms_opt(
                h.literal_long()? as u32,
                m.literal_long()? as u32,
                s.literal_long()? as u32,
            )
            .map(|time| SqlOperand::Literal(Value::Time(time)))
            .ok_or_else(|| RadarError::Evaluation("invalid time literal".into()))
        });
        evaluator.register("datetime", |args| {
            let [y, mo, d, h, mi, s] = arity::<_, 6>("datetime", args)?;
            let date = NaiveDate::from_ymd_opt(
                y.literal_long()? as i32,
                mo.literal_long()? as u32,
                d.literal_long()? as u32,
            );
            let time = NaiveTime::from_hms_opt(
                h.literal_long()? as u32,
                mi.literal_long()? as u32,
                s.literal_long()? as u32,
            );
            match (date, time) {
                (Some(date), Some(time)) => Ok(SqlOperand::Literal(Value::DateTime(
                    NaiveDateTime::new(date, time),
                ))),
                _ => Err(RadarError::Evaluation("invalid datetime literal".into())),
            }
        });
        evaluator.register("interval", |args| {
            let [days, seconds] = arity::<_, 2>("interval", args)?;
            Ok(SqlOperand::Literal(Value::Interval(
                Duration::days(days.literal_long()?)
                    + Duration::seconds(seconds.literal_long()?),
            )))
        });

        Self { evaluator, state }
    }

    fn eval_frag(&self, expr: &Expression) -> RadarResult<SqlFrag> {
        self.evaluator.evaluate(expr)?.into_frag()
    }

    /// Order terms are `asc`/`desc` calls; an untagged term orders
    /// ascending.
    fn eval_ordered(&self, expr: &Expression) -> RadarResult<(SqlFrag, Direction)> {
        match self.evaluator.evaluate(expr)? {
            SqlOperand::Ordered(frag, direction) => Ok((frag, direction)),
            other => Ok((other.into_frag()?, Direction::Asc)),
        }
    }

    fn from_clause(&self) -> FromClause {
        self.state.borrow().from.clone()
    }
}

/// Translate a file query into one select statement.
///
/// The result set is file identities. With explicit order terms the
/// statement groups by file identity and orders on `min`/`max` of the
/// resolved columns; otherwise the join fan-out is collapsed with
/// `DISTINCT` and rows are ordered by insertion id, the only stable
/// ordering available.
pub fn transform_file_query(query: &FileQuery) -> RadarResult<SelectStatement> {
    let translator = Translator::new();
    let mut stmt = SelectStatement::new(FromClause::new("files"));
    stmt.column("id", SqlFrag::raw("files.id"));
    stmt.column("uuid", SqlFrag::raw("files.uuid"));

    if let Some(filter) = &query.filter {
        stmt.where_clause = Some(translator.eval_frag(filter)?);
    }

    if query.order.is_empty() {
        stmt.distinct = true;
        stmt.order_by
            .push((SqlFrag::raw("files.id"), Direction::Asc));
    } else {
        for term in &query.order {
            let (frag, direction) = translator.eval_ordered(term)?;
            let wrapped = match direction {
                Direction::Asc => SqlFrag::func("min", frag),
                Direction::Desc => SqlFrag::func("max", frag),
            };
            stmt.order_by.push((wrapped, direction));
        }
        stmt.group_by.push(SqlFrag::raw("files.id"));
        stmt.group_by.push(SqlFrag::raw("files.uuid"));
    }

    stmt.limit = query.limit;
    stmt.offset = query.skip;
    stmt.from = translator.from_clause();
    Ok(stmt)
}

/// Translate an attribute query into one select statement.
pub fn transform_attribute_query(query: &AttributeQuery) -> RadarResult<SelectStatement> {
    if query.fetch.is_empty() {
        return Err(RadarError::Value(
            "attribute query fetches no columns".into(),
        ));
    }

    let translator = Translator::new();
    let mut stmt = SelectStatement::new(FromClause::new("files"));
    stmt.distinct = query.distinct;

    for (key, expr) in &query.fetch {
        let frag = translator.eval_frag(expr)?;
        stmt.column(key, frag);
    }

    if let Some(filter) = &query.filter {
        stmt.where_clause = Some(translator.eval_frag(filter)?);
    }

    for term in &query.group {
        stmt.group_by.push(translator.eval_frag(term)?);
    }

    for term in &query.order {
        let (frag, direction) = translator.eval_ordered(term)?;
        stmt.order_by.push((frag, direction));
    }

    stmt.limit = query.limit;
    stmt.offset = query.skip;
    stmt.from = translator.from_clause();
    Ok(stmt)
}

#[cfg(test)]
mod tests {
    use super::*;
    use radar_expr::ast::builders::*;

    fn attr_long(name: &str) -> Expression {
        attribute(name, AttributeType::Long)
    }

    fn attr_str(name: &str) -> Expression {
        attribute(name, AttributeType::String)
    }

    #[test]
    fn test_unordered_file_query_is_distinct() {
        let stmt = transform_file_query(&FileQuery::new()).unwrap();
        let (sql, params) = stmt.to_sql();
        assert_eq!(
            sql,
            r#"SELECT DISTINCT files.id AS "id", files.uuid AS "uuid" FROM files ORDER BY files.id ASC"#
        );
        assert!(params.is_empty());
    }

    #[test]
    fn test_specialized_column_filter() {
        let query = FileQuery::new()
            .with_filter(eq(attr_str("what/object"), Expression::literal("pvol")));
        let (sql, params) = transform_file_query(&query).unwrap().to_sql();
        assert_eq!(
            sql,
            r#"SELECT DISTINCT files.id AS "id", files.uuid AS "uuid" FROM files WHERE (files.what_object = $1) ORDER BY files.id ASC"#
        );
        assert_eq!(params, vec![Value::from("pvol")]);
    }

    #[test]
    fn test_generic_attribute_joins() {
        let query = FileQuery::new()
            .with_filter(gt(attr_long("where/xsize"), Expression::literal(100i64)));
        let (sql, params) = transform_file_query(&query).unwrap().to_sql();
        assert_eq!(
            sql,
            r#"SELECT DISTINCT files.id AS "id", files.uuid AS "uuid" FROM files LEFT JOIN nodes node0 ON node0.file_id = files.id AND node0.name = $1 LEFT JOIN nodes parent0 ON parent0.id = node0.parent_id AND parent0.name = $2 LEFT JOIN attribute_values value0 ON value0.node_id = node0.id WHERE (value0.value_long > $3) ORDER BY files.id ASC"#
        );
        assert_eq!(
            params,
            vec![
                Value::from("xsize"),
                Value::from("where"),
                Value::Long(100)
            ]
        );
    }

    #[test]
    fn test_repeated_path_joins_once() {
        let filter = and(
            gt(attr_long("where/xsize"), Expression::literal(0i64)),
            lt(attr_long("where/xsize"), Expression::literal(500i64)),
        );
        let stmt = transform_file_query(&FileQuery::new().with_filter(filter)).unwrap();
        // One join triple for the shared path.
        assert_eq!(stmt.from.joins.len(), 3);
        let (sql, params) = stmt.to_sql();
        assert_eq!(
            sql,
            r#"SELECT DISTINCT files.id AS "id", files.uuid AS "uuid" FROM files LEFT JOIN nodes node0 ON node0.file_id = files.id AND node0.name = $1 LEFT JOIN nodes parent0 ON parent0.id = node0.parent_id AND parent0.name = $2 LEFT JOIN attribute_values value0 ON value0.node_id = node0.id WHERE ((value0.value_long > $3) AND (value0.value_long < $4)) ORDER BY files.id ASC"#
        );
        assert_eq!(
            params,
            vec![
                Value::from("xsize"),
                Value::from("where"),
                Value::Long(0),
                Value::Long(500)
            ]
        );
    }

    #[test]
    fn test_distinct_paths_join_separately() {
        let filter = and(
            eq(attr_long("where/xsize"), Expression::literal(240i64)),
            eq(attr_long("where/ysize"), Expression::literal(240i64)),
        );
        let stmt = transform_file_query(&FileQuery::new().with_filter(filter)).unwrap();
        assert_eq!(stmt.from.joins.len(), 6);
    }

    #[test]
    fn test_absolute_path_matches_trailing_segments() {
        let query = FileQuery::new().with_filter(eq(
            attr_long("/dataset1/where/xsize"),
            Expression::literal(240i64),
        ));
        let (sql, params) = transform_file_query(&query).unwrap().to_sql();
        // Only the attribute and its immediate parent name take part in
        // the match.
        assert!(sql.contains("node0.name = $1"));
        assert!(sql.contains("parent0.name = $2"));
        assert_eq!(
            params,
            vec![
                Value::from("xsize"),
                Value::from("where"),
                Value::Long(240)
            ]
        );
    }

    #[test]
    fn test_source_kv_filter() {
        let query = FileQuery::new().with_filter(eq(
            attr_str("what/source:NOD"),
            Expression::literal("seang"),
        ));
        let (sql, params) = transform_file_query(&query).unwrap().to_sql();
        assert_eq!(
            sql,
            r#"SELECT DISTINCT files.id AS "id", files.uuid AS "uuid" FROM files JOIN sources ON sources.id = files.source_id LEFT JOIN source_kvs src_nod ON src_nod.source_id = sources.id AND src_nod.key = $1 WHERE (src_nod.value = $2) ORDER BY files.id ASC"#
        );
        assert_eq!(params, vec![Value::from("NOD"), Value::from("seang")]);
    }

    #[test]
    fn test_source_name_column() {
        let query = FileQuery::new().with_filter(eq(
            attr_str("what/source:_name"),
            Expression::literal("seang"),
        ));
        let (sql, params) = transform_file_query(&query).unwrap().to_sql();
        assert_eq!(
            sql,
            r#"SELECT DISTINCT files.id AS "id", files.uuid AS "uuid" FROM files JOIN sources ON sources.id = files.source_id WHERE (sources.name = $1) ORDER BY files.id ASC"#
        );
        assert_eq!(params, vec![Value::from("seang")]);
    }

    #[test]
    fn test_bdb_source_prefix_shares_join() {
        let filter = and(
            eq(attr_str("what/source:_name"), Expression::literal("seang")),
            eq(attr_str("_bdb/source:PLC"), Expression::literal("Ängelholm")),
        );
        let stmt = transform_file_query(&FileQuery::new().with_filter(filter)).unwrap();
        // sources joined once, one kv join for PLC.
        assert_eq!(stmt.from.joins.len(), 2);
    }

    #[test]
    fn test_ordered_file_query_groups_and_aggregates() {
        let query = FileQuery::new()
            .order_by(desc(attribute("what/date", AttributeType::Date)))
            .order_by(asc(attribute("what/time", AttributeType::Time)));
        let (sql, params) = transform_file_query(&query).unwrap().to_sql();
        assert_eq!(
            sql,
            r#"SELECT files.id AS "id", files.uuid AS "uuid" FROM files GROUP BY files.id, files.uuid ORDER BY max(files.what_date) DESC, min(files.what_time) ASC"#
        );
        assert!(params.is_empty());
    }

    #[test]
    fn test_ordered_file_query_on_node_attribute() {
        let query = FileQuery::new().order_by(desc(attr_long("where/elangle")));
        let (sql, params) = transform_file_query(&query).unwrap().to_sql();
        assert_eq!(
            sql,
            r#"SELECT files.id AS "id", files.uuid AS "uuid" FROM files LEFT JOIN nodes node0 ON node0.file_id = files.id AND node0.name = $1 LEFT JOIN nodes parent0 ON parent0.id = node0.parent_id AND parent0.name = $2 LEFT JOIN attribute_values value0 ON value0.node_id = node0.id GROUP BY files.id, files.uuid ORDER BY max(value0.value_long) DESC"#
        );
        assert_eq!(params, vec![Value::from("elangle"), Value::from("where")]);
    }

    #[test]
    fn test_limit_and_skip() {
        let query = FileQuery::new().with_limit(10).with_skip(20);
        let (sql, _) = transform_file_query(&query).unwrap().to_sql();
        assert!(sql.ends_with(" LIMIT 10 OFFSET 20"));
    }

    #[test]
    fn test_like_translates_wildcard() {
        let query = FileQuery::new()
            .with_filter(like(attr_str("what/source:CMT"), "se*"));
        let (sql, params) = transform_file_query(&query).unwrap().to_sql();
        assert!(sql.contains("(src_cmt.value LIKE $2)"));
        assert_eq!(params, vec![Value::from("CMT"), Value::from("se%")]);
    }

    #[test]
    fn test_in_membership() {
        let query = FileQuery::new().with_filter(is_in(
            attr_str("what/object"),
            vec![Expression::literal("pvol"), Expression::literal("scan")],
        ));
        let (sql, params) = transform_file_query(&query).unwrap().to_sql();
        assert!(sql.contains("files.what_object IN ($1, $2)"));
        assert_eq!(params, vec![Value::from("pvol"), Value::from("scan")]);
    }

    #[test]
    fn test_in_empty_list_matches_nothing() {
        let query = FileQuery::new().with_filter(is_in(attr_str("what/object"), vec![]));
        let (sql, params) = transform_file_query(&query).unwrap().to_sql();
        assert!(sql.contains("WHERE FALSE"));
        assert!(params.is_empty());
    }

    #[test]
    fn test_between_is_half_open() {
        let query = FileQuery::new().with_filter(between(
            attribute("what/date", AttributeType::Date),
            date(2000, 1, 1),
            date(2001, 1, 1),
        ));
        let (sql, params) = transform_file_query(&query).unwrap().to_sql();
        assert!(
            sql.contains("(($1 <= files.what_date) AND (files.what_date < $2))"),
            "got {}",
            sql
        );
        assert_eq!(
            params,
            vec![
                Value::Date(NaiveDate::from_ymd_opt(2000, 1, 1).unwrap()),
                Value::Date(NaiveDate::from_ymd_opt(2001, 1, 1).unwrap()),
            ]
        );
    }

    #[test]
    fn test_temporal_literals_bind_typed_values() {
        let query = FileQuery::new().with_filter(and(
            eq(attribute("what/date", AttributeType::Date), date(2000, 1, 2)),
            eq(attribute("what/time", AttributeType::Time), time(12, 5, 0)),
        ));
        let (_, params) = transform_file_query(&query).unwrap().to_sql();
        assert_eq!(
            params,
            vec![
                Value::Date(NaiveDate::from_ymd_opt(2000, 1, 2).unwrap()),
                Value::Time(NaiveTime::from_hms_opt(12, 5, 0).unwrap()),
            ]
        );
    }

    #[test]
    fn test_arithmetic_on_columns() {
        let query = FileQuery::new().with_filter(gt(
            mul(attr_long("where/xsize"), attr_long("where/ysize")),
            Expression::literal(1_000_000i64),
        ));
        let (sql, _) = transform_file_query(&query).unwrap().to_sql();
        assert!(sql.contains("((value0.value_long * value1.value_long) > $5)"));
    }

    #[test]
    fn test_root_level_attribute_is_lookup_error() {
        let query = FileQuery::new()
            .with_filter(eq(attr_str("object"), Expression::literal("pvol")));
        assert!(matches!(
            transform_file_query(&query).unwrap_err(),
            RadarError::Lookup(_)
        ));
    }

    #[test]
    fn test_unknown_operator_is_evaluation_error() {
        let query = FileQuery::new().with_filter(call(
            "frobnicate",
            vec![Expression::literal(1i64)],
        ));
        assert!(matches!(
            transform_file_query(&query).unwrap_err(),
            RadarError::Evaluation(_)
        ));
    }

    #[test]
    fn test_attribute_query_fetch_labels() {
        let query = AttributeQuery::new()
            .fetch("uuid", attr_str("file:uuid"))
            .fetch("xsize", attr_long("where/xsize"));
        let (sql, params) = transform_attribute_query(&query).unwrap().to_sql();
        assert_eq!(
            sql,
            r#"SELECT files.uuid AS "uuid", value0.value_long AS "xsize" FROM files LEFT JOIN nodes node0 ON node0.file_id = files.id AND node0.name = $1 LEFT JOIN nodes parent0 ON parent0.id = node0.parent_id AND parent0.name = $2 LEFT JOIN attribute_values value0 ON value0.node_id = node0.id"#
        );
        assert_eq!(params, vec![Value::from("xsize"), Value::from("where")]);
    }

    #[test]
    fn test_attribute_query_shares_joins_between_fetch_and_filter() {
        let query = AttributeQuery::new()
            .fetch("xsize", attr_long("where/xsize"))
            .with_filter(gt(attr_long("where/xsize"), Expression::literal(0i64)));
        let stmt = transform_attribute_query(&query).unwrap();
        assert_eq!(stmt.from.joins.len(), 3);
        let (sql, params) = stmt.to_sql();
        assert_eq!(
            sql,
            r#"SELECT value0.value_long AS "xsize" FROM files LEFT JOIN nodes node0 ON node0.file_id = files.id AND node0.name = $1 LEFT JOIN nodes parent0 ON parent0.id = node0.parent_id AND parent0.name = $2 LEFT JOIN attribute_values value0 ON value0.node_id = node0.id WHERE (value0.value_long > $3)"#
        );
        assert_eq!(
            params,
            vec![Value::from("xsize"), Value::from("where"), Value::Long(0)]
        );
    }

    #[test]
    fn test_attribute_query_group_and_aggregate() {
        let query = AttributeQuery::new()
            .fetch("source", attr_str("what/source:_name"))
            .fetch("count", count(attr_str("file:uuid")))
            .group_by(attr_str("what/source:_name"));
        let (sql, params) = transform_attribute_query(&query).unwrap().to_sql();
        assert_eq!(
            sql,
            r#"SELECT sources.name AS "source", count(files.uuid) AS "count" FROM files JOIN sources ON sources.id = files.source_id GROUP BY sources.name"#
        );
        assert!(params.is_empty());
    }

    #[test]
    fn test_attribute_query_distinct_order_limit() {
        let query = AttributeQuery::new()
            .fetch("object", attr_str("what/object"))
            .distinct(true)
            .order_by(asc(attr_str("what/object")))
            .with_limit(5)
            .with_skip(2);
        let (sql, _) = transform_attribute_query(&query).unwrap().to_sql();
        assert_eq!(
            sql,
            r#"SELECT DISTINCT files.what_object AS "object" FROM files ORDER BY files.what_object ASC LIMIT 5 OFFSET 2"#
        );
    }

    #[test]
    fn test_attribute_query_aggregate_fetch() {
        let query = AttributeQuery::new()
            .fetch("min_xsize", min(attr_long("where/xsize")))
            .fetch("max_xsize", max(attr_long("where/xsize")));
        let (sql, _) = transform_attribute_query(&query).unwrap().to_sql();
        assert!(sql.contains(r#"min(value0.value_long) AS "min_xsize""#));
        assert!(sql.contains(r#"max(value0.value_long) AS "max_xsize""#));
    }

    #[test]
    fn test_attribute_query_requires_fetch() {
        assert!(matches!(
            transform_attribute_query(&AttributeQuery::new()).unwrap_err(),
            RadarError::Value(_)
        ));
    }

    #[test]
    fn test_ordering_term_rejected_as_value() {
        let query = FileQuery::new()
            .with_filter(desc(attr_long("where/xsize")));
        assert!(matches!(
            transform_file_query(&query).unwrap_err(),
            RadarError::Evaluation(_)
        ));
    }
}
