//! A small relational query model.
//!
//! Fragments carry SQL text with `?` placeholders plus their bind values;
//! [`SelectStatement::to_sql`] assembles the pieces in text order and
//! renders PostgreSQL-style `$n` parameters.

use radar_common::Value;

/// A SQL expression fragment with its bind parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlFrag {
    pub sql: String,
    pub params: Vec<Value>,
}

impl SqlFrag {
    /// Raw SQL text with no parameters (column references, constants).
    pub fn raw(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: Vec::new(),
        }
    }

    /// A single bound value.
    pub fn bind(value: Value) -> Self {
        Self {
            sql: "?".to_string(),
            params: vec![value],
        }
    }

    /// `(lhs op rhs)`.
    pub fn infix(op: &str, lhs: SqlFrag, rhs: SqlFrag) -> Self {
        let mut params = lhs.params;
        params.extend(rhs.params);
        Self {
            sql: format!("({} {} {})", lhs.sql, op, rhs.sql),
            params,
        }
    }

    /// `name(arg)`.
    pub fn func(name: &str, arg: SqlFrag) -> Self {
        Self {
            sql: format!("{}({})", name, arg.sql),
            params: arg.params,
        }
    }

    /// `NOT (arg)`.
    pub fn negate(arg: SqlFrag) -> Self {
        Self {
            sql: format!("NOT ({})", arg.sql),
            params: arg.params,
        }
    }
}

/// Sort direction for an order-by term.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

impl Direction {
    fn as_sql(&self) -> &'static str {
        match self {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        }
    }
}

/// Join flavor; attribute joins are outer so missing attributes yield
/// NULL instead of dropping the file row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    LeftOuter,
}

/// One join entry in a from clause.
#[derive(Debug, Clone)]
pub struct Join {
    pub kind: JoinKind,
    pub table: String,
    pub alias: Option<String>,
    pub on: SqlFrag,
}

/// The base relation plus its accumulated joins.
#[derive(Debug, Clone)]
pub struct FromClause {
    pub base: String,
    pub joins: Vec<Join>,
}

impl FromClause {
    pub fn new(base: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            joins: Vec::new(),
        }
    }

    /// Whether a table or alias is already part of this clause. Used as
    /// the dedup guard before adding attribute joins.
    pub fn contains(&self, name: &str) -> bool {
        if self.base == name {
            return true;
        }
        self.joins
            .iter()
            .any(|j| j.table == name || j.alias.as_deref() == Some(name))
    }

    pub fn join(&mut self, kind: JoinKind, table: &str, alias: Option<&str>, on: SqlFrag) {
        self.joins.push(Join {
            kind,
            table: table.to_string(),
            alias: alias.map(|a| a.to_string()),
            on,
        });
    }
}

/// One labeled select-list entry.
#[derive(Debug, Clone)]
pub struct SelectColumn {
    pub label: String,
    pub expr: SqlFrag,
}

/// A complete, executable select statement.
#[derive(Debug, Clone)]
pub struct SelectStatement {
    pub distinct: bool,
    pub columns: Vec<SelectColumn>,
    pub from: FromClause,
    pub where_clause: Option<SqlFrag>,
    pub group_by: Vec<SqlFrag>,
    pub order_by: Vec<(SqlFrag, Direction)>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl SelectStatement {
    pub fn new(from: FromClause) -> Self {
        Self {
            distinct: false,
            columns: Vec::new(),
            from,
            where_clause: None,
            group_by: Vec::new(),
            order_by: Vec::new(),
            limit: None,
            offset: None,
        }
    }

    pub fn column(&mut self, label: &str, expr: SqlFrag) {
        self.columns.push(SelectColumn {
            label: label.to_string(),
            expr,
        });
    }

    /// Render to one SQL string with `$1…$n` binds and the parameter list
    /// in matching order.
    pub fn to_sql(&self) -> (String, Vec<Value>) {
        let mut sql = String::new();
        let mut params = Vec::new();

        sql.push_str("SELECT ");
        if self.distinct {
            sql.push_str("DISTINCT ");
        }
        for (i, col) in self.columns.iter().enumerate() {
            if i > 0 {
                sql.push_str(", ");
            }
            sql.push_str(&col.expr.sql);
            sql.push_str(" AS \"");
            sql.push_str(&col.label.replace('"', "\"\""));
            sql.push('"');
            params.extend(col.expr.params.iter().cloned());
        }

        sql.push_str(" FROM ");
        sql.push_str(&self.from.base);
        for join in &self.from.joins {
            sql.push_str(match join.kind {
                JoinKind::Inner => " JOIN ",
                JoinKind::LeftOuter => " LEFT JOIN ",
            });
            sql.push_str(&join.table);
            if let Some(alias) = &join.alias {
                sql.push(' ');
                sql.push_str(alias);
            }
            sql.push_str(" ON ");
            sql.push_str(&join.on.sql);
            params.extend(join.on.params.iter().cloned());
        }

        if let Some(where_clause) = &self.where_clause {
            sql.push_str(" WHERE ");
            sql.push_str(&where_clause.sql);
            params.extend(where_clause.params.iter().cloned());
        }

        if !self.group_by.is_empty() {
            sql.push_str(" GROUP BY ");
            for (i, term) in self.group_by.iter().enumerate() {
                if i > 0 {
                    sql.push_str(", ");
                }
                sql.push_str(&term.sql);
                params.extend(term.params.iter().cloned());
            }
        }

        if !self.order_by.is_empty() {
            sql.push_str(" ORDER BY ");
            for (i, (term, direction)) in self.order_by.iter().enumerate() {
                if i > 0 {
                    sql.push_str(", ");
                }
                sql.push_str(&term.sql);
                sql.push(' ');
                sql.push_str(direction.as_sql());
                params.extend(term.params.iter().cloned());
            }
        }

        if let Some(limit) = self.limit {
            sql.push_str(&format!(" LIMIT {}", limit));
        }
        if let Some(offset) = self.offset {
            sql.push_str(&format!(" OFFSET {}", offset));
        }

        (number_placeholders(&sql), params)
    }
}

/// Replace successive `?` placeholders with `$1…$n`.
///
/// Values are always bound, never inlined, so `?` cannot occur inside a
/// string literal here.
fn number_placeholders(sql: &str) -> String {
    let mut out = String::with_capacity(sql.len() + 8);
    let mut n = 0;
    for ch in sql.chars() {
        if ch == '?' {
            n += 1;
            out.push('$');
            out.push_str(&n.to_string());
        } else {
            out.push(ch);
        }
    }
    out
}
