//! Query parameter objects.

use radar_expr::Expression;

/// Query for stored files.
///
/// Results are file identities (one row per matching file); the filter
/// and order terms are expression ASTs over attribute references.
#[derive(Debug, Clone, Default)]
pub struct FileQuery {
    pub filter: Option<Expression>,
    pub order: Vec<Expression>,
    pub limit: Option<i64>,
    pub skip: Option<i64>,
}

impl FileQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_filter(mut self, filter: Expression) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Append an order term (an `asc`/`desc` call).
    pub fn order_by(mut self, term: Expression) -> Self {
        self.order.push(term);
        self
    }

    pub fn with_limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_skip(mut self, skip: i64) -> Self {
        self.skip = Some(skip);
        self
    }
}

/// Query for attribute values across files.
///
/// The select list is exactly the `fetch` entries, labeled by their keys
/// in insertion order.
#[derive(Debug, Clone, Default)]
pub struct AttributeQuery {
    pub fetch: Vec<(String, Expression)>,
    pub filter: Option<Expression>,
    pub distinct: bool,
    pub order: Vec<Expression>,
    pub group: Vec<Expression>,
    pub limit: Option<i64>,
    pub skip: Option<i64>,
}

impl AttributeQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fetch(mut self, key: &str, expr: Expression) -> Self {
        self.fetch.push((key.to_string(), expr));
        self
    }

    pub fn with_filter(mut self, filter: Expression) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn distinct(mut self, distinct: bool) -> Self {
        self.distinct = distinct;
        self
    }

    pub fn order_by(mut self, term: Expression) -> Self {
        self.order.push(term);
        self
    }

    pub fn group_by(mut self, term: Expression) -> Self {
        self.group.push(term);
        self
    }

    pub fn with_limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_skip(mut self, skip: i64) -> Self {
        self.skip = Some(skip);
        self
    }
}
