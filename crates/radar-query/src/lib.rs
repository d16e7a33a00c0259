//! Query objects and their translation to executable SQL.
//!
//! A [`FileQuery`] or [`AttributeQuery`] carries expression ASTs for
//! filtering, ordering, grouping and projection; the translator turns one
//! query into exactly one [`SelectStatement`] over the relational schema,
//! building the join graph for attribute references on the fly.

pub mod query;
pub mod sql;
pub mod translator;

pub use query::{AttributeQuery, FileQuery};
pub use sql::{Direction, FromClause, Join, JoinKind, SelectStatement, SqlFrag};
pub use translator::{transform_attribute_query, transform_file_query};
