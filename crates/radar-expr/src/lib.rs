//! Expression language for metadata queries.
//!
//! Queries carry small s-expression style ASTs: symbols name operators,
//! literals carry values, and nested lists form calls. The evaluator walks
//! an AST bottom-up through a typed dispatch table; specialized evaluators
//! (such as the SQL translator) plug in their own operand type.

pub mod ast;
pub mod eval;
pub mod json;

pub use ast::{AttributeType, Expression};
pub use eval::{standard_evaluator, Evaluator, Operand};
pub use json::{unwrap_json, wrap_json};
