//! Boolean query expressions and node-range matching for job records.
//!
//! A query is a small boolean expression over bare terms, combined
//! with `and`, `or`, `not` and parentheses. Expressions are parsed
//! once into an AST and evaluated per record; what a term means
//! (string equality, numeric comparison, node membership) depends on
//! the field the query is bound to.

pub mod expr;
pub mod field;
pub mod nodes;

pub use expr::{Expr, ExprError};
pub use field::{EvalError, FieldQuery, QueryField};
pub use nodes::NodeSet;
