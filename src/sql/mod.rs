//! SQL generation module.
//!
//! A small, type-safe SELECT builder that renders to several SQL dialects.
//! Filter compilation produces [`Expr`] trees and edits a caller-supplied
//! [`Query`]; nothing here knows about records or request strings.
//!
//! - [`query`] - SELECT query builder
//! - [`expr`] - Expression AST and builder DSL
//! - [`token`] - Token types for SQL generation
//! - [`dialect`] - SQL dialect implementations

pub mod dialect;
pub mod expr;
pub mod query;
pub mod token;

#[cfg(test)]
pub mod test_utils;

// Re-export commonly used types at the sql module level
pub use dialect::{Dialect, SqlDialect};
pub use expr::{
    col, computed, conjunction, disjunction, lit_bool, lit_float, lit_int, lit_str, lit_timestamp,
    lit_uint, table_col, unsatisfiable, BinaryOperator, Expr, ExprExt, Literal,
    CURRENT_TABLE_PLACEHOLDER,
};
pub use query::{Join, JoinType, LimitOffset, OrderByExpr, Query, SelectExpr, SortDir, TableRef};
pub use token::{Token, TokenStream};
