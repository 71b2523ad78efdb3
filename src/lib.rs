//! # Sieve
//!
//! Compiles client-supplied query strings (filter, sort, join, search,
//! field selection) into safe SELECT transformations over declared record
//! types.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────┐      ┌──────────────────────────┐
//! │  query string pairs      │      │  Record::describe()      │
//! └──────────────────────────┘      └──────────────────────────┘
//!              │ [dsl]                           │ [schema]
//!              ▼                                 ▼
//! ┌──────────────────────────┐      ┌──────────────────────────┐
//! │  Request descriptors     │      │  SchemaGraph (cached)    │
//! └──────────────────────────┘      └──────────────────────────┘
//!              │                                 │
//!              └───────────────┬─────────────────┘
//!                              ▼ [scope]
//! ┌─────────────────────────────────────────────────────────────┐
//! │  blacklist → planner (joins, columns) → operator (predicates) │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼ [sql]
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  Query (any dialect)                        │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! User input only reaches SQL as literals produced by type coercion.
//! Unknown and forbidden terms are dropped; values that do not fit a column
//! make their clause match nothing.

pub mod blacklist;
pub mod config;
pub mod dsl;
pub mod error;
pub mod operator;
pub mod planner;
pub mod schema;
pub mod scope;
pub mod sql;
pub mod types;

pub use error::{CompileError, CompileResult, Error, Result};

/// Re-exports for convenient usage.
pub mod prelude {
    pub use crate::blacklist::Blacklist;
    pub use crate::config::Settings;
    pub use crate::dsl::{Filter, Join, Request, Sort, SortOrder};
    pub use crate::operator::{Operator, OperatorRegistry};
    pub use crate::schema::{FieldDescriptor, Record, RecordDescriptor, RelationKind, Schema};
    pub use crate::scope::{Pagination, Scope};
    pub use crate::sql::{Dialect, Query, TableRef};
    pub use crate::types::{ColumnType, DataType, ScalarType};
    pub use crate::{CompileError, Error};
}
