//! Filter operators and their registry.
//!
//! An [`Operator`] turns `(column, data type, raw arguments)` into a boolean
//! condition. Operators never fail: an unsupported type or an argument that
//! does not coerce produces [`unsatisfiable`](crate::sql::expr::unsatisfiable)
//! so the query stays well formed and the clause matches nothing.
//!
//! The registry is built once and then read; extension goes through
//! [`OperatorRegistry::register`] and [`OperatorRegistry::override_operator`].

mod builtin;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use once_cell::sync::Lazy;
use thiserror::Error;

use crate::sql::expr::{unsatisfiable, Expr};
use crate::types::DataType;

pub use builtin::escape_like;

/// Operator used by search when none is configured.
pub const DEFAULT_SEARCH_OPERATOR: &str = "$cont";

/// Predicate builder: `(column, data type, arguments) -> condition`.
pub type BuildFn = Arc<dyn Fn(&Expr, DataType, &[String]) -> Expr + Send + Sync>;

/// Result type for registry mutations.
pub type RegistryResult<T> = Result<T, RegistryError>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("operator '{0}' is already registered")]
    AlreadyRegistered(String),
}

// =============================================================================
// Operator
// =============================================================================

/// A named predicate builder with a minimum argument count.
#[derive(Clone)]
pub struct Operator {
    name: String,
    required_args: usize,
    build: BuildFn,
}

impl Operator {
    pub fn new<F>(name: impl Into<String>, required_args: usize, build: F) -> Self
    where
        F: Fn(&Expr, DataType, &[String]) -> Expr + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            required_args,
            build: Arc::new(build),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn required_args(&self) -> usize {
        self.required_args
    }

    /// Build the condition for `column`.
    ///
    /// Too few arguments fails closed; the parser rejects that case earlier
    /// but filters can also be constructed directly.
    pub fn apply(&self, column: &Expr, data_type: DataType, args: &[String]) -> Expr {
        if args.len() < self.required_args {
            return unsatisfiable();
        }
        (self.build)(column, data_type, args)
    }
}

impl fmt::Debug for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Operator")
            .field("name", &self.name)
            .field("required_args", &self.required_args)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Registry
// =============================================================================

static STANDARD: Lazy<OperatorRegistry> = Lazy::new(OperatorRegistry::builtin);

/// Name → operator table.
#[derive(Debug, Clone, Default)]
pub struct OperatorRegistry {
    operators: BTreeMap<String, Operator>,
}

impl OperatorRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the built-in catalog.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        for op in builtin::catalog() {
            registry.operators.insert(op.name.clone(), op);
        }
        registry
    }

    /// The process-wide built-in catalog.
    pub fn standard() -> &'static OperatorRegistry {
        &STANDARD
    }

    /// Add a new operator. Fails if the name is taken.
    pub fn register(&mut self, op: Operator) -> RegistryResult<()> {
        if self.operators.contains_key(&op.name) {
            return Err(RegistryError::AlreadyRegistered(op.name));
        }
        self.operators.insert(op.name.clone(), op);
        Ok(())
    }

    /// Add or replace an operator, returning the one it replaced.
    pub fn override_operator(&mut self, op: Operator) -> Option<Operator> {
        self.operators.insert(op.name.clone(), op)
    }

    pub fn get(&self, name: &str) -> Option<&Operator> {
        self.operators.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.operators.contains_key(name)
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> Vec<&str> {
        self.operators.keys().map(String::as_str).collect()
    }
}
