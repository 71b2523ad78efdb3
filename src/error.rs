//! Crate-level error types.
//!
//! Only malformed input and structural schema problems are errors. Unknown
//! or forbidden fields are dropped and type mismatches compile to an
//! unsatisfiable condition; neither reaches this module.

use thiserror::Error;

use crate::config::SettingsError;
use crate::dsl::ParseError;
use crate::operator::RegistryError;

/// Result type for query compilation.
pub type CompileResult<T> = std::result::Result<T, CompileError>;

/// Fatal compilation errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CompileError {
    /// A joined result cannot be reassembled without a primary key.
    #[error("record '{record}' (table '{table}') has no primary key, required to select joined relations")]
    MissingPrimaryKey { record: String, table: String },
}

/// Any error the crate can report.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Compile(#[from] CompileError),

    #[error(transparent)]
    Settings(#[from] SettingsError),

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

pub type Result<T> = std::result::Result<T, Error>;
