//! Query-string mini-language: filter, sort, join, search and field lists.
//!
//! ```text
//! filter := field "||" operator ("||" arg ("," arg)*)?
//! sort   := field "," ("ASC" | "DESC")            ; case-insensitive
//! join   := relation ("||" field ("," field)*)?
//! fields := field ("," field)*
//! ```
//!
//! Parsing is purely syntactic. Whether a field or relation exists, and
//! whether the request may touch it, is decided at compile time where
//! unknown terms are dropped rather than reported.
//!
//! Every descriptor's `Display` is its canonical textual form, so
//! `parse(x.to_string()) == x`.

mod parser;
mod request;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub use parser::{parse_fields, parse_filter, parse_join, parse_sort, ParseError, ParseResult};
pub use request::Request;

/// Separator between filter/join segments.
pub const SEGMENT_SEPARATOR: &str = "||";

/// Separator between relation names in a field path.
pub const PATH_SEPARATOR: &str = ".";

// =============================================================================
// Filter
// =============================================================================

/// One filter term.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    /// Column name, optionally prefixed by a dotted relation path.
    pub field: String,
    /// Operator name, e.g. `$eq`.
    pub operator: String,
    pub args: Vec<String>,
    /// Member of the disjunctive ("or") group.
    pub or: bool,
}

impl Filter {
    pub fn new(field: &str, operator: &str, args: &[&str]) -> Self {
        Self {
            field: field.into(),
            operator: operator.into(),
            args: args.iter().map(|a| a.to_string()).collect(),
            or: false,
        }
    }

    /// Move this term to the disjunctive group.
    #[must_use]
    pub fn disjunctive(mut self) -> Self {
        self.or = true;
        self
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.field, SEGMENT_SEPARATOR, self.operator)?;
        if !self.args.is_empty() {
            write!(f, "{}{}", SEGMENT_SEPARATOR, self.args.join(","))?;
        }
        Ok(())
    }
}

// =============================================================================
// Sort
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        })
    }
}

/// One ORDER BY term. Deserializes from its textual form (`"name,DESC"`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Sort {
    pub field: String,
    pub order: SortOrder,
}

impl Sort {
    pub fn asc(field: &str) -> Self {
        Self {
            field: field.into(),
            order: SortOrder::Asc,
        }
    }

    pub fn desc(field: &str) -> Self {
        Self {
            field: field.into(),
            order: SortOrder::Desc,
        }
    }
}

impl fmt::Display for Sort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.field, self.order)
    }
}

impl FromStr for Sort {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_sort(s)
    }
}

impl TryFrom<String> for Sort {
    type Error = ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        parse_sort(&value)
    }
}

impl From<Sort> for String {
    fn from(sort: Sort) -> Self {
        sort.to_string()
    }
}

// =============================================================================
// Join
// =============================================================================

/// An explicit join request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Join {
    /// Dotted relation path.
    pub relation: String,
    /// `None` selects every admissible column; `Some(vec![])` selects only
    /// the keys.
    pub fields: Option<Vec<String>>,
}

impl Join {
    pub fn new(relation: &str) -> Self {
        Self {
            relation: relation.into(),
            fields: None,
        }
    }

    #[must_use]
    pub fn with_fields(mut self, fields: &[&str]) -> Self {
        self.fields = Some(fields.iter().map(|f| f.to_string()).collect());
        self
    }
}

impl fmt::Display for Join {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.relation)?;
        if let Some(fields) = &self.fields {
            write!(f, "{}{}", SEGMENT_SEPARATOR, fields.join(","))?;
        }
        Ok(())
    }
}

impl FromStr for Join {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_join(s)
    }
}

// =============================================================================
// Search
// =============================================================================

/// Free-text search across several fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Search {
    pub query: String,
    /// Candidate fields; every admissible root column when `None`.
    pub fields: Option<Vec<String>>,
    /// Operator name; `$cont` when `None`.
    pub operator: Option<String>,
}

impl Search {
    pub fn new(query: &str) -> Self {
        Self {
            query: query.into(),
            fields: None,
            operator: None,
        }
    }
}

/// Split a dotted path into its relation prefix and final name.
///
/// `"Owner.Parent.name"` → `(["Owner", "Parent"], "name")`.
pub fn split_path(path: &str) -> (Vec<&str>, &str) {
    let mut segments: Vec<&str> = path.split(PATH_SEPARATOR).collect();
    let last = segments.pop().unwrap_or_default();
    (segments, last)
}
