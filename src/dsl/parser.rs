//! Parsers for the textual descriptor forms.

use thiserror::Error;

use super::{Filter, Join, Sort, SortOrder, SEGMENT_SEPARATOR};
use crate::operator::OperatorRegistry;

/// Result type for DSL parsing.
pub type ParseResult<T> = Result<T, ParseError>;

/// Malformed request input. Raised before any compilation happens.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("invalid filter '{raw}': {reason}")]
    FilterSyntax { raw: String, reason: &'static str },

    #[error("unknown operator '{0}'")]
    UnknownOperator(String),

    #[error("operator '{operator}' requires {required} argument(s), got {given}")]
    MissingArguments {
        operator: String,
        required: usize,
        given: usize,
    },

    #[error("invalid sort '{raw}': {reason}")]
    SortSyntax { raw: String, reason: &'static str },

    #[error("invalid join '{raw}': {reason}")]
    JoinSyntax { raw: String, reason: &'static str },

    #[error("invalid {param} '{value}': expected a positive integer")]
    InvalidPagination { param: &'static str, value: String },
}

fn filter_syntax(raw: &str, reason: &'static str) -> ParseError {
    ParseError::FilterSyntax {
        raw: raw.into(),
        reason,
    }
}

/// Parse `field||operator[||arg,arg...]`.
pub fn parse_filter(raw: &str, or: bool, operators: &OperatorRegistry) -> ParseResult<Filter> {
    let segments: Vec<&str> = raw.split(SEGMENT_SEPARATOR).collect();
    if !(2..=3).contains(&segments.len()) {
        return Err(filter_syntax(raw, "expected field||operator[||args]"));
    }

    let field = segments[0].trim();
    if field.is_empty() {
        return Err(filter_syntax(raw, "empty field"));
    }

    let operator_name = segments[1].trim();
    if operator_name.is_empty() {
        return Err(filter_syntax(raw, "empty operator"));
    }
    let operator = operators
        .get(operator_name)
        .ok_or_else(|| ParseError::UnknownOperator(operator_name.into()))?;

    let args = match segments.get(2) {
        Some(list) => {
            let args: Vec<String> = list.split(',').map(|a| a.trim().to_string()).collect();
            if args.iter().any(String::is_empty) {
                return Err(filter_syntax(raw, "empty argument"));
            }
            args
        }
        None => Vec::new(),
    };

    if args.len() < operator.required_args() {
        return Err(ParseError::MissingArguments {
            operator: operator_name.into(),
            required: operator.required_args(),
            given: args.len(),
        });
    }

    Ok(Filter {
        field: field.into(),
        operator: operator_name.into(),
        args,
        or,
    })
}

/// Parse `field,ASC|DESC` (order is case-insensitive).
pub fn parse_sort(raw: &str) -> ParseResult<Sort> {
    let syntax = |reason| ParseError::SortSyntax {
        raw: raw.into(),
        reason,
    };

    let (field, order) = raw
        .split_once(',')
        .ok_or_else(|| syntax("expected field,order"))?;

    let field = field.trim();
    if field.is_empty() {
        return Err(syntax("empty field"));
    }

    let order = match order.trim().to_ascii_uppercase().as_str() {
        "ASC" => SortOrder::Asc,
        "DESC" => SortOrder::Desc,
        "" => return Err(syntax("empty order")),
        _ => return Err(syntax("order must be ASC or DESC")),
    };

    Ok(Sort {
        field: field.into(),
        order,
    })
}

/// Parse `relation[||field,field...]`.
///
/// A trailing `||` with nothing after it requests no columns beyond the
/// keys, which differs from omitting `||` entirely.
pub fn parse_join(raw: &str) -> ParseResult<Join> {
    let (relation, fields) = match raw.split_once(SEGMENT_SEPARATOR) {
        Some((relation, list)) => (relation, Some(parse_fields(list))),
        None => (raw, None),
    };

    let relation = relation.trim();
    if relation.is_empty() {
        return Err(ParseError::JoinSyntax {
            raw: raw.into(),
            reason: "empty relation",
        });
    }

    Ok(Join {
        relation: relation.into(),
        fields,
    })
}

/// Parse a comma-separated field list, dropping empty entries.
pub fn parse_fields(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .map(str::to_string)
        .collect()
}
