//! A whole request's descriptors, parsed from query-string pairs.

use super::parser::{parse_fields, parse_filter, parse_join, parse_sort, ParseError, ParseResult};
use super::{Filter, Join, Sort};
use crate::operator::OperatorRegistry;

/// Descriptors of one incoming request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Request {
    pub filter: Vec<Filter>,
    pub or: Vec<Filter>,
    pub sort: Vec<Sort>,
    pub join: Vec<Join>,
    /// Requested root columns; every admissible column when `None`.
    pub fields: Option<Vec<String>>,
    pub search: Option<String>,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

impl Request {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from decoded query-string pairs.
    ///
    /// Keys may be repeated and may use the `key[]` spelling. Unknown keys
    /// are ignored.
    pub fn from_query<I, K, V>(pairs: I, operators: &OperatorRegistry) -> ParseResult<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut request = Request::new();
        for (key, value) in pairs {
            let key = key.as_ref();
            let value = value.as_ref();
            match key.strip_suffix("[]").unwrap_or(key) {
                "filter" => request.filter.push(parse_filter(value, false, operators)?),
                "or" => request.or.push(parse_filter(value, true, operators)?),
                "sort" => request.sort.push(parse_sort(value)?),
                "join" => request.join.push(parse_join(value)?),
                "fields" => request
                    .fields
                    .get_or_insert_with(Vec::new)
                    .extend(parse_fields(value)),
                "search" => request.search = Some(value.to_string()),
                "page" => request.page = Some(positive("page", value)?),
                "per_page" => request.per_page = Some(positive("per_page", value)?),
                _ => {}
            }
        }
        Ok(request)
    }

    // Builder methods

    #[must_use]
    pub fn with_filter(mut self, filter: Filter) -> Self {
        if filter.or {
            self.or.push(filter);
        } else {
            self.filter.push(filter);
        }
        self
    }

    #[must_use]
    pub fn with_sort(mut self, sort: Sort) -> Self {
        self.sort.push(sort);
        self
    }

    #[must_use]
    pub fn with_join(mut self, join: Join) -> Self {
        self.join.push(join);
        self
    }

    #[must_use]
    pub fn with_fields(mut self, fields: &[&str]) -> Self {
        self.fields = Some(fields.iter().map(|f| f.to_string()).collect());
        self
    }

    #[must_use]
    pub fn with_search(mut self, query: &str) -> Self {
        self.search = Some(query.into());
        self
    }

    #[must_use]
    pub fn with_page(mut self, page: u64, per_page: u64) -> Self {
        self.page = Some(page);
        self.per_page = Some(per_page);
        self
    }
}

fn positive(param: &'static str, value: &str) -> ParseResult<u64> {
    match value.trim().parse::<u64>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(ParseError::InvalidPagination {
            param,
            value: value.into(),
        }),
    }
}
