//! Scope composition: one request's descriptors applied to a query.
//!
//! [`Scope::apply`] runs the steps in a fixed order:
//!
//! 1. filters, ANDed within the `filter` and `or` groups, the two groups
//!    ORed, the result wrapped in one outer group;
//! 2. explicit joins;
//! 3. search, one OR group ANDed into the WHERE clause;
//! 4. sorts, falling back to the configured default sort;
//! 5. the projection.
//!
//! Terms that name unknown or forbidden fields and relations are dropped.
//! The only failure is a missing primary key on a table whose rows must be
//! reassembled from a join.

mod pagination;

use std::collections::HashSet;

use tracing::{debug, warn};

use crate::config::Settings;
use crate::dsl::{Filter, Request, Search, Sort, SortOrder};
use crate::operator::{Operator, OperatorRegistry, DEFAULT_SEARCH_OPERATOR};
use crate::planner::JoinPlanner;
use crate::schema::{Record, Schema};
use crate::sql::expr::{conjunction, disjunction, unsatisfiable, Expr, ExprExt};
use crate::sql::query::{OrderByExpr, Query, SelectExpr, TableRef};

pub use crate::error::{CompileError, CompileResult};
pub use pagination::Pagination;

/// Compiles requests against one record type.
#[derive(Debug, Clone)]
pub struct Scope<'a> {
    schema: Schema,
    settings: &'a Settings,
    operators: &'a OperatorRegistry,
}

impl<'a> Scope<'a> {
    /// Scope over `schema` using the built-in operators.
    pub fn new(schema: Schema, settings: &'a Settings) -> Self {
        Self {
            schema,
            settings,
            operators: OperatorRegistry::standard(),
        }
    }

    /// Scope over `R` from the process-wide schema registry.
    pub fn for_record<R: Record>(settings: &'a Settings) -> Self {
        Self::new(Schema::of::<R>(), settings)
    }

    #[must_use]
    pub fn with_operators(mut self, operators: &'a OperatorRegistry) -> Self {
        self.operators = operators;
        self
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn settings(&self) -> &Settings {
        self.settings
    }

    /// Apply `request` to `query`.
    ///
    /// The root table becomes the FROM clause when `query` has none. Joins,
    /// conditions, sorts and select items already on `query` are kept.
    pub fn apply(&self, request: &Request, query: Query) -> CompileResult<Query> {
        let mut query = query;
        let root = self.schema.root_table();
        let root_scope = query
            .from
            .get_or_insert_with(|| TableRef::new(&root.name))
            .name_in_scope()
            .to_owned();
        let mut planner = JoinPlanner::new(&self.schema, &self.settings.blacklist, &root_scope);

        if !self.settings.disable_filter {
            let (next, condition) = self.filter_condition(&mut planner, query, request);
            query = next;
            if let Some(condition) = condition {
                query = query.filter(condition);
            }
        }

        if !self.settings.disable_join {
            for join in &request.join {
                query = planner.select_join(query, join)?;
            }
        }

        if let Some(search) = self.search(request) {
            let (next, condition) = self.search_condition(&mut planner, query, &search);
            query = next;
            if let Some(condition) = condition {
                query = query.filter(condition.grouped());
            }
        }

        let sorts = if self.settings.disable_sort || request.sort.is_empty() {
            &self.settings.default_sort
        } else {
            &request.sort
        };
        for sort in sorts {
            query = self.apply_sort(&mut planner, query, sort);
        }

        self.project(planner, request, query)
    }

    /// Apply `request` and bound the result to the requested page.
    pub fn apply_paginated(
        &self,
        request: &Request,
        query: Query,
    ) -> CompileResult<(Query, Pagination)> {
        let pagination = Pagination::new(
            request.page.unwrap_or(1),
            request.per_page.unwrap_or(self.settings.default_page_size),
        );
        let query = self.apply(request, query)?;
        Ok((pagination.apply(query), pagination))
    }

    fn filter_condition(
        &self,
        planner: &mut JoinPlanner<'_>,
        mut query: Query,
        request: &Request,
    ) -> (Query, Option<Expr>) {
        let mut and = Vec::new();
        let mut or = Vec::new();
        for filter in request.filter.iter().chain(&request.or) {
            let (next, condition) = self.condition(planner, query, filter);
            query = next;
            match condition {
                Some(c) if filter.or => or.push(c),
                Some(c) => and.push(c),
                None => {}
            }
        }

        // A lone `or` group is treated as a `filter` group.
        let condition = match (conjunction(and), conjunction(or)) {
            (Some(and), Some(or)) => Some(and.grouped().or(or.grouped()).grouped()),
            (Some(group), None) | (None, Some(group)) => Some(group.grouped()),
            (None, None) => None,
        };
        (query, condition)
    }

    fn condition(
        &self,
        planner: &mut JoinPlanner<'_>,
        query: Query,
        filter: &Filter,
    ) -> (Query, Option<Expr>) {
        let Some(op) = self.operators.get(&filter.operator) else {
            debug!(filter = %filter, "dropping filter with unregistered operator");
            return (query, None);
        };
        let Some(resolved) = planner.resolve_column(&filter.field) else {
            debug!(filter = %filter, "dropping filter");
            return (query, None);
        };
        let (query, column) = planner.column_expr(query, &resolved);
        let condition = op.apply(&column, resolved.column.data_type, &filter.args);
        (query, Some(condition))
    }

    /// Search descriptor for `request`, if search applies.
    fn search(&self, request: &Request) -> Option<Search> {
        if self.settings.disable_search {
            return None;
        }
        // Blank text searches nothing; any other text is matched as given.
        let text = request.search.as_deref().filter(|q| !q.trim().is_empty())?;
        Some(Search {
            query: text.to_string(),
            fields: self.settings.search_fields.clone(),
            operator: self.settings.search_operator.clone(),
        })
    }

    fn search_operator(&self, search: &Search) -> Option<&'a Operator> {
        let operators: &'a OperatorRegistry = self.operators;
        let name = search.operator.as_deref().unwrap_or(DEFAULT_SEARCH_OPERATOR);
        if let Some(op) = operators.get(name) {
            return Some(op);
        }
        warn!(operator = %name, fallback = DEFAULT_SEARCH_OPERATOR, "search operator not registered");
        operators.get(DEFAULT_SEARCH_OPERATOR)
    }

    fn search_condition(
        &self,
        planner: &mut JoinPlanner<'_>,
        mut query: Query,
        search: &Search,
    ) -> (Query, Option<Expr>) {
        let Some(op) = self.search_operator(search) else {
            debug!("dropping search without an operator");
            return (query, None);
        };

        let fields: Vec<&str> = match &search.fields {
            Some(fields) => fields.iter().map(String::as_str).collect(),
            None => self
                .schema
                .root_table()
                .columns()
                .iter()
                .map(|c| c.name.as_str())
                .collect(),
        };

        let args = [search.query.clone()];
        let mut conditions = Vec::new();
        for field in fields {
            let Some(resolved) = planner.resolve_column(field) else {
                continue;
            };
            let (next, column) = planner.column_expr(query, &resolved);
            query = next;
            conditions.push(op.apply(&column, resolved.column.data_type, &args));
        }

        // Members failing closed add nothing to a disjunction, unless every
        // member does.
        let unsat = unsatisfiable();
        let matched = conditions.iter().any(|c| c != &unsat);
        let condition = if matched {
            disjunction(conditions.into_iter().filter(|c| c != &unsat))
        } else {
            conditions.first().map(|_| unsat)
        };
        (query, condition)
    }

    fn apply_sort(&self, planner: &mut JoinPlanner<'_>, query: Query, sort: &Sort) -> Query {
        let Some(resolved) = planner.resolve_column(&sort.field) else {
            debug!(sort = %sort, "dropping sort");
            return query;
        };
        let (query, expr) = planner.column_expr(query, &resolved);
        query.add_order_by(match sort.order {
            SortOrder::Asc => OrderByExpr::asc(expr),
            SortOrder::Desc => OrderByExpr::desc(expr),
        })
    }

    /// Replace the select list with root columns, then joined columns, then
    /// whatever the caller had selected that is not already there.
    fn project(
        &self,
        planner: JoinPlanner<'_>,
        request: &Request,
        mut query: Query,
    ) -> CompileResult<Query> {
        let root = self.schema.root_table();
        let blacklist = &self.settings.blacklist;
        let root_scope = planner.root_scope().to_owned();

        let mut wanted: HashSet<&str> = match request.fields.as_ref() {
            Some(fields) if !self.settings.disable_fields => fields
                .iter()
                .map(String::as_str)
                .filter(|field| {
                    let known = root.has_column(field) && blacklist.field_allowed(field);
                    if !known {
                        debug!(field = %field, "dropping field");
                    }
                    known
                })
                .collect(),
            _ => root
                .columns()
                .iter()
                .map(|c| c.name.as_str())
                .filter(|name| blacklist.field_allowed(name))
                .collect(),
        };

        if planner.has_selection() {
            if !root.has_primary_key() {
                return Err(CompileError::MissingPrimaryKey {
                    record: root.record.clone(),
                    table: root.name.clone(),
                });
            }
            wanted.extend(root.primary_keys().map(|c| c.name.as_str()));
            wanted.extend(planner.root_keys().iter().map(String::as_str));
        }
        if wanted.is_empty() {
            debug!(record = %root.record, "no admissible field requested, selecting primary key");
            wanted.extend(root.primary_keys().map(|c| c.name.as_str()));
        }

        let mut select: Vec<SelectExpr> = root
            .columns()
            .iter()
            .filter(|c| wanted.contains(c.name.as_str()))
            .map(|c| match c.computed {
                Some(_) => c.expr(&root_scope).alias(&c.name),
                None => SelectExpr::new(c.expr(&root_scope)),
            })
            .collect();
        select.extend(planner.into_selection());

        let caller = std::mem::take(&mut query.select);
        for item in caller {
            if !select.iter().any(|s| s.expr == item.expr) {
                select.push(item);
            }
        }
        query.select = select;
        Ok(query)
    }
}
