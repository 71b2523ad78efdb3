//! Join planning: dotted paths → joins and column references.
//!
//! A [`JoinPlanner`] lives for one compilation. It walks relation paths
//! through the schema graph, consulting the blacklist at every hop, and
//! emits at most one join per relation path. A path that leaves the schema
//! or the blacklist's permission resolves to `None`; callers drop the term.
//!
//! Joins are addressed by the relation path with `__` between segments
//! (`Owner`, `Owner__Parent`). A caller join on the same table, aliased with
//! that name or not aliased at all, is reused: its condition is ANDed with
//! the key equality and columns are referenced through its name.

mod select;

use std::collections::{HashMap, HashSet};

use tracing::{debug, trace};

use crate::blacklist::Blacklist;
use crate::dsl::{split_path, PATH_SEPARATOR};
use crate::schema::{Column, Relation, Schema, TableId};
use crate::sql::expr::{Expr, ExprExt};
use crate::sql::query::{Query, SelectExpr, TableRef};

/// Separator between relation names in a join alias.
pub const ALIAS_SEPARATOR: &str = "__";

/// Alias of the join reached through `segments`.
pub fn join_alias(segments: &[&str]) -> String {
    segments.join(ALIAS_SEPARATOR)
}

// =============================================================================
// Resolved paths
// =============================================================================

/// One relation traversal.
#[derive(Debug, Clone)]
pub struct Hop<'a> {
    pub relation: &'a Relation,
    pub target: TableId,
    /// Alias the joined table gets unless a caller join is reused.
    pub alias: String,
    /// Dotted relation path up to and including this hop.
    pub path: String,
    /// Blacklist governing the target level.
    pub blacklist: &'a Blacklist,
}

/// A relation path that resolved completely.
#[derive(Debug, Clone)]
pub struct RelationPath<'a> {
    pub hops: Vec<Hop<'a>>,
    /// Table at the end of the path (the root for an empty path).
    pub table: TableId,
    pub blacklist: &'a Blacklist,
}

/// A column reachable through an admissible path.
#[derive(Debug, Clone)]
pub struct ResolvedColumn<'a> {
    pub column: &'a Column,
    pub hops: Vec<Hop<'a>>,
}

// =============================================================================
// Planner
// =============================================================================

/// Request-scoped join planner.
#[derive(Debug)]
pub struct JoinPlanner<'a> {
    schema: &'a Schema,
    blacklist: &'a Blacklist,
    root_scope: String,
    /// Relation alias -> name the joined table is in scope under, for every
    /// hop joined (or merged into a caller join) by this compilation.
    scopes: HashMap<String, String>,
    /// Root columns the joined rows are matched back on.
    root_keys: Vec<String>,
    selection: Vec<SelectExpr>,
    labels: HashSet<String>,
}

impl<'a> JoinPlanner<'a> {
    /// `root_scope` is how the query names the root table (its alias, or
    /// the table name).
    pub fn new(schema: &'a Schema, blacklist: &'a Blacklist, root_scope: &str) -> Self {
        Self {
            schema,
            blacklist,
            root_scope: root_scope.into(),
            scopes: HashMap::new(),
            root_keys: Vec::new(),
            selection: Vec::new(),
            labels: HashSet::new(),
        }
    }

    pub fn root_scope(&self) -> &str {
        &self.root_scope
    }

    /// Walk `segments` as relation names from the root.
    pub fn resolve_path(&self, segments: &[&str]) -> Option<RelationPath<'a>> {
        let schema: &'a Schema = self.schema;
        let mut table = schema.root();
        let mut blacklist: &'a Blacklist = self.blacklist;
        let mut hops = Vec::with_capacity(segments.len());

        for (i, segment) in segments.iter().enumerate() {
            if !blacklist.relation_allowed(segment) {
                debug!(
                    path = %segments[..=i].join(PATH_SEPARATOR),
                    "relation not allowed"
                );
                return None;
            }
            let Some(found) = schema.relation(table, segment) else {
                debug!(
                    path = %segments[..=i].join(PATH_SEPARATOR),
                    record = %schema.table(table).record,
                    "unknown relation"
                );
                return None;
            };

            blacklist = blacklist.descend(segment);
            hops.push(Hop {
                relation: found.relation,
                target: found.target,
                alias: join_alias(&segments[..=i]),
                path: segments[..=i].join(PATH_SEPARATOR),
                blacklist,
            });
            table = found.target;
        }

        Some(RelationPath {
            hops,
            table,
            blacklist,
        })
    }

    /// Resolve a possibly dotted field path to a filterable column.
    ///
    /// Unknown, blacklisted and unsupported-type columns resolve to `None`.
    pub fn resolve_column(&self, path: &str) -> Option<ResolvedColumn<'a>> {
        let (relations, name) = split_path(path);
        let resolved = self.resolve_path(&relations)?;

        if !resolved.blacklist.field_allowed(name) {
            debug!(field = %path, "field not allowed");
            return None;
        }
        let schema: &'a Schema = self.schema;
        let Some(column) = schema.table(resolved.table).column(name) else {
            debug!(field = %path, "unknown field");
            return None;
        };
        if !column.is_queryable() {
            debug!(field = %path, data_type = %column.data_type, "field type not queryable");
            return None;
        }
        if let Some(hop) = resolved.hops.iter().find(|h| !h.relation.is_keyed()) {
            debug!(field = %path, relation = %hop.path, "relation has no join key");
            return None;
        }

        Some(ResolvedColumn {
            column,
            hops: resolved.hops,
        })
    }

    /// Name the table reached through `hops` is in scope under.
    ///
    /// Only meaningful once the hops went through [`Self::ensure_joins`].
    pub fn scope_of<'s>(&'s self, hops: &'s [Hop<'a>]) -> &'s str {
        match hops.last() {
            Some(hop) => self.hop_scope(hop),
            None => &self.root_scope,
        }
    }

    fn hop_scope<'s>(&'s self, hop: &'s Hop<'a>) -> &'s str {
        self.scopes.get(&hop.alias).map_or(hop.alias.as_str(), String::as_str)
    }

    /// Join the column's path and reference the column through it.
    pub fn column_expr(&mut self, query: Query, resolved: &ResolvedColumn<'a>) -> (Query, Expr) {
        let query = self.ensure_joins(query, &resolved.hops);
        let expr = resolved.column.expr(self.scope_of(&resolved.hops));
        (query, expr)
    }

    /// Make sure every hop is joined exactly once.
    ///
    /// A caller join on the hop's table is reused when it carries the hop's
    /// alias or no alias. When the alias is taken by a join on another
    /// table, the hop is joined under a fresh alias.
    pub fn ensure_joins(&mut self, mut query: Query, hops: &[Hop<'a>]) -> Query {
        let mut parent = self.root_scope.clone();
        for hop in hops {
            if let Some(scope) = self.scopes.get(&hop.alias) {
                trace!(alias = %hop.alias, "reusing join");
                parent = scope.clone();
                continue;
            }

            let schema: &'a Schema = self.schema;
            let table = &schema.table(hop.target).name;
            let claimed: HashSet<&str> = self.scopes.values().map(String::as_str).collect();
            let caller = query.joins.iter_mut().find(|join| {
                join.table.table == *table
                    && !claimed.contains(join.name_in_scope())
                    && join.table.alias.as_ref().map_or(true, |alias| *alias == hop.alias)
            });

            let scope = match caller {
                Some(existing) => {
                    let scope = existing.name_in_scope().to_owned();
                    trace!(alias = %hop.alias, join = %scope, "merging into existing join");
                    let on = hop.relation.join_condition(&parent, &scope);
                    existing.on = on.and(existing.on.clone().grouped());
                    scope
                }
                None => {
                    let scope = free_alias(&query, &hop.alias);
                    trace!(alias = %scope, relation = %hop.relation.name, "joining");
                    let on = hop.relation.join_condition(&parent, &scope);
                    query = query.left_join(TableRef::new(table).with_alias(&scope), on);
                    scope
                }
            };
            self.scopes.insert(hop.alias.clone(), scope.clone());
            parent = scope;
        }
        query
    }

    /// Whether any explicit join selected columns.
    pub fn has_selection(&self) -> bool {
        !self.selection.is_empty()
    }

    /// Root columns joined rows are matched back on.
    pub fn root_keys(&self) -> &[String] {
        &self.root_keys
    }

    /// Columns selected for explicit joins, in request order.
    pub fn into_selection(self) -> Vec<SelectExpr> {
        self.selection
    }
}

/// `alias`, or `alias` with a numeric suffix if the query already uses it.
fn free_alias(query: &Query, alias: &str) -> String {
    let taken = |name: &str| {
        query.joins.iter().any(|j| j.name_in_scope() == name)
            || query.from.as_ref().is_some_and(|f| f.name_in_scope() == name)
    };
    if !taken(alias) {
        return alias.to_owned();
    }
    let fresh = (1u32..)
        .map(|n| format!("{alias}_{n}"))
        .find(|candidate| !taken(candidate.as_str()))
        .unwrap_or_else(|| alias.to_owned());
    debug!(alias = %alias, fresh = %fresh, "alias taken by another join");
    fresh
}
