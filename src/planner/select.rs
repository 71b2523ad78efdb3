//! Column selection for explicit joins.

use std::collections::HashSet;

use tracing::debug;

use super::{Hop, JoinPlanner, PATH_SEPARATOR};
use crate::dsl::Join;
use crate::error::{CompileError, CompileResult};
use crate::schema::{RelationKind, Schema, Table};
use crate::sql::expr::ExprExt;
use crate::sql::query::Query;

impl<'a> JoinPlanner<'a> {
    /// Join the relation path of `join` and select its columns.
    ///
    /// Primary keys of every joined table and the keys linking each hop to
    /// the next are always selected, whatever the field list or blacklist
    /// says. A relation path that does not resolve is dropped.
    pub fn select_join(&mut self, query: Query, join: &Join) -> CompileResult<Query> {
        let segments: Vec<&str> = join.relation.split(PATH_SEPARATOR).collect();
        let Some(path) = self.resolve_path(&segments) else {
            debug!(join = %join, "dropping join");
            return Ok(query);
        };
        let Some(first) = path.hops.first() else {
            return Ok(query);
        };

        let schema: &'a Schema = self.schema;
        let mut parent = schema.root();
        for hop in &path.hops {
            let target = schema.table(hop.target);
            // The table whose key the relation references when none resolved.
            let keyless = match hop.relation.kind {
                RelationKind::BelongsTo => hop.target,
                RelationKind::HasOne | RelationKind::HasMany => parent,
            };
            let missing = if !target.has_primary_key() {
                Some(target)
            } else if !hop.relation.is_keyed() {
                Some(schema.table(keyless))
            } else {
                None
            };
            if let Some(table) = missing {
                return Err(CompileError::MissingPrimaryKey {
                    record: table.record.clone(),
                    table: table.name.clone(),
                });
            }
            parent = hop.target;
        }

        for key in first.relation.parent_keys() {
            if !self.root_keys.contains(key) {
                self.root_keys.push(key.clone());
            }
        }

        let query = self.ensure_joins(query, &path.hops);

        let last = path.hops.len() - 1;
        for (i, hop) in path.hops.iter().enumerate() {
            let table = schema.table(hop.target);
            let mut wanted: HashSet<&str> = table.primary_keys().map(|c| c.name.as_str()).collect();
            wanted.extend(hop.relation.child_keys().iter().map(String::as_str));
            if let Some(next) = path.hops.get(i + 1) {
                wanted.extend(next.relation.parent_keys().iter().map(String::as_str));
            }
            if i == last {
                wanted.extend(requested_columns(table, hop, join.fields.as_deref()));
            }
            self.select_columns(table, hop, &wanted);
        }

        Ok(query)
    }

    fn select_columns(&mut self, table: &Table, hop: &Hop<'a>, wanted: &HashSet<&str>) {
        for column in table.columns().iter().filter(|c| wanted.contains(c.name.as_str())) {
            let label = format!("{}{}{}", hop.path, PATH_SEPARATOR, column.name);
            if self.labels.insert(label.clone()) {
                let expr = column.expr(self.hop_scope(hop));
                self.selection.push(expr.alias(&label));
            }
        }
    }
}

/// Admissible columns named by `fields`, or all admissible columns.
fn requested_columns<'t>(table: &'t Table, hop: &Hop<'_>, fields: Option<&[String]>) -> Vec<&'t str> {
    let admissible = |name: &str| hop.blacklist.field_allowed(name);
    match fields {
        None => table
            .columns()
            .iter()
            .map(|c| c.name.as_str())
            .filter(|name| admissible(name))
            .collect(),
        Some(fields) => fields
            .iter()
            .filter_map(|field| {
                let column = table.column(field);
                if column.is_none() || !admissible(field) {
                    debug!(join = %hop.path, field = %field, "dropping join field");
                }
                column
                    .filter(|_| admissible(field))
                    .map(|c| c.name.as_str())
            })
            .collect(),
    }
}
