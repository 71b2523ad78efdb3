//! Builds table nodes from record descriptors.
//!
//! Columns are added before relations and a node is reserved before either,
//! so a relation reaching back to a record under construction finds its node
//! and its columns already in place.

use std::any::TypeId;

use inflector::Inflector;
use tracing::{debug, warn};

use super::descriptor::{FieldDescriptor, FieldShape, RecordRef, RelationKind};
use super::{Column, Relation, SchemaGraph, Table, TableId};

/// Column conventionally holding the primary key.
const DEFAULT_PRIMARY_KEY: &str = "id";

/// Suffix of conventional foreign-key columns.
const FOREIGN_KEY_SUFFIX: &str = "_id";

pub(super) struct Introspector<'g> {
    graph: &'g mut SchemaGraph,
}

impl<'g> Introspector<'g> {
    pub(super) fn new(graph: &'g mut SchemaGraph) -> Self {
        Self { graph }
    }

    /// Node for `record`, introspecting it (and anything it reaches) first
    /// if needed.
    pub(super) fn ensure(&mut self, record: RecordRef) -> TableId {
        if let Some(id) = self.graph.table_of(record.type_id()) {
            return id;
        }

        let descriptor = record.describe();
        let table_name = descriptor
            .table
            .clone()
            .unwrap_or_else(|| descriptor.name.to_table_case());
        let id = self
            .graph
            .reserve(record.type_id(), Table::new(&descriptor.name, &table_name));

        // Columns
        let mut table = Table::new(&descriptor.name, &table_name);
        let mut embedding = vec![record.type_id()];
        collect_columns(&mut table, &descriptor.fields, "", &mut embedding);
        if !table.has_primary_key() {
            table.set_primary_key(DEFAULT_PRIMARY_KEY);
        }
        *self.graph.table_mut(id) = table;

        // Relations
        for field in descriptor.fields.iter().filter(|f| !f.ignore) {
            let (target_record, to_many) = match &field.shape {
                FieldShape::ToOne(target) => (*target, false),
                FieldShape::ToMany(target) => (*target, true),
                FieldShape::Scalar(_) | FieldShape::Embedded { .. } => continue,
            };
            let target = self.ensure(target_record);
            match self.resolve_relation(id, target, field, to_many) {
                Some(relation) => self.graph.add_relation(id, target, relation),
                None => continue,
            }
        }

        let table = self.graph.table(id);
        debug!(
            record = %table.record,
            table = %table.name,
            columns = table.columns().len(),
            relations = self.graph.relations(id).count(),
            "introspected record"
        );

        id
    }

    fn resolve_relation(
        &self,
        owner: TableId,
        target: TableId,
        field: &FieldDescriptor,
        to_many: bool,
    ) -> Option<Relation> {
        let owner_table = self.graph.table(owner);
        let target_table = self.graph.table(target);

        let kind = match field.kind {
            _ if to_many => RelationKind::HasMany,
            Some(kind @ (RelationKind::HasOne | RelationKind::BelongsTo)) => kind,
            // A to-one relation belongs to its target when the owner holds
            // the key columns.
            Some(RelationKind::HasMany) | None => {
                let owner_holds_keys = if field.foreign_keys.is_empty() {
                    owner_table.has_column(&belongs_to_key(&field.name))
                } else {
                    field.foreign_keys.iter().all(|c| owner_table.has_column(c))
                };
                if owner_holds_keys {
                    RelationKind::BelongsTo
                } else {
                    RelationKind::HasOne
                }
            }
        };

        // Which table holds the foreign key and which the referenced columns.
        let (fk_table, ref_table) = match kind {
            RelationKind::BelongsTo => (owner_table, target_table),
            RelationKind::HasOne | RelationKind::HasMany => (target_table, owner_table),
        };

        let foreign_keys = if field.foreign_keys.is_empty() {
            vec![match kind {
                RelationKind::BelongsTo => belongs_to_key(&field.name),
                RelationKind::HasOne | RelationKind::HasMany => {
                    format!("{}{}", owner_table.record.to_snake_case(), FOREIGN_KEY_SUFFIX)
                }
            }]
        } else {
            field.foreign_keys.clone()
        };

        let references = if field.references.is_empty() {
            ref_table.primary_keys().map(|c| c.name.clone()).collect()
        } else {
            field.references.clone()
        };

        let problem = if let Some(missing) = foreign_keys.iter().find(|c| !fk_table.has_column(c)) {
            Some(format!("foreign key column '{}' not found on '{}'", missing, fk_table.name))
        } else if references.is_empty() {
            None
        } else if foreign_keys.len() != references.len() {
            Some("foreign key and reference column counts differ".to_string())
        } else {
            references
                .iter()
                .find(|c| !ref_table.has_column(c))
                .map(|missing| format!("referenced column '{}' not found on '{}'", missing, ref_table.name))
        };

        if let Some(reason) = problem {
            warn!(
                record = %owner_table.record,
                relation = %field.name,
                %reason,
                "skipping unresolvable relation"
            );
            return None;
        }

        // Kept without references; an explicit join on it is a missing key.
        if references.is_empty() {
            warn!(
                record = %owner_table.record,
                relation = %field.name,
                table = %ref_table.name,
                "relation references a table without primary key"
            );
        }

        Some(Relation {
            name: field.name.clone(),
            kind,
            foreign_keys,
            references,
        })
    }
}

fn belongs_to_key(relation: &str) -> String {
    format!("{}{}", relation.to_snake_case(), FOREIGN_KEY_SUFFIX)
}

/// Add scalar columns, promoting embedded records' columns with their prefix.
fn collect_columns(
    table: &mut Table,
    fields: &[FieldDescriptor],
    prefix: &str,
    embedding: &mut Vec<TypeId>,
) {
    for field in fields.iter().filter(|f| !f.ignore) {
        match &field.shape {
            FieldShape::Scalar(data_type) => {
                let name = field
                    .column_name
                    .clone()
                    .unwrap_or_else(|| field.name.to_snake_case());
                table.add_column(Column {
                    name: format!("{}{}", prefix, name),
                    data_type: *data_type,
                    computed: field.computed.clone(),
                    primary_key: field.primary_key,
                });
            }
            FieldShape::Embedded {
                record,
                prefix: inner,
            } => {
                if embedding.contains(&record.type_id()) {
                    warn!(
                        record = %table.record,
                        field = %field.name,
                        "recursive embedding ignored"
                    );
                    continue;
                }
                embedding.push(record.type_id());
                let nested = format!("{}{}", prefix, inner.as_deref().unwrap_or(""));
                collect_columns(table, &record.describe().fields, &nested, embedding);
                embedding.pop();
            }
            // Relations of embedded records are not promoted.
            FieldShape::ToOne(_) | FieldShape::ToMany(_) => {}
        }
    }
}
