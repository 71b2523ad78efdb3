//! Schema graph: tables, columns and relations of record types.
//!
//! Each record type becomes one table node in a petgraph `DiGraph`; each
//! admissible relation becomes an edge from owner to target. Nodes are keyed
//! by Rust type identity, so a self-referencing record has an edge pointing
//! back at its own node and mutually referencing records share nodes.
//!
//! Graphs are built lazily by [`SchemaRegistry`] and handed out as cheap
//! [`Schema`] handles over an immutable snapshot.

pub mod descriptor;
mod introspect;
mod registry;

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::Arc;

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;

use crate::sql::expr::{computed, conjunction, table_col, unsatisfiable, Expr, ExprExt};
use crate::types::DataType;

pub use descriptor::{FieldDescriptor, FieldShape, Record, RecordDescriptor, RecordRef, RelationKind};
pub use registry::SchemaRegistry;

/// Identifies a table node within a [`SchemaGraph`].
pub type TableId = NodeIndex;

// =============================================================================
// Columns
// =============================================================================

/// A column of a table.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub data_type: DataType,
    /// SQL template computing the value instead of reading a column.
    pub computed: Option<String>,
    pub primary_key: bool,
}

impl Column {
    /// Whether the column can take part in filters, sorts and search.
    pub fn is_queryable(&self) -> bool {
        self.data_type.is_supported()
    }

    /// Reference to this column through the table or alias `in_scope`.
    pub fn expr(&self, in_scope: &str) -> Expr {
        match &self.computed {
            Some(template) => computed(template, in_scope),
            None => table_col(in_scope, &self.name),
        }
    }
}

// =============================================================================
// Tables
// =============================================================================

/// A table node.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    /// Name of the record type this table was built from.
    pub record: String,
    pub name: String,
    columns: Vec<Column>,
    index: HashMap<String, usize>,
}

impl Table {
    pub(crate) fn new(record: &str, name: &str) -> Self {
        Self {
            record: record.into(),
            name: name.into(),
            columns: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Add a column. A later column with the same name replaces the earlier one.
    pub(crate) fn add_column(&mut self, column: Column) {
        match self.index.get(&column.name) {
            Some(&i) => self.columns[i] = column,
            None => {
                self.index.insert(column.name.clone(), self.columns.len());
                self.columns.push(column);
            }
        }
    }

    pub(crate) fn set_primary_key(&mut self, name: &str) -> bool {
        match self.index.get(name) {
            Some(&i) => {
                self.columns[i].primary_key = true;
                true
            }
            None => false,
        }
    }

    /// Columns in declaration order.
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.index.get(name).map(|&i| &self.columns[i])
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn primary_keys(&self) -> impl Iterator<Item = &Column> {
        self.columns.iter().filter(|c| c.primary_key)
    }

    pub fn has_primary_key(&self) -> bool {
        self.columns.iter().any(|c| c.primary_key)
    }
}

// =============================================================================
// Relations
// =============================================================================

/// A relation edge.
///
/// `foreign_keys` always live on the owned side: the owner for belongs-to,
/// the target for has-one and has-many. `references` are the matching
/// columns on the other side.
#[derive(Debug, Clone, PartialEq)]
pub struct Relation {
    pub name: String,
    pub kind: RelationKind,
    pub foreign_keys: Vec<String>,
    pub references: Vec<String>,
}

impl Relation {
    /// ON condition joining `target` (the relation's table in scope) to
    /// `parent`.
    pub fn join_condition(&self, parent: &str, target: &str) -> Expr {
        let pairs = self.foreign_keys.iter().zip(&self.references);
        let equalities = pairs.map(|(fk, reference)| match self.kind {
            RelationKind::BelongsTo => table_col(target, reference).eq(table_col(parent, fk)),
            RelationKind::HasOne | RelationKind::HasMany => {
                table_col(target, fk).eq(table_col(parent, reference))
            }
        });
        conjunction(equalities).unwrap_or_else(unsatisfiable)
    }

    /// Whether every foreign key has a referenced column to equal.
    ///
    /// False when the referenced table has no primary key and the relation
    /// names no references of its own.
    pub fn is_keyed(&self) -> bool {
        !self.references.is_empty() && self.references.len() == self.foreign_keys.len()
    }

    /// Columns the parent must select for the related rows to be matched
    /// back to it.
    pub fn parent_keys(&self) -> &[String] {
        match self.kind {
            RelationKind::BelongsTo => &self.foreign_keys,
            RelationKind::HasOne | RelationKind::HasMany => &self.references,
        }
    }

    /// Extra target columns, beyond its primary key, needed to reassemble
    /// the relation.
    pub fn child_keys(&self) -> &[String] {
        match self.kind {
            RelationKind::HasMany => &self.foreign_keys,
            RelationKind::HasOne | RelationKind::BelongsTo => &[],
        }
    }
}

/// A relation together with the table it points at.
#[derive(Debug, Clone, Copy)]
pub struct RelationRef<'a> {
    pub relation: &'a Relation,
    pub target: TableId,
}

// =============================================================================
// Graph
// =============================================================================

/// All introspected tables and their relations.
#[derive(Debug, Clone, Default)]
pub struct SchemaGraph {
    graph: DiGraph<Table, Relation>,
    by_type: HashMap<TypeId, TableId>,
}

impl SchemaGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn table(&self, id: TableId) -> &Table {
        &self.graph[id]
    }

    /// Node already built for a record type.
    pub fn table_of(&self, type_id: TypeId) -> Option<TableId> {
        self.by_type.get(&type_id).copied()
    }

    /// Relation `name` declared on `from`.
    pub fn relation(&self, from: TableId, name: &str) -> Option<RelationRef<'_>> {
        self.relations(from).find(|r| r.relation.name == name)
    }

    pub fn relations(&self, from: TableId) -> impl Iterator<Item = RelationRef<'_>> {
        self.graph.edges(from).map(|edge| RelationRef {
            relation: edge.weight(),
            target: edge.target(),
        })
    }

    pub fn table_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn relation_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub(crate) fn reserve(&mut self, type_id: TypeId, table: Table) -> TableId {
        let id = self.graph.add_node(table);
        self.by_type.insert(type_id, id);
        id
    }

    pub(crate) fn table_mut(&mut self, id: TableId) -> &mut Table {
        &mut self.graph[id]
    }

    pub(crate) fn add_relation(&mut self, from: TableId, to: TableId, relation: Relation) {
        self.graph.add_edge(from, to, relation);
    }
}

/// A handle on one record type's table within a graph snapshot.
#[derive(Debug, Clone)]
pub struct Schema {
    graph: Arc<SchemaGraph>,
    root: TableId,
}

impl Schema {
    pub(crate) fn new(graph: Arc<SchemaGraph>, root: TableId) -> Self {
        Self { graph, root }
    }

    /// Schema of `R` from the process-wide registry.
    pub fn of<R: Record>() -> Self {
        SchemaRegistry::global().schema::<R>()
    }

    pub fn root(&self) -> TableId {
        self.root
    }

    pub fn root_table(&self) -> &Table {
        self.graph.table(self.root)
    }

    pub fn graph(&self) -> &SchemaGraph {
        &self.graph
    }

    pub fn table(&self, id: TableId) -> &Table {
        self.graph.table(id)
    }

    pub fn relation(&self, from: TableId, name: &str) -> Option<RelationRef<'_>> {
        self.graph.relation(from, name)
    }
}
