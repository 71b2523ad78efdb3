//! Process-wide cache of introspected schemas.

use std::sync::{Arc, PoisonError, RwLock};

use once_cell::sync::Lazy;

use super::descriptor::{Record, RecordRef};
use super::introspect::Introspector;
use super::{Schema, SchemaGraph};

static GLOBAL: Lazy<SchemaRegistry> = Lazy::new(SchemaRegistry::new);

/// Caches one [`SchemaGraph`] shared by every record type it has seen.
///
/// Read-mostly: lookups of known types take a shared lock and clone an
/// `Arc`. The first use of a new type takes the write lock, re-checks, and
/// publishes a new snapshot with the type (and everything it reaches) added.
/// Handles given out earlier keep their snapshot; table ids stay valid
/// across snapshots because nodes are only ever appended.
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    graph: RwLock<Arc<SchemaGraph>>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The registry shared by the whole process.
    pub fn global() -> &'static SchemaRegistry {
        &GLOBAL
    }

    pub fn schema<R: Record>(&self) -> Schema {
        self.schema_of(RecordRef::of::<R>())
    }

    pub fn schema_of(&self, record: RecordRef) -> Schema {
        {
            // The graph is append-only, so a poisoned lock still guards a
            // consistent snapshot.
            let graph = self.graph.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(id) = graph.table_of(record.type_id()) {
                return Schema::new(Arc::clone(&graph), id);
            }
        }

        let mut graph = self.graph.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(id) = graph.table_of(record.type_id()) {
            return Schema::new(Arc::clone(&graph), id);
        }

        let mut next = SchemaGraph::clone(&graph);
        let id = Introspector::new(&mut next).ensure(record);
        *graph = Arc::new(next);
        Schema::new(Arc::clone(&graph), id)
    }

    /// Snapshot of everything introspected so far.
    pub fn snapshot(&self) -> Arc<SchemaGraph> {
        Arc::clone(&self.graph.read().unwrap_or_else(PoisonError::into_inner))
    }
}
