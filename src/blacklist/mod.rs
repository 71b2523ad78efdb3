//! Hierarchical field and relation access control.
//!
//! A [`Blacklist`] mirrors the shape of a schema: it names the fields and
//! relations a request may not touch at one level and holds a nested
//! blacklist per relation for the levels below. `is_final` stops any further
//! relation traversal from that level, which is how runaway bidirectional
//! paths (`A.B.A.B...`) are cut.
//!
//! ```toml
//! fields = ["password"]
//! relations = ["Sessions"]
//!
//! [nested.Owner]
//! fields = ["email"]
//! is_final = true
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Permit-all blacklist returned when descending into an unlisted relation.
static EMPTY: Blacklist = Blacklist {
    fields: Vec::new(),
    relations: Vec::new(),
    nested: BTreeMap::new(),
    is_final: false,
};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Blacklist {
    /// Fields hidden at this level.
    pub fields: Vec<String>,
    /// Relations that may not be traversed from this level.
    pub relations: Vec<String>,
    /// Blacklists applied after descending into a relation.
    pub nested: BTreeMap<String, Blacklist>,
    /// Block every relation from this level down.
    pub is_final: bool,
}

impl Blacklist {
    pub fn new() -> Self {
        Self::default()
    }

    /// The permit-all blacklist.
    pub fn empty() -> &'static Blacklist {
        &EMPTY
    }

    pub fn field_allowed(&self, field: &str) -> bool {
        !self.fields.iter().any(|f| f == field)
    }

    pub fn relation_allowed(&self, relation: &str) -> bool {
        !self.is_final && !self.relations.iter().any(|r| r == relation)
    }

    /// Blacklist governing the level below `relation`.
    pub fn descend(&self, relation: &str) -> &Blacklist {
        self.nested.get(relation).unwrap_or(&EMPTY)
    }

    // Builder methods

    #[must_use]
    pub fn with_fields(mut self, fields: &[&str]) -> Self {
        self.fields.extend(fields.iter().map(|f| f.to_string()));
        self
    }

    #[must_use]
    pub fn with_relations(mut self, relations: &[&str]) -> Self {
        self.relations.extend(relations.iter().map(|r| r.to_string()));
        self
    }

    #[must_use]
    pub fn with_nested(mut self, relation: &str, nested: Blacklist) -> Self {
        self.nested.insert(relation.into(), nested);
        self
    }

    #[must_use]
    pub fn final_level(mut self) -> Self {
        self.is_final = true;
        self
    }
}
