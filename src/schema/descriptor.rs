//! Declarative record descriptors.
//!
//! A record type describes its shape once through [`Record::describe`]; the
//! introspector turns that description into a table node with columns and
//! relation edges.
//!
//! ```ignore
//! impl Record for Article {
//!     fn describe() -> RecordDescriptor {
//!         RecordDescriptor::new("Article")
//!             .field(FieldDescriptor::column::<i64>("ID").primary_key())
//!             .field(FieldDescriptor::column::<String>("Title"))
//!             .field(FieldDescriptor::column::<i64>("AuthorID"))
//!             .field(FieldDescriptor::to_one::<User>("Author"))
//!             .field(FieldDescriptor::to_many::<Comment>("Comments"))
//!     }
//! }
//! ```

use std::any::{type_name, TypeId};
use std::fmt;

use crate::types::{ColumnType, DataType};

/// A record type with a declared shape.
pub trait Record: 'static {
    fn describe() -> RecordDescriptor;
}

/// Type-erased handle to a [`Record`] implementation.
#[derive(Clone, Copy)]
pub struct RecordRef {
    type_id: TypeId,
    type_name: &'static str,
    describe: fn() -> RecordDescriptor,
}

impl RecordRef {
    pub fn of<R: Record>() -> Self {
        Self {
            type_id: TypeId::of::<R>(),
            type_name: type_name::<R>(),
            describe: R::describe,
        }
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn describe(&self) -> RecordDescriptor {
        (self.describe)()
    }
}

impl fmt::Debug for RecordRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("RecordRef").field(&self.type_name).finish()
    }
}

impl PartialEq for RecordRef {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl Eq for RecordRef {}

// =============================================================================
// Record Descriptor
// =============================================================================

/// The declared shape of one record type.
#[derive(Debug, Clone, PartialEq)]
#[must_use = "builders have no effect until used"]
pub struct RecordDescriptor {
    pub name: String,
    /// Table name; derived from `name` when absent.
    pub table: Option<String>,
    pub fields: Vec<FieldDescriptor>,
}

impl RecordDescriptor {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.into(),
            table: None,
            fields: Vec::new(),
        }
    }

    pub fn table(mut self, table: &str) -> Self {
        self.table = Some(table.into());
        self
    }

    pub fn field(mut self, field: FieldDescriptor) -> Self {
        self.fields.push(field);
        self
    }
}

// =============================================================================
// Field Descriptor
// =============================================================================

/// Ownership direction of a relation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelationKind {
    /// The target holds a foreign key to the owner; at most one row.
    HasOne,
    /// The target holds a foreign key to the owner; any number of rows.
    HasMany,
    /// The owner holds a foreign key to the target.
    BelongsTo,
}

impl RelationKind {
    pub fn is_to_many(self) -> bool {
        matches!(self, RelationKind::HasMany)
    }
}

/// What a declared field contributes to the schema.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldShape {
    /// A single column.
    Scalar(DataType),
    /// Columns of another record inlined into this table, optionally
    /// prefixed.
    Embedded {
        record: RecordRef,
        prefix: Option<String>,
    },
    /// Relation to at most one target row.
    ToOne(RecordRef),
    /// Relation to any number of target rows.
    ToMany(RecordRef),
}

/// One declared field.
#[derive(Debug, Clone, PartialEq)]
#[must_use = "builders have no effect until used"]
pub struct FieldDescriptor {
    pub name: String,
    pub shape: FieldShape,
    pub column_name: Option<String>,
    pub primary_key: bool,
    pub foreign_keys: Vec<String>,
    pub references: Vec<String>,
    pub kind: Option<RelationKind>,
    pub computed: Option<String>,
    pub ignore: bool,
}

impl FieldDescriptor {
    fn with_shape(name: &str, shape: FieldShape) -> Self {
        Self {
            name: name.into(),
            shape,
            column_name: None,
            primary_key: false,
            foreign_keys: Vec::new(),
            references: Vec::new(),
            kind: None,
            computed: None,
            ignore: false,
        }
    }

    /// A column whose type is derived from the Rust type `T`.
    pub fn column<T: ColumnType>(name: &str) -> Self {
        Self::with_shape(name, FieldShape::Scalar(T::data_type()))
    }

    /// A column with an explicit abstract type.
    pub fn scalar(name: &str, data_type: DataType) -> Self {
        Self::with_shape(name, FieldShape::Scalar(data_type))
    }

    /// Columns of `R` promoted into the owning table.
    pub fn embedded<R: Record>(name: &str, prefix: Option<&str>) -> Self {
        Self::with_shape(
            name,
            FieldShape::Embedded {
                record: RecordRef::of::<R>(),
                prefix: prefix.map(str::to_string),
            },
        )
    }

    pub fn to_one<R: Record>(name: &str) -> Self {
        Self::with_shape(name, FieldShape::ToOne(RecordRef::of::<R>()))
    }

    pub fn to_many<R: Record>(name: &str) -> Self {
        Self::with_shape(name, FieldShape::ToMany(RecordRef::of::<R>()))
    }

    pub fn column_name(mut self, column: &str) -> Self {
        self.column_name = Some(column.into());
        self
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    /// Foreign-key column(s): on the owner for belongs-to, on the target
    /// otherwise.
    pub fn foreign_key(mut self, columns: &[&str]) -> Self {
        self.foreign_keys = columns.iter().map(|c| c.to_string()).collect();
        self
    }

    /// Column(s) the foreign key points at.
    pub fn references(mut self, columns: &[&str]) -> Self {
        self.references = columns.iter().map(|c| c.to_string()).collect();
        self
    }

    pub fn kind(mut self, kind: RelationKind) -> Self {
        self.kind = Some(kind);
        self
    }

    /// SQL template computing this column. `~~~ct~~~` stands for the table
    /// in scope.
    pub fn computed(mut self, template: &str) -> Self {
        self.computed = Some(template.into());
        self
    }

    /// Override the abstract type of a column.
    pub fn data_type(mut self, data_type: DataType) -> Self {
        if let FieldShape::Scalar(_) = self.shape {
            self.shape = FieldShape::Scalar(data_type);
        }
        self
    }

    pub fn ignore(mut self) -> Self {
        self.ignore = true;
        self
    }
}
