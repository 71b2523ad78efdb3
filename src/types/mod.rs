//! Abstract column data types and string coercion.
//!
//! Every argument a client sends arrives as a string. Before it reaches the
//! query builder it is coerced into a [`Value`] for the column's
//! [`DataType`]; anything that does not coerce cleanly yields `None` and the
//! operator using it fails closed.

use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

use crate::sql::expr::{
    lit_bool, lit_float, lit_int, lit_str, lit_timestamp, lit_uint, Expr,
};

// =============================================================================
// Data Types
// =============================================================================

/// Scalar column types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarType {
    Text,
    Bool,
    Int8,
    Int16,
    Int32,
    Int64,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Float32,
    Float64,
    Time,
    /// Enumerated text values; compared and matched as text.
    Enum,
}

/// The abstract type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    Scalar(ScalarType),
    /// Array column whose elements have the given scalar type.
    Array(ScalarType),
    /// Not representable; never eligible for filter, sort or search.
    Unsupported,
}

impl ScalarType {
    /// Text-like types accept pattern operators.
    pub fn is_textual(self) -> bool {
        matches!(self, ScalarType::Text | ScalarType::Enum)
    }

    pub fn is_numeric(self) -> bool {
        !matches!(
            self,
            ScalarType::Text | ScalarType::Enum | ScalarType::Bool | ScalarType::Time
        )
    }

    /// Coerce one raw argument.
    pub fn coerce(self, raw: &str) -> Option<Value> {
        match self {
            ScalarType::Text | ScalarType::Enum => Some(Value::Text(raw.to_string())),
            ScalarType::Bool => parse_bool(raw).map(Value::Bool),
            ScalarType::Int8 => raw.parse::<i8>().ok().map(|n| Value::Int(n.into())),
            ScalarType::Int16 => raw.parse::<i16>().ok().map(|n| Value::Int(n.into())),
            ScalarType::Int32 => raw.parse::<i32>().ok().map(|n| Value::Int(n.into())),
            ScalarType::Int64 => raw.parse::<i64>().ok().map(Value::Int),
            ScalarType::Uint8 => raw.parse::<u8>().ok().map(|n| Value::Uint(n.into())),
            ScalarType::Uint16 => raw.parse::<u16>().ok().map(|n| Value::Uint(n.into())),
            ScalarType::Uint32 => raw.parse::<u32>().ok().map(|n| Value::Uint(n.into())),
            ScalarType::Uint64 => raw.parse::<u64>().ok().map(Value::Uint),
            ScalarType::Float32 => raw
                .parse::<f32>()
                .ok()
                .filter(|f| f.is_finite())
                .map(|f| Value::Float(f.into())),
            ScalarType::Float64 => raw
                .parse::<f64>()
                .ok()
                .filter(|f| f.is_finite())
                .map(Value::Float),
            ScalarType::Time => parse_time(raw).map(Value::Time),
        }
    }
}

impl DataType {
    pub const TEXT: DataType = DataType::Scalar(ScalarType::Text);
    pub const BOOL: DataType = DataType::Scalar(ScalarType::Bool);
    pub const INT64: DataType = DataType::Scalar(ScalarType::Int64);
    pub const TIME: DataType = DataType::Scalar(ScalarType::Time);

    /// The scalar type of a non-array column.
    pub fn scalar(self) -> Option<ScalarType> {
        match self {
            DataType::Scalar(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_array(self) -> bool {
        matches!(self, DataType::Array(_))
    }

    pub fn is_supported(self) -> bool {
        !matches!(self, DataType::Unsupported)
    }

    /// Coerce one raw argument. Arrays coerce with their element rule.
    pub fn coerce(self, raw: &str) -> Option<Value> {
        match self {
            DataType::Scalar(s) | DataType::Array(s) => s.coerce(raw),
            DataType::Unsupported => None,
        }
    }

    /// Coerce every argument, failing if any one fails.
    pub fn coerce_all(self, raws: &[String]) -> Option<Vec<Value>> {
        raws.iter().map(|raw| self.coerce(raw)).collect()
    }
}

impl fmt::Display for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ScalarType::Text => "text",
            ScalarType::Bool => "bool",
            ScalarType::Int8 => "int8",
            ScalarType::Int16 => "int16",
            ScalarType::Int32 => "int32",
            ScalarType::Int64 => "int64",
            ScalarType::Uint8 => "uint8",
            ScalarType::Uint16 => "uint16",
            ScalarType::Uint32 => "uint32",
            ScalarType::Uint64 => "uint64",
            ScalarType::Float32 => "float32",
            ScalarType::Float64 => "float64",
            ScalarType::Time => "time",
            ScalarType::Enum => "enum",
        };
        f.write_str(name)
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Scalar(s) => write!(f, "{}", s),
            DataType::Array(s) => write!(f, "{}[]", s),
            DataType::Unsupported => f.write_str("unsupported"),
        }
    }
}

// =============================================================================
// Values
// =============================================================================

/// A coerced argument, safe to hand to the query builder as a literal.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Text(String),
    Bool(bool),
    Int(i64),
    Uint(u64),
    Float(f64),
    Time(NaiveDateTime),
}

impl Value {
    pub fn to_expr(&self) -> Expr {
        match self {
            Value::Text(s) => lit_str(s),
            Value::Bool(b) => lit_bool(*b),
            Value::Int(n) => lit_int(*n),
            Value::Uint(n) => lit_uint(*n),
            Value::Float(f) => lit_float(*f),
            Value::Time(t) => lit_timestamp(*t),
        }
    }
}

impl From<Value> for Expr {
    fn from(value: Value) -> Self {
        value.to_expr()
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Accepted time formats: RFC 3339 (with or without fractional seconds,
/// normalized to UTC), `YYYY-MM-DD HH:MM:SS`, and `YYYY-MM-DD`.
fn parse_time(raw: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_utc());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Some(dt);
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

// =============================================================================
// Rust type mapping
// =============================================================================

/// Maps a Rust field type onto its column [`DataType`].
pub trait ColumnType {
    fn data_type() -> DataType;
}

macro_rules! scalar_column_type {
    ($($ty:ty => $scalar:ident),* $(,)?) => {
        $(
            impl ColumnType for $ty {
                fn data_type() -> DataType {
                    DataType::Scalar(ScalarType::$scalar)
                }
            }
        )*
    };
}

scalar_column_type! {
    String => Text,
    &'static str => Text,
    bool => Bool,
    i8 => Int8,
    i16 => Int16,
    i32 => Int32,
    i64 => Int64,
    u8 => Uint8,
    u16 => Uint16,
    u32 => Uint32,
    u64 => Uint64,
    f32 => Float32,
    f64 => Float64,
    NaiveDateTime => Time,
    NaiveDate => Time,
    DateTime<Utc> => Time,
}

/// Nullable wrapper: same column type as the inner value.
impl<T: ColumnType> ColumnType for Option<T> {
    fn data_type() -> DataType {
        T::data_type()
    }
}

impl<T: ColumnType> ColumnType for Vec<T> {
    fn data_type() -> DataType {
        match T::data_type() {
            DataType::Scalar(s) => DataType::Array(s),
            _ => DataType::Unsupported,
        }
    }
}

/// Free-form JSON documents have no comparable representation.
impl ColumnType for serde_json::Value {
    fn data_type() -> DataType {
        DataType::Unsupported
    }
}
