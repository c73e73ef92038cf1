//! Field descriptors and their decoded values
//!
//! A table's physical layout is not fixed in code: the schema provider hands
//! the codec an ordered list of [`Cell`] descriptors, each naming an on-disk
//! type, a byte length, and optionally a dependency on another field. The
//! descriptor doubles as the value slot once a row has been decoded.

use chrono::{DateTime, Utc};

use crate::bits::BitVector32;
use crate::error::{Error, Result};

/// On-disk field type, one canonical variant per layout.
///
/// Schema documents may spell several aliases for the same layout
/// (`short`/`int16`, `int`/`int32`, ...); those collapse onto these
/// variants at load time via [`FieldType::parse`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    /// Single byte, or a raw byte array when the declared length exceeds 1.
    Byte,
    /// 32 boolean flags packed into an i32 word.
    BitVector,
    /// One bit of a sibling [`FieldType::BitVector`] field; consumes no bytes.
    BitFromVector,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Int64,
    /// i32 seconds since the Unix epoch, decoded to a calendar timestamp.
    DateTime,
    /// i32 on disk, decoded as value / 100.
    Decimal,
    Float32,
    Float64,
    /// Not stored on disk; assigned from a monotonic counter during parse.
    Sid,
    /// Null-padded byte string of the declared length.
    String,
    /// String whose length comes from a named sibling field's decoded value.
    StringByLen,
    /// String whose length comes from a named field of the header record.
    StringByHeaderRef,
    /// Write-only derived i32: length of the string field depending on it.
    StringLen,
}

impl FieldType {
    /// Resolve a schema type name (including aliases) to its canonical
    /// variant. Unknown names are a hard schema error.
    pub fn parse(name: &str) -> Result<Self> {
        let ty = match name.to_ascii_lowercase().as_str() {
            "byte" => FieldType::Byte,
            "bit_vector" => FieldType::BitVector,
            "bit_from_vector" => FieldType::BitFromVector,
            "int16" | "short" => FieldType::Int16,
            "uint16" | "ushort" => FieldType::UInt16,
            "int32" | "int" => FieldType::Int32,
            "uint32" | "uint" => FieldType::UInt32,
            "int64" | "long" => FieldType::Int64,
            "datetime" => FieldType::DateTime,
            "decimal" => FieldType::Decimal,
            "float32" | "float" | "single" => FieldType::Float32,
            "float64" | "double" => FieldType::Float64,
            "sid" => FieldType::Sid,
            "string" => FieldType::String,
            "string_by_len" => FieldType::StringByLen,
            "string_header_ref" | "string_by_header_ref" | "string_by_ref" => {
                FieldType::StringByHeaderRef
            }
            "string_len" => FieldType::StringLen,
            _ => return Err(Error::UnknownFieldType(name.to_string())),
        };
        Ok(ty)
    }

    /// Native on-disk byte width, for the fixed-width types.
    pub fn default_length(self) -> Option<i32> {
        match self {
            FieldType::Byte => Some(1),
            FieldType::BitVector => Some(4),
            FieldType::Int16 | FieldType::UInt16 => Some(2),
            FieldType::Int32 | FieldType::UInt32 => Some(4),
            FieldType::Int64 => Some(8),
            FieldType::DateTime => Some(4),
            FieldType::Decimal => Some(4),
            FieldType::Float32 => Some(4),
            FieldType::Float64 => Some(8),
            FieldType::StringLen => Some(4),
            _ => None,
        }
    }
}

/// Semantic role a field plays beyond its raw value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlagKind {
    #[default]
    None,
    /// The field holding the table's row count (defined headers).
    RowCount,
    /// The field grouping rows in double-loop tables.
    LoopCounter,
    /// A labeled group of bit flags; carries the `opt` label list.
    BitFlagGroup,
}

impl FlagKind {
    pub fn parse(name: &str) -> Result<Self> {
        match name.to_ascii_lowercase().as_str() {
            "none" => Ok(FlagKind::None),
            "row_count" => Ok(FlagKind::RowCount),
            "loop_counter" => Ok(FlagKind::LoopCounter),
            "bit_flag" => Ok(FlagKind::BitFlagGroup),
            other => Err(Error::InvalidSchema(format!("unknown flag '{}'", other))),
        }
    }
}

/// A decoded (or to-be-encoded) field payload.
///
/// One case per scalar kind the codec understands; dispatch over values is
/// always an exhaustive match, never a reflective downcast.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Empty,
    Byte(u8),
    Bytes(Vec<u8>),
    Bits(BitVector32),
    Bit(bool),
    Int16(i16),
    UInt16(u16),
    Int32(i32),
    UInt32(u32),
    Int64(i64),
    DateTime(DateTime<Utc>),
    Decimal(f64),
    Float32(f32),
    Float64(f64),
    String(String),
}

impl Value {
    pub fn is_empty(&self) -> bool {
        matches!(self, Value::Empty)
    }

    /// Numeric view of the value, for length dependencies and counters.
    /// Strings go through a plain integer parse; non-numeric payloads have
    /// no i32 view.
    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Value::Byte(v) => Some(*v as i32),
            Value::Bit(v) => Some(*v as i32),
            Value::Int16(v) => Some(*v as i32),
            Value::UInt16(v) => Some(*v as i32),
            Value::Int32(v) => Some(*v),
            Value::UInt32(v) => Some(*v as i32),
            Value::Int64(v) => Some(*v as i32),
            Value::Decimal(v) => Some(*v as i32),
            Value::String(s) => s.trim_end_matches('\0').parse().ok(),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int64(v) => Some(*v),
            other => other.as_i32().map(i64::from),
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float32(v) => Some(*v as f64),
            Value::Float64(v) | Value::Decimal(v) => Some(*v),
            other => other.as_i64().map(|v| v as f64),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Truthiness used when packing `bit_from_vector` fields back into
    /// their vector word.
    pub fn truthy(&self) -> bool {
        match self {
            Value::Bit(b) => *b,
            Value::Empty => false,
            other => other.as_i32().map(|v| v != 0).unwrap_or(false),
        }
    }
}

/// One named, typed slot of a record: the immutable schema shape plus a
/// mutable decoded/encoded value.
#[derive(Debug, Clone)]
pub struct Cell {
    pub name: String,
    pub kind: FieldType,
    /// Declared byte length; 0 defers to the type default, -1 means no
    /// fixed length.
    length: i32,
    /// Name of the field this one's length or value depends on.
    pub dependency: Option<String>,
    /// Bit index within the dependency vector (`bit_from_vector` only).
    pub bit_position: i32,
    pub flag: FlagKind,
    /// Whether external consumers (table exports) see this field.
    pub visible: bool,
    /// A declared default suppresses length inference and marks the field
    /// as computed/absent.
    pub default: Option<Value>,
    /// Labels for the bits of a `BitFlagGroup` field.
    pub bit_labels: Vec<String>,
    pub value: Value,
}

impl Cell {
    pub fn new(name: impl Into<String>, kind: FieldType) -> Self {
        Cell {
            name: name.into(),
            kind,
            length: 0,
            dependency: None,
            bit_position: 0,
            flag: FlagKind::None,
            visible: true,
            default: None,
            bit_labels: Vec::new(),
            value: Value::Empty,
        }
    }

    pub fn with_length(mut self, length: i32) -> Self {
        self.length = length;
        self
    }

    pub fn with_dependency(mut self, dependency: impl Into<String>) -> Self {
        self.dependency = Some(dependency.into());
        self
    }

    pub fn with_bit_position(mut self, position: i32) -> Self {
        self.bit_position = position;
        self
    }

    pub fn with_flag(mut self, flag: FlagKind) -> Self {
        self.flag = flag;
        self
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    /// Effective byte length: the declared length, or the type's native
    /// width when nothing was declared. A declared default suppresses the
    /// inference (the field is computed, not read).
    pub fn length(&self) -> i32 {
        if self.length == 0 && self.default.is_none() {
            self.kind.default_length().unwrap_or(0)
        } else {
            self.length
        }
    }

    pub fn set_length(&mut self, length: i32) {
        self.length = length;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_aliases_collapse() {
        assert_eq!(FieldType::parse("short").unwrap(), FieldType::Int16);
        assert_eq!(FieldType::parse("int16").unwrap(), FieldType::Int16);
        assert_eq!(FieldType::parse("int").unwrap(), FieldType::Int32);
        assert_eq!(FieldType::parse("INT32").unwrap(), FieldType::Int32);
        assert_eq!(FieldType::parse("long").unwrap(), FieldType::Int64);
        assert_eq!(FieldType::parse("single").unwrap(), FieldType::Float32);
        assert_eq!(FieldType::parse("float").unwrap(), FieldType::Float32);
        assert_eq!(FieldType::parse("double").unwrap(), FieldType::Float64);
        assert_eq!(
            FieldType::parse("string_by_ref").unwrap(),
            FieldType::StringByHeaderRef
        );
    }

    #[test]
    fn test_unknown_type_name() {
        match FieldType::parse("quaternion") {
            Err(Error::UnknownFieldType(name)) => assert_eq!(name, "quaternion"),
            other => panic!("expected UnknownFieldType, got {:?}", other),
        }
    }

    #[test]
    fn test_length_inference() {
        let cell = Cell::new("id", FieldType::Int32);
        assert_eq!(cell.length(), 4);

        let cell = Cell::new("name", FieldType::String).with_length(19);
        assert_eq!(cell.length(), 19);

        // a default marks the field as computed; no inference
        let cell = Cell::new("pad", FieldType::Int32).with_default(Value::Int32(0));
        assert_eq!(cell.length(), 0);
    }

    #[test]
    fn test_value_numeric_views() {
        assert_eq!(Value::Int16(-3).as_i32(), Some(-3));
        assert_eq!(Value::String("42".into()).as_i32(), Some(42));
        assert_eq!(Value::String("42\0".into()).as_i32(), Some(42));
        assert_eq!(Value::String("n/a".into()).as_i32(), None);
        assert_eq!(Value::Empty.as_i32(), None);
        assert_eq!(Value::Int32(7).as_f64(), Some(7.0));
        assert!(Value::Bit(true).truthy());
        assert!(!Value::Empty.truthy());
    }
}
