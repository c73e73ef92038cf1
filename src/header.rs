//! The two header layouts read ahead of the row stream
//!
//! A table carries either the fixed traditional header (date stamp, banner
//! padding, row count) or a schema-defined header record whose shape comes
//! from the schema provider. Which one applies is a property of the schema
//! and fixed for the life of a codec instance.

use crate::cell::{FlagKind, Value};
use crate::row::Row;

/// Byte length of the traditional header's date stamp (`YYYYMMDD`).
pub const DATE_STAMP_LEN: usize = 8;
/// Byte length of the traditional header's version/padding slot.
pub const PADDING_LEN: usize = 120;

/// The fixed traditional header: date stamp, banner padding, row count,
/// always in that order.
#[derive(Debug, Clone, Default)]
pub struct TraditionalHeader {
    pub date: String,
    pub padding: Vec<u8>,
    pub row_count: i32,
}

/// Header variant in effect for one codec instance.
#[derive(Debug, Clone)]
pub enum Header {
    Traditional(TraditionalHeader),
    Defined(Row),
}

impl Header {
    /// The row count the header declares. For defined headers this is the
    /// `RowCount`-flagged field's value.
    pub fn row_count(&self) -> i32 {
        match self {
            Header::Traditional(h) => h.row_count,
            Header::Defined(row) => row
                .value_by_flag(FlagKind::RowCount)
                .and_then(Value::as_i32)
                .unwrap_or(0),
        }
    }

    pub fn set_row_count(&mut self, count: i32) {
        match self {
            Header::Traditional(h) => h.row_count = count,
            Header::Defined(row) => row.set_value_by_flag(FlagKind::RowCount, Value::Int32(count)),
        }
    }

    /// Numeric view of a named header field, for `string_by_header_ref`
    /// length resolution. Traditional headers have no named fields.
    pub fn field_i32(&self, name: &str) -> Option<i32> {
        match self {
            Header::Traditional(_) => None,
            Header::Defined(row) => row.value_by_name(name).and_then(Value::as_i32),
        }
    }

    /// The defined header record, when this header is schema-defined.
    pub fn defined(&self) -> Option<&Row> {
        match self {
            Header::Traditional(_) => None,
            Header::Defined(row) => Some(row),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::{Cell, FieldType};

    #[test]
    fn test_traditional_row_count() {
        let mut h = Header::Traditional(TraditionalHeader::default());
        assert_eq!(h.row_count(), 0);
        h.set_row_count(42);
        assert_eq!(h.row_count(), 42);
        assert_eq!(h.field_i32("anything"), None);
    }

    #[test]
    fn test_defined_row_count_lives_in_flagged_cell() {
        let template = vec![
            Cell::new("name_length", FieldType::Int32),
            Cell::new("row_count", FieldType::Int32).with_flag(FlagKind::RowCount),
        ];
        let mut h = Header::Defined(Row::new(&template));
        h.set_row_count(7);
        assert_eq!(h.row_count(), 7);

        let row = h.defined().unwrap();
        assert_eq!(row.value_by_name("row_count"), Some(&Value::Int32(7)));
    }

    #[test]
    fn test_header_field_lookup() {
        let template = vec![Cell::new("name_length", FieldType::Int32)];
        let mut row = Row::new(&template);
        row.set_value_by_name("name_length", Value::Int32(32));
        let h = Header::Defined(row);
        assert_eq!(h.field_i32("name_length"), Some(32));
        assert_eq!(h.field_i32("missing"), None);
    }
}
