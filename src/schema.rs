//! Schema provider boundary and the bundled JSON adapter
//!
//! The codec never interprets schema sources itself; anything that can
//! produce a [`TableLayout`] — a scripting engine, a config parser, a
//! hand-written description — plugs in behind [`SchemaProvider`]. The
//! adapter shipped here loads the layout from a JSON document.

use serde::Deserialize;

use crate::cell::{Cell, FieldType, FlagKind, Value};
use crate::error::{Error, Result};
use crate::row::Row;

/// Direction a row-processor hook is invoked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Read,
    Write,
}

/// Non-standard table encodings. Only the grouped double-loop layout is
/// defined today.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecialCase {
    /// Rows are emitted in runs grouped by the `LoopCounter` field, each
    /// run preceded by its own element count.
    DoubleLoop,
}

/// Plain layout data a schema provider hands the codec: ordered field
/// templates plus table-level properties.
#[derive(Debug, Clone, Default)]
pub struct TableLayout {
    pub table_name: Option<String>,
    pub file_name: Option<String>,
    /// Ordered field descriptors for the row template.
    pub fields: Vec<Cell>,
    /// Ordered field descriptors for the header, when it is schema-defined.
    pub header_fields: Option<Vec<Cell>>,
    pub special_case: Option<SpecialCase>,
    /// User-supplied SELECT statement text, if any.
    pub select_statement: Option<String>,
    /// Explicit externally-visible column names; falls back to all visible
    /// field names in declaration order.
    pub sql_columns: Option<Vec<String>>,
}

/// Source of table layouts and, optionally, a per-row transform hook.
pub trait SchemaProvider {
    /// The table layout. Called once at codec initialization.
    fn layout(&self) -> Result<TableLayout>;

    /// Whether [`SchemaProvider::process_row`] does anything. When false
    /// the codec skips the call entirely.
    fn has_row_processor(&self) -> bool {
        false
    }

    /// Transform hook invoked around each row parse/write. May mutate the
    /// row in place; errors are surfaced, not swallowed.
    fn process_row(&self, _direction: Direction, _row: &mut Row, _index: usize) -> Result<()> {
        Ok(())
    }
}

/// A bare layout is its own provider; handy for embedders that build the
/// field list in code.
impl SchemaProvider for TableLayout {
    fn layout(&self) -> Result<TableLayout> {
        Ok(self.clone())
    }
}

// JSON adapter

#[derive(Debug, Deserialize)]
struct SchemaDoc {
    #[serde(default)]
    table_name: Option<String>,
    #[serde(default)]
    file_name: Option<String>,
    fields: Vec<FieldDef>,
    #[serde(default)]
    header: Option<Vec<FieldDef>>,
    #[serde(default)]
    special_case: Option<String>,
    #[serde(default)]
    select_statement: Option<String>,
    #[serde(default)]
    sql_columns: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct FieldDef {
    name: String,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    length: Option<i32>,
    #[serde(default)]
    dependency: Option<String>,
    #[serde(default)]
    bit_position: Option<i32>,
    #[serde(default)]
    flag: Option<String>,
    /// Visibility to external consumers; defaults to shown.
    #[serde(default = "default_show")]
    show: bool,
    #[serde(default)]
    default: Option<serde_json::Value>,
    /// Bit labels for `bit_flag` fields.
    #[serde(default)]
    opt: Vec<String>,
}

fn default_show() -> bool {
    true
}

/// Schema provider backed by a JSON table description.
///
/// Type names accept the historical aliases (`short`, `int`, `single`,
/// ...); they are collapsed to canonical [`FieldType`]s here so the codec
/// never sees an alias.
#[derive(Debug, Clone)]
pub struct JsonSchema {
    layout: TableLayout,
}

impl JsonSchema {
    /// Parse a schema document from JSON text.
    pub fn from_str(text: &str) -> Result<Self> {
        let doc: SchemaDoc = serde_json::from_str(text)?;

        let fields = convert_fields(&doc.fields)?;
        let header_fields = match &doc.header {
            Some(defs) => Some(convert_fields(defs)?),
            None => None,
        };
        let special_case = match doc.special_case.as_deref() {
            None => None,
            Some("double_loop") => Some(SpecialCase::DoubleLoop),
            Some(other) => {
                return Err(Error::InvalidSchema(format!(
                    "unknown special case '{}'",
                    other
                )))
            }
        };

        Ok(JsonSchema {
            layout: TableLayout {
                table_name: doc.table_name,
                file_name: doc.file_name,
                fields,
                header_fields,
                special_case,
                select_statement: doc.select_statement,
                sql_columns: doc.sql_columns,
            },
        })
    }
}

impl SchemaProvider for JsonSchema {
    fn layout(&self) -> Result<TableLayout> {
        Ok(self.layout.clone())
    }
}

fn convert_fields(defs: &[FieldDef]) -> Result<Vec<Cell>> {
    defs.iter().map(convert_field).collect()
}

fn convert_field(def: &FieldDef) -> Result<Cell> {
    let kind = FieldType::parse(&def.kind)?;
    let mut cell = Cell::new(def.name.clone(), kind);

    if let Some(length) = def.length {
        cell.set_length(length);
    }
    if let Some(dependency) = &def.dependency {
        cell = cell.with_dependency(dependency.clone());
    }
    if let Some(position) = def.bit_position {
        cell = cell.with_bit_position(position);
    }
    if let Some(flag) = &def.flag {
        cell = cell.with_flag(FlagKind::parse(flag)?);
    }
    if !def.show {
        cell = cell.hidden();
    }
    if let Some(default) = &def.default {
        cell = cell.with_default(convert_default(&def.name, default)?);
    }
    cell.bit_labels = def.opt.clone();

    Ok(cell)
}

fn convert_default(field: &str, value: &serde_json::Value) -> Result<Value> {
    match value {
        serde_json::Value::Bool(b) => Ok(Value::Bit(*b)),
        serde_json::Value::String(s) => Ok(Value::String(s.clone())),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                if i >= i32::MIN as i64 && i <= i32::MAX as i64 {
                    Ok(Value::Int32(i as i32))
                } else {
                    Ok(Value::Int64(i))
                }
            } else {
                Ok(Value::Float64(n.as_f64().unwrap_or(0.0)))
            }
        }
        other => Err(Error::InvalidSchema(format!(
            "field '{}' has unsupported default {}",
            field, other
        ))),
    }
}
