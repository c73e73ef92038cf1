//! Schema-driven record codec for .rdb table buffers
//!
//! [`RdbCodec`] is the orchestrator: it obtains the table layout from a
//! [`SchemaProvider`], parses a raw byte buffer into a header plus a
//! sequence of [`Row`]s, and serializes those rows back into bytes with the
//! same physical layout. Field order within a record is significant — a
//! field's length or value may depend on an earlier field of the same row
//! or on a header field, so fields are always processed in declaration
//! order.

use chrono::{TimeZone, Utc};
use encoding_rs::{Encoding, UTF_8};

use crate::bits::BitVector32;
use crate::cell::{Cell, FieldType, FlagKind, Value};
use crate::cursor::BinaryCursor;
use crate::error::{Error, Result};
use crate::export::{sql_type_of, ColumnSpec};
use crate::header::{Header, TraditionalHeader, DATE_STAMP_LEN, PADDING_LEN};
use crate::row::Row;
use crate::schema::{Direction, SchemaProvider, SpecialCase, TableLayout};

/// Synchronous progress/message notifications fired on the calling thread.
///
/// Callbacks must not block indefinitely and must never touch the buffer
/// being parsed or written. The default implementations are no-ops.
pub trait ProgressSink {
    fn progress_max(&mut self, _max: i32) {}
    fn progress(&mut self, _value: i32) {}
    fn message(&mut self, _text: &str) {}
}

/// The record codec: owns the schema templates, the current header, and the
/// decoded dataset for one load/save cycle.
pub struct RdbCodec {
    provider: Box<dyn SchemaProvider>,
    layout: TableLayout,
    header: Header,
    rows: Vec<Row>,
    encoding: &'static Encoding,
    sink: Option<Box<dyn ProgressSink>>,
    next_sequence_id: i32,
}

impl RdbCodec {
    /// Initialize the codec from a schema provider. The layout is fetched
    /// and validated once; templates are read-only thereafter.
    pub fn new(provider: Box<dyn SchemaProvider>) -> Result<Self> {
        let layout = provider.layout()?;
        validate_layout(&layout)?;

        let header = match &layout.header_fields {
            Some(template) => Header::Defined(Row::new(template)),
            None => Header::Traditional(TraditionalHeader::default()),
        };

        Ok(RdbCodec {
            provider,
            layout,
            header,
            rows: Vec::new(),
            encoding: UTF_8,
            sink: None,
            next_sequence_id: 0,
        })
    }

    /// Set the text encoding strings are decoded and encoded with.
    pub fn set_encoding(&mut self, encoding: &'static Encoding) {
        self.encoding = encoding;
    }

    /// Install a progress/message sink.
    pub fn set_progress_sink(&mut self, sink: Box<dyn ProgressSink>) {
        self.sink = Some(sink);
    }

    // Dataset surface

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn rows_mut(&mut self) -> &mut [Row] {
        &mut self.rows
    }

    pub fn row(&self, index: usize) -> Option<&Row> {
        self.rows.get(index)
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    /// The row template cells (schema only, values unset).
    pub fn row_template(&self) -> &[Cell] {
        &self.layout.fields
    }

    pub fn header_template(&self) -> Option<&[Cell]> {
        self.layout.header_fields.as_deref()
    }

    pub fn table_name(&self) -> Option<&str> {
        self.layout.table_name.as_deref()
    }

    pub fn file_name(&self) -> Option<&str> {
        self.layout.file_name.as_deref()
    }

    pub fn select_statement(&self) -> Option<&str> {
        self.layout.select_statement.as_deref()
    }

    /// The row count in effect: the header's declared count, bumped to the
    /// held dataset size when rows were replaced wholesale under a
    /// traditional header.
    pub fn row_count(&self) -> i32 {
        let declared = self.header.row_count();
        match self.header {
            Header::Traditional(_) if (self.rows.len() as i32) > declared => {
                self.rows.len() as i32
            }
            _ => declared,
        }
    }

    /// Replace the held dataset wholesale, syncing the header row count.
    pub fn set_data(&mut self, rows: Vec<Row>) {
        self.header.set_row_count(rows.len() as i32);
        self.rows = rows;
    }

    /// Drop the held dataset.
    pub fn clear(&mut self) {
        self.rows.clear();
    }

    /// Every row whose field `key` currently holds the numeric `value`.
    pub fn find_all(&self, key: &str, value: i32) -> Vec<&Row> {
        self.rows
            .iter()
            .filter(|row| {
                row.value_by_name(key).and_then(Value::as_i32) == Some(value)
            })
            .collect()
    }

    /// Externally-visible columns with their SQL type mapping, for the
    /// database export boundary. Uses the schema's explicit column list
    /// when present, otherwise all field names in declaration order;
    /// hidden fields are excluded either way.
    pub fn visible_columns(&self) -> Vec<ColumnSpec> {
        let names: Vec<String> = match &self.layout.sql_columns {
            Some(columns) => columns.clone(),
            None => self.layout.fields.iter().map(|c| c.name.clone()).collect(),
        };
        names
            .iter()
            .filter_map(|name| self.layout.fields.iter().find(|c| &c.name == name))
            .filter(|cell| cell.visible)
            .map(|cell| ColumnSpec {
                name: cell.name.clone(),
                sql_type: sql_type_of(cell.kind),
            })
            .collect()
    }

    /// Names of the externally-visible columns, in export order.
    pub fn visible_cell_names(&self) -> Vec<String> {
        self.visible_columns().into_iter().map(|c| c.name).collect()
    }

    /// Parameterised INSERT statement text over the visible columns.
    pub fn insert_statement(&self) -> String {
        let table = self.layout.table_name.as_deref().unwrap_or("<tableName>");
        crate::export::insert_statement(table, &self.visible_columns())
    }

    // Parse

    /// Parse a raw table buffer into a header plus the row dataset.
    ///
    /// One failure is reported per call: the error carries field/row
    /// context and is also delivered to the message sink.
    pub fn parse(&mut self, buffer: &[u8]) -> Result<()> {
        tracing::debug!(len = buffer.len(), "parsing table buffer");
        let result = self.parse_inner(buffer);
        match &result {
            Ok(()) => tracing::debug!(rows = self.rows.len(), "parse complete"),
            Err(e) => {
                let text = format!("parse failed: {}", e);
                self.notify_message(&text);
            }
        }
        result
    }

    fn parse_inner(&mut self, buffer: &[u8]) -> Result<()> {
        // one fresh counter per parse pass
        self.next_sequence_id = 0;
        let mut cursor = BinaryCursor::from_bytes(buffer.to_vec());
        self.parse_header(&mut cursor)?;
        self.parse_rows(&mut cursor)?;
        Ok(())
    }

    fn parse_header(&mut self, cursor: &mut BinaryCursor) -> Result<()> {
        match &self.layout.header_fields {
            None => {
                let date = cursor.read_string(DATE_STAMP_LEN, self.encoding)?;
                let padding = cursor.read_bytes(PADDING_LEN)?;
                let row_count = cursor.read_i32()?;
                self.header = Header::Traditional(TraditionalHeader {
                    date,
                    padding,
                    row_count,
                });
            }
            Some(template) => {
                let template = template.clone();
                let mut row = Row::new(&template);
                // header fields resolve dependencies against the header
                // record itself; there is no outer header scope
                read_row_fields(
                    cursor,
                    &mut row,
                    None,
                    self.encoding,
                    &mut self.next_sequence_id,
                    0,
                )?;
                self.header = Header::Defined(row);
            }
        }
        Ok(())
    }

    fn parse_rows(&mut self, cursor: &mut BinaryCursor) -> Result<()> {
        let row_count = self.header.row_count();
        let grouped = self.layout.special_case == Some(SpecialCase::DoubleLoop);
        let use_processor = self.provider.has_row_processor();
        let template = self.layout.fields.clone();

        self.notify_progress_max(row_count);
        let mut rows = Vec::with_capacity(row_count.max(0) as usize);

        for r in 0..row_count {
            // grouped tables prefix each run with its own element count;
            // every inner row is flattened into one output sequence
            let inner = if grouped { cursor.read_i32()? } else { 1 };

            for _ in 0..inner {
                let mut row = Row::new(&template);
                read_row_fields(
                    cursor,
                    &mut row,
                    Some(&self.header),
                    self.encoding,
                    &mut self.next_sequence_id,
                    r as usize,
                )?;

                if use_processor {
                    self.provider.process_row(Direction::Read, &mut row, r as usize)?;
                }
                rows.push(row);

                if r * 100 / row_count != (r - 1) * 100 / row_count {
                    self.notify_progress(r);
                }
            }
        }

        self.rows = rows;
        self.notify_progress_max(100);
        self.notify_progress(0);
        Ok(())
    }

    // Write

    /// Serialize the header and the held dataset back into bytes with the
    /// original physical layout.
    pub fn write(&mut self) -> Result<Vec<u8>> {
        tracing::debug!(rows = self.rows.len(), "writing table buffer");
        let result = self.write_inner();
        if let Err(e) = &result {
            let text = format!("write failed: {}", e);
            self.notify_message(&text);
        }
        result
    }

    fn write_inner(&mut self) -> Result<Vec<u8>> {
        let mut cursor = BinaryCursor::new();
        self.write_header(&mut cursor)?;
        self.write_rows(&mut cursor)?;
        Ok(cursor.into_bytes())
    }

    fn write_header(&mut self, cursor: &mut BinaryCursor) -> Result<()> {
        match &self.header {
            Header::Traditional(_) => {
                let date = Utc::now().format("%Y%m%d").to_string();
                cursor.write_string(&date, DATE_STAMP_LEN, self.encoding)?;

                let banner = format!(
                    "........RDB written with unrdb v{}",
                    env!("CARGO_PKG_VERSION")
                );
                cursor.write_string(&banner, PADDING_LEN, self.encoding)?;

                if self.layout.special_case == Some(SpecialCase::DoubleLoop) {
                    cursor.write_i32(self.group_run_count())?;
                } else {
                    cursor.write_i32(self.row_count())?;
                }
            }
            Header::Defined(row) => {
                let row = row.clone();
                write_row_fields(cursor, &row, None, self.encoding, 0)?;
            }
        }
        Ok(())
    }

    /// Number of `LoopCounter` runs across the dataset, as recorded in the
    /// traditional header of a grouped table. Counts value transitions from
    /// a starting marker of 0, so callers must present rows pre-sorted by
    /// counter value to get one run per distinct value.
    fn group_run_count(&self) -> i32 {
        let mut prev = 0i32;
        let mut runs = 0i32;
        for row in &self.rows {
            let current = row
                .value_by_flag(FlagKind::LoopCounter)
                .and_then(Value::as_i32)
                .unwrap_or(0);
            if current != prev {
                prev = current;
                runs += 1;
            }
        }
        runs
    }

    fn write_rows(&mut self, cursor: &mut BinaryCursor) -> Result<()> {
        let total = self.rows.len() as i32;
        let grouped = self.layout.special_case == Some(SpecialCase::DoubleLoop);
        let use_processor = self.provider.has_row_processor();

        self.notify_progress_max(total);

        if grouped {
            self.write_grouped_rows(cursor, use_processor)?;
        } else {
            for r in 0..self.rows.len() {
                self.write_one_row(cursor, r, use_processor)?;

                let r = r as i32;
                if total > 0 && r * 100 / total != (r - 1) * 100 / total {
                    self.notify_progress(r);
                }
            }
        }

        if let Some(file) = self.layout.file_name.clone() {
            self.notify_message(&format!("writing {}", file));
        }
        self.notify_progress_max(100);
        self.notify_progress(0);
        Ok(())
    }

    /// Grouped write: whenever the `LoopCounter` value changes from the
    /// previous row, emit the count of all rows sharing that value followed
    /// by those rows. Rows must arrive sorted by counter value; unsorted
    /// input produces one (possibly duplicate) group per transition. That
    /// is the established on-disk contract, preserved exactly.
    fn write_grouped_rows(&mut self, cursor: &mut BinaryCursor, use_processor: bool) -> Result<()> {
        let counter = match self.rows.first() {
            Some(row) => row
                .name_by_flag(FlagKind::LoopCounter)
                .ok_or_else(|| {
                    Error::InvalidSchema("grouped table has no LoopCounter field".into())
                })?
                .to_string(),
            None => return Ok(()),
        };

        let mut prev = 0i32;
        for idx in 0..self.rows.len() {
            let current = self.rows[idx]
                .value_by_name(&counter)
                .and_then(Value::as_i32)
                .unwrap_or(0);
            if current == prev {
                continue;
            }

            let group: Vec<usize> = (0..self.rows.len())
                .filter(|&i| {
                    self.rows[i].value_by_name(&counter).and_then(Value::as_i32)
                        == Some(current)
                })
                .collect();

            cursor.write_i32(group.len() as i32)?;
            for &member in &group {
                self.write_one_row(cursor, member, use_processor)?;
            }
            prev = current;
        }
        Ok(())
    }

    fn write_one_row(
        &mut self,
        cursor: &mut BinaryCursor,
        index: usize,
        use_processor: bool,
    ) -> Result<()> {
        if use_processor {
            // the hook mutates a scratch copy, never the held dataset
            let mut scratch = Row::new(&self.layout.fields);
            self.rows[index].clone_into(&mut scratch);
            self.provider
                .process_row(Direction::Write, &mut scratch, index)?;
            write_row_fields(cursor, &scratch, Some(&self.header), self.encoding, index)
        } else {
            write_row_fields(
                cursor,
                &self.rows[index],
                Some(&self.header),
                self.encoding,
                index,
            )
        }
    }

    // Notifications

    fn notify_progress_max(&mut self, max: i32) {
        if let Some(sink) = self.sink.as_deref_mut() {
            sink.progress_max(max);
        }
    }

    fn notify_progress(&mut self, value: i32) {
        if let Some(sink) = self.sink.as_deref_mut() {
            sink.progress(value);
        }
    }

    fn notify_message(&mut self, text: &str) {
        if let Some(sink) = self.sink.as_deref_mut() {
            sink.message(text);
        }
    }
}

/// Structural template validation performed once at initialization.
/// Dependency *presence* is deliberately left to parse/write time, where an
/// unresolved name surfaces as [`Error::MissingDependency`] with row
/// context.
fn validate_layout(layout: &TableLayout) -> Result<()> {
    let row_counts = layout
        .fields
        .iter()
        .filter(|c| c.flag == FlagKind::RowCount)
        .count();
    if row_counts > 1 {
        return Err(Error::InvalidSchema(
            "more than one field carries the RowCount flag".into(),
        ));
    }

    if let Some(header) = &layout.header_fields {
        let header_counts = header
            .iter()
            .filter(|c| c.flag == FlagKind::RowCount)
            .count();
        if header_counts != 1 {
            return Err(Error::InvalidSchema(
                "a defined header needs exactly one RowCount field".into(),
            ));
        }
    }

    let loop_counters = layout
        .fields
        .iter()
        .filter(|c| c.flag == FlagKind::LoopCounter)
        .count();
    if loop_counters > 1 {
        return Err(Error::InvalidSchema(
            "more than one field carries the LoopCounter flag".into(),
        ));
    }
    if layout.special_case == Some(SpecialCase::DoubleLoop) && loop_counters != 1 {
        return Err(Error::InvalidSchema(
            "grouped tables need exactly one LoopCounter field".into(),
        ));
    }

    for cell in &layout.fields {
        if cell.kind == FieldType::BitFromVector {
            match &cell.dependency {
                None => {
                    return Err(Error::InvalidSchema(format!(
                        "bit field '{}' has no dependency",
                        cell.name
                    )))
                }
                Some(dep) => {
                    if let Some(target) = layout.fields.iter().find(|c| &c.name == dep) {
                        if target.kind != FieldType::BitVector {
                            return Err(Error::InvalidSchema(format!(
                                "bit field '{}' depends on '{}' which is not a bit vector",
                                cell.name, dep
                            )));
                        }
                    }
                }
            }
        }

        if cell.kind == FieldType::StringByHeaderRef {
            let dep = cell.dependency.as_deref().unwrap_or("");
            let resolved = layout
                .header_fields
                .as_deref()
                .map(|h| h.iter().any(|c| c.name == dep))
                .unwrap_or(false);
            if !resolved {
                return Err(Error::InvalidSchema(format!(
                    "field '{}' references header field '{}' which is not defined",
                    cell.name, dep
                )));
            }
        }
    }

    Ok(())
}

fn require_dependency(cell: &Cell) -> Result<&str> {
    cell.dependency.as_deref().ok_or_else(|| Error::MissingDependency {
        field: cell.name.clone(),
        dependency: "(unset)".into(),
    })
}

/// Run the field-read algorithm over one row, in declaration order.
fn read_row_fields(
    cursor: &mut BinaryCursor,
    row: &mut Row,
    header: Option<&Header>,
    encoding: &'static Encoding,
    next_sequence_id: &mut i32,
    row_index: usize,
) -> Result<()> {
    for idx in 0..row.len() {
        read_field(cursor, row, idx, header, encoding, next_sequence_id)
            .map_err(|e| e.at(&row.cells()[idx].name, row_index))?;
    }
    Ok(())
}

fn read_field(
    cursor: &mut BinaryCursor,
    row: &mut Row,
    idx: usize,
    header: Option<&Header>,
    encoding: &'static Encoding,
    next_sequence_id: &mut i32,
) -> Result<()> {
    let cell = &row.cells()[idx];
    let kind = cell.kind;
    let length = cell.length();
    let bit_position = cell.bit_position;
    let name = cell.name.clone();
    let dependency = cell.dependency.clone();

    let value = match kind {
        FieldType::Byte => {
            if length > 1 {
                Value::Bytes(cursor.read_bytes(length as usize)?)
            } else {
                Value::Byte(cursor.read_u8()?)
            }
        }
        FieldType::BitVector => Value::Bits(BitVector32::from_word(cursor.read_u32()?)),
        FieldType::BitFromVector => {
            let dep = dependency.ok_or_else(|| Error::MissingDependency {
                field: name.clone(),
                dependency: "(unset)".into(),
            })?;
            let bits = match row.value_by_name(&dep) {
                Some(Value::Bits(v)) => *v,
                _ => {
                    return Err(Error::MissingDependency {
                        field: name,
                        dependency: dep,
                    })
                }
            };
            Value::Bit(bits.get(bit_position as u32))
        }
        FieldType::Int16 => Value::Int16(cursor.read_i16()?),
        FieldType::UInt16 => Value::UInt16(cursor.read_u16()?),
        FieldType::Int32 => Value::Int32(cursor.read_i32()?),
        FieldType::UInt32 => Value::UInt32(cursor.read_u32()?),
        FieldType::Int64 => Value::Int64(cursor.read_i64()?),
        FieldType::DateTime => {
            let seconds = cursor.read_i32()?;
            let stamp = Utc
                .timestamp_opt(seconds as i64, 0)
                .single()
                .unwrap_or_default();
            Value::DateTime(stamp)
        }
        FieldType::Decimal => Value::Decimal(cursor.read_i32()? as f64 / 100.0),
        FieldType::Float32 => Value::Float32(cursor.read_f32()?),
        FieldType::Float64 => Value::Float64(cursor.read_f64()?),
        FieldType::Sid => {
            // assigned, never read from disk
            let id = *next_sequence_id;
            *next_sequence_id += 1;
            Value::Int32(id)
        }
        FieldType::String => Value::String(cursor.read_string(length.max(0) as usize, encoding)?),
        FieldType::StringByLen => {
            let dep = require_dependency(cell)?.to_string();
            let len = row
                .value_by_name(&dep)
                .ok_or_else(|| Error::MissingDependency {
                    field: name,
                    dependency: dep,
                })?
                .as_i32();
            match len {
                // negative or unparseable length: leave unset, consume nothing
                Some(n) if n >= 0 => Value::String(cursor.read_string(n as usize, encoding)?),
                _ => return Ok(()),
            }
        }
        FieldType::StringByHeaderRef => {
            let dep = require_dependency(cell)?.to_string();
            let len = header
                .and_then(|h| h.field_i32(&dep))
                .ok_or_else(|| Error::MissingDependency {
                    field: name,
                    dependency: dep,
                })?;
            Value::String(cursor.read_string(len.max(0) as usize, encoding)?)
        }
        // write-only derived data; the read position does not advance
        FieldType::StringLen => return Ok(()),
    };

    row.set_value(idx, value);
    Ok(())
}

/// Run the field-write algorithm over one row, mirroring the read dispatch.
fn write_row_fields(
    cursor: &mut BinaryCursor,
    row: &Row,
    header: Option<&Header>,
    encoding: &'static Encoding,
    row_index: usize,
) -> Result<()> {
    for idx in 0..row.len() {
        write_field(cursor, row, idx, header, encoding)
            .map_err(|e| e.at(&row.cells()[idx].name, row_index))?;
    }
    Ok(())
}

fn write_field(
    cursor: &mut BinaryCursor,
    row: &Row,
    idx: usize,
    header: Option<&Header>,
    encoding: &'static Encoding,
) -> Result<()> {
    let cell = &row.cells()[idx];
    match cell.kind {
        FieldType::Byte => {
            let length = cell.length();
            if length > 1 {
                let mut bytes = match &cell.value {
                    Value::Bytes(b) => b.clone(),
                    _ => Vec::new(),
                };
                bytes.resize(length as usize, 0);
                cursor.write_bytes(&bytes)?;
            } else {
                let byte = match &cell.value {
                    Value::Byte(b) => *b,
                    other => other.as_i32().unwrap_or(0) as u8,
                };
                cursor.write_u8(byte)?;
            }
        }
        FieldType::BitVector => {
            // the stored word is not trusted; re-pack it from the fields
            // that depend on this vector
            let mut bits = BitVector32::default();
            for field in row.bit_fields(&cell.name) {
                bits.set(field.bit_position as u32, field.value.truthy());
            }
            cursor.write_u32(bits.to_word())?;
        }
        // packed into its vector; no bytes of its own
        FieldType::BitFromVector => {}
        FieldType::Int16 => cursor.write_i16(cell.value.as_i32().unwrap_or(0) as i16)?,
        FieldType::UInt16 => cursor.write_u16(cell.value.as_i32().unwrap_or(0) as u16)?,
        FieldType::Int32 => cursor.write_i32(cell.value.as_i32().unwrap_or(0))?,
        FieldType::UInt32 => {
            let v = match &cell.value {
                Value::UInt32(v) => *v,
                other => other.as_i64().unwrap_or(0) as u32,
            };
            cursor.write_u32(v)?;
        }
        FieldType::Int64 => cursor.write_i64(cell.value.as_i64().unwrap_or(0))?,
        FieldType::DateTime => {
            let seconds = match &cell.value {
                Value::DateTime(stamp) => stamp.timestamp(),
                _ => 0,
            };
            cursor.write_i32(seconds as i32)?;
        }
        FieldType::Decimal => {
            let scaled = (cell.value.as_f64().unwrap_or(0.0) * 100.0).round() as i32;
            cursor.write_i32(scaled)?;
        }
        FieldType::Float32 => {
            let v = match &cell.value {
                Value::Float32(v) => *v,
                other => other.as_f64().unwrap_or(0.0) as f32,
            };
            cursor.write_f32(v)?;
        }
        FieldType::Float64 => cursor.write_f64(cell.value.as_f64().unwrap_or(0.0))?,
        // not stored on disk
        FieldType::Sid => {}
        FieldType::String => {
            let text = cell.value.as_str().unwrap_or("");
            cursor.write_string(text, cell.length().max(0) as usize, encoding)?;
        }
        FieldType::StringByLen => {
            let dep = require_dependency(cell)?.to_string();
            let slot = row
                .value_by_name(&dep)
                .and_then(Value::as_i32)
                .unwrap_or(0);
            let text = cell.value.as_str().unwrap_or("");
            cursor.write_string(text, slot.max(0) as usize, encoding)?;
        }
        FieldType::StringByHeaderRef => {
            let dep = require_dependency(cell)?.to_string();
            let slot = header
                .and_then(|h| h.field_i32(&dep))
                .ok_or_else(|| Error::MissingDependency {
                    field: cell.name.clone(),
                    dependency: dep,
                })?;
            let text = cell.value.as_str().unwrap_or("");
            cursor.write_string(text, slot.max(0) as usize, encoding)?;
        }
        FieldType::StringLen => {
            // derived: byte length of the string field that depends on this
            // one, plus its null terminator
            let owner = row
                .name_by_dependency(&cell.name)
                .ok_or_else(|| Error::MissingDependency {
                    field: cell.name.clone(),
                    dependency: cell.name.clone(),
                })?;
            let text = row
                .value_by_name(owner)
                .and_then(Value::as_str)
                .unwrap_or("");
            let (encoded, _, _) = encoding.encode(text);
            cursor.write_i32(encoded.len() as i32 + 1)?;
        }
    }
    Ok(())
}
