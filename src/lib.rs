//! # unrdb
//!
//! A Rust library for reading and writing `.rdb` game data tables.
//!
//! ## Overview
//!
//! An `.rdb` file is a header followed by a flat run of fixed-layout
//! records. Nothing in the file describes its own layout; a schema document
//! supplies the ordered field list and the codec applies it field by field.
//! This library provides:
//!
//! - Parsing table buffers into typed rows and serializing them back
//! - The full historical field-type set, including bit vectors, packed
//!   decimals, epoch timestamps, and length-dependent strings
//! - Traditional (date stamp + row count) and schema-defined headers
//! - Grouped double-loop tables keyed by a loop-counter field
//! - A JSON schema adapter, plus the [`schema::SchemaProvider`] trait for
//!   custom schema sources and per-row transform hooks
//! - Legacy codepage support via `encoding_rs`
//! - SQL column typing and INSERT/SELECT text for database export layers
//!
//! ## Example
//!
//! ```rust,no_run
//! use unrdb::{JsonSchema, RdbCodec};
//!
//! fn main() -> unrdb::Result<()> {
//!     let doc = std::fs::read_to_string("schemas/monster.json")?;
//!     let schema = JsonSchema::from_str(&doc)?;
//!     let mut codec = RdbCodec::new(Box::new(schema))?;
//!
//!     let buffer = std::fs::read("db_monster.rdb")?;
//!     codec.parse(&buffer)?;
//!
//!     for row in codec.rows() {
//!         println!("{:?}", row.value_by_name("name"));
//!     }
//!
//!     let bytes = codec.write()?;
//!     std::fs::write("db_monster.rdb", bytes)?;
//!     Ok(())
//! }
//! ```

pub mod bits;
pub mod cell;
pub mod codec;
pub mod cursor;
pub mod error;
pub mod export;
pub mod header;
pub mod row;
pub mod schema;

pub use bits::BitVector32;
pub use cell::{Cell, FieldType, FlagKind, Value};
pub use codec::{ProgressSink, RdbCodec};
pub use error::{Error, Result};
pub use export::{insert_statement, sql_type_of, ColumnSpec, SqlType};
pub use header::{Header, TraditionalHeader};
pub use row::Row;
pub use schema::{Direction, JsonSchema, SchemaProvider, SpecialCase, TableLayout};
