//! SQL-facing view of a table: column typing and statement text
//!
//! The codec itself never talks to a database; this module only maps field
//! types to their SQL column types and builds parameterised statement text
//! for whatever database layer the embedder wires up.

use std::fmt;

use crate::cell::FieldType;

/// SQL column type a field surfaces as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlType {
    TinyInt,
    SmallInt,
    Int,
    BigInt,
    DateTime,
    Decimal,
    Real,
    Float,
    VarChar,
}

impl fmt::Display for SqlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SqlType::TinyInt => "TINYINT",
            SqlType::SmallInt => "SMALLINT",
            SqlType::Int => "INT",
            SqlType::BigInt => "BIGINT",
            SqlType::DateTime => "DATETIME",
            SqlType::Decimal => "DECIMAL",
            SqlType::Real => "REAL",
            SqlType::Float => "FLOAT",
            SqlType::VarChar => "VARCHAR",
        };
        f.write_str(name)
    }
}

/// Column type a field of the given kind surfaces as. Bit fields travel as
/// TINYINT (0/1); every string flavour is VARCHAR.
pub fn sql_type_of(kind: FieldType) -> SqlType {
    match kind {
        FieldType::Byte | FieldType::BitFromVector => SqlType::TinyInt,
        FieldType::Int16 | FieldType::UInt16 => SqlType::SmallInt,
        FieldType::BitVector
        | FieldType::Int32
        | FieldType::UInt32
        | FieldType::Sid
        | FieldType::StringLen => SqlType::Int,
        FieldType::Int64 => SqlType::BigInt,
        FieldType::DateTime => SqlType::DateTime,
        FieldType::Decimal => SqlType::Decimal,
        FieldType::Float32 => SqlType::Real,
        FieldType::Float64 => SqlType::Float,
        FieldType::String | FieldType::StringByLen | FieldType::StringByHeaderRef => {
            SqlType::VarChar
        }
    }
}

/// One externally-visible column: field name plus its SQL type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSpec {
    pub name: String,
    pub sql_type: SqlType,
}

/// Parameterised INSERT text over the given columns, with one `@name`
/// placeholder per column.
pub fn insert_statement(table: &str, columns: &[ColumnSpec]) -> String {
    let names: Vec<&str> = columns.iter().map(|c| c.name.as_str()).collect();
    let params: Vec<String> = names.iter().map(|n| format!("@{}", n)).collect();
    format!(
        "INSERT INTO {} ({}) VALUES ({});",
        table,
        names.join(", "),
        params.join(", ")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_mapping() {
        assert_eq!(sql_type_of(FieldType::Byte), SqlType::TinyInt);
        assert_eq!(sql_type_of(FieldType::BitFromVector), SqlType::TinyInt);
        assert_eq!(sql_type_of(FieldType::Int16), SqlType::SmallInt);
        assert_eq!(sql_type_of(FieldType::Int32), SqlType::Int);
        assert_eq!(sql_type_of(FieldType::Sid), SqlType::Int);
        assert_eq!(sql_type_of(FieldType::Int64), SqlType::BigInt);
        assert_eq!(sql_type_of(FieldType::DateTime), SqlType::DateTime);
        assert_eq!(sql_type_of(FieldType::Decimal), SqlType::Decimal);
        assert_eq!(sql_type_of(FieldType::Float32), SqlType::Real);
        assert_eq!(sql_type_of(FieldType::Float64), SqlType::Float);
        assert_eq!(sql_type_of(FieldType::StringByLen), SqlType::VarChar);
    }

    #[test]
    fn test_insert_statement_text() {
        let columns = vec![
            ColumnSpec { name: "id".into(), sql_type: SqlType::Int },
            ColumnSpec { name: "name".into(), sql_type: SqlType::VarChar },
        ];
        assert_eq!(
            insert_statement("MonsterResource", &columns),
            "INSERT INTO MonsterResource (id, name) VALUES (@id, @name);"
        );
    }

    #[test]
    fn test_insert_statement_no_columns() {
        assert_eq!(insert_statement("T", &[]), "INSERT INTO T () VALUES ();");
    }
}
