//! Error types for unrdb

use thiserror::Error;

/// Main error type for unrdb operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("unexpected end of buffer: needed {needed} bytes, {remaining} remaining")]
    UnexpectedEnd { needed: usize, remaining: usize },

    #[error("field '{field}' depends on '{dependency}' which does not resolve")]
    MissingDependency { field: String, dependency: String },

    #[error("unknown field type: {0}")]
    UnknownFieldType(String),

    #[error("encoded string is {len} bytes but the slot holds {max}")]
    StringTooLong { len: usize, max: usize },

    #[error("invalid schema: {0}")]
    InvalidSchema(String),

    #[error("row processor failed: {0}")]
    Processor(String),

    #[error("field '{field}' (row {row}): {source}")]
    Field {
        field: String,
        row: usize,
        #[source]
        source: Box<Error>,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("schema document error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Attach field-name/row context to an error bubbling out of a single
    /// field read or write. Already-contextualized errors pass through.
    pub(crate) fn at(self, field: &str, row: usize) -> Error {
        match self {
            Error::Field { .. } => self,
            other => Error::Field {
                field: field.to_string(),
                row,
                source: Box::new(other),
            },
        }
    }
}

/// Result type alias for unrdb operations
pub type Result<T> = std::result::Result<T, Error>;
