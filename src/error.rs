//! Error types for parsing and executing queries.

use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::data_type::StorageType;

/// Result type for table and database operations.
pub type QueryResult<T> = Result<T, QueryError>;

/// Errors raised while turning query text into a [crate::Query].
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum ParseError {
    /// The query does not end in `IN <table>`.
    #[error("missing table target: query must end with `IN <table>`")]
    MissingTable,

    /// A `[...]` value list is absent, unterminated or contains an empty value.
    #[error("malformed value list: {reason}")]
    MalformedValueList { reason: String },

    /// `ENTRY` is not followed by an id.
    #[error("missing entry id after ENTRY")]
    MissingEntryId,

    #[error("unknown comparator {found:?}, expected IS, NOT, INCLUDES or EXCLUDES")]
    UnknownComparator { found: String },

    /// `WHERE` is followed by nothing.
    #[error("empty WHERE clause")]
    EmptyWhere,

    #[error("missing value for dependency on column {column:?}")]
    MissingValue { column: String },

    #[error("unknown action {found:?}, expected ADD, REMOVE, GET, SET or DROP")]
    UnknownAction { found: String },

    /// `DROP` must be followed by exactly one table name.
    #[error("malformed DROP: expected `DROP <table>`, got {found:?}")]
    MalformedDrop { found: String },

    #[error("unterminated quoted value starting at {position}")]
    UnterminatedQuote { position: usize },

    #[error("expected {expected}, found {found}")]
    UnexpectedToken { expected: String, found: String },
}

/// Errors raised while executing a query against a table or database.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
pub enum QueryError {
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// A literal's classified type disagrees with its column's storage type.
    #[error("type mismatch: value {value:?} is not a valid {expected} for column {column:?}")]
    TypeMismatch {
        column: String,
        value: String,
        expected: StorageType,
    },

    #[error("value count mismatch: table has {expected} columns, got {found} values")]
    ValueCountMismatch { expected: usize, found: usize },

    /// A WHERE clause names an unknown column or compares it against an incompatible value.
    #[error("invalid dependency on column {column:?}: {reason}")]
    InvalidDependency { column: String, reason: String },

    #[error("entry {id:?} not found in table {table:?}")]
    EntryNotFound { table: String, id: String },

    #[error("table {table:?} not found")]
    TableNotFound { table: String },

    #[error("table {table:?} has been dropped")]
    TableDropped { table: String },

    #[error("table {table:?} already exists")]
    TableExists { table: String },

    #[error("invalid schema: {reason}")]
    InvalidSchema { reason: String },

    /// A message handed to [crate::Database::handle] is not a query request.
    #[error("invalid request: {reason}")]
    InvalidRequest { reason: String },

    /// The backing file does not follow the table format.
    #[error("corrupt table file {path:?} at byte {offset}: {reason}")]
    CorruptTable {
        path: PathBuf,
        offset: usize,
        reason: String,
    },

    /// Underlying file-system failure. The [io::ErrorKind] is kept as text so
    /// the error can cross a serialization boundary.
    #[error("I/O error on {path:?} ({kind}): {message}")]
    Io {
        path: PathBuf,
        kind: String,
        message: String,
    },
}

impl QueryError {
    /// Wraps an [io::Error] with the path it occurred on.
    pub fn io(path: impl AsRef<Path>, err: io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            kind: format!("{:?}", err.kind()),
            message: err.to_string(),
        }
    }

    pub(crate) fn corrupt(path: impl AsRef<Path>, offset: usize, reason: impl Into<String>) -> Self {
        Self::CorruptTable {
            path: path.as_ref().to_path_buf(),
            offset,
            reason: reason.into(),
        }
    }
}
