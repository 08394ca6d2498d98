//! Error types for relmap

use std::time::Duration;
use thiserror::Error;

/// Result type alias for relmap operations
pub type OrmResult<T> = Result<T, OrmError>;

/// Failure to parse a field tag such as `column:id;primary;auto_increment`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TagError {
    /// The tag produced no entries at all.
    #[error("tag is empty")]
    Empty,

    /// The same key appeared twice.
    #[error("duplicate tag key '{0}'")]
    DuplicateKey(String),

    /// A clause that is neither `key` nor `key:value`.
    #[error("malformed tag clause '{0}'")]
    Malformed(String),
}

/// Schema descriptor problems detected while registering a type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MetadataError {
    /// A tagged field has no `column` key.
    #[error("field '{field}' is tagged but declares no column")]
    MissingColumn { field: String },

    /// The table-name accessor returned an empty string.
    #[error("type '{type_name}' returned an empty table name")]
    EmptyTableName { type_name: String },

    /// A save statement needs at least one `primary` column.
    #[error("table '{table}' has no primary key column")]
    NoPrimaryKey { table: String },

    /// Mapping targets must be concrete values, not boxed indirections.
    #[error("field '{field}' is a pointer type and cannot be a mapping target")]
    PointerFieldNotAllowed { field: String },

    /// Two fields claim the same column.
    #[error("column '{column}' is claimed by more than one field of '{type_name}'")]
    DuplicateColumn { type_name: String, column: String },

    /// Only one surrogate key per table is supported.
    #[error("table '{table}' declares more than one auto_increment column")]
    MultipleAutoIncrement { table: String },

    /// No field carries a tag in the active namespace.
    #[error("type '{type_name}' has no field tagged in namespace '{namespace}'")]
    NoMappedFields { type_name: String, namespace: String },
}

/// Error types for mapping and query construction
#[derive(Debug, Error)]
pub enum OrmError {
    /// Field tag could not be parsed
    #[error("Invalid tag on field '{field}': {source}")]
    TagParse {
        field: String,
        #[source]
        source: TagError,
    },

    /// Schema descriptor is unusable
    #[error("Metadata error: {0}")]
    Metadata(#[from] MetadataError),

    /// Destination has the wrong shape or state for the requested operation
    #[error("Invalid destination: {0}")]
    InvalidDestination(String),

    /// Cursor was exhausted before any row was produced
    #[error("Record not found")]
    RecordNotFound,

    /// Serial mapping was called without destinations
    #[error("Serial mapping requires at least one destination")]
    EmptyDestinationList,

    /// Serial mapping segment boundary violated
    #[error(
        "Segment {segment} expected head column '{expected}', found {}",
        describe_column(.actual)
    )]
    HeadColumnMismatch {
        segment: usize,
        expected: String,
        actual: Option<String>,
    },

    /// A required serial destination received an all-NULL segment
    #[error("Segment {segment} for required '{type_name}' is entirely NULL")]
    RequiredSegmentNull { segment: usize, type_name: String },

    /// Empty or whitespace-only SQL was about to be produced
    #[error("Dangerous query: {0}")]
    DangerousQuery(String),

    /// The cursor was asked to scan into the wrong number of targets
    #[error("Scan expected {expected} targets, got {actual}")]
    ColumnCountMismatch { expected: usize, actual: usize },

    /// Row decode/mapping error
    #[error("Decode error on column '{column}': {message}")]
    Decode { column: String, message: String },

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Query timeout error
    #[error("Query timeout after {0:?}")]
    Timeout(Duration),

    /// Error reported by the underlying cursor or executor
    #[error("Driver error: {0}")]
    Driver(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl OrmError {
    /// Create a decode error for a specific column
    pub fn decode(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Decode {
            column: column.into(),
            message: message.into(),
        }
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a dangerous query error
    pub fn dangerous(message: impl Into<String>) -> Self {
        Self::DangerousQuery(message.into())
    }

    /// Wrap a driver-side message as a driver error
    pub fn driver(message: impl Into<String>) -> Self {
        let message: String = message.into();
        Self::Driver(message.into())
    }

    /// Check if this is a not found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::RecordNotFound)
    }

    /// Check if this is a dangerous query error
    pub fn is_dangerous(&self) -> bool {
        matches!(self, Self::DangerousQuery(_))
    }

    /// Check if this is a timeout error
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }
}

fn describe_column(column: &Option<String>) -> String {
    match column {
        Some(name) => format!("'{name}'"),
        None => "end of row".to_string(),
    }
}

impl From<tokio_postgres::Error> for OrmError {
    fn from(err: tokio_postgres::Error) -> Self {
        Self::Driver(Box::new(err))
    }
}
