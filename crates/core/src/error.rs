//! Unified error types for the billing aggregator.
//!
//! Error codes:
//! - ARCHIVE_001-003: Archive and staging errors
//! - DB_001-004: Store errors
//! - ROW_001: Row-level errors (recoverable, the row is skipped)

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Archive error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveErrorCode {
    /// ARCHIVE_001: Archive file could not be opened
    Unreadable,
    /// ARCHIVE_002: Archive or one of its entries is corrupt
    Corrupt,
    /// ARCHIVE_003: Staging directory could not be written
    Staging,
}

impl ArchiveErrorCode {
    /// Get the error code string.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Unreadable => "ARCHIVE_001",
            Self::Corrupt => "ARCHIVE_002",
            Self::Staging => "ARCHIVE_003",
        }
    }
}

/// Store error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbErrorCode {
    /// DB_001: Store could not be opened
    Open,
    /// DB_002: Schema bootstrap failed
    Schema,
    /// DB_003: Failed to write aggregates
    Write,
    /// DB_004: Failed to read aggregates
    Query,
}

impl DbErrorCode {
    /// Get the error code string.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Open => "DB_001",
            Self::Schema => "DB_002",
            Self::Write => "DB_003",
            Self::Query => "DB_004",
        }
    }
}

/// Unified error type for the billing aggregator.
#[derive(Debug, Error)]
pub enum Error {
    /// Archive error with code.
    #[error("[{code}] {message}")]
    Archive { code: &'static str, message: String },

    /// Store error with code.
    #[error("[{code}] {message}")]
    Database { code: &'static str, message: String },

    /// ROW_001: the cost field of a row is not a finite decimal number.
    #[error("[ROW_001] invalid cost {value:?} in column {column}")]
    InvalidCost { value: String, column: usize },

    #[error("missing column: {0}")]
    MissingColumn(String),

    #[error("unsafe archive entry: {0}")]
    UnsafeEntry(String),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("worker failure: {0}")]
    Worker(String),

    #[error("pipeline cancelled")]
    Cancelled,

    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create an archive error.
    pub fn archive(code: ArchiveErrorCode, msg: impl Into<String>) -> Self {
        Self::Archive {
            code: code.code(),
            message: msg.into(),
        }
    }

    /// Create a store error.
    pub fn database(code: DbErrorCode, msg: impl Into<String>) -> Self {
        Self::Database {
            code: code.code(),
            message: msg.into(),
        }
    }

    pub fn invalid_cost(value: impl Into<String>, column: usize) -> Self {
        Self::InvalidCost {
            value: value.into(),
            column,
        }
    }

    pub fn missing_column(name: impl Into<String>) -> Self {
        Self::MissingColumn(name.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn worker(msg: impl Into<String>) -> Self {
        Self::Worker(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Row-level errors are skipped by workers instead of stopping them.
    pub fn is_row_level(&self) -> bool {
        matches!(self, Self::InvalidCost { .. })
    }

    /// Get the error code if this is a coded error.
    pub fn error_code(&self) -> Option<&'static str> {
        match self {
            Self::Archive { code, .. } => Some(*code),
            Self::Database { code, .. } => Some(*code),
            Self::InvalidCost { .. } => Some("ROW_001"),
            _ => None,
        }
    }
}
