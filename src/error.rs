//! Error taxonomy for the media index layer.

use thiserror::Error;

use crate::models::ContentUri;

/// Errors raised by the index, the mapper and the mutation issuer.
///
/// Only [`MediaIndexError::SchemaMismatch`] and [`MediaIndexError::MissingColumn`]
/// ever reach consumers of live or paged sequences; query failures are turned
/// into empty results where they occur.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MediaIndexError {
    /// The index returned a value the record model has no variant for.
    #[error("unexpected value {value} in column {column}")]
    SchemaMismatch { column: &'static str, value: i64 },

    /// A projected column is missing from the result set.
    #[error("column {0} missing from result set")]
    MissingColumn(String),

    #[error("query failed: {0}")]
    Query(String),

    #[error("mutation failed: {0}")]
    Mutation(String),

    #[error("no row at {0}")]
    NotFound(ContentUri),

    #[error("unsupported operation: {0}")]
    Unsupported(&'static str),
}

impl MediaIndexError {
    /// Whether the error means the index schema does not match the record model.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            MediaIndexError::SchemaMismatch { .. } | MediaIndexError::MissingColumn(_)
        )
    }
}

impl From<rusqlite::Error> for MediaIndexError {
    fn from(err: rusqlite::Error) -> Self {
        MediaIndexError::Query(err.to_string())
    }
}

pub type Result<T, E = MediaIndexError> = std::result::Result<T, E>;
