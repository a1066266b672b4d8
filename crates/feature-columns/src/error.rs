//! Error type shared by columns, the transformation cache and the assemblers.

use std::path::PathBuf;

/// Errors raised while building or evaluating feature columns.
///
/// All failures are local and synchronous. Construction-time checks fail when
/// the column or config is built; data-dependent checks fail on the first
/// transform or assembly that sees the offending input.
#[derive(Debug, thiserror::Error)]
pub enum ColumnError {
    /// Malformed construction arguments or assembler call.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Two columns handed to one assembler call share a name.
    #[error("duplicate feature column name found: {name}")]
    DuplicateColumn { name: String },

    /// Declared dtype incompatible with the column, or with the input tensor.
    #[error("dtype mismatch for {column}: {reason}")]
    DtypeMismatch { column: String, reason: String },

    /// Default value or dense input does not have the expected shape.
    #[error("shape mismatch for {column}: {reason}")]
    ShapeMismatch { column: String, reason: String },

    /// Sparse input given where a dense tensor is required.
    #[error("feature {key} must be a dense tensor, got a sparse tensor")]
    InvalidInputType { key: String },

    /// Raw key absent from the input table.
    #[error("feature {key} not found in input features")]
    KeyNotFound { key: String },

    /// A column transform yielded no output.
    #[error("feature column {column} produced no output from its transform")]
    UnsupportedColumn { column: String },

    /// A column (transitively) requested its own output while being computed.
    #[error("cyclic dependency detected while transforming {column}")]
    CyclicDependency { column: String },

    /// Categorical id that does not address a row of the weight table.
    #[error("id {id} of column {column} is out of range for {num_buckets} buckets")]
    IdOutOfRange {
        column: String,
        id: i64,
        num_buckets: usize,
    },

    /// Vocabulary file could not be turned into a lookup table.
    #[error("failed to initialize vocabulary table from {}: {reason}", path.display())]
    VocabularyInit { path: PathBuf, reason: String },

    /// Malformed in-memory or JSON record.
    #[error("invalid record: {0}")]
    InvalidRecord(String),
}

impl ColumnError {
    pub(crate) fn config(reason: impl Into<String>) -> Self {
        Self::Config(reason.into())
    }

    pub(crate) fn dtype(column: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::DtypeMismatch {
            column: column.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn shape(column: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ShapeMismatch {
            column: column.into(),
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for ColumnError {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidRecord(err.to_string())
    }
}

/// Result alias used throughout the crate.
pub type Result<T, E = ColumnError> = std::result::Result<T, E>;
