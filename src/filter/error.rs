use thiserror::Error;

/// Raised when a raw query cannot be turned into a filter/projection/options triple.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FilterError {
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Unbalanced brackets in query key: {0}")]
    UnbalancedBrackets(String),

    #[error("Query key '{key}' nests deeper than {max} levels")]
    DepthExceeded { key: String, max: usize },

    #[error("Query key '{0}' is used both as a value and as an object")]
    ConflictingKey(String),

    #[error("Unsupported operator: {0}")]
    UnsupportedOperator(String),

    #[error("Invalid sort direction '{value}' for field '{field}'")]
    InvalidSortDirection { field: String, value: String },

    #[error("Invalid projection: {0}")]
    InvalidProjection(String),

    #[error("Invalid numeric value '{value}' for '{key}'")]
    InvalidNumber { key: String, value: String },
}
