/// ObjectStore Error Types
///
/// Every fallible operation in the crate reports one of these variants.
/// Checks run before any cached state is touched, so an error never leaves
/// a `Results` with a half-updated view.

use crate::column::ColumnType;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ObjectStoreError {
    /// The session was closed or the table it handed out has been detached.
    #[error("Access to invalidated Results objects")]
    Invalidated,

    #[error("Cannot write to a read-only Realm")]
    ReadOnly,

    #[error("Operation requires {expected}")]
    WrongTransactionState { expected: &'static str },

    #[error("Index {index} is outside of range 0...{size}")]
    OutOfBounds { index: usize, size: usize },

    #[error("Column index {column} is outside of range 0...{count}")]
    ColumnOutOfBounds { column: usize, count: usize },

    #[error("Cannot {operation} '{column}': column type {column_type:?} is not supported")]
    TypeMismatch {
        operation: &'static str,
        column: String,
        column_type: ColumnType,
    },

    #[error("Type mismatch for column '{column}': expected {expected:?}")]
    InvalidValue { column: String, expected: ColumnType },

    #[error("Column '{0}' is not nullable")]
    NotNullable(String),

    #[error("Missing value for column '{0}'")]
    MissingValue(String),

    #[error("Row or query belongs to table '{found}', expected '{expected}'")]
    MismatchedTable { expected: String, found: String },

    #[error("Sum of column '{0}' overflows a 64-bit integer")]
    AggregateOverflow(String),

    #[error("Table '{0}' already exists")]
    DuplicateTable(String),

    #[error("No table named '{0}'")]
    NoSuchTable(String),

    #[error("Config error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, ObjectStoreError>;

impl From<serde_json::Error> for ObjectStoreError {
    fn from(e: serde_json::Error) -> Self {
        Self::Config(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = ObjectStoreError::OutOfBounds { index: 5, size: 3 };
        assert_eq!(err.to_string(), "Index 5 is outside of range 0...3");

        let err = ObjectStoreError::TypeMismatch {
            operation: "sum",
            column: "born".to_string(),
            column_type: ColumnType::DateTime,
        };
        assert!(err.to_string().contains("sum 'born'"));
    }
}
