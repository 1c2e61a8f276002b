//! Error types.
//!
//! Two layers:
//! - [`GridError`]: data-layer taxonomy raised by the grid, tables, and the
//!   axis-expression evaluator. The reactive controller catches these per
//!   curve role and turns them into diagnostics.
//! - [`AppError`]: process-level error carrying an exit code, used by the
//!   binary front-ends.

use thiserror::Error;

use crate::domain::GridKey;

/// Data-layer result type.
pub type GridResult<T> = std::result::Result<T, GridError>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum GridError {
    /// Invalid discretization or photometric set at startup. Fatal.
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("no table loaded for {0}")]
    KeyNotFound(GridKey),

    #[error("no age bucket for log(age)={age:.2} in table {key}")]
    AgeNotFound { key: GridKey, age: f64 },

    #[error("unknown column `{0}`")]
    UnknownColumn(String),

    /// A parameter value that cannot be snapped onto the grid (e.g. NaN).
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Failure reported by a table-reader collaborator.
    #[error("table reader failed for {key}: {message}")]
    Reader { key: GridKey, message: String },
}

impl GridError {
    /// Exit code used when a data-layer error escapes to the process boundary.
    pub fn exit_code(&self) -> u8 {
        match self {
            GridError::Configuration(_) | GridError::Reader { .. } | GridError::InvalidParameter(_) => 2,
            GridError::KeyNotFound(_) | GridError::AgeNotFound { .. } | GridError::UnknownColumn(_) => 3,
        }
    }
}

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl From<GridError> for AppError {
    fn from(err: GridError) -> Self {
        AppError::new(err.exit_code(), err.to_string())
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configuration_errors_map_to_usage_exit_code() {
        let err: AppError = GridError::Configuration("bad set".to_string()).into();
        assert_eq!(err.exit_code(), 2);
        assert!(err.to_string().contains("bad set"));
    }

    #[test]
    fn lookup_errors_map_to_not_found_exit_code() {
        let err: AppError = GridError::UnknownColumn("Foo".to_string()).into();
        assert_eq!(err.exit_code(), 3);
    }
}
