//! Protocol error types.

use thiserror::Error;

pub type ProtocolResult<T> = Result<T, ProtocolError>;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("{record} record truncated: expected {expected} bytes, got {actual}")]
    Truncated {
        record: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("Invalid {field}: {value}")]
    InvalidField { field: &'static str, value: i64 },
}

impl ProtocolError {
    pub fn truncated(record: &'static str, expected: usize, actual: usize) -> Self {
        ProtocolError::Truncated {
            record,
            expected,
            actual,
        }
    }
}
