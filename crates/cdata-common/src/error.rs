//! Error types for cdata services.

use thiserror::Error;

/// Result type alias using CdataError.
pub type CdataResult<T> = Result<T, CdataError>;

/// Primary error type shared by the cdata crates.
#[derive(Debug, Error)]
pub enum CdataError {
    // === Request Errors ===
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Invalid range for axis '{axis}': min {min} > max {max}")]
    InvertedRange { axis: char, min: i64, max: i64 },

    #[error("Field index {index} out of range (volume has {count} fields)")]
    FieldOutOfRange { index: usize, count: usize },

    #[error("Invalid time specification: {0}")]
    InvalidTime(String),

    // === Data Errors ===
    #[error("Data not available: {0}")]
    DataNotAvailable(String),

    #[error("Failed to read data: {0}")]
    DataReadError(String),

    #[error("Projection error: {0}")]
    ProjectionError(String),
}

impl CdataError {
    /// Whether the error was caused by the request itself rather than by
    /// the data store or the server.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            CdataError::InvalidRequest(_)
                | CdataError::InvertedRange { .. }
                | CdataError::FieldOutOfRange { .. }
                | CdataError::InvalidTime(_)
        )
    }

    /// Short label used in metrics and structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            CdataError::InvalidRequest(_) => "invalid_request",
            CdataError::InvertedRange { .. } => "inverted_range",
            CdataError::FieldOutOfRange { .. } => "field_out_of_range",
            CdataError::InvalidTime(_) => "invalid_time",
            CdataError::DataNotAvailable(_) => "data_not_available",
            CdataError::DataReadError(_) => "data_read",
            CdataError::ProjectionError(_) => "projection",
        }
    }
}
