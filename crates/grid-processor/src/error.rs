//! Error types for grid processing.

use cdata_common::CdataError;
use thiserror::Error;

/// Errors that can occur during grid processing.
#[derive(Error, Debug)]
pub enum GridProcessorError {
    /// Failed to open the volume file.
    #[error("failed to open volume: {0}")]
    OpenFailed(String),

    /// Failed to read data from the volume.
    #[error("failed to read volume data: {0}")]
    ReadFailed(String),

    /// Invalid metadata in the volume file.
    #[error("invalid volume metadata: {0}")]
    InvalidMetadata(String),

    /// The requested field does not exist in the volume.
    #[error("field {index} out of range (volume has {count} fields)")]
    FieldOutOfRange { index: usize, count: usize },

    /// Requested cells lie outside a plane buffer.
    #[error("requested region {requested} is outside plane bounds {plane}")]
    OutOfBounds { requested: String, plane: String },

    /// Run-length coded buffer is malformed.
    #[error("decompression error: {0}")]
    DecompressionError(String),

    /// Grid geometry cannot be projected.
    #[error("projection error: {0}")]
    ProjectionError(String),

    /// Storage/IO error.
    #[error("storage error: {0}")]
    StorageError(String),
}

impl GridProcessorError {
    /// Create an OpenFailed error.
    pub fn open_failed(msg: impl Into<String>) -> Self {
        Self::OpenFailed(msg.into())
    }

    /// Create a ReadFailed error.
    pub fn read_failed(msg: impl Into<String>) -> Self {
        Self::ReadFailed(msg.into())
    }

    /// Create an InvalidMetadata error.
    pub fn invalid_metadata(msg: impl Into<String>) -> Self {
        Self::InvalidMetadata(msg.into())
    }

    /// Create an OutOfBounds error.
    pub fn out_of_bounds(requested: impl Into<String>, plane: impl Into<String>) -> Self {
        Self::OutOfBounds {
            requested: requested.into(),
            plane: plane.into(),
        }
    }

    pub fn decompression(msg: impl Into<String>) -> Self {
        Self::DecompressionError(msg.into())
    }
}

impl From<std::io::Error> for GridProcessorError {
    fn from(err: std::io::Error) -> Self {
        Self::StorageError(err.to_string())
    }
}

impl From<serde_json::Error> for GridProcessorError {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidMetadata(err.to_string())
    }
}

impl From<projection::ProjectionError> for GridProcessorError {
    fn from(err: projection::ProjectionError) -> Self {
        Self::ProjectionError(err.to_string())
    }
}

impl From<GridProcessorError> for CdataError {
    fn from(err: GridProcessorError) -> Self {
        match err {
            GridProcessorError::FieldOutOfRange { index, count } => {
                CdataError::FieldOutOfRange { index, count }
            }
            GridProcessorError::ProjectionError(msg) => CdataError::ProjectionError(msg),
            other => CdataError::DataReadError(other.to_string()),
        }
    }
}

/// Result type for grid processor operations.
pub type Result<T> = std::result::Result<T, GridProcessorError>;
