use std::path::PathBuf;

use thiserror::Error;

pub type StorageResult<T> = Result<T, StorageError>;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("no data roots configured")]
    NoRoots,

    #[error("data root {0} is not a directory")]
    NotADirectory(PathBuf),

    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),
}
