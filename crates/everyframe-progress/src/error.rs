//! Error types for the progress store.

use thiserror::Error;

/// Errors that can occur loading or persisting progress state.
#[derive(Debug, Error)]
pub enum StoreError {
    /// I/O error reading or writing the state file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// State file is not valid JSON.
    #[error("state file parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// Atomic rename of the replacement file failed.
    #[error("failed to replace state file: {0}")]
    Replace(#[from] tempfile::PersistError),
}
