use thiserror::Error;

/// A result type for waypoint tuning
pub type Result<T> = std::result::Result<T, TuneError>;

/// An error for waypoint tuning
#[derive(Error, Debug)]
pub enum TuneError {
    /// When configuration is invalid
    #[error("Invalid configuration: {0}")]
    InvalidConfigError(String),
    /// When IO fails
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    /// When configuration cannot be (de)serialized
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
    /// When numpy array read fails
    #[error("Npy read error: {0}")]
    ReadNpyError(#[from] ndarray_npy::ReadNpyError),
    /// When numpy array write fails
    #[error("Npy write error: {0}")]
    WriteNpyError(#[from] ndarray_npy::WriteNpyError),
}
