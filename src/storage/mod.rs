//! Storage for uploaded movie files and cover images.

pub mod local;

pub use local::LocalStorage;

/// A file received from a multipart form, held in memory until stored.
#[derive(Clone, Debug)]
pub struct UploadedFile {
    /// Name the client sent, used only for its extension.
    pub filename: String,
    pub data: Vec<u8>,
}

/// Storage operation errors.
#[derive(Debug)]
pub enum StorageError {
    /// I/O error
    Io(std::io::Error),
    /// The blocking thread pool refused or lost the job
    Blocking(String),
}

impl std::fmt::Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageError::Io(e) => write!(f, "I/O error: {}", e),
            StorageError::Blocking(msg) => write!(f, "Blocking task failed: {}", msg),
        }
    }
}

impl std::error::Error for StorageError {}

impl From<std::io::Error> for StorageError {
    fn from(e: std::io::Error) -> Self {
        StorageError::Io(e)
    }
}
