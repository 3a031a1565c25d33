use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by the classification core.
#[derive(Debug, Error)]
pub enum Error {
    /// No persisted model exists yet; training has to run first.
    #[error("backend {backend_id}: model not initialized, {} not found", path.display())]
    NotInitialized { backend_id: String, path: PathBuf },

    /// Training was requested on a corpus with zero documents.
    #[error("backend {backend_id}: cannot train with an empty document corpus")]
    EmptyCorpus { backend_id: String },

    /// A recognized hyperparameter carried a value that does not coerce
    /// to its declared type.
    #[error("invalid value {value:?} for parameter {key:?}")]
    InvalidParameter { key: String, value: String },

    /// A subject-corpus line or file header that does not split into
    /// `<uri> <label>`.
    #[error("malformed subject entry {entry:?} in {}", path.display())]
    MalformedSubject { entry: String, path: PathBuf },

    #[error("malformed document record at {}:{line}: {source}", path.display())]
    MalformedDocument {
        path: PathBuf,
        line: usize,
        source: serde_json::Error,
    },

    #[error("metadata serialization failed")]
    Meta(#[from] serde_json::Error),

    #[error("model serialization failed")]
    ModelCodec(#[from] bincode::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
