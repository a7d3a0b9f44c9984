use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Vector slot {local_id} exceeds shard capacity of {capacity} documents")]
    CapacityExceeded { local_id: u32, capacity: u32 },

    #[error("Vector dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("Embedding failed: {0}")]
    Embedding(String),

    #[error("Text index error: {0}")]
    TextIndex(String),

    #[error("DocMap error: {0}")]
    DocMap(String),

    #[error("Operation failed: {0}")]
    Operation(String),
}

impl Error {
    /// Collaborator failures worth retrying; everything else is deterministic.
    pub fn is_transient(&self) -> bool {
        matches!(self, Error::Embedding(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
