use thiserror::Error;

pub type Result<T> = std::result::Result<T, VectorStoreError>;

#[derive(Error, Debug)]
pub enum VectorStoreError {
    #[error("Provider failure: {0}")]
    ProviderFailure(String),

    #[error("Corpus is inconsistent: {labels} labels vs {vectors} vectors")]
    Consistency { labels: usize, vectors: usize },

    #[error("Snapshot unavailable: {0}")]
    Persistence(String),

    #[error("Vector index is empty")]
    EmptyIndex,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl VectorStoreError {
    pub fn provider(message: impl Into<String>) -> Self {
        Self::ProviderFailure(message.into())
    }
}
