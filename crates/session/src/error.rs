use thiserror::Error;

pub type Result<T> = std::result::Result<T, SessionError>;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Vector store error: {0}")]
    VectorStoreError(#[from] column_vector_store::VectorStoreError),

    #[error("Corpus loader error: {0}")]
    CorpusLoader(String),

    #[error("Corpus has no labels")]
    EmptyCorpus,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}
