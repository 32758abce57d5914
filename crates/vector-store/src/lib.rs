//! # Column Vector Store
//!
//! Embedding storage and exhaustive similarity search for database column labels.
//!
//! ## Features
//!
//! - **Brute-force cosine ranking** with a deterministic tie-break
//! - **Snapshot persistence** as a single JSON file, replaced atomically
//! - **Best-effort generation**: per-label embedding failures are skipped and reported
//! - **Pluggable embeddings**: OpenAI-compatible HTTP API or a deterministic stub
//!
//! ## Architecture
//!
//! ```text
//! Label[]
//!     │
//!     ├──> EmbeddingProvider (OpenAI / stub)
//!     │      └─> Vector[d]
//!     │
//!     ├──> SnapshotStore
//!     │      └─> column_embeddings.json (vectors only, positional)
//!     │
//!     └──> VectorIndex
//!            └─> Full-scan cosine ranking
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use column_vector_store::{EmbeddingProvider, SnapshotStore, StubEmbeddings, VectorIndex};
//!
//! #[tokio::main]
//! async fn main() -> column_vector_store::Result<()> {
//!     let labels = vec!["BI_HREMPLOYEE.COMPANYNAME".to_string()];
//!     let embedder = StubEmbeddings::default();
//!     let store = SnapshotStore::default();
//!
//!     store.save(&labels, &embedder).await?;
//!     let vectors = store.read().await?;
//!     let index = VectorIndex::from_corpus(labels, vectors)?;
//!
//!     let query = embedder.embed("company name").await?;
//!     for hit in index.search(&query, 20)? {
//!         println!("{}. {} ({:.4})", hit.rank, hit.label, hit.score);
//!     }
//!     Ok(())
//! }
//! ```

mod embeddings;
mod error;
mod index;
mod paths;
mod snapshot;
mod types;

pub use embeddings::{
    EmbeddingProvider, OpenAiEmbeddings, OpenAiEmbeddingsConfig, StubEmbeddings,
    DEFAULT_API_BASE, DEFAULT_EMBEDDING_MODEL, DEFAULT_STUB_DIMENSION,
};
pub use error::{Result, VectorStoreError};
pub use index::VectorIndex;
pub use paths::{default_snapshot_path, snapshot_path_in, SNAPSHOT_DIR_NAME, SNAPSHOT_FILE_NAME};
pub use snapshot::{NoopObserver, SaveObserver, SnapshotStore, DEFAULT_EMBED_THROTTLE};
pub use types::{EmbedOutcome, EmbedStatus, IndexStats, Label, SaveReport, SearchResult, Vector};
