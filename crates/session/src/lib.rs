//! # Column Session
//!
//! Startup policy and query loop for column search.
//!
//! ## Pipeline
//!
//! ```text
//! CorpusLoader (schema export / label list)
//!     │
//!     ├──> snapshot present and count matches? ──> VectorIndex
//!     │
//!     └──> otherwise
//!            ├─> LabelAugmenter (count-preserving, optional)
//!            ├─> SnapshotStore::save (embed, skip failures)
//!            └─> SnapshotStore::read ──> VectorIndex
//!
//! query line ──> EmbeddingProvider ──> VectorIndex::search (top-K)
//! ```

mod augment;
mod corpus;
mod error;
mod session;

pub use augment::{
    augment_or_original, Augmented, ChatAugmenter, ChatAugmenterConfig, LabelAugmenter,
    DEFAULT_CHAT_MODEL, DEFAULT_DESCRIPTION_LANGUAGE,
};
pub use corpus::{CorpusLoader, FileCorpusLoader, StaticCorpus};
pub use error::{Result, SessionError};
pub use session::{
    QueryReporter, QuerySession, RegenerationReason, SessionDeps, SessionOptions, StartupReport,
    DEFAULT_TOP_K, EXIT_SENTINEL,
};
