use crate::augment::{augment_or_original, LabelAugmenter};
use crate::corpus::CorpusLoader;
use crate::error::{Result, SessionError};
use column_vector_store::{
    EmbeddingProvider, IndexStats, Label, NoopObserver, SaveObserver, SaveReport, SearchResult,
    SnapshotStore, VectorIndex, VectorStoreError,
};
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

pub const DEFAULT_TOP_K: usize = 20;
pub const EXIT_SENTINEL: &str = "exit";

/// How the index was obtained at startup.
#[derive(Debug, Clone, PartialEq)]
pub enum StartupReport {
    /// Existing snapshot matched the corpus.
    Snapshot { labels: usize },
    /// Snapshot was (re)generated.
    Regenerated {
        reason: RegenerationReason,
        augmented: bool,
        save: SaveReport,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegenerationReason {
    Missing,
    Unreadable,
    CountMismatch { labels: usize, vectors: usize },
    Forced,
}

/// Receives query-loop events. The session itself never writes to stdout.
pub trait QueryReporter: Send {
    fn on_prompt(&mut self) {}
    fn on_results(&mut self, query: &str, results: &[SearchResult]);
    fn on_error(&mut self, query: &str, error: &VectorStoreError);
    fn on_exit(&mut self) {}
}

/// Everything the startup policy needs besides the snapshot location.
pub struct SessionDeps {
    pub loader: Arc<dyn CorpusLoader>,
    pub embedder: Arc<dyn EmbeddingProvider>,
    pub augmenter: Option<Arc<dyn LabelAugmenter>>,
}

#[derive(Debug, Clone, Copy)]
pub struct SessionOptions {
    pub top_k: usize,
    pub force_rebuild: bool,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
            force_rebuild: false,
        }
    }
}

/// A loaded index plus the embedder used to turn queries into vectors.
pub struct QuerySession {
    index: VectorIndex,
    embedder: Arc<dyn EmbeddingProvider>,
    top_k: usize,
}

impl QuerySession {
    pub async fn start(
        store: &SnapshotStore,
        deps: SessionDeps,
        options: SessionOptions,
    ) -> Result<(Self, StartupReport)> {
        Self::start_with_observer(store, deps, options, &mut NoopObserver).await
    }

    /// Build or load the index.
    ///
    /// A snapshot whose vector count matches the label count is used as is.
    /// Anything else triggers regeneration: labels are optionally augmented,
    /// embedded, saved, and read back from disk before indexing.
    pub async fn start_with_observer(
        store: &SnapshotStore,
        deps: SessionDeps,
        options: SessionOptions,
        observer: &mut dyn SaveObserver,
    ) -> Result<(Self, StartupReport)> {
        let labels = deps.loader.load_labels().await?;
        if labels.is_empty() {
            return Err(SessionError::EmptyCorpus);
        }

        let reason = if options.force_rebuild {
            RegenerationReason::Forced
        } else if store.exists() {
            match store.load().await {
                Some(vectors) if vectors.len() == labels.len() => {
                    let count = labels.len();
                    let index = VectorIndex::from_corpus(labels, vectors)?;
                    log::info!("Using existing snapshot ({count} labels)");
                    let session = Self::new(index, deps.embedder, options.top_k);
                    return Ok((session, StartupReport::Snapshot { labels: count }));
                }
                Some(vectors) => {
                    log::warn!(
                        "Snapshot holds {} vectors for {} labels; regenerating",
                        vectors.len(),
                        labels.len()
                    );
                    RegenerationReason::CountMismatch {
                        labels: labels.len(),
                        vectors: vectors.len(),
                    }
                }
                None => RegenerationReason::Unreadable,
            }
        } else {
            log::info!("No snapshot at {}", store.path().display());
            RegenerationReason::Missing
        };

        log::info!("Regenerating snapshot for {} labels ({reason:?})", labels.len());

        let (labels, augmented) = match &deps.augmenter {
            Some(augmenter) => {
                let out = augment_or_original(augmenter.as_ref(), labels).await;
                (out.labels, out.applied)
            }
            None => (labels, false),
        };

        let save = store
            .save_with_observer(&labels, deps.embedder.as_ref(), observer)
            .await?;
        let vectors = store.read().await?;
        let index = VectorIndex::from_corpus(labels, vectors)?;

        let session = Self::new(index, deps.embedder, options.top_k);
        Ok((
            session,
            StartupReport::Regenerated {
                reason,
                augmented,
                save,
            },
        ))
    }

    pub fn new(index: VectorIndex, embedder: Arc<dyn EmbeddingProvider>, top_k: usize) -> Self {
        Self {
            index,
            embedder,
            top_k,
        }
    }

    #[must_use]
    pub const fn index(&self) -> &VectorIndex {
        &self.index
    }

    #[must_use]
    pub fn stats(&self) -> IndexStats {
        self.index.stats()
    }

    #[must_use]
    pub const fn top_k(&self) -> usize {
        self.top_k
    }

    #[must_use]
    pub fn labels(&self) -> &[Label] {
        self.index.labels()
    }

    /// Embed `text` and rank it with the session's top-K.
    pub async fn query(&self, text: &str) -> column_vector_store::Result<Vec<SearchResult>> {
        self.query_top(text, self.top_k).await
    }

    pub async fn query_top(
        &self,
        text: &str,
        k: usize,
    ) -> column_vector_store::Result<Vec<SearchResult>> {
        let vector = self.embedder.embed(text).await?;
        self.index.search(&vector, k)
    }

    /// Read queries line by line until an empty line, `exit` (any case), or
    /// end of input. A failing query is reported and the loop continues.
    /// Returns the number of queries answered.
    pub async fn run<R>(&self, mut input: R, reporter: &mut dyn QueryReporter) -> Result<usize>
    where
        R: AsyncBufRead + Unpin + Send,
    {
        let mut answered = 0;
        let mut line = String::new();
        loop {
            reporter.on_prompt();
            line.clear();
            if input.read_line(&mut line).await? == 0 {
                break;
            }
            let query = line.trim();
            if is_exit(query) {
                break;
            }

            match self.query(query).await {
                Ok(results) => {
                    answered += 1;
                    reporter.on_results(query, &results);
                }
                Err(err) => {
                    log::debug!("Query '{query}' failed: {err}");
                    reporter.on_error(query, &err);
                }
            }
        }
        reporter.on_exit();
        Ok(answered)
    }
}

fn is_exit(query: &str) -> bool {
    query.is_empty() || query.eq_ignore_ascii_case(EXIT_SENTINEL)
}
