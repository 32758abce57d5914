use async_trait::async_trait;
use column_session::{
    CorpusLoader, LabelAugmenter, QueryReporter, QuerySession, RegenerationReason, SessionDeps,
    SessionError, SessionOptions, StartupReport, StaticCorpus,
};
use column_vector_store::{
    EmbeddingProvider, Label, SearchResult, SnapshotStore, Vector, VectorStoreError,
};
use pretty_assertions::assert_eq;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

/// Embeds known texts to fixed vectors; anything else is a provider failure.
struct MapEmbeddings {
    vectors: HashMap<String, Vector>,
    calls: AtomicUsize,
}

impl MapEmbeddings {
    fn new(entries: &[(&str, Vector)]) -> Arc<Self> {
        Arc::new(Self {
            vectors: entries
                .iter()
                .map(|(text, vector)| ((*text).to_string(), vector.clone()))
                .collect(),
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EmbeddingProvider for MapEmbeddings {
    async fn embed(&self, text: &str) -> column_vector_store::Result<Vector> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.vectors
            .get(text)
            .cloned()
            .ok_or_else(|| VectorStoreError::provider(format!("no embedding for '{text}'")))
    }

    fn model_id(&self) -> &str {
        "map"
    }
}

struct CountingLoader {
    inner: StaticCorpus,
    calls: AtomicUsize,
}

#[async_trait]
impl CorpusLoader for CountingLoader {
    async fn load_labels(&self) -> column_session::Result<Vec<Label>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.load_labels().await
    }
}

struct Suffix(&'static str);

#[async_trait]
impl LabelAugmenter for Suffix {
    async fn augment(&self, labels: &[Label]) -> column_vector_store::Result<Vec<Label>> {
        Ok(labels.iter().map(|l| format!("{l}{}", self.0)).collect())
    }
}

struct DropsOne;

#[async_trait]
impl LabelAugmenter for DropsOne {
    async fn augment(&self, labels: &[Label]) -> column_vector_store::Result<Vec<Label>> {
        Ok(labels.iter().skip(1).cloned().collect())
    }
}

#[derive(Default)]
struct Transcript {
    prompts: usize,
    answered: Vec<(String, Vec<SearchResult>)>,
    failed: Vec<String>,
    exited: bool,
}

impl QueryReporter for Transcript {
    fn on_prompt(&mut self) {
        self.prompts += 1;
    }

    fn on_results(&mut self, query: &str, results: &[SearchResult]) {
        self.answered.push((query.to_string(), results.to_vec()));
    }

    fn on_error(&mut self, query: &str, _error: &VectorStoreError) {
        self.failed.push(query.to_string());
    }

    fn on_exit(&mut self) {
        self.exited = true;
    }
}

fn labels(items: &[&str]) -> Vec<Label> {
    items.iter().map(|s| (*s).to_string()).collect()
}

fn example_embedder() -> Arc<MapEmbeddings> {
    MapEmbeddings::new(&[
        ("T1.A", vec![1.0, 0.0]),
        ("T1.B", vec![0.0, 1.0]),
        ("T1.C", vec![0.7071, 0.7071]),
        ("T1.A (alpha)", vec![1.0, 0.0]),
        ("T1.B (alpha)", vec![0.0, 1.0]),
        ("T1.C (alpha)", vec![0.7071, 0.7071]),
        ("east", vec![1.0, 0.0]),
    ])
}

fn loader(items: &[&str]) -> Arc<CountingLoader> {
    Arc::new(CountingLoader {
        inner: StaticCorpus::new(labels(items)),
        calls: AtomicUsize::new(0),
    })
}

fn store_in(tmp: &TempDir) -> SnapshotStore {
    SnapshotStore::new(tmp.path().join("column_embeddings").join("column_embeddings.json"))
        .with_throttle(Duration::ZERO)
}

fn deps(
    loader: Arc<CountingLoader>,
    embedder: Arc<MapEmbeddings>,
    augmenter: Option<Arc<dyn LabelAugmenter>>,
) -> SessionDeps {
    SessionDeps {
        loader,
        embedder,
        augmenter,
    }
}

#[tokio::test]
async fn first_run_generates_then_second_run_reuses_snapshot() {
    let tmp = TempDir::new().unwrap();
    let store = store_in(&tmp);
    let embedder = example_embedder();

    let (session, report) = QuerySession::start(
        &store,
        deps(loader(&["T1.A", "T1.B", "T1.C"]), embedder.clone(), None),
        SessionOptions::default(),
    )
    .await
    .unwrap();
    match report {
        StartupReport::Regenerated {
            reason,
            augmented,
            save,
        } => {
            assert_eq!(reason, RegenerationReason::Missing);
            assert!(!augmented);
            assert_eq!((save.attempted, save.succeeded, save.failed), (3, 3, 0));
        }
        other => panic!("expected regeneration, got {other:?}"),
    }
    assert_eq!(session.index().size(), 3);
    assert_eq!(embedder.calls(), 3);

    let loader = loader(&["T1.A", "T1.B", "T1.C"]);
    let (session, report) = QuerySession::start(
        &store,
        deps(loader.clone(), embedder.clone(), None),
        SessionOptions::default(),
    )
    .await
    .unwrap();
    assert_eq!(report, StartupReport::Snapshot { labels: 3 });
    assert_eq!(loader.calls.load(Ordering::SeqCst), 1);
    assert_eq!(embedder.calls(), 3);

    let results = session.query("east").await.unwrap();
    let order: Vec<&str> = results.iter().map(|r| r.label.as_str()).collect();
    assert_eq!(order, vec!["T1.A", "T1.C", "T1.B"]);
    assert!((results[0].score - 1.0).abs() < 1e-5);
    assert!((results[1].score - 0.7071).abs() < 1e-3);
    assert!(results[2].score.abs() < 1e-5);
}

#[tokio::test]
async fn count_mismatch_forces_regeneration() {
    let tmp = TempDir::new().unwrap();
    let store = store_in(&tmp);
    store.write(&[vec![1.0, 0.0], vec![0.0, 1.0]]).await.unwrap();

    let (session, report) = QuerySession::start(
        &store,
        deps(loader(&["T1.A", "T1.B", "T1.C"]), example_embedder(), None),
        SessionOptions::default(),
    )
    .await
    .unwrap();

    assert!(matches!(
        report,
        StartupReport::Regenerated {
            reason: RegenerationReason::CountMismatch {
                labels: 3,
                vectors: 2
            },
            ..
        }
    ));
    assert_eq!(session.index().size(), 3);
    assert_eq!(store.read().await.unwrap().len(), 3);
}

#[tokio::test]
async fn unreadable_snapshot_is_treated_as_missing() {
    let tmp = TempDir::new().unwrap();
    let store = store_in(&tmp);
    std::fs::create_dir_all(store.path().parent().unwrap()).unwrap();
    std::fs::write(store.path(), "{ not vectors").unwrap();

    let (_, report) = QuerySession::start(
        &store,
        deps(loader(&["T1.A"]), example_embedder(), None),
        SessionOptions::default(),
    )
    .await
    .unwrap();

    assert!(matches!(
        report,
        StartupReport::Regenerated {
            reason: RegenerationReason::Unreadable,
            ..
        }
    ));
}

#[tokio::test]
async fn empty_corpus_aborts_startup() {
    let tmp = TempDir::new().unwrap();
    let store = store_in(&tmp);

    let err = QuerySession::start(
        &store,
        deps(loader(&[]), example_embedder(), None),
        SessionOptions::default(),
    )
    .await
    .err()
    .unwrap();
    assert!(matches!(err, SessionError::EmptyCorpus));
    assert!(!store.exists());

    store.write(&[vec![1.0, 0.0]]).await.unwrap();
    let err = QuerySession::start(
        &store,
        deps(loader(&[]), example_embedder(), None),
        SessionOptions::default(),
    )
    .await
    .err()
    .unwrap();
    assert!(matches!(err, SessionError::EmptyCorpus));
}

#[tokio::test]
async fn partial_generation_is_a_consistency_error() {
    let tmp = TempDir::new().unwrap();
    let store = store_in(&tmp);

    let err = QuerySession::start(
        &store,
        deps(
            loader(&["T1.A", "T1.B", "UNKNOWN.X", "T1.C", "T1.A"]),
            example_embedder(),
            None,
        ),
        SessionOptions::default(),
    )
    .await
    .err()
    .unwrap();

    assert!(matches!(
        err,
        SessionError::VectorStoreError(VectorStoreError::Consistency {
            labels: 5,
            vectors: 4
        })
    ));
    assert_eq!(store.read().await.unwrap().len(), 4);
}

#[tokio::test]
async fn augmented_labels_feed_the_index() {
    let tmp = TempDir::new().unwrap();
    let store = store_in(&tmp);

    let (session, report) = QuerySession::start(
        &store,
        deps(
            loader(&["T1.A", "T1.B", "T1.C"]),
            example_embedder(),
            Some(Arc::new(Suffix(" (alpha)"))),
        ),
        SessionOptions::default(),
    )
    .await
    .unwrap();

    assert!(matches!(
        report,
        StartupReport::Regenerated {
            augmented: true,
            ..
        }
    ));
    assert_eq!(
        session.labels(),
        labels(&["T1.A (alpha)", "T1.B (alpha)", "T1.C (alpha)"]).as_slice()
    );
}

#[tokio::test]
async fn augmentation_count_mismatch_keeps_original_labels() {
    let tmp = TempDir::new().unwrap();
    let store = store_in(&tmp);

    let (session, report) = QuerySession::start(
        &store,
        deps(
            loader(&["T1.A", "T1.B", "T1.C"]),
            example_embedder(),
            Some(Arc::new(DropsOne)),
        ),
        SessionOptions::default(),
    )
    .await
    .unwrap();

    assert!(matches!(
        report,
        StartupReport::Regenerated {
            augmented: false,
            ..
        }
    ));
    assert_eq!(session.labels(), labels(&["T1.A", "T1.B", "T1.C"]).as_slice());
}

#[tokio::test]
async fn forced_rebuild_ignores_matching_snapshot() {
    let tmp = TempDir::new().unwrap();
    let store = store_in(&tmp);
    store
        .write(&[vec![9.0, 9.0], vec![9.0, 9.0], vec![9.0, 9.0]])
        .await
        .unwrap();
    let embedder = example_embedder();

    let (_, report) = QuerySession::start(
        &store,
        deps(loader(&["T1.A", "T1.B", "T1.C"]), embedder.clone(), None),
        SessionOptions {
            force_rebuild: true,
            ..SessionOptions::default()
        },
    )
    .await
    .unwrap();

    assert!(matches!(
        report,
        StartupReport::Regenerated {
            reason: RegenerationReason::Forced,
            ..
        }
    ));
    assert_eq!(embedder.calls(), 3);
    assert_eq!(store.read().await.unwrap()[0], vec![1.0, 0.0]);
}

#[tokio::test]
async fn query_loop_survives_failures_and_stops_on_exit() {
    let tmp = TempDir::new().unwrap();
    let store = store_in(&tmp);
    let (session, _) = QuerySession::start(
        &store,
        deps(loader(&["T1.A", "T1.B", "T1.C"]), example_embedder(), None),
        SessionOptions {
            top_k: 2,
            force_rebuild: false,
        },
    )
    .await
    .unwrap();

    let input: &[u8] = b"east\nsomething unknown\n  east  \nEXIT\neast\n";
    let mut transcript = Transcript::default();
    let answered = session.run(input, &mut transcript).await.unwrap();

    assert_eq!(answered, 2);
    assert_eq!(transcript.failed, vec!["something unknown".to_string()]);
    assert_eq!(transcript.answered.len(), 2);
    assert_eq!(transcript.answered[1].0, "east");
    assert_eq!(transcript.answered[0].1.len(), 2);
    assert_eq!(transcript.prompts, 4);
    assert!(transcript.exited);
}

#[tokio::test]
async fn query_loop_ends_on_blank_line_or_eof() {
    let tmp = TempDir::new().unwrap();
    let store = store_in(&tmp);
    let (session, _) = QuerySession::start(
        &store,
        deps(loader(&["T1.A"]), example_embedder(), None),
        SessionOptions::default(),
    )
    .await
    .unwrap();

    let mut transcript = Transcript::default();
    let blank: &[u8] = b"east\n\neast\n";
    assert_eq!(session.run(blank, &mut transcript).await.unwrap(), 1);

    let mut transcript = Transcript::default();
    let eof: &[u8] = b"east";
    assert_eq!(session.run(eof, &mut transcript).await.unwrap(), 1);
    assert!(transcript.exited);
}
