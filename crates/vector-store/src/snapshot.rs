use crate::embeddings::EmbeddingProvider;
use crate::error::{Result, VectorStoreError};
use crate::paths::default_snapshot_path;
use crate::types::{EmbedOutcome, EmbedStatus, Label, SaveReport, Vector};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Pause between successive embedding calls during a generation pass.
pub const DEFAULT_EMBED_THROTTLE: Duration = Duration::from_millis(200);

/// Receives per-label progress while a snapshot is generated.
pub trait SaveObserver: Send {
    fn on_start(&mut self, _total: usize) {}
    fn on_outcome(&mut self, _outcome: &EmbedOutcome, _total: usize) {}
    fn on_written(&mut self, _path: &Path, _vectors: usize) {}
}

pub struct NoopObserver;

impl SaveObserver for NoopObserver {}

/// Durable vector snapshot: a single JSON file holding the vectors in corpus
/// order, rewritten wholesale on every save. Labels are not stored.
#[derive(Clone, Debug)]
pub struct SnapshotStore {
    path: PathBuf,
    throttle: Duration,
    embed_timeout: Option<Duration>,
}

impl Default for SnapshotStore {
    fn default() -> Self {
        Self::new(default_snapshot_path())
    }
}

impl SnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            throttle: DEFAULT_EMBED_THROTTLE,
            embed_timeout: None,
        }
    }

    #[must_use]
    pub const fn with_throttle(mut self, throttle: Duration) -> Self {
        self.throttle = throttle;
        self
    }

    /// Bound each embedding call; a call that runs over counts as a failure.
    #[must_use]
    pub const fn with_embed_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.embed_timeout = timeout;
        self
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub const fn throttle(&self) -> Duration {
        self.throttle
    }

    #[must_use]
    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    pub async fn save(
        &self,
        labels: &[Label],
        embedder: &dyn EmbeddingProvider,
    ) -> Result<SaveReport> {
        self.save_with_observer(labels, embedder, &mut NoopObserver)
            .await
    }

    /// Embed every label in order and persist the vectors that succeeded.
    ///
    /// A label whose embedding fails is skipped, so the snapshot can hold fewer
    /// vectors than `labels`. Only a failed write is returned as an error.
    pub async fn save_with_observer(
        &self,
        labels: &[Label],
        embedder: &dyn EmbeddingProvider,
        observer: &mut dyn SaveObserver,
    ) -> Result<SaveReport> {
        log::info!(
            "Embedding {} labels with '{}' into {}",
            labels.len(),
            embedder.model_id(),
            self.path.display()
        );
        observer.on_start(labels.len());

        let mut report = SaveReport::default();
        let mut vectors: Vec<Vector> = Vec::with_capacity(labels.len());

        for (index, label) in labels.iter().enumerate() {
            if index > 0 && !self.throttle.is_zero() {
                tokio::time::sleep(self.throttle).await;
            }

            let status = match self.embed_one(embedder, label).await {
                Ok(vector) => {
                    let dimension = vector.len();
                    vectors.push(vector);
                    log::debug!("{}/{} {label}: {dimension} dims", index + 1, labels.len());
                    EmbedStatus::Embedded { dimension }
                }
                Err(err) => {
                    log::warn!("Skipping '{label}' ({}/{}): {err}", index + 1, labels.len());
                    EmbedStatus::Failed {
                        reason: err.to_string(),
                    }
                }
            };

            let outcome = EmbedOutcome {
                index,
                label: label.clone(),
                status,
            };
            observer.on_outcome(&outcome, labels.len());
            report.record(outcome);
        }

        self.write(&vectors).await?;
        observer.on_written(&self.path, vectors.len());
        log::info!(
            "Snapshot saved: {} of {} labels embedded ({} failed)",
            report.succeeded,
            report.attempted,
            report.failed
        );
        Ok(report)
    }

    async fn embed_one(&self, embedder: &dyn EmbeddingProvider, label: &str) -> Result<Vector> {
        let Some(limit) = self.embed_timeout else {
            return embedder.embed(label).await;
        };
        tokio::time::timeout(limit, embedder.embed(label))
            .await
            .map_err(|_| {
                VectorStoreError::provider(format!("embedding timed out after {limit:?}"))
            })?
    }

    /// Replace the snapshot with `vectors` (temp file + rename).
    pub async fn write(&self, vectors: &[Vector]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let bytes = serde_json::to_vec_pretty(vectors)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, bytes).await?;
        if let Err(err) = tokio::fs::rename(&tmp, &self.path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(VectorStoreError::Persistence(format!(
                "cannot replace {}: {err}",
                self.path.display()
            )));
        }
        Ok(())
    }

    /// Strict read: a missing or unparsable snapshot is a `Persistence` error.
    pub async fn read(&self) -> Result<Vec<Vector>> {
        let bytes = tokio::fs::read(&self.path).await.map_err(|err| {
            VectorStoreError::Persistence(format!("{}: {err}", self.path.display()))
        })?;
        serde_json::from_slice(&bytes).map_err(|err| {
            VectorStoreError::Persistence(format!("{} is malformed: {err}", self.path.display()))
        })
    }

    /// Lenient read used by the startup policy: any failure means "no snapshot".
    /// The count is not checked against labels here.
    pub async fn load(&self) -> Option<Vec<Vector>> {
        if !self.exists() {
            return None;
        }
        match self.read().await {
            Ok(vectors) => {
                log::info!(
                    "Loaded {} vectors from {}",
                    vectors.len(),
                    self.path.display()
                );
                Some(vectors)
            }
            Err(err) => {
                log::warn!("Ignoring snapshot: {err}");
                None
            }
        }
    }
}
