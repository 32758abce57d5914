use crate::error::{Result, VectorStoreError};
use crate::types::{IndexStats, Label, SearchResult, Vector};

/// Exhaustive cosine-similarity index over a positional corpus.
///
/// Every query scans all stored vectors (O(n·d)). That is fine for hundreds
/// to low thousands of columns; past that an ANN structure would be needed,
/// and it would have to reproduce the tie-break order below exactly.
#[derive(Debug, Default, Clone)]
pub struct VectorIndex {
    labels: Vec<Label>,
    vectors: Vec<Vector>,
}

impl VectorIndex {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_corpus(labels: Vec<Label>, vectors: Vec<Vector>) -> Result<Self> {
        let mut index = Self::new();
        index.load(labels, vectors)?;
        Ok(index)
    }

    /// Replace the corpus. On error the current contents are kept as they were.
    pub fn load(&mut self, labels: Vec<Label>, vectors: Vec<Vector>) -> Result<()> {
        if labels.len() != vectors.len() {
            return Err(VectorStoreError::Consistency {
                labels: labels.len(),
                vectors: vectors.len(),
            });
        }
        if labels.is_empty() {
            return Err(VectorStoreError::EmptyIndex);
        }

        self.labels = labels;
        self.vectors = vectors;
        log::info!(
            "Vector index loaded: {} entries, dimension {}",
            self.labels.len(),
            self.dimension()
        );
        Ok(())
    }

    /// Cosine similarity. Mismatched lengths, zero magnitudes and non-finite
    /// inputs score 0.
    ///
    /// Sums run in `f64`: squaring an `f32` near `1e20` overflows and near
    /// `1e-30` underflows.
    #[must_use]
    pub fn similarity(a: &[f32], b: &[f32]) -> f32 {
        if a.len() != b.len() {
            return 0.0;
        }

        let mut dot = 0.0f64;
        let mut norm_a = 0.0f64;
        let mut norm_b = 0.0f64;
        for (x, y) in a.iter().zip(b) {
            let (x, y) = (f64::from(*x), f64::from(*y));
            dot += x * y;
            norm_a += x * x;
            norm_b += y * y;
        }

        if norm_a == 0.0 || norm_b == 0.0 {
            return 0.0;
        }

        let score = dot / (norm_a.sqrt() * norm_b.sqrt());
        if score.is_finite() {
            score as f32
        } else {
            0.0
        }
    }

    /// Rank every stored vector against `query` and return the best `k`.
    ///
    /// Ordering is by descending score; equal scores keep corpus order.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchResult>> {
        if self.vectors.is_empty() {
            return Err(VectorStoreError::EmptyIndex);
        }

        let mut scored: Vec<(usize, f32)> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(idx, vector)| (idx, Self::similarity(query, vector)))
            .collect();

        scored.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        scored.truncate(k.min(self.vectors.len()));

        let results = scored
            .into_iter()
            .enumerate()
            .map(|(pos, (idx, score))| SearchResult {
                rank: pos + 1,
                index: idx,
                label: self.labels[idx].clone(),
                score,
            })
            .collect::<Vec<_>>();

        log::debug!("Ranked {} entries, returning {}", self.size(), results.len());
        Ok(results)
    }

    #[must_use]
    pub fn size(&self) -> usize {
        self.labels.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Dimension of the first stored vector, 0 when empty.
    #[must_use]
    pub fn dimension(&self) -> usize {
        self.vectors.first().map_or(0, Vec::len)
    }

    #[must_use]
    pub fn labels(&self) -> &[Label] {
        &self.labels
    }

    #[must_use]
    pub fn stats(&self) -> IndexStats {
        let dimension = self.dimension();
        IndexStats {
            entries: self.size(),
            dimension,
            approx_bytes: self
                .size()
                .saturating_mul(dimension)
                .saturating_mul(std::mem::size_of::<f32>()),
        }
    }
}
