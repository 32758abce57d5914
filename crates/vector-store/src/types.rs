use serde::{Deserialize, Serialize};

/// Qualified column name (`TABLE.COLUMN`), optionally followed by a description.
pub type Label = String;

/// Embedding produced by a provider. Dimension is not stored.
pub type Vector = Vec<f32>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    /// 1-based position in the ranking.
    pub rank: usize,
    /// Position of the entry in the loaded corpus.
    pub index: usize,
    pub label: Label,
    pub score: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IndexStats {
    pub entries: usize,
    pub dimension: usize,
    pub approx_bytes: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum EmbedStatus {
    Embedded { dimension: usize },
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmbedOutcome {
    pub index: usize,
    pub label: Label,
    #[serde(flatten)]
    pub status: EmbedStatus,
}

impl EmbedOutcome {
    #[must_use]
    pub const fn is_embedded(&self) -> bool {
        matches!(self.status, EmbedStatus::Embedded { .. })
    }
}

/// Result of one generation pass. Failed labels are skipped, so `succeeded`
/// can be lower than `attempted`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SaveReport {
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub outcomes: Vec<EmbedOutcome>,
}

impl SaveReport {
    pub(crate) fn record(&mut self, outcome: EmbedOutcome) {
        self.attempted += 1;
        if outcome.is_embedded() {
            self.succeeded += 1;
        } else {
            self.failed += 1;
        }
        self.outcomes.push(outcome);
    }

    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.failed == 0
    }

    pub fn failures(&self) -> impl Iterator<Item = &EmbedOutcome> {
        self.outcomes.iter().filter(|outcome| !outcome.is_embedded())
    }
}
