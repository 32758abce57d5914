use column_session::{QueryReporter, RegenerationReason, StartupReport};
use column_vector_store::{
    EmbedOutcome, EmbedStatus, IndexStats, SaveObserver, SearchResult, VectorStoreError,
};
use std::io::Write;
use std::path::Path;

pub fn render_results(results: &[SearchResult]) -> String {
    if results.is_empty() {
        return "No results\n".to_string();
    }
    let mut out = format!("Top {} matches:\n", results.len());
    for hit in results {
        out.push_str(&format!(
            "  {:>3}. {} (similarity: {:.4})\n",
            hit.rank, hit.label, hit.score
        ));
    }
    out
}

pub fn render_stats(stats: &IndexStats) -> String {
    format!(
        "Entries:   {}\nDimension: {}\nMemory:    ~{:.2} KB\n",
        stats.entries,
        stats.dimension,
        stats.approx_bytes as f64 / 1024.0
    )
}

pub fn describe_startup(report: &StartupReport) -> String {
    match report {
        StartupReport::Snapshot { labels } => format!("Loaded snapshot with {labels} entries"),
        StartupReport::Regenerated {
            reason,
            augmented,
            save,
        } => {
            let why = match reason {
                RegenerationReason::Missing => "no snapshot".to_string(),
                RegenerationReason::Unreadable => "snapshot unreadable".to_string(),
                RegenerationReason::CountMismatch { labels, vectors } => {
                    format!("{vectors} vectors for {labels} labels")
                }
                RegenerationReason::Forced => "rebuild requested".to_string(),
            };
            format!(
                "Generated snapshot ({why}): {}/{} embedded, {} failed{}",
                save.succeeded,
                save.attempted,
                save.failed,
                if *augmented { ", labels augmented" } else { "" }
            )
        }
    }
}

/// Prints query results to stdout, one block per query.
pub struct ConsoleReporter {
    interactive: bool,
}

impl ConsoleReporter {
    pub const fn new(interactive: bool) -> Self {
        Self { interactive }
    }
}

impl QueryReporter for ConsoleReporter {
    fn on_prompt(&mut self) {
        if self.interactive {
            let mut stdout = std::io::stdout().lock();
            let _ = write!(stdout, "\n> ");
            let _ = stdout.flush();
        }
    }

    fn on_results(&mut self, query: &str, results: &[SearchResult]) {
        log::debug!("'{query}': {} results", results.len());
        print!("{}", render_results(results));
    }

    fn on_error(&mut self, query: &str, error: &VectorStoreError) {
        eprintln!("Search failed for '{query}': {error}");
    }

    fn on_exit(&mut self) {
        if self.interactive {
            println!("Bye!");
        }
    }
}

/// Generation progress on stderr.
pub struct ProgressPrinter {
    enabled: bool,
}

impl ProgressPrinter {
    pub const fn new(enabled: bool) -> Self {
        Self { enabled }
    }
}

impl SaveObserver for ProgressPrinter {
    fn on_start(&mut self, total: usize) {
        if self.enabled {
            eprintln!("Embedding {total} labels...");
        }
    }

    fn on_outcome(&mut self, outcome: &EmbedOutcome, total: usize) {
        if !self.enabled {
            return;
        }
        match &outcome.status {
            EmbedStatus::Embedded { dimension } => eprintln!(
                "  {}/{total} {} ({dimension} dims)",
                outcome.index + 1,
                outcome.label
            ),
            EmbedStatus::Failed { reason } => eprintln!(
                "  {}/{total} {} FAILED: {reason}",
                outcome.index + 1,
                outcome.label
            ),
        }
    }

    fn on_written(&mut self, path: &Path, vectors: usize) {
        if self.enabled {
            eprintln!("Saved {vectors} vectors to {}", path.display());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use column_vector_store::SaveReport;

    #[test]
    fn results_are_numbered_with_four_decimals() {
        let results = vec![
            SearchResult {
                rank: 1,
                index: 0,
                label: "T1.A".to_string(),
                score: 1.0,
            },
            SearchResult {
                rank: 2,
                index: 2,
                label: "T1.C".to_string(),
                score: 0.707_106_8,
            },
        ];
        let text = render_results(&results);
        assert!(text.contains("  1. T1.A (similarity: 1.0000)"));
        assert!(text.contains("  2. T1.C (similarity: 0.7071)"));
        assert_eq!(render_results(&[]), "No results\n");
    }

    #[test]
    fn startup_summary_mentions_failures() {
        let report = StartupReport::Regenerated {
            reason: RegenerationReason::CountMismatch {
                labels: 5,
                vectors: 4,
            },
            augmented: true,
            save: SaveReport {
                attempted: 5,
                succeeded: 5,
                failed: 0,
                outcomes: Vec::new(),
            },
        };
        let text = describe_startup(&report);
        assert!(text.contains("4 vectors for 5 labels"));
        assert!(text.contains("5/5 embedded"));
        assert!(text.contains("labels augmented"));
    }
}
