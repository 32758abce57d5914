use crate::error::{Result, SessionError};
use async_trait::async_trait;
use column_vector_store::Label;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Source of the ordered label list. Must return the same order on every call
/// within a run: snapshot vectors are matched to labels by position.
#[async_trait]
pub trait CorpusLoader: Send + Sync {
    async fn load_labels(&self) -> Result<Vec<Label>>;
}

/// Labels from a file on disk.
///
/// `*.json` files are read as a schema export and flattened to `TABLE.COLUMN`;
/// anything else is one label per line (`#` comments and blank lines skipped).
#[derive(Clone, Debug)]
pub struct FileCorpusLoader {
    path: PathBuf,
    table_prefixes: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SchemaExport {
    tables: Vec<TableExport>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct TableExport {
    name: String,
    #[serde(default)]
    columns: Vec<ColumnExport>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ColumnExport {
    Named {
        name: String,
        #[serde(default)]
        #[allow(dead_code)]
        data_type: Option<String>,
    },
    Bare(String),
}

impl ColumnExport {
    /// `"COMPANYNAME (VARCHAR2)"` -> `"COMPANYNAME"`.
    fn column_name(&self) -> &str {
        let raw = match self {
            Self::Named { name, .. } => name,
            Self::Bare(name) => name,
        };
        raw.split_whitespace().next().unwrap_or("")
    }
}

impl FileCorpusLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            table_prefixes: Vec::new(),
        }
    }

    /// Keep only tables whose name starts with one of `prefixes` (schema exports only).
    #[must_use]
    pub fn with_table_prefixes(mut self, prefixes: Vec<String>) -> Self {
        self.table_prefixes = prefixes;
        self
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn is_schema_export(&self) -> bool {
        self.path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
    }

    fn table_selected(&self, table: &str) -> bool {
        self.table_prefixes.is_empty()
            || self
                .table_prefixes
                .iter()
                .any(|prefix| table.starts_with(prefix.as_str()))
    }

    fn labels_from_schema(&self, bytes: &[u8]) -> Result<Vec<Label>> {
        let export: SchemaExport = serde_json::from_slice(bytes).map_err(|err| {
            SessionError::CorpusLoader(format!("{}: {err}", self.path.display()))
        })?;

        let mut tables: Vec<&TableExport> = export
            .tables
            .iter()
            .filter(|table| self.table_selected(&table.name))
            .collect();
        tables.sort_by(|a, b| a.name.cmp(&b.name));

        let mut labels = Vec::new();
        for table in tables {
            for column in &table.columns {
                let column = column.column_name();
                if column.is_empty() {
                    continue;
                }
                labels.push(format!("{}.{column}", table.name));
            }
        }
        Ok(labels)
    }
}

fn labels_from_lines(text: &str) -> Vec<Label> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}

#[async_trait]
impl CorpusLoader for FileCorpusLoader {
    async fn load_labels(&self) -> Result<Vec<Label>> {
        let bytes = tokio::fs::read(&self.path).await.map_err(|err| {
            SessionError::CorpusLoader(format!("{}: {err}", self.path.display()))
        })?;

        let labels = if self.is_schema_export() {
            self.labels_from_schema(&bytes)?
        } else {
            labels_from_lines(&String::from_utf8_lossy(&bytes))
        };
        log::info!("Loaded {} labels from {}", labels.len(), self.path.display());
        Ok(labels)
    }
}

/// Fixed label list, mostly for embedding the crate in other tools.
#[derive(Clone, Debug, Default)]
pub struct StaticCorpus {
    labels: Vec<Label>,
}

impl StaticCorpus {
    #[must_use]
    pub const fn new(labels: Vec<Label>) -> Self {
        Self { labels }
    }
}

#[async_trait]
impl CorpusLoader for StaticCorpus {
    async fn load_labels(&self) -> Result<Vec<Label>> {
        Ok(self.labels.clone())
    }
}
