use anyhow::{Context, Result};
use clap::ValueEnum;
use column_session::{DEFAULT_CHAT_MODEL, DEFAULT_DESCRIPTION_LANGUAGE, DEFAULT_TOP_K};
use column_vector_store::{
    default_snapshot_path, DEFAULT_API_BASE, DEFAULT_EMBEDDING_MODEL, DEFAULT_EMBED_THROTTLE,
    DEFAULT_STUB_DIMENSION,
};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_CONFIG_FILE: &str = "column-finder.toml";
pub const DEFAULT_CORPUS_FILE: &str = "columns.txt";

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbedMode {
    Openai,
    Stub,
}

/// `column-finder.toml`. Every key is optional; flags and env vars win.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    #[serde(default)]
    pub corpus: CorpusSection,
    #[serde(default)]
    pub snapshot: SnapshotSection,
    #[serde(default)]
    pub embedding: EmbeddingSection,
    #[serde(default)]
    pub augment: AugmentSection,
    #[serde(default)]
    pub search: SearchSection,
    #[serde(default)]
    pub api: ApiSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CorpusSection {
    pub path: Option<PathBuf>,
    pub table_prefixes: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SnapshotSection {
    pub path: Option<PathBuf>,
    pub throttle_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EmbeddingSection {
    pub mode: Option<EmbedMode>,
    pub model: Option<String>,
    pub stub_dimension: Option<usize>,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AugmentSection {
    pub enabled: Option<bool>,
    pub model: Option<String>,
    pub language: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SearchSection {
    pub top_k: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ApiSection {
    pub base_url: Option<String>,
}

impl FileConfig {
    pub fn from_path(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Cannot read config {}", path.display()))?;
        Self::from_toml(&text).with_context(|| format!("Invalid config {}", path.display()))
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Explicit `--config` must exist; the implicit `column-finder.toml` is optional.
    pub fn discover(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::from_path(path);
        }
        let implicit = Path::new(DEFAULT_CONFIG_FILE);
        if implicit.is_file() {
            log::debug!("Using {}", implicit.display());
            return Self::from_path(implicit);
        }
        Ok(Self::default())
    }
}

/// Values supplied on the command line or through the environment.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub corpus: Option<PathBuf>,
    pub table_prefixes: Vec<String>,
    pub snapshot: Option<PathBuf>,
    pub embed_mode: Option<EmbedMode>,
    pub embed_model: Option<String>,
    pub stub_dimension: Option<usize>,
    pub chat_model: Option<String>,
    pub language: Option<String>,
    pub no_augment: bool,
    pub api_key: Option<String>,
    pub api_base: Option<String>,
    pub top_k: Option<usize>,
    pub throttle_ms: Option<u64>,
    pub timeout_secs: Option<u64>,
}

/// Fully resolved settings: defaults < config file < env/flags.
#[derive(Debug, Clone)]
pub struct Settings {
    pub corpus: PathBuf,
    pub table_prefixes: Vec<String>,
    pub snapshot: PathBuf,
    pub embed_mode: EmbedMode,
    pub embed_model: String,
    pub stub_dimension: usize,
    pub augment: bool,
    pub chat_model: String,
    pub language: String,
    pub api_key: Option<String>,
    pub api_base: String,
    pub top_k: usize,
    pub throttle: Duration,
    pub timeout: Duration,
}

impl Settings {
    #[must_use]
    pub fn resolve(file: FileConfig, cli: Overrides) -> Self {
        let table_prefixes = if cli.table_prefixes.is_empty() {
            file.corpus.table_prefixes.unwrap_or_default()
        } else {
            cli.table_prefixes
        };
        let throttle = cli
            .throttle_ms
            .or(file.snapshot.throttle_ms)
            .map_or(DEFAULT_EMBED_THROTTLE, Duration::from_millis);

        Self {
            corpus: cli
                .corpus
                .or(file.corpus.path)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_CORPUS_FILE)),
            table_prefixes,
            snapshot: cli
                .snapshot
                .or(file.snapshot.path)
                .unwrap_or_else(default_snapshot_path),
            embed_mode: cli
                .embed_mode
                .or(file.embedding.mode)
                .unwrap_or(EmbedMode::Openai),
            embed_model: cli
                .embed_model
                .or(file.embedding.model)
                .unwrap_or_else(|| DEFAULT_EMBEDDING_MODEL.to_string()),
            stub_dimension: cli
                .stub_dimension
                .or(file.embedding.stub_dimension)
                .unwrap_or(DEFAULT_STUB_DIMENSION)
                .max(1),
            augment: !cli.no_augment && file.augment.enabled.unwrap_or(true),
            chat_model: cli
                .chat_model
                .or(file.augment.model)
                .unwrap_or_else(|| DEFAULT_CHAT_MODEL.to_string()),
            language: cli
                .language
                .or(file.augment.language)
                .unwrap_or_else(|| DEFAULT_DESCRIPTION_LANGUAGE.to_string()),
            api_key: cli.api_key.filter(|key| !key.trim().is_empty()),
            api_base: cli
                .api_base
                .or(file.api.base_url)
                .unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
            top_k: cli
                .top_k
                .or(file.search.top_k)
                .unwrap_or(DEFAULT_TOP_K)
                .max(1),
            throttle,
            timeout: Duration::from_secs(
                cli.timeout_secs
                    .or(file.embedding.timeout_secs)
                    .unwrap_or(30)
                    .max(1),
            ),
        }
    }

    pub fn require_api_key(&self) -> Result<&str> {
        self.api_key
            .as_deref()
            .context("OPENAI_API_KEY is not set (use --api-key, or --embed-mode stub for offline runs)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults_apply_without_file_or_flags() {
        let settings = Settings::resolve(FileConfig::default(), Overrides::default());
        assert_eq!(settings.corpus, PathBuf::from(DEFAULT_CORPUS_FILE));
        assert_eq!(settings.snapshot, default_snapshot_path());
        assert_eq!(settings.embed_mode, EmbedMode::Openai);
        assert_eq!(settings.embed_model, "text-embedding-3-large");
        assert_eq!(settings.top_k, 20);
        assert_eq!(settings.throttle, Duration::from_millis(200));
        assert!(settings.augment);
        assert!(settings.api_key.is_none());
    }

    #[test]
    fn flags_override_file_which_overrides_defaults() {
        let file = FileConfig::from_toml(
            r#"
            [corpus]
            path = "schema.json"
            table_prefixes = ["BI_EMPLOYEE", "BI_HREMPLOYEE"]

            [embedding]
            mode = "stub"
            stub_dimension = 32

            [search]
            top_k = 5

            [augment]
            enabled = false
            "#,
        )
        .unwrap();
        let cli = Overrides {
            top_k: Some(7),
            throttle_ms: Some(0),
            ..Overrides::default()
        };

        let settings = Settings::resolve(file, cli);
        assert_eq!(settings.corpus, PathBuf::from("schema.json"));
        assert_eq!(settings.table_prefixes, vec!["BI_EMPLOYEE", "BI_HREMPLOYEE"]);
        assert_eq!(settings.embed_mode, EmbedMode::Stub);
        assert_eq!(settings.stub_dimension, 32);
        assert_eq!(settings.top_k, 7);
        assert_eq!(settings.throttle, Duration::ZERO);
        assert!(!settings.augment);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(FileConfig::from_toml("[search]\ntopk = 3\n").is_err());
        assert!(FileConfig::from_toml("[vectors]\npath = \"x\"\n").is_err());
    }

    #[test]
    fn blank_api_key_counts_as_missing() {
        let settings = Settings::resolve(
            FileConfig::default(),
            Overrides {
                api_key: Some("   ".to_string()),
                ..Overrides::default()
            },
        );
        assert!(settings.require_api_key().is_err());
    }
}
