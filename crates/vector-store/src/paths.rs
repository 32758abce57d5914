use std::path::{Path, PathBuf};

pub const SNAPSHOT_DIR_NAME: &str = "column_embeddings";
pub const SNAPSHOT_FILE_NAME: &str = "column_embeddings.json";

/// `column_embeddings/column_embeddings.json`, relative to the working directory.
#[must_use]
pub fn default_snapshot_path() -> PathBuf {
    PathBuf::from(SNAPSHOT_DIR_NAME).join(SNAPSHOT_FILE_NAME)
}

#[must_use]
pub fn snapshot_path_in(dir: &Path) -> PathBuf {
    dir.join(SNAPSHOT_DIR_NAME).join(SNAPSHOT_FILE_NAME)
}
