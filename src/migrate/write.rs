use std::path::{Path, PathBuf};

use uuid::Uuid;

use crate::document::OutputDocument;
use crate::error::MigrationError;

/// `new_<uuid>_<language-tag>.json`
pub fn file_name(language_tag: &str) -> String {
    format!("new_{}_{}.json", Uuid::new_v4(), language_tag)
}

pub async fn ensure_dir(dir: &Path) -> Result<(), MigrationError> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|source| MigrationError::Write { path: dir.to_path_buf(), source })
}

/// Pretty-print `doc` to a fresh file in `dir`. The bytes land in a temporary
/// sibling first and are renamed into place, so a failed write never leaves a
/// truncated document under the final name.
pub async fn write_document(dir: &Path, language_tag: &str, doc: &OutputDocument) -> Result<PathBuf, MigrationError> {
    let path = dir.join(file_name(language_tag));
    let tmp = path.with_extension("json.part");

    let body = serde_json::to_vec_pretty(doc)
        .map_err(|e| MigrationError::Write { path: path.clone(), source: std::io::Error::other(e) })?;

    if let Err(source) = tokio::fs::write(&tmp, &body).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(MigrationError::Write { path: tmp, source });
    }
    if let Err(source) = tokio::fs::rename(&tmp, &path).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(MigrationError::Write { path, source });
    }
    Ok(path)
}
