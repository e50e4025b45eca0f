//! Snapshot files: a pretty-printed JSON array of `{id, text, vector, meta?}`.

use crate::index::validate_vectors;
use quiver_core::{QuiverError, QuiverResult, Record, SearchItem};
use std::path::Path;
use tracing::info;

/// Writes `records` to `path` as pretty-printed JSON, creating parent
/// directories as needed.
pub async fn save_snapshot(path: &Path, records: &[Record]) -> QuiverResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    let data = serde_json::to_string_pretty(records)?;
    tokio::fs::write(path, data.as_bytes()).await?;
    info!(path = %path.display(), count = records.len(), "Snapshot saved");
    Ok(())
}

/// Reads a snapshot from `path`.
///
/// Strict mode rejects the whole file if any entry lacks a valid vector.
/// Entries whose `vector` is absent load with an empty vector otherwise.
pub async fn load_snapshot(path: &Path, strict: bool) -> QuiverResult<Vec<Record>> {
    let data = tokio::fs::read_to_string(path).await?;
    let records: Vec<Record> = serde_json::from_str(&data)
        .map_err(|e| QuiverError::InvalidInput(format!("Invalid snapshot {}: {e}", path.display())))?;
    if strict {
        validate_vectors(&records)?;
    }
    info!(path = %path.display(), count = records.len(), strict, "Snapshot loaded");
    Ok(records)
}

/// Reads raw `[{id, text, meta?}]` items to be embedded.
pub async fn load_items(path: &Path) -> QuiverResult<Vec<SearchItem>> {
    let data = tokio::fs::read_to_string(path).await?;
    let items: Vec<SearchItem> = serde_json::from_str(&data)?;
    Ok(items)
}
