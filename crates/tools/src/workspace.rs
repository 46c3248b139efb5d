//! Filesystem helpers shared by the file tools and the repository sampler.
//!
//! Paths coming from the model are untrusted: anything that is absolute or
//! climbs with `..` is refused before it touches the disk, and the
//! canonical result must still sit under the root.

use gitsage_core::text::truncate_chars;
use ignore::WalkBuilder;
use std::path::{Component, Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum PathError {
    #[error("Path '{0}' escapes the repository root")]
    Escapes(String),

    #[error("Path '{0}' does not exist")]
    NotFound(String),
}

/// Resolve `relative` under `root`, refusing traversal and symlink escapes.
pub fn resolve_in_root(root: &Path, relative: &str) -> Result<PathBuf, PathError> {
    let cleaned = relative.trim().trim_start_matches("./");
    let rel = Path::new(cleaned);
    let plain = rel
        .components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir));
    if !plain {
        return Err(PathError::Escapes(relative.to_string()));
    }

    let joined = root.join(rel);
    let canonical = joined
        .canonicalize()
        .map_err(|_| PathError::NotFound(cleaned.to_string()))?;
    let canonical_root = root
        .canonicalize()
        .map_err(|_| PathError::NotFound(root.display().to_string()))?;
    if !canonical.starts_with(&canonical_root) {
        return Err(PathError::Escapes(relative.to_string()));
    }
    Ok(canonical)
}

/// Resolve a path the model gave to a file tool. Relative paths are taken
/// against `root` when one is configured.
pub fn resolve_user_path(root: Option<&Path>, path: &str) -> PathBuf {
    let candidate = Path::new(path.trim());
    match root {
        Some(root) if candidate.is_relative() => root.join(candidate),
        _ => candidate.to_path_buf(),
    }
}

/// Every file under `root` as a sorted, `/`-separated relative path.
/// `.git` is skipped; ignore files are not honoured.
pub fn walk_files(root: &Path) -> Vec<String> {
    let walker = WalkBuilder::new(root)
        .standard_filters(false)
        .filter_entry(|entry| entry.file_name() != ".git")
        .build();

    let mut files: Vec<String> = walker
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_some_and(|ft| ft.is_file()))
        .filter_map(|entry| {
            entry
                .path()
                .strip_prefix(root)
                .ok()
                .map(|rel| rel.to_string_lossy().replace('\\', "/"))
        })
        .collect();
    files.sort();
    files
}

/// Same as [`walk_files`], off the async runtime.
pub async fn walk_files_blocking(root: &Path) -> Vec<String> {
    let root = root.to_path_buf();
    tokio::task::spawn_blocking(move || walk_files(&root))
        .await
        .unwrap_or_default()
}

/// Read at most `max_chars` characters of a file under `root`.
///
/// Returns `None` for anything that cannot be read as a regular file.
pub async fn read_capped(root: &Path, relative: &str, max_chars: usize) -> Option<String> {
    let path = resolve_in_root(root, relative).ok()?;
    if !path.is_file() {
        return None;
    }
    let bytes = tokio::fs::read(&path).await.ok()?;
    let text = String::from_utf8_lossy(&bytes);
    Some(truncate_chars(&text, max_chars).to_string())
}
