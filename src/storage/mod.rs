//! Persistence layer.
//!
//! Datasets are header-prefixed CSV files under `<data_dir>/datasets/<kind>/`;
//! model artifacts are JSON envelopes under `<data_dir>/models/<role>/`.
//! Both default to content-derived file names, so re-saving unchanged data
//! overwrites the same file.

pub mod datasets;
pub mod matches;
pub mod models;

use std::fs;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::types::{EngineError, Result};

pub use datasets::{describe, read_dataset, summarize, write_dataset, DatasetKind};
pub use matches::{MatchHit, MatchQuery, MatchStore, TableMatchStore};
pub use models::{canonical, identity, load_model, save_model, Model};

pub fn datasets_dir(data_dir: &Path, kind: DatasetKind) -> PathBuf {
    data_dir.join("datasets").join(kind.subdir())
}

pub fn models_dir(data_dir: &Path) -> PathBuf {
    data_dir.join("models")
}

/// UUID-formatted prefix of the SHA-256 of `bytes`.
pub fn content_id(bytes: &[u8]) -> Uuid {
    let digest = Sha256::digest(bytes);
    let mut prefix = [0u8; 16];
    prefix.copy_from_slice(&digest[..16]);
    Uuid::from_bytes(prefix)
}

/// `dir/name` with `extension` appended when missing.
fn named_file(dir: &Path, name: &str, extension: &str) -> PathBuf {
    let file = if name.ends_with(&format!(".{extension}")) {
        name.to_string()
    } else {
        format!("{name}.{extension}")
    };
    dir.join(file)
}

/// Most recently modified file with `extension` in `dir`.
fn newest_file(dir: &Path, extension: &str) -> Result<PathBuf> {
    let entries = fs::read_dir(dir).map_err(|e| {
        EngineError::Persistence(format!("cannot list {}: {e}", dir.display()))
    })?;
    let mut newest: Option<(std::time::SystemTime, PathBuf)> = None;
    for entry in entries {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) != Some(extension) {
            continue;
        }
        let modified = fs::metadata(&path)?.modified()?;
        if newest.as_ref().map_or(true, |(t, _)| modified > *t) {
            newest = Some((modified, path));
        }
    }
    newest
        .map(|(_, path)| path)
        .ok_or_else(|| EngineError::Persistence(format!("no .{extension} file in {}", dir.display())))
}

/// Resolve a named file, or the newest one in `dir`.
fn resolve_file(dir: &Path, name: Option<&str>, extension: &str) -> Result<PathBuf> {
    match name {
        Some(name) => {
            let path = named_file(dir, name, extension);
            if path.exists() {
                Ok(path)
            } else {
                Err(EngineError::Persistence(format!("{} does not exist", path.display())))
            }
        }
        None => newest_file(dir, extension),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_id_is_stable() {
        assert_eq!(content_id(b"abc"), content_id(b"abc"));
        assert_ne!(content_id(b"abc"), content_id(b"abd"));
        assert_eq!(content_id(b"abc").to_string(), "ba7816bf-8f01-cfea-4141-40de5dae2223");
    }

    #[test]
    fn test_resolve_missing() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(resolve_file(dir.path(), None, "json"), Err(EngineError::Persistence(_))));
        assert!(matches!(resolve_file(dir.path(), Some("x"), "json"), Err(EngineError::Persistence(_))));
    }

    #[test]
    fn test_named_file_extension() {
        let dir = Path::new("/data");
        assert_eq!(named_file(dir, "a", "csv"), PathBuf::from("/data/a.csv"));
        assert_eq!(named_file(dir, "a.csv", "csv"), PathBuf::from("/data/a.csv"));
    }
}
