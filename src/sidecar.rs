//! Metadata sidecar layout and on-disk mechanics.
//!
//! One ARXML document per source file; one JSON array of metadata records
//! per source file, stored under a parallel metadata root that mirrors the
//! ARXML tree's relative structure with the extension swapped. The contract
//! forbids hand-editing sidecars: record addresses are positional and break
//! under manual changes.

use std::cmp::Ordering;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Result, SyncError};
use crate::metadata::MetadataRecord;

pub const ARXML_EXT: &str = "arxml";
pub const SIDECAR_EXT: &str = "json";

/// Split a relative path into its forward-slash segments.
pub fn path_segments(rel_path: &str) -> Vec<&str> {
    rel_path.split('/').filter(|s| !s.is_empty()).collect()
}

/// Deterministic ordering for multi-file runs: segment-by-segment
/// lexicographic comparison, a path that is a prefix of another sorting
/// first. Identity numbering depends on this order, so it is a committed
/// contract, not a convenience.
pub fn compare_rel_paths(a: &str, b: &str) -> Ordering {
    path_segments(a).cmp(&path_segments(b))
}

/// Absolute ARXML path for a relative source path (without extension).
pub fn arxml_path(arxml_root: &Path, rel_path: &str) -> PathBuf {
    let mut p = arxml_root.to_path_buf();
    for seg in path_segments(rel_path) {
        p.push(seg);
    }
    p.set_extension(ARXML_EXT);
    p
}

/// Absolute sidecar path for a relative source path (without extension).
pub fn sidecar_path(meta_root: &Path, rel_path: &str) -> PathBuf {
    let mut p = meta_root.to_path_buf();
    for seg in path_segments(rel_path) {
        p.push(seg);
    }
    p.set_extension(SIDECAR_EXT);
    p
}

/// Recursively collect every file under `root` with the given extension,
/// as relative paths without extension, in deterministic order. Callers
/// wrap the I/O error with their own context (metadata root vs model
/// root).
pub fn scan_tree(root: &Path, ext: &str) -> std::io::Result<Vec<String>> {
    let mut found = Vec::new();
    walk(root, root, ext, &mut found)?;
    found.sort_by(|a, b| compare_rel_paths(a, b));
    Ok(found)
}

fn walk(root: &Path, dir: &Path, ext: &str, out: &mut Vec<String>) -> std::io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            walk(root, &path, ext, out)?;
        } else if path.extension().and_then(|e| e.to_str()) == Some(ext) {
            if let Ok(rel) = path.with_extension("").strip_prefix(root) {
                let rel = rel
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy())
                    .collect::<Vec<_>>()
                    .join("/");
                out.push(rel);
            }
        }
    }
    Ok(())
}

/// Read one sidecar file into its ordered record sequence.
pub fn read_records(meta_root: &Path, rel_path: &str) -> Result<Vec<MetadataRecord>> {
    let path = sidecar_path(meta_root, rel_path);
    let text = fs::read_to_string(&path).map_err(|source| SyncError::FileIo {
        path: path.clone(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| SyncError::MalformedSidecar { path, source })
}

/// Persist one file's ordered record sequence, creating parent directories
/// as needed. Directory-creation failure aborts the run.
pub fn write_records(meta_root: &Path, rel_path: &str, records: &[MetadataRecord]) -> Result<()> {
    let path = sidecar_path(meta_root, rel_path);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| SyncError::DirCreation {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    let json = serde_json::to_string_pretty(records).map_err(|source| {
        SyncError::MalformedSidecar {
            path: path.clone(),
            source,
        }
    })?;
    fs::write(&path, json).map_err(|source| SyncError::FileIo { path, source })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cmp::Ordering;

    #[test]
    fn segment_wise_ordering() {
        // Segment comparison, not plain string comparison: "a/b" < "a.b/x"
        // would differ under naive string order because '.' < '/'.
        assert_eq!(compare_rel_paths("a/b", "a/c"), Ordering::Less);
        assert_eq!(compare_rel_paths("a", "a/b"), Ordering::Less);
        assert_eq!(compare_rel_paths("a/b/c", "a/b"), Ordering::Greater);
        assert_eq!(compare_rel_paths("ecu/app", "ecu/app"), Ordering::Equal);
        assert_eq!(compare_rel_paths("a-b/x", "a/x"), Ordering::Greater);
    }

    #[test]
    fn path_mapping_swaps_extension() {
        let arxml = arxml_path(Path::new("/models"), "ecu/app");
        assert_eq!(arxml, Path::new("/models/ecu/app.arxml"));
        let sidecar = sidecar_path(Path::new("/models/.arlang-meta"), "ecu/app");
        assert_eq!(sidecar, Path::new("/models/.arlang-meta/ecu/app.json"));
    }

    #[test]
    fn scan_finds_nested_files_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        std::fs::create_dir_all(root.join("b/sub")).unwrap();
        std::fs::write(root.join("b/sub/deep.arxml"), "<A/>").unwrap();
        std::fs::write(root.join("a.arxml"), "<A/>").unwrap();
        std::fs::write(root.join("b/top.arxml"), "<A/>").unwrap();
        std::fs::write(root.join("b/notes.txt"), "ignored").unwrap();

        let found = scan_tree(root, ARXML_EXT).unwrap();
        assert_eq!(found, vec!["a", "b/sub/deep", "b/top"]);
    }

    #[test]
    fn missing_root_is_an_io_error() {
        let err = scan_tree(Path::new("/definitely/not/here"), ARXML_EXT).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::NotFound);
    }
}
