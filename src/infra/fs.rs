//! # File System Operations Module / 文件系统操作模块
//!
//! Filesystem-backed artifact store and the helpers used to persist reports.
//!
//! 基于文件系统的产物存储，以及用于持久化报告的辅助函数。

use anyhow::{Context, Result};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::core::artifacts::ArtifactStore;

/// Stores artifacts as plain files, creating parent directories on demand.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsArtifactStore;

impl ArtifactStore for FsArtifactStore {
    fn store(&self, path: &Path, bytes: &[u8]) -> io::Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, bytes)
    }

    fn list(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        if is_directory(path) {
            collect_files(path, &mut files)?;
        }
        files.sort();
        Ok(files)
    }
}

fn collect_files(dir: &Path, out: &mut Vec<PathBuf>) -> io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_files(&path, out)?;
        } else {
            out.push(path);
        }
    }
    Ok(())
}

/// Writes `content` to `dir/file_name`, creating `dir` first.
///
/// # Returns
/// The path of the written file.
pub fn write_report(dir: &Path, file_name: &str, content: &str) -> Result<PathBuf> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create report directory: {}", dir.display()))?;
    let path = dir.join(file_name);
    fs::write(&path, content)
        .with_context(|| format!("Failed to write report: {}", path.display()))?;
    Ok(path)
}

/// Checks if a path exists and is a directory.
pub fn is_directory(path: &Path) -> bool {
    path.exists() && path.is_dir()
}

/// Returns `path` relative to `base` when `path` lies under it.
///
/// Used to turn screenshot paths into links that stay valid when the report
/// directory is moved together with the screenshot tree.
pub fn relative_to(path: &Path, base: &Path) -> PathBuf {
    let path_parts: Vec<_> = path.components().collect();
    let base_parts: Vec<_> = base.components().collect();
    let common = path_parts
        .iter()
        .zip(&base_parts)
        .take_while(|(a, b)| a == b)
        .count();

    let mut relative = PathBuf::new();
    for _ in common..base_parts.len() {
        relative.push("..");
    }
    for part in &path_parts[common..] {
        relative.push(part);
    }
    relative
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_paths_climb_out_of_the_report_dir() {
        assert_eq!(
            relative_to(
                Path::new("screenshots/2025-01-02/TestA/Step_1_FILL.png"),
                Path::new("report-summary/summaries")
            ),
            PathBuf::from("../../screenshots/2025-01-02/TestA/Step_1_FILL.png")
        );
    }

    #[test]
    fn store_creates_parents_and_list_is_sorted() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsArtifactStore;
        store.store(&dir.path().join("b/Step_2_X.png"), b"2").unwrap();
        store.store(&dir.path().join("a/Step_1_X.png"), b"1").unwrap();

        let files = store.list(dir.path()).unwrap();
        assert_eq!(
            files,
            vec![dir.path().join("a/Step_1_X.png"), dir.path().join("b/Step_2_X.png")]
        );
        assert!(store.list(&dir.path().join("missing")).unwrap().is_empty());
    }
}
