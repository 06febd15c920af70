use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Atomically write bytes to a file by writing to a temp file then renaming.
///
/// The target either keeps its old contents or receives the new contents,
/// never a partial write. Missing parent directories are created.
///
/// # Errors
/// Returns an error if the write or rename fails.
pub fn atomic_write(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent)?;

    // Same directory as the target so the rename stays on one filesystem
    let mut temp_path = parent.to_path_buf();
    temp_path.push(format!(
        ".{}.tmp.{}",
        path.file_name().and_then(|n| n.to_str()).unwrap_or("file"),
        std::process::id()
    ));

    {
        let mut file = File::create(&temp_path)?;
        file.write_all(bytes)?;
        file.sync_all()?;
    }

    match fs::rename(&temp_path, path) {
        Ok(()) => Ok(()),
        Err(e) => {
            // On Windows, rename can fail if target exists. Try copy + remove as fallback.
            if cfg!(windows) {
                fs::copy(&temp_path, path)?;
                let _ = fs::remove_file(&temp_path);
                Ok(())
            } else {
                let _ = fs::remove_file(&temp_path);
                Err(e)
            }
        }
    }
}

/// Copy a file byte-for-byte through [`atomic_write`].
///
/// # Errors
/// Returns an error if the source cannot be read or the target written.
pub fn copy_atomic(from: &Path, to: &Path) -> io::Result<u64> {
    let bytes = fs::read(from)?;
    atomic_write(to, &bytes)?;
    Ok(bytes.len() as u64)
}

/// Delete a stale artifact if it exists.
///
/// Returns `true` when a file was removed, `false` when nothing was there.
///
/// # Errors
/// Returns an error if the file exists but cannot be removed.
pub fn remove_if_present(path: &Path) -> io::Result<bool> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

/// Check whether a path has one of the given extensions (case-insensitive).
#[must_use]
pub fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| extensions.iter().any(|x| x.eq_ignore_ascii_case(e)))
}

/// List files directly inside `dir` (non-recursive) with one of `extensions`.
///
/// Results are sorted by file name so listing order is stable across
/// platforms. A missing directory yields an empty list.
///
/// # Errors
/// Returns an error if the directory exists but cannot be read.
pub fn list_files(dir: &Path, extensions: &[&str]) -> io::Result<Vec<PathBuf>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e),
    };

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry?;
        let path = entry.path();
        if entry.file_type()?.is_file() && has_extension(&path, extensions) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Recursively collect files under `dir` with one of `extensions`, sorted.
///
/// A missing directory yields an empty list.
///
/// # Errors
/// Returns an error if a directory entry cannot be read.
pub fn walk_files(dir: &Path, extensions: &[&str]) -> io::Result<Vec<PathBuf>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.map_err(io::Error::other)?;
        if entry.file_type().is_file() && has_extension(entry.path(), extensions) {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

/// Remove every file under `dir` matching one of `extensions`.
///
/// Only files that are present are touched. Returns the number removed.
///
/// # Errors
/// Returns an error if a present file cannot be removed.
pub fn remove_matching(dir: &Path, extensions: &[&str]) -> io::Result<usize> {
    let mut removed = 0;
    for path in walk_files(dir, extensions)? {
        if remove_if_present(&path)? {
            removed += 1;
        }
    }
    Ok(removed)
}

/// Render `path` relative to `root` with forward slashes.
///
/// Falls back to the full path when `path` is not under `root`.
#[must_use]
pub fn to_slash_relative(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Check a forward-slash relative path against a glob where `*` never
/// crosses a directory separator.
#[must_use]
pub fn glob_matches(pattern: &glob::Pattern, rel_path: &str) -> bool {
    let options = glob::MatchOptions {
        require_literal_separator: true,
        ..glob::MatchOptions::new()
    };
    pattern.matches_with(rel_path, options)
}
