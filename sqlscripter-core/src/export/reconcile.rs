//! Keeps category directories in step with the objects exported into them.
//!
//! `prepare_directory` clears stale scripts before a category is exported;
//! `finalize_directory` removes the directory again when nothing was written.

use crate::{Result, error::ScripterError};
use std::path::Path;
use tracing::{debug, trace};

fn is_script_file(name: &std::ffi::OsStr) -> bool {
    let extension = super::SCRIPT_EXTENSION;
    name.to_str().is_some_and(|name| {
        name.len() >= extension.len()
            && name
                .get(name.len() - extension.len()..)
                .is_some_and(|tail| tail.eq_ignore_ascii_case(extension))
    })
}

/// Creates `path` (with parents) or removes the `*.sql` files directly in it.
///
/// Subdirectories and files with other extensions are left alone.
///
/// # Errors
/// Returns an I/O error if the directory cannot be created, listed, or a
/// stale script cannot be removed, or if `path` exists but is not a
/// directory.
pub async fn prepare_directory(path: &Path) -> Result<()> {
    match tokio::fs::metadata(path).await {
        Ok(metadata) if metadata.is_dir() => {}
        Ok(_) => {
            return Err(ScripterError::io(
                "prepare",
                path,
                std::io::Error::new(std::io::ErrorKind::NotADirectory, "not a directory"),
            ));
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!("Creating directory {}", path.display());
            return tokio::fs::create_dir_all(path)
                .await
                .map_err(|e| ScripterError::io("create directory", path, e));
        }
        Err(e) => return Err(ScripterError::io("inspect", path, e)),
    }

    let mut entries = tokio::fs::read_dir(path)
        .await
        .map_err(|e| ScripterError::io("list", path, e))?;

    let mut removed = 0usize;
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| ScripterError::io("list", path, e))?
    {
        let file_type = entry
            .file_type()
            .await
            .map_err(|e| ScripterError::io("inspect", &entry.path(), e))?;

        if file_type.is_file() && is_script_file(&entry.file_name()) {
            let stale = entry.path();
            trace!("Removing stale script {}", stale.display());
            tokio::fs::remove_file(&stale)
                .await
                .map_err(|e| ScripterError::io("remove", &stale, e))?;
            removed += 1;
        }
    }

    if removed > 0 {
        debug!("Removed {} stale scripts from {}", removed, path.display());
    }

    Ok(())
}

/// Removes `path` recursively when `exported` is zero.
///
/// A missing directory is not an error.
pub async fn finalize_directory(path: &Path, exported: usize) -> Result<()> {
    if exported > 0 {
        return Ok(());
    }

    match tokio::fs::remove_dir_all(path).await {
        Ok(()) => {
            debug!("Removed empty category directory {}", path.display());
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(ScripterError::io("remove directory", path, e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_prepare_creates_missing_directory() {
        let root = TempDir::new().unwrap();
        let path = root.path().join("Databases").join("Sales").join("Tables");

        prepare_directory(&path).await.unwrap();
        assert!(path.is_dir());
    }

    #[tokio::test]
    async fn test_prepare_purges_only_scripts() {
        let root = TempDir::new().unwrap();
        let path = root.path();
        std::fs::write(path.join("Old.sql"), "x").unwrap();
        std::fs::write(path.join("Upper.SQL"), "x").unwrap();
        std::fs::write(path.join("notes.txt"), "keep").unwrap();
        std::fs::create_dir(path.join("nested")).unwrap();
        std::fs::write(path.join("nested").join("Inner.sql"), "keep").unwrap();

        prepare_directory(path).await.unwrap();

        assert!(!path.join("Old.sql").exists());
        assert!(!path.join("Upper.SQL").exists());
        assert!(path.join("notes.txt").exists());
        assert!(path.join("nested").join("Inner.sql").exists());
    }

    #[tokio::test]
    async fn test_prepare_rejects_file() {
        let root = TempDir::new().unwrap();
        let path = root.path().join("Tables");
        std::fs::write(&path, "not a directory").unwrap();

        let result = prepare_directory(&path).await;
        assert!(matches!(result, Err(ScripterError::Io { .. })));
    }

    #[tokio::test]
    async fn test_finalize_removes_empty_category() {
        let root = TempDir::new().unwrap();
        let path = root.path().join("Views");
        std::fs::create_dir_all(path.join("leftover")).unwrap();

        finalize_directory(&path, 0).await.unwrap();
        assert!(!path.exists());

        // Already gone
        finalize_directory(&path, 0).await.unwrap();
    }

    #[tokio::test]
    async fn test_finalize_keeps_populated_category() {
        let root = TempDir::new().unwrap();
        let path = root.path().join("Views");
        std::fs::create_dir(&path).unwrap();
        std::fs::write(path.join("v.sql"), "x").unwrap();

        finalize_directory(&path, 1).await.unwrap();
        assert!(path.join("v.sql").exists());
    }

    #[test]
    fn test_is_script_file() {
        assert!(is_script_file(std::ffi::OsStr::new("a.sql")));
        assert!(is_script_file(std::ffi::OsStr::new(".sql")));
        assert!(is_script_file(std::ffi::OsStr::new("B.Sql")));
        assert!(!is_script_file(std::ffi::OsStr::new("a.sqlx")));
        assert!(!is_script_file(std::ffi::OsStr::new("sql")));
    }
}
