//! Discovery of DTO source files.

use std::{
    fs,
    path::{Path, PathBuf},
};

use log::{debug, warn};

use crate::error::PrismError;

/// Find every file with `extension` below `dirs`, recursively.
///
/// Paths are returned sorted so that a run is reproducible regardless of
/// directory iteration order. Directories that do not exist are skipped with
/// a warning.
pub fn discover(dirs: &[PathBuf], extension: &str) -> Result<Vec<PathBuf>, PrismError> {
    let mut sources = Vec::new();
    for dir in dirs {
        if !dir.is_dir() {
            warn!(dir:? = dir; "DTO directory does not exist, skipping");
            continue;
        }
        walk(dir, extension, &mut sources)?;
    }
    sources.sort();
    sources.dedup();
    debug!(sources = sources.len(); "Discovered DTO sources");
    Ok(sources)
}

fn walk(dir: &Path, extension: &str, sources: &mut Vec<PathBuf>) -> Result<(), PrismError> {
    let entries = fs::read_dir(dir).map_err(|source| PrismError::Read {
        path: dir.to_path_buf(),
        source,
    })?;
    for entry in entries {
        let path = entry?.path();
        if path.is_dir() {
            walk(&path, extension, sources)?;
        } else if path.extension().is_some_and(|ext| ext == extension) {
            sources.push(path);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_discover_recursively_and_sorted() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("hr");
        fs::create_dir(&nested).unwrap();
        fs::write(nested.join("Employee.dto"), "").unwrap();
        fs::write(dir.path().join("Department.dto"), "").unwrap();
        fs::write(dir.path().join("notes.txt"), "").unwrap();

        let sources = discover(&[dir.path().to_path_buf()], "dto").unwrap();
        assert_eq!(
            sources,
            vec![dir.path().join("Department.dto"), nested.join("Employee.dto")]
        );
    }

    #[test]
    fn test_missing_directory_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let sources = discover(&[dir.path().join("absent")], "dto").unwrap();
        assert!(sources.is_empty());
    }
}
