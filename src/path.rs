use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// name of the hidden metadata subdirectory inside a repository's working tree
pub const METADATA_DIR: &str = ".ivy";

/// walk upward from `start` looking for a directory containing `.ivy`
pub fn find_repo_root(start: &Path) -> Result<PathBuf> {
    let start = start
        .canonicalize()
        .map_err(|source| Error::Io { path: start.to_path_buf(), source })?;

    let mut dir = start.as_path();
    loop {
        if dir.join(METADATA_DIR).is_dir() {
            return Ok(dir.to_path_buf());
        }
        match dir.parent() {
            Some(parent) => dir = parent,
            None => return Err(Error::NoRepo(start)),
        }
    }
}

/// express `path` relative to `root` using forward slashes regardless of host separator
pub fn to_repo_relative(root: &Path, path: &Path) -> Result<String> {
    let abs = if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    };

    let rel = abs
        .strip_prefix(root)
        .map_err(|_| Error::PathNotFound(abs.display().to_string()))?;

    let mut parts = Vec::new();
    for component in rel.components() {
        match component {
            std::path::Component::Normal(s) => {
                parts.push(s.to_str().ok_or_else(|| Error::NonUtf8Path(abs.clone()))?.to_string())
            }
            std::path::Component::CurDir => {}
            _ => return Err(Error::PathNotFound(abs.display().to_string())),
        }
    }
    Ok(parts.join("/"))
}

/// split a forward-slash repo-relative path into its components
pub fn split_components(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}
