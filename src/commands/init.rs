//! `init` - create the metadata layout for a new repository

use std::path::Path;

use tracing::info;

use crate::error::{Error, Result};
use crate::path::METADATA_DIR;
use crate::repo::Repo;

/// initialize a repository at `path`, or report success if one already exists
/// there in good standing
pub fn init(path: &Path) -> Result<Repo> {
    match Repo::init(path) {
        Ok(repo) => {
            info!(path = %path.display(), "initialized repository");
            Ok(repo)
        }
        Err(Error::RepoExists(_)) => {
            let meta = path.join(METADATA_DIR);
            if meta.join("HEAD").is_file() && meta.join("objects").is_dir() {
                Repo::open(path)
            } else {
                Err(Error::RepoExists(path.to_path_buf()))
            }
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_init_creates_layout() {
        let dir = tempdir().unwrap();
        let repo_path = dir.path().join("project");

        let repo = init(&repo_path).unwrap();

        assert!(repo.objects_path().is_dir());
        assert!(repo.head_path().is_file());
    }

    #[test]
    fn test_init_idempotent_on_well_formed_repo() {
        let dir = tempdir().unwrap();
        let repo_path = dir.path().join("project");

        init(&repo_path).unwrap();
        let repo = init(&repo_path).unwrap();

        assert!(repo.objects_path().is_dir());
    }
}
