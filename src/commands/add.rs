//! `add <paths...>` - stage files into the index

use std::path::Path;

use tracing::debug;

use crate::error::Result;
use crate::index::Index;
use crate::repo::{with_lock, Repo};
use crate::worktree;

/// stage every file under each of `paths` (recursing into directories),
/// removing index entries for paths that no longer exist on disk
pub fn add(repo: &Repo, paths: &[impl AsRef<Path>]) -> Result<usize> {
    with_lock(repo, || {
        let mut index = Index::read(repo)?;
        let mut staged = 0;

        for path in paths {
            let path = path.as_ref();
            let abs = if path.is_absolute() { path.to_path_buf() } else { repo.path().join(path) };

            if !abs.exists() && !abs.symlink_metadata().is_ok() {
                let rel = crate::path::to_repo_relative(repo.path(), &abs)?;
                worktree::unstage_path(&mut index, &rel);
                continue;
            }

            for rel in paths_under(repo, &abs)? {
                worktree::stage_path(repo, &mut index, &rel)?;
                debug!(path = %rel, "staged");
                staged += 1;
            }
        }

        index.write(repo)?;
        Ok(staged)
    })
}

/// expand `abs` (a file or directory) into the repo-relative paths it covers
fn paths_under(repo: &Repo, abs: &Path) -> Result<Vec<String>> {
    let metadata = std::fs::symlink_metadata(abs).map_err(|source| crate::error::Error::Io { path: abs.to_path_buf(), source })?;

    if metadata.is_dir() {
        let all = worktree::scan_worktree(repo)?;
        let prefix = crate::path::to_repo_relative(repo.path(), abs)?;
        Ok(all.into_iter().filter(|p| p == &prefix || p.starts_with(&format!("{prefix}/"))).collect())
    } else {
        Ok(vec![crate::path::to_repo_relative(repo.path(), abs)?])
    }
}
