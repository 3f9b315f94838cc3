//! `status` - tri-state comparison of HEAD tree, index, and working tree

use crate::error::Result;
use crate::index::Index;
use crate::repo::Repo;
use crate::worktree;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChangeKind {
    Added,
    Modified,
    Deleted,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StatusReport {
    /// index vs HEAD's tree
    pub staged: Vec<(String, ChangeKind)>,
    /// working tree vs index
    pub unstaged: Vec<(String, ChangeKind)>,
    /// present on disk, absent from the index
    pub untracked: Vec<String>,
}

pub fn status(repo: &Repo) -> Result<StatusReport> {
    let index = Index::read(repo)?;
    let head_files = match super::head_tree(repo)? {
        Some(tree) => super::flatten_tree(repo, tree)?,
        None => Default::default(),
    };

    let mut staged = Vec::new();
    for entry in index.entries() {
        match head_files.get(&entry.path) {
            None => staged.push((entry.path.clone(), ChangeKind::Added)),
            Some((_, hash)) if *hash != entry.hash => staged.push((entry.path.clone(), ChangeKind::Modified)),
            Some(_) => {}
        }
    }
    for path in head_files.keys() {
        if index.entry(path).is_none() {
            staged.push((path.clone(), ChangeKind::Deleted));
        }
    }
    staged.sort();

    let mut unstaged = Vec::new();
    for entry in index.entries() {
        let abs = repo.path().join(&entry.path);
        if !abs.exists() && abs.symlink_metadata().is_err() {
            unstaged.push((entry.path.clone(), ChangeKind::Deleted));
        } else if !worktree::path_matches_index(repo, entry)? {
            unstaged.push((entry.path.clone(), ChangeKind::Modified));
        }
    }

    let tracked: std::collections::HashSet<&str> = index.entries().map(|e| e.path.as_str()).collect();
    let untracked = worktree::scan_worktree(repo)?.into_iter().filter(|p| !tracked.contains(p.as_str())).collect();

    Ok(StatusReport { staged, unstaged, untracked })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::{add, commit};
    use tempfile::tempdir;

    fn test_repo() -> (tempfile::TempDir, Repo) {
        let dir = tempdir().unwrap();
        let repo = Repo::init(&dir.path().join("repo")).unwrap();
        (dir, repo)
    }

    #[test]
    fn test_new_file_is_untracked() {
        let (_dir, repo) = test_repo();
        std::fs::write(repo.path().join("a.txt"), "a").unwrap();

        let report = status(&repo).unwrap();
        assert_eq!(report.untracked, vec!["a.txt".to_string()]);
        assert!(report.staged.is_empty());
    }

    #[test]
    fn test_staged_new_file_is_added() {
        let (_dir, repo) = test_repo();
        std::fs::write(repo.path().join("a.txt"), "a").unwrap();
        add(&repo, &["a.txt"]).unwrap();

        let report = status(&repo).unwrap();
        assert_eq!(report.staged, vec![("a.txt".to_string(), ChangeKind::Added)]);
        assert!(report.untracked.is_empty());
    }

    #[test]
    fn test_modified_after_commit() {
        let (_dir, repo) = test_repo();
        std::fs::write(repo.path().join("a.txt"), "a").unwrap();
        add(&repo, &["a.txt"]).unwrap();
        commit::commit(&repo, "first").unwrap();

        std::fs::write(repo.path().join("a.txt"), "changed").unwrap();
        let report = status(&repo).unwrap();

        assert_eq!(report.unstaged, vec![("a.txt".to_string(), ChangeKind::Modified)]);
        assert!(report.staged.is_empty());
    }

    #[test]
    fn test_deleted_file_shows_in_unstaged() {
        let (_dir, repo) = test_repo();
        std::fs::write(repo.path().join("a.txt"), "a").unwrap();
        add(&repo, &["a.txt"]).unwrap();
        commit::commit(&repo, "first").unwrap();

        std::fs::remove_file(repo.path().join("a.txt")).unwrap();
        let report = status(&repo).unwrap();

        assert_eq!(report.unstaged, vec![("a.txt".to_string(), ChangeKind::Deleted)]);
    }

    #[test]
    fn test_clean_tree_has_no_changes() {
        let (_dir, repo) = test_repo();
        std::fs::write(repo.path().join("a.txt"), "a").unwrap();
        add(&repo, &["a.txt"]).unwrap();
        commit::commit(&repo, "first").unwrap();

        let report = status(&repo).unwrap();
        assert!(report.staged.is_empty());
        assert!(report.unstaged.is_empty());
        assert!(report.untracked.is_empty());
    }
}
