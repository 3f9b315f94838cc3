//! `log` - walk commit history from HEAD

use crate::diff::DiffOptions;
use crate::error::Result;
use crate::hash::Hash;
use crate::objects::commit::{read_commit, Commit};
use crate::refs;
use crate::repo::Repo;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogEntry {
    pub hash: Hash,
    pub commit: Commit,
    /// unified diff against the first parent (root commits diff against an empty tree)
    pub diff: Option<String>,
}

/// walk first-parent history from HEAD, most recent first
pub fn log(repo: &Repo, max_count: Option<usize>, with_diff: bool) -> Result<Vec<LogEntry>> {
    let mut entries = Vec::new();
    let mut current = match refs::head_commit(repo) {
        Ok(hash) => Some(hash),
        Err(_) => None,
    };

    while let Some(hash) = current {
        if let Some(max) = max_count {
            if entries.len() >= max {
                break;
            }
        }

        let commit = read_commit(repo, &hash)?;
        let diff = if with_diff {
            let parent_tree = commit.parents.first().map(|p| read_commit(repo, p)).transpose()?.map(|c| c.tree);
            Some(super::diff::diff_trees(repo, parent_tree, Some(commit.tree), &DiffOptions::default())?)
        } else {
            None
        };

        current = commit.parents.first().copied();
        entries.push(LogEntry { hash, commit, diff });
    }

    Ok(entries)
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
    fn test_log_orders_most_recent_first() {
        let (_dir, repo) = test_repo();
        std::fs::write(repo.path().join("a.txt"), "a").unwrap();
        add(&repo, &["a.txt"]).unwrap();
        let first = commit::commit(&repo, "first").unwrap();

        std::fs::write(repo.path().join("b.txt"), "b").unwrap();
        add(&repo, &["b.txt"]).unwrap();
        let second = commit::commit(&repo, "second").unwrap();

        let entries = log(&repo, None, false).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].hash, second);
        assert_eq!(entries[1].hash, first);
    }

    #[test]
    fn test_log_respects_max_count() {
        let (_dir, repo) = test_repo();
        std::fs::write(repo.path().join("a.txt"), "a").unwrap();
        add(&repo, &["a.txt"]).unwrap();
        commit::commit(&repo, "first").unwrap();
        std::fs::write(repo.path().join("b.txt"), "b").unwrap();
        add(&repo, &["b.txt"]).unwrap();
        commit::commit(&repo, "second").unwrap();

        let entries = log(&repo, Some(1), false).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].commit.message, "second");
    }

    #[test]
    fn test_log_with_diff_includes_unified_diff() {
        let (_dir, repo) = test_repo();
        std::fs::write(repo.path().join("a.txt"), "one\n").unwrap();
        add(&repo, &["a.txt"]).unwrap();
        commit::commit(&repo, "first").unwrap();

        let entries = log(&repo, None, true).unwrap();
        assert!(entries[0].diff.as_ref().unwrap().contains("+one"));
    }

    #[test]
    fn test_log_empty_repo_returns_nothing() {
        let (_dir, repo) = test_repo();
        let entries = log(&repo, None, false).unwrap();
        assert!(entries.is_empty());
    }
}
