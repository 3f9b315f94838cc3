//! `diff` - unified diff between working tree/index/arbitrary revisions

use crate::diff::{self as diffmod, DiffOptions};
use crate::error::Result;
use crate::hash::Hash;
use crate::index::Index;
use crate::objects::{self, TreeMode};
use crate::repo::Repo;
use crate::worktree;

/// per-file insertion/deletion counts, the `--stat` summary
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileStat {
    pub path: String,
    pub insertions: usize,
    pub deletions: usize,
}

/// the unified diff text for every path that changed between two trees
/// (`old`/`new` each `None` meaning "no tree", i.e. an empty working state)
pub fn diff_trees(repo: &Repo, old: Option<Hash>, new: Option<Hash>, options: &DiffOptions) -> Result<String> {
    let old_files = match old {
        Some(h) => super::flatten_tree(repo, h)?,
        None => Default::default(),
    };
    let new_files = match new {
        Some(h) => super::flatten_tree(repo, h)?,
        None => Default::default(),
    };

    let mut paths: std::collections::BTreeSet<&String> = old_files.keys().collect();
    paths.extend(new_files.keys());

    let mut out = String::new();
    for path in paths {
        let old_entry = old_files.get(path);
        let new_entry = new_files.get(path);
        if old_entry.map(|(_, h)| h) == new_entry.map(|(_, h)| h) {
            continue;
        }

        let old_text = read_text(repo, old_entry)?;
        let new_text = read_text(repo, new_entry)?;
        out.push_str(&diffmod::unified_diff(&format!("a/{path}"), &format!("b/{path}"), &old_text, &new_text, options));
    }
    Ok(out)
}

/// diff the working tree against the index (unstaged changes)
pub fn diff_worktree_vs_index(repo: &Repo, options: &DiffOptions) -> Result<String> {
    let index = Index::read(repo)?;
    let mut out = String::new();

    for entry in index.entries() {
        if worktree::path_matches_index(repo, entry)? {
            continue;
        }
        let old_text = String::from_utf8_lossy(&objects::blob::read_blob(repo, &entry.hash)?).into_owned();
        let abs = repo.path().join(&entry.path);
        let new_text = std::fs::read_to_string(&abs).unwrap_or_default();
        out.push_str(&diffmod::unified_diff(&format!("a/{}", entry.path), &format!("b/{}", entry.path), &old_text, &new_text, options));
    }
    Ok(out)
}

/// diff the index against HEAD's tree (staged changes)
pub fn diff_index_vs_head(repo: &Repo, options: &DiffOptions) -> Result<String> {
    let index = Index::read(repo)?;
    let index_tree = index.build_tree(repo)?;
    diff_trees(repo, super::head_tree(repo)?, Some(index_tree), options)
}

fn read_text(repo: &Repo, entry: Option<&(TreeMode, Hash)>) -> Result<String> {
    match entry {
        None => Ok(String::new()),
        Some((_, hash)) => Ok(String::from_utf8_lossy(&objects::blob::read_blob(repo, hash)?).into_owned()),
    }
}

/// `--stat`: per-file insertion/deletion counts derived from hunk line counts
pub fn stat_trees(repo: &Repo, old: Option<Hash>, new: Option<Hash>, options: &DiffOptions) -> Result<Vec<FileStat>> {
    let old_files = match old {
        Some(h) => super::flatten_tree(repo, h)?,
        None => Default::default(),
    };
    let new_files = match new {
        Some(h) => super::flatten_tree(repo, h)?,
        None => Default::default(),
    };

    let mut paths: std::collections::BTreeSet<&String> = old_files.keys().collect();
    paths.extend(new_files.keys());

    let mut stats = Vec::new();
    for path in paths {
        let old_entry = old_files.get(path);
        let new_entry = new_files.get(path);
        if old_entry.map(|(_, h)| h) == new_entry.map(|(_, h)| h) {
            continue;
        }

        let old_text = read_text(repo, old_entry)?;
        let new_text = read_text(repo, new_entry)?;
        let ops = diffmod::diff_lines(&old_text, &new_text, options);

        let insertions = ops.iter().filter(|op| matches!(op, diffmod::DiffOp::Insert(_))).count();
        let deletions = ops.iter().filter(|op| matches!(op, diffmod::DiffOp::Delete(_))).count();
        stats.push(FileStat { path: path.clone(), insertions, deletions });
    }
    Ok(stats)
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
    fn test_diff_worktree_vs_index_detects_change() {
        let (_dir, repo) = test_repo();
        std::fs::write(repo.path().join("a.txt"), "one\n").unwrap();
        add(&repo, &["a.txt"]).unwrap();

        std::fs::write(repo.path().join("a.txt"), "two\n").unwrap();
        let rendered = diff_worktree_vs_index(&repo, &DiffOptions::default()).unwrap();

        assert!(rendered.contains("-one"));
        assert!(rendered.contains("+two"));
    }

    #[test]
    fn test_diff_index_vs_head_detects_staged_change() {
        let (_dir, repo) = test_repo();
        std::fs::write(repo.path().join("a.txt"), "one\n").unwrap();
        add(&repo, &["a.txt"]).unwrap();
        commit::commit(&repo, "first").unwrap();

        std::fs::write(repo.path().join("a.txt"), "two\n").unwrap();
        add(&repo, &["a.txt"]).unwrap();

        let rendered = diff_index_vs_head(&repo, &DiffOptions::default()).unwrap();
        assert!(rendered.contains("-one"));
        assert!(rendered.contains("+two"));
    }

    #[test]
    fn test_stat_trees_counts_lines() {
        let (_dir, repo) = test_repo();
        std::fs::write(repo.path().join("a.txt"), "one\ntwo\n").unwrap();
        add(&repo, &["a.txt"]).unwrap();
        let first = commit::commit(&repo, "first").unwrap();
        let first_tree = objects::commit::read_commit(&repo, &first).unwrap().tree;

        std::fs::write(repo.path().join("a.txt"), "one\nTWO\nthree\n").unwrap();
        add(&repo, &["a.txt"]).unwrap();
        let second = commit::commit(&repo, "second").unwrap();
        let second_tree = objects::commit::read_commit(&repo, &second).unwrap().tree;

        let stats = stat_trees(&repo, Some(first_tree), Some(second_tree), &DiffOptions::default()).unwrap();
        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].path, "a.txt");
        assert_eq!(stats[0].insertions, 2);
        assert_eq!(stats[0].deletions, 1);
    }
}
