//! `merge <rev>` - fast-forward or three-way merge into the current branch

use std::collections::BTreeSet;
use std::path::Path;

use tracing::info;

use crate::error::{Error, Result};
use crate::hash::Hash;
use crate::index::{Index, IndexEntry};
use crate::merge as mergelib;
use crate::objects::commit::{read_commit, Commit};
use crate::objects::{self, TreeMode};
use crate::refs;
use crate::repo::{with_lock, Repo};
use crate::revision;
use crate::time::{Signature, SignatureKind};
use crate::worktree;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MergeOutcome {
    /// `target` was already reachable from HEAD; nothing to do
    AlreadyUpToDate,
    /// HEAD advanced directly to `target`, no merge commit created
    FastForward(Hash),
    /// a merge commit was created
    Merged(Hash),
    /// working tree and index updated, but left for the caller to commit
    /// (`--no-commit`); `MERGE_HEAD`/`MERGE_MSG` are set
    Staged,
    /// conflicts remain in these paths; `MERGE_HEAD`/`MERGE_MSG` are set and
    /// markers are in the working tree
    Conflicts(Vec<String>),
}

/// merge `target` into the current branch
pub fn merge(repo: &Repo, target: &str, no_commit: bool) -> Result<MergeOutcome> {
    with_lock(repo, || {
        let their = revision::resolve_commit(repo, target)?;
        let head = refs::head_commit(repo)?;

        if head == their {
            return Ok(MergeOutcome::AlreadyUpToDate);
        }
        if mergelib::is_ancestor(repo, head, their)? {
            let commit = read_commit(repo, &their)?;
            worktree::checkout_tree(repo, &commit.tree)?;
            refs::advance_head(repo, &their)?;
            info!(target, commit = %their, "fast-forward");
            return Ok(MergeOutcome::FastForward(their));
        }
        if mergelib::is_ancestor(repo, their, head)? {
            return Ok(MergeOutcome::AlreadyUpToDate);
        }

        three_way(repo, target, head, their, no_commit)
    })
}

fn three_way(repo: &Repo, target: &str, head: Hash, their: Hash, no_commit: bool) -> Result<MergeOutcome> {
    let base = mergelib::merge_base(repo, head, their)?;
    let base_tree = read_commit(repo, &base)?.tree;
    let ours_tree = read_commit(repo, &head)?.tree;
    let theirs_tree = read_commit(repo, &their)?.tree;

    let base_files = super::flatten_tree(repo, base_tree)?;
    let ours_files = super::flatten_tree(repo, ours_tree)?;
    let theirs_files = super::flatten_tree(repo, theirs_tree)?;

    let mut paths: BTreeSet<&String> = base_files.keys().collect();
    paths.extend(ours_files.keys());
    paths.extend(theirs_files.keys());

    let mut new_index = Index::new();
    let mut conflicted = Vec::new();

    for path in paths {
        let (resolved, is_conflict) = merge_file(repo, base_files.get(path), ours_files.get(path), theirs_files.get(path))?;
        let abs = repo.path().join(path);

        match resolved {
            None => {
                let _ = std::fs::remove_file(&abs);
            }
            Some((mode, hash)) => {
                write_to_disk(&abs, repo, mode, hash)?;
                let metadata = crate::index::stat(&abs)?;
                new_index.add(IndexEntry::from_metadata(path.clone(), hash, mode, &metadata));
            }
        }
        if is_conflict {
            conflicted.push(path.clone());
        }
    }

    new_index.write(repo)?;

    if !conflicted.is_empty() || no_commit {
        refs::write_merge_head(repo, &their)?;
        refs::write_merge_msg(repo, &format!("Merge '{target}'"))?;
        if !conflicted.is_empty() {
            info!(target, conflicts = conflicted.len(), "merge produced conflicts");
            return Ok(MergeOutcome::Conflicts(conflicted));
        }
        return Ok(MergeOutcome::Staged);
    }

    let tree = new_index.build_tree(repo)?;
    let author = Signature::from_env(SignatureKind::Author)?;
    let committer = Signature::from_env(SignatureKind::Committer)?;
    let commit = Commit::new(tree, vec![head, their], author, committer, format!("Merge '{target}'"));
    let hash = crate::objects::commit::write_commit(repo, &commit)?;
    refs::advance_head(repo, &hash)?;

    info!(target, commit = %hash, "merged");
    Ok(MergeOutcome::Merged(hash))
}

/// per-path merge decision, performing an actual three-way text merge when
/// both sides touched the path with differing content
fn merge_file(
    repo: &Repo,
    base: Option<&(TreeMode, Hash)>,
    ours: Option<&(TreeMode, Hash)>,
    theirs: Option<&(TreeMode, Hash)>,
) -> Result<(Option<(TreeMode, Hash)>, bool)> {
    let base_hash = base.map(|(_, h)| *h);
    let ours_hash = ours.map(|(_, h)| *h);
    let theirs_hash = theirs.map(|(_, h)| *h);

    match mergelib::classify_file(base_hash, ours_hash, theirs_hash) {
        mergelib::FileOutcome::Resolved(None) => Ok((None, false)),
        mergelib::FileOutcome::Resolved(Some(h)) => {
            let mode = [ours, theirs].into_iter().flatten().find(|(_, e)| *e == h).map(|(m, _)| *m).unwrap_or(TreeMode::Regular);
            Ok((Some((mode, h)), false))
        }
        mergelib::FileOutcome::Conflict(_) => resolve_conflicted_file(repo, base, ours, theirs),
    }
}

fn resolve_conflicted_file(
    repo: &Repo,
    base: Option<&(TreeMode, Hash)>,
    ours: Option<&(TreeMode, Hash)>,
    theirs: Option<&(TreeMode, Hash)>,
) -> Result<(Option<(TreeMode, Hash)>, bool)> {
    // both sides present: run an actual three-way merge on their text content
    if let (Some((mode, _)), Some(_)) = (ours, theirs) {
        if *mode != TreeMode::Symlink {
            if let (Ok(base_text), Ok(ours_text), Ok(theirs_text)) =
                (read_text_opt(repo, base), read_text_opt(repo, ours), read_text_opt(repo, theirs))
            {
                let result = mergelib::merge_texts(&base_text, &ours_text, &theirs_text, &mergelib::MergeOptions::default());
                let hash = objects::blob::write_blob(repo, result.text.as_bytes())?;
                return Ok((Some((*mode, hash)), !result.conflicts.is_empty()));
            }
        }
    }

    // deleted on one side, modified on the other: keep the modified content
    let kept = ours.or(theirs).copied();
    Ok((kept, true))
}

fn read_text_opt(repo: &Repo, entry: Option<&(TreeMode, Hash)>) -> Result<String> {
    match entry {
        None => Ok(String::new()),
        Some((_, hash)) => {
            let bytes = objects::blob::read_blob(repo, hash)?;
            String::from_utf8(bytes).map_err(|_| Error::NonUtf8Path(std::path::PathBuf::from(hash.to_hex())))
        }
    }
}

fn write_to_disk(abs: &Path, repo: &Repo, mode: TreeMode, hash: Hash) -> Result<()> {
    if let Some(parent) = abs.parent() {
        std::fs::create_dir_all(parent).map_err(|source| Error::Io { path: parent.to_path_buf(), source })?;
    }
    let content = objects::blob::read_blob(repo, &hash)?;

    if mode == TreeMode::Symlink {
        let target = String::from_utf8(content).map_err(|_| Error::NonUtf8Path(abs.to_path_buf()))?;
        if abs.symlink_metadata().is_ok() {
            std::fs::remove_file(abs).map_err(|source| Error::Io { path: abs.to_path_buf(), source })?;
        }
        std::os::unix::fs::symlink(target, abs).map_err(|source| Error::Io { path: abs.to_path_buf(), source })
    } else {
        std::fs::write(abs, &content).map_err(|source| Error::Io { path: abs.to_path_buf(), source })?;
        let perm = if mode == TreeMode::Executable { 0o755 } else { 0o644 };
        std::fs::set_permissions(abs, std::os::unix::fs::PermissionsExt::from_mode(perm)).map_err(|source| Error::Io { path: abs.to_path_buf(), source })
    }
}

/// abort an in-progress merge, restoring HEAD's tree and clearing merge state
pub fn abort(repo: &Repo) -> Result<()> {
    with_lock(repo, || {
        if refs::read_merge_head(repo)?.is_none() {
            return Err(Error::NoMergeInProgress);
        }
        let head = refs::head_commit(repo)?;
        let commit = read_commit(repo, &head)?;
        worktree::checkout_tree(repo, &commit.tree)?;
        refs::clear_merge_head(repo)?;
        refs::clear_merge_msg(repo)?;
        info!("merge aborted");
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::{add, branch, checkout, commit};
    use tempfile::tempdir;

    fn test_repo() -> (tempfile::TempDir, Repo) {
        let dir = tempdir().unwrap();
        let repo = Repo::init(&dir.path().join("repo")).unwrap();
        (dir, repo)
    }

    #[test]
    fn test_fast_forward_merge() {
        let (_dir, repo) = test_repo();
        std::fs::write(repo.path().join("a.txt"), "one\n").unwrap();
        add(&repo, &["a.txt"]).unwrap();
        commit::commit(&repo, "first").unwrap();
        branch::create(&repo, "topic", None).unwrap();
        checkout::checkout(&repo, "topic").unwrap();

        std::fs::write(repo.path().join("b.txt"), "two\n").unwrap();
        add(&repo, &["b.txt"]).unwrap();
        let topic_tip = commit::commit(&repo, "second").unwrap();
        checkout::checkout(&repo, "main").unwrap();

        let outcome = merge(&repo, "topic", false).unwrap();
        assert_eq!(outcome, MergeOutcome::FastForward(topic_tip));
        assert!(repo.path().join("b.txt").exists());
    }

    #[test]
    fn test_already_up_to_date() {
        let (_dir, repo) = test_repo();
        std::fs::write(repo.path().join("a.txt"), "one\n").unwrap();
        add(&repo, &["a.txt"]).unwrap();
        commit::commit(&repo, "first").unwrap();
        branch::create(&repo, "topic", None).unwrap();

        let outcome = merge(&repo, "topic", false).unwrap();
        assert_eq!(outcome, MergeOutcome::AlreadyUpToDate);
    }

    #[test]
    fn test_clean_three_way_merge_creates_merge_commit() {
        let (_dir, repo) = test_repo();
        std::fs::write(repo.path().join("a.txt"), "a\nb\nc\n").unwrap();
        add(&repo, &["a.txt"]).unwrap();
        commit::commit(&repo, "base").unwrap();
        branch::create(&repo, "topic", None).unwrap();

        std::fs::write(repo.path().join("x.txt"), "ours\n").unwrap();
        add(&repo, &["x.txt"]).unwrap();
        commit::commit(&repo, "ours-change").unwrap();

        checkout::checkout(&repo, "topic").unwrap();
        std::fs::write(repo.path().join("y.txt"), "theirs\n").unwrap();
        add(&repo, &["y.txt"]).unwrap();
        commit::commit(&repo, "theirs-change").unwrap();

        checkout::checkout(&repo, "main").unwrap();
        let outcome = merge(&repo, "topic", false).unwrap();

        assert!(matches!(outcome, MergeOutcome::Merged(_)));
        assert!(repo.path().join("x.txt").exists());
        assert!(repo.path().join("y.txt").exists());
        assert_eq!(refs::read_merge_head(&repo).unwrap(), None);
    }

    #[test]
    fn test_conflicting_merge_leaves_markers_and_merge_head() {
        let (_dir, repo) = test_repo();
        std::fs::write(repo.path().join("a.txt"), "base\n").unwrap();
        add(&repo, &["a.txt"]).unwrap();
        commit::commit(&repo, "base").unwrap();
        branch::create(&repo, "topic", None).unwrap();

        std::fs::write(repo.path().join("a.txt"), "ours\n").unwrap();
        add(&repo, &["a.txt"]).unwrap();
        commit::commit(&repo, "ours-change").unwrap();

        checkout::checkout(&repo, "topic").unwrap();
        std::fs::write(repo.path().join("a.txt"), "theirs\n").unwrap();
        add(&repo, &["a.txt"]).unwrap();
        commit::commit(&repo, "theirs-change").unwrap();

        checkout::checkout(&repo, "main").unwrap();
        let outcome = merge(&repo, "topic", false).unwrap();

        match outcome {
            MergeOutcome::Conflicts(paths) => assert_eq!(paths, vec!["a.txt".to_string()]),
            other => panic!("expected conflicts, got {other:?}"),
        }
        let content = std::fs::read_to_string(repo.path().join("a.txt")).unwrap();
        assert!(mergelib::has_conflicts(&content));
        assert!(refs::read_merge_head(&repo).unwrap().is_some());
    }

    #[test]
    fn test_abort_restores_head_tree() {
        let (_dir, repo) = test_repo();
        std::fs::write(repo.path().join("a.txt"), "base\n").unwrap();
        add(&repo, &["a.txt"]).unwrap();
        commit::commit(&repo, "base").unwrap();
        branch::create(&repo, "topic", None).unwrap();

        std::fs::write(repo.path().join("a.txt"), "ours\n").unwrap();
        add(&repo, &["a.txt"]).unwrap();
        commit::commit(&repo, "ours-change").unwrap();

        checkout::checkout(&repo, "topic").unwrap();
        std::fs::write(repo.path().join("a.txt"), "theirs\n").unwrap();
        add(&repo, &["a.txt"]).unwrap();
        commit::commit(&repo, "theirs-change").unwrap();

        checkout::checkout(&repo, "main").unwrap();
        merge(&repo, "topic", false).unwrap();

        abort(&repo).unwrap();
        assert_eq!(refs::read_merge_head(&repo).unwrap(), None);
        assert_eq!(std::fs::read_to_string(repo.path().join("a.txt")).unwrap(), "ours\n");
    }
}
