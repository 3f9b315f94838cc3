//! `commit -m <msg>` - snapshot the index as a new commit

use tracing::info;

use crate::error::{Error, Result};
use crate::hash::Hash;
use crate::index::Index;
use crate::objects::commit::{write_commit, Commit};
use crate::refs;
use crate::repo::{with_lock, Repo};
use crate::time::{Signature, SignatureKind};

/// build a commit from the current index, reject it if empty (unless a merge
/// is being concluded), and advance whatever HEAD points at
pub fn commit(repo: &Repo, message: &str) -> Result<Hash> {
    with_lock(repo, || {
        let index = Index::read(repo)?;
        let tree = index.build_tree(repo)?;

        let head = refs::head_commit(repo).ok();
        let merging = refs::read_merge_head(repo)?;

        if let Some(head_hash) = head {
            let head_commit = crate::objects::commit::read_commit(repo, &head_hash)?;
            if head_commit.tree == tree && merging.is_none() {
                return Err(Error::NothingToCommit);
            }
        }

        let mut parents = Vec::new();
        if let Some(head_hash) = head {
            parents.push(head_hash);
        }
        if let Some(merge_hash) = merging {
            parents.push(merge_hash);
        }

        let author = Signature::from_env(SignatureKind::Author)?;
        let committer = Signature::from_env(SignatureKind::Committer)?;

        let commit = Commit::new(tree, parents, author, committer, message);
        let hash = write_commit(repo, &commit)?;

        refs::advance_head(repo, &hash)?;
        refs::clear_merge_head(repo)?;
        refs::clear_merge_msg(repo)?;

        info!(commit = %hash, "committed");
        Ok(hash)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::add;
    use tempfile::tempdir;

    fn test_repo() -> (tempfile::TempDir, Repo) {
        let dir = tempdir().unwrap();
        let repo = Repo::init(&dir.path().join("repo")).unwrap();
        (dir, repo)
    }

    #[test]
    fn test_first_commit_has_no_parents() {
        let (_dir, repo) = test_repo();
        std::fs::write(repo.path().join("hello.txt"), "hi\n").unwrap();
        add(&repo, &["hello.txt"]).unwrap();

        let hash = commit(&repo, "first").unwrap();
        let c = crate::objects::commit::read_commit(&repo, &hash).unwrap();

        assert!(c.is_root());
        assert_eq!(refs::head_commit(&repo).unwrap(), hash);
    }

    #[test]
    fn test_second_commit_has_one_parent() {
        let (_dir, repo) = test_repo();
        std::fs::write(repo.path().join("a.txt"), "a").unwrap();
        add(&repo, &["a.txt"]).unwrap();
        let first = commit(&repo, "first").unwrap();

        std::fs::write(repo.path().join("b.txt"), "b").unwrap();
        add(&repo, &["b.txt"]).unwrap();
        let second = commit(&repo, "second").unwrap();

        let c = crate::objects::commit::read_commit(&repo, &second).unwrap();
        assert_eq!(c.parents, vec![first]);
    }

    #[test]
    fn test_empty_commit_rejected() {
        let (_dir, repo) = test_repo();
        std::fs::write(repo.path().join("a.txt"), "a").unwrap();
        add(&repo, &["a.txt"]).unwrap();
        commit(&repo, "first").unwrap();

        let result = commit(&repo, "nothing changed");
        assert!(matches!(result, Err(Error::NothingToCommit)));
    }

    #[test]
    fn test_merge_commit_gets_second_parent() {
        let (_dir, repo) = test_repo();
        std::fs::write(repo.path().join("a.txt"), "a").unwrap();
        add(&repo, &["a.txt"]).unwrap();
        let first = commit(&repo, "first").unwrap();

        let other = Hash::from_hex("1111111111111111111111111111111111111111").unwrap();
        refs::write_merge_head(&repo, &other).unwrap();

        std::fs::write(repo.path().join("b.txt"), "b").unwrap();
        add(&repo, &["b.txt"]).unwrap();
        let merge_commit = commit(&repo, "merge").unwrap();

        let c = crate::objects::commit::read_commit(&repo, &merge_commit).unwrap();
        assert_eq!(c.parents, vec![first, other]);
        assert_eq!(refs::read_merge_head(&repo).unwrap(), None);
    }
}
