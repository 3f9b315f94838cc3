//! low-level introspection verbs: `show`, `cat-file`, `ls-tree`, `ls-files`,
//! `rev-parse`, `hash-object`, `update-ref`, `symbolic-ref`

use crate::error::Result;
use crate::hash::Hash;
use crate::index::Index;
use crate::objects::{self, ObjectKind, TreeMode};
use crate::refs::{self, Head};
use crate::repo::Repo;
use crate::revision;

/// `cat-file`: the raw decompressed body of an object plus its kind
pub fn cat_file(repo: &Repo, expr: &str) -> Result<(ObjectKind, Vec<u8>)> {
    let hash = revision::resolve(repo, expr)?;
    objects::read(repo, &hash)
}

/// `show`: the commit a revision names, plus its tree's unified diff against its first parent
pub fn show(repo: &Repo, expr: &str) -> Result<super::log::LogEntry> {
    let hash = revision::resolve_commit(repo, expr)?;
    let commit = objects::commit::read_commit(repo, &hash)?;
    let parent_tree = commit.parents.first().map(|p| objects::commit::read_commit(repo, p)).transpose()?.map(|c| c.tree);
    let diff = super::diff::diff_trees(repo, parent_tree, Some(commit.tree), &crate::diff::DiffOptions::default())?;
    Ok(super::log::LogEntry { hash, commit, diff: Some(diff) })
}

/// one row of `ls-tree` output
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TreeRow {
    pub mode: TreeMode,
    pub kind: ObjectKind,
    pub hash: Hash,
    pub name: String,
}

/// `ls-tree`: the direct entries of the tree a revision resolves to (non-recursive)
pub fn ls_tree(repo: &Repo, expr: &str) -> Result<Vec<TreeRow>> {
    let hash = revision::resolve(repo, expr)?;
    let (kind, _) = objects::read(repo, &hash)?;
    let tree_hash = match kind {
        ObjectKind::Tree => hash,
        ObjectKind::Commit => objects::commit::read_commit(repo, &hash)?.tree,
        other => return Err(crate::error::Error::InvalidObjectType(other.to_string())),
    };
    let tree = objects::tree::read_tree(repo, &tree_hash)?;
    Ok(tree
        .entries()
        .iter()
        .map(|e| TreeRow {
            mode: e.mode,
            kind: if e.mode.is_directory() { ObjectKind::Tree } else { ObjectKind::Blob },
            hash: e.hash,
            name: e.name.clone(),
        })
        .collect())
}

/// `ls-files`: index paths, or (with `staged = false`) the full working-tree listing
pub fn ls_files(repo: &Repo, staged_only: bool) -> Result<Vec<String>> {
    if staged_only {
        let index = Index::read(repo)?;
        Ok(index.entries().map(|e| e.path.clone()).collect())
    } else {
        crate::worktree::scan_worktree(repo)
    }
}

/// `rev-parse`: resolve a revision expression to a hash
pub fn rev_parse(repo: &Repo, expr: &str) -> Result<Hash> {
    revision::resolve(repo, expr)
}

/// `hash-object`: hash (and optionally write) a blob from raw content
pub fn hash_object(repo: &Repo, content: &[u8], write: bool) -> Result<Hash> {
    if write {
        objects::blob::write_blob(repo, content)
    } else {
        Ok(crate::hash::hash_object(ObjectKind::Blob.as_str(), content))
    }
}

/// `update-ref`: point a full ref path (e.g. `refs/heads/main`) at a commit
pub fn update_ref(repo: &Repo, ref_path: &str, target: &str) -> Result<Hash> {
    let hash = revision::resolve_commit(repo, target)?;
    if let Some(name) = ref_path.strip_prefix("refs/heads/") {
        refs::write_branch(repo, name, &hash)?;
    } else if let Some(name) = ref_path.strip_prefix("refs/tags/") {
        refs::write_tag_ref(repo, name, &hash)?;
    } else {
        refs::validate_ref_name(ref_path)?;
        return Err(crate::error::Error::InvalidRef(ref_path.to_string()));
    }
    Ok(hash)
}

/// `symbolic-ref`: read or rewrite what HEAD points at
pub fn symbolic_ref(repo: &Repo, new_target: Option<&str>) -> Result<String> {
    if let Some(target) = new_target {
        refs::write_head_symbolic(repo, target)?;
        return Ok(target.to_string());
    }
    match refs::read_head(repo)? {
        Head::Symbolic(target) => Ok(target),
        Head::Detached(hash) => Ok(hash.to_hex()),
    }
}
