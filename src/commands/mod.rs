//! the command layer: one file per verb, each a thin contract over the
//! library modules (object store, index, refs, revision, diff, merge)

pub mod add;
pub mod branch;
pub mod checkout;
pub mod commit;
pub mod diff;
pub mod init;
pub mod log;
pub mod merge;
pub mod plumbing;
pub mod status;
pub mod tag;

use std::collections::BTreeMap;

use crate::error::Result;
use crate::hash::Hash;
use crate::objects::{self, TreeMode};
use crate::repo::Repo;

/// recursively flatten a tree into repo-relative path -> (mode, blob hash)
pub(crate) fn flatten_tree(repo: &Repo, tree_hash: Hash) -> Result<BTreeMap<String, (TreeMode, Hash)>> {
    let mut out = BTreeMap::new();
    flatten_tree_into(repo, tree_hash, "", &mut out)?;
    Ok(out)
}

fn flatten_tree_into(repo: &Repo, tree_hash: Hash, prefix: &str, out: &mut BTreeMap<String, (TreeMode, Hash)>) -> Result<()> {
    let tree = objects::tree::read_tree(repo, &tree_hash)?;
    for entry in tree.entries() {
        let path = if prefix.is_empty() { entry.name.clone() } else { format!("{prefix}/{}", entry.name) };
        if entry.mode.is_directory() {
            flatten_tree_into(repo, entry.hash, &path, out)?;
        } else {
            out.insert(path, (entry.mode, entry.hash));
        }
    }
    Ok(())
}

/// the tree of the commit HEAD currently resolves to, or `None` on the first commit
pub(crate) fn head_tree(repo: &Repo) -> Result<Option<Hash>> {
    match crate::refs::head_commit(repo) {
        Ok(hash) => Ok(Some(objects::commit::read_commit(repo, &hash)?.tree)),
        Err(crate::error::Error::RefNotFound(_)) => Ok(None),
        Err(e) => Err(e),
    }
}
