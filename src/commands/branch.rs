//! `branch` - list, create, delete, rename branches

use tracing::info;

use crate::error::{Error, Result};
use crate::merge;
use crate::refs;
use crate::repo::{with_lock, Repo};
use crate::revision;

/// a branch and whether HEAD currently points at it
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BranchInfo {
    pub name: String,
    pub is_current: bool,
}

pub fn list(repo: &Repo) -> Result<Vec<BranchInfo>> {
    let current = refs::current_branch(repo)?;
    refs::list_branches(repo)?
        .into_iter()
        .map(|name| {
            let is_current = current.as_deref() == Some(name.as_str());
            Ok(BranchInfo { name, is_current })
        })
        .collect()
}

/// create a new branch pointing at `start_point` (defaults to HEAD's commit)
pub fn create(repo: &Repo, name: &str, start_point: Option<&str>) -> Result<()> {
    with_lock(repo, || {
        if refs::branch_exists(repo, name) {
            return Err(Error::BranchExists(name.to_string()));
        }
        let target = match start_point {
            Some(expr) => revision::resolve_commit(repo, expr)?,
            None => refs::head_commit(repo)?,
        };
        refs::write_branch(repo, name, &target)?;
        info!(branch = name, "created");
        Ok(())
    })
}

/// delete a branch; refuses when it isn't merged into HEAD unless `force`
pub fn delete(repo: &Repo, name: &str, force: bool) -> Result<()> {
    with_lock(repo, || {
        if refs::current_branch(repo)?.as_deref() == Some(name) {
            return Err(Error::CannotDeleteCurrentBranch(name.to_string()));
        }
        let branch_commit = refs::read_branch(repo, name)?;

        if !force {
            let head = refs::head_commit(repo)?;
            if !merge::is_ancestor(repo, branch_commit, head)? {
                return Err(Error::BranchNotMerged(name.to_string()));
            }
        }

        refs::delete_branch(repo, name)?;
        info!(branch = name, "deleted");
        Ok(())
    })
}

/// rename a branch, refusing if the destination already exists
pub fn rename(repo: &Repo, old_name: &str, new_name: &str) -> Result<()> {
    with_lock(repo, || {
        if refs::branch_exists(repo, new_name) {
            return Err(Error::BranchExists(new_name.to_string()));
        }
        let hash = refs::read_branch(repo, old_name)?;
        refs::write_branch(repo, new_name, &hash)?;
        refs::delete_branch(repo, old_name)?;

        if refs::current_branch(repo)?.as_deref() == Some(old_name) {
            refs::write_head_symbolic(repo, &format!("refs/heads/{new_name}"))?;
        }
        info!(from = old_name, to = new_name, "renamed");
        Ok(())
    })
}
