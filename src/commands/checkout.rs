//! `checkout <rev>` - update working tree, index, and HEAD to a target commit

use tracing::info;

use crate::error::{Error, Result};
use crate::objects::commit::read_commit;
use crate::refs;
use crate::repo::{with_lock, Repo};
use crate::revision;
use crate::worktree;

/// move HEAD (and the working tree) to `target`, a branch name or any
/// revision expression; refuses when doing so would discard uncommitted changes
pub fn checkout(repo: &Repo, target: &str) -> Result<()> {
    with_lock(repo, || {
        let commit_hash = revision::resolve_commit(repo, target)?;

        let report = super::status::status(repo)?;
        if !report.staged.is_empty() || !report.unstaged.is_empty() {
            return Err(Error::WouldOverwriteChanges);
        }

        let commit = read_commit(repo, &commit_hash)?;
        worktree::checkout_tree(repo, &commit.tree)?;

        if refs::branch_exists(repo, target) {
            refs::write_head_symbolic(repo, &format!("refs/heads/{target}"))?;
        } else {
            refs::write_head_detached(repo, &commit_hash)?;
        }

        info!(target, commit = %commit_hash, "checked out");
        Ok(())
    })
}
