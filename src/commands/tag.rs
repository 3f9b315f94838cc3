//! `tag` - lightweight and annotated tags

use tracing::info;

use crate::error::{Error, Result};
use crate::hash::Hash;
use crate::objects::{self, ObjectKind, Tag};
use crate::refs;
use crate::repo::{with_lock, Repo};
use crate::revision;
use crate::time::{Signature, SignatureKind};

pub fn list(repo: &Repo) -> Result<Vec<String>> {
    refs::list_tags(repo)
}

/// create a tag at `target` (defaults to HEAD); `message` present means annotated
pub fn create(repo: &Repo, name: &str, target: Option<&str>, message: Option<&str>) -> Result<Hash> {
    with_lock(repo, || {
        if refs::tag_ref_exists(repo, name) {
            return Err(Error::TagExists(name.to_string()));
        }
        let commit_hash = match target {
            Some(expr) => revision::resolve_commit(repo, expr)?,
            None => refs::head_commit(repo)?,
        };

        let ref_target = match message {
            Some(msg) => {
                let tagger = Signature::from_env(SignatureKind::Committer)?;
                let tag = Tag::new(commit_hash, ObjectKind::Commit, name, tagger, msg);
                objects::tag::write_tag(repo, &tag)?
            }
            None => commit_hash,
        };

        refs::write_tag_ref(repo, name, &ref_target)?;
        info!(tag = name, "created");
        Ok(ref_target)
    })
}

pub fn delete(repo: &Repo, name: &str) -> Result<()> {
    with_lock(repo, || {
        refs::delete_tag_ref(repo, name)?;
        info!(tag = name, "deleted");
        Ok(())
    })
}
