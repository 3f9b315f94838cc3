//! revision expressions: `HEAD`, branch/tag names, abbreviated hashes,
//! `^N`/`~N` ancestry walks, `^{type}` peeling, and `rev:path` lookups

use crate::error::{Error, Result};
use crate::hash::Hash;
use crate::objects::{self, ObjectKind};
use crate::refs;
use crate::repo::Repo;

const MAX_TAG_CHAIN: usize = 32;

/// resolve a revision expression to the hash of the object it names
pub fn resolve(repo: &Repo, expr: &str) -> Result<Hash> {
    if let Some((rev_part, path_part)) = expr.split_once(':') {
        let tree_hash = resolve_to_tree(repo, rev_part)?;
        return resolve_path(repo, tree_hash, path_part);
    }
    resolve_rev(repo, expr)
}

/// resolve a revision expression and follow any tag indirection down to a commit
pub fn resolve_commit(repo: &Repo, expr: &str) -> Result<Hash> {
    let hash = resolve(repo, expr)?;
    let (kind, target) = deref_tag_chain(repo, hash)?;
    if kind != ObjectKind::Commit {
        return Err(Error::CannotResolveReference(format!("{expr} does not resolve to a commit")));
    }
    Ok(target)
}

fn resolve_rev(repo: &Repo, expr: &str) -> Result<Hash> {
    if expr.is_empty() {
        return Err(Error::CannotResolveReference(expr.to_string()));
    }

    // 1. full 40-hex hash
    if expr.len() == 40 && expr.bytes().all(|b| b.is_ascii_hexdigit()) {
        let hash = Hash::from_hex(expr)?;
        if objects::exists(repo, &hash) {
            return Ok(hash);
        }
    }

    // 2. abbreviated hash
    if Hash::is_hex_prefix(expr) && expr.len() < 40 {
        if let Ok(hash) = objects::expand(repo, expr) {
            return Ok(hash);
        }
    }

    // 3. literal HEAD
    if expr == "HEAD" {
        return refs::head_commit(repo);
    }

    // 4. peel: base^{type}
    if let Some(pos) = expr.find("^{") {
        let base = &expr[..pos];
        let close = expr[pos..].find('}').map(|i| pos + i).ok_or_else(|| Error::CannotResolveReference(expr.to_string()))?;
        let target_type = &expr[pos + 2..close];
        let base_hash = resolve_rev(repo, base)?;
        return peel(repo, base_hash, target_type);
    }

    // 5. ^N / ~N ancestry walk, possibly chained
    if let Some(pos) = expr.find(['^', '~']) {
        let base = &expr[..pos];
        let ops = &expr[pos..];
        let base_hash = resolve_rev(repo, base)?;
        let (_, mut hash) = deref_tag_chain(repo, base_hash)?;

        let bytes = ops.as_bytes();
        let mut i = 0;
        while i < bytes.len() {
            let op = bytes[i] as char;
            i += 1;
            let start = i;
            while i < bytes.len() && bytes[i].is_ascii_digit() {
                i += 1;
            }
            let n: usize = if start == i { 1 } else { expr_num(&ops[start..i], expr)? };

            let commit = objects::commit::read_commit(repo, &hash)?;
            match op {
                '^' => {
                    if n > 0 {
                        hash = *commit
                            .parents
                            .get(n - 1)
                            .ok_or_else(|| Error::CannotResolveReference(format!("{expr} has no parent {n}")))?;
                    }
                }
                '~' => {
                    for _ in 0..n {
                        let commit = objects::commit::read_commit(repo, &hash)?;
                        hash = *commit
                            .parents
                            .first()
                            .ok_or_else(|| Error::CannotResolveReference(format!("{expr} ran out of ancestors")))?;
                    }
                }
                _ => unreachable!(),
            }
        }
        return Ok(hash);
    }

    // 7. refs/heads, then refs/tags (dereferenced), then the metadata root
    if refs::branch_exists(repo, expr) {
        return refs::read_branch(repo, expr);
    }
    if refs::tag_ref_exists(repo, expr) {
        let hash = refs::read_tag_ref(repo, expr)?;
        let (_, target) = deref_tag_chain(repo, hash)?;
        return Ok(target);
    }
    let meta_file = repo.meta_path().join(expr);
    if meta_file.is_file() {
        if let Ok(content) = std::fs::read_to_string(&meta_file) {
            if let Ok(hash) = Hash::from_hex(content.trim()) {
                return Ok(hash);
            }
        }
    }

    // 8.
    Err(Error::CannotResolveReference(expr.to_string()))
}

fn expr_num(s: &str, expr: &str) -> Result<usize> {
    s.parse().map_err(|_| Error::CannotResolveReference(expr.to_string()))
}

/// follow a chain of tag objects down to the non-tag object they ultimately name
fn deref_tag_chain(repo: &Repo, mut hash: Hash) -> Result<(ObjectKind, Hash)> {
    for _ in 0..MAX_TAG_CHAIN {
        let (kind, _) = objects::read(repo, &hash)?;
        if kind != ObjectKind::Tag {
            return Ok((kind, hash));
        }
        let tag = objects::tag::read_tag(repo, &hash)?;
        hash = tag.object;
    }
    Err(Error::CannotResolveReference(format!("tag chain too deep starting at {hash}")))
}

/// peel `hash` (after following any tag indirection) to the requested object type
fn peel(repo: &Repo, hash: Hash, target_type: &str) -> Result<Hash> {
    let (kind, target) = deref_tag_chain(repo, hash)?;
    match (target_type, kind) {
        ("commit", ObjectKind::Commit) => Ok(target),
        ("tree", ObjectKind::Tree) => Ok(target),
        ("tree", ObjectKind::Commit) => Ok(objects::commit::read_commit(repo, &target)?.tree),
        ("blob", ObjectKind::Blob) => Ok(target),
        (other, _) => Err(Error::CannotResolveReference(format!("cannot peel {hash} to {other}"))),
    }
}

/// resolve `expr` down to the tree it names, following commit → tree as needed
fn resolve_to_tree(repo: &Repo, expr: &str) -> Result<Hash> {
    let hash = resolve(repo, expr)?;
    let (kind, target) = deref_tag_chain(repo, hash)?;
    match kind {
        ObjectKind::Tree => Ok(target),
        ObjectKind::Commit => Ok(objects::commit::read_commit(repo, &target)?.tree),
        _ => Err(Error::CannotResolveReference(format!("{expr} is not a commit or tree"))),
    }
}

/// walk `path` components through nested trees starting at `tree_hash`
fn resolve_path(repo: &Repo, tree_hash: Hash, path: &str) -> Result<Hash> {
    let components: Vec<&str> = path.split('/').filter(|c| !c.is_empty()).collect();
    if components.is_empty() {
        return Ok(tree_hash);
    }

    let mut current = tree_hash;
    for (i, component) in components.iter().enumerate() {
        let tree = objects::tree::read_tree(repo, &current)?;
        let entry = tree.get(component).ok_or_else(|| Error::PathNotFound(path.to_string()))?;

        if i + 1 < components.len() && !entry.mode.is_directory() {
            return Err(Error::PathNotFound(path.to_string()));
        }
        current = entry.hash;
    }
    Ok(current)
}
