//! HEAD, branches, tags: symbolic and direct refs, stored as flat hash files

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::{Error, IoResultExt, Result};
use crate::hash::Hash;
use crate::repo::Repo;

const HEADS_PREFIX: &str = "refs/heads/";
const TAGS_PREFIX: &str = "refs/tags/";

/// where HEAD currently points
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Head {
    /// points at a branch or other ref, e.g. `refs/heads/main`
    Symbolic(String),
    /// points directly at a commit, bypassing any branch
    Detached(Hash),
}

fn atomic_write(repo: &Repo, path: &Path, content: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_path(parent)?;
    }

    let tmp_path = repo.new_tmp_file();
    {
        let mut tmp_file = File::create(&tmp_path).with_path(&tmp_path)?;
        tmp_file.write_all(content).with_path(&tmp_path)?;
        tmp_file.sync_all().with_path(&tmp_path)?;
    }
    fs::rename(&tmp_path, path).with_path(path)?;

    if let Some(parent) = path.parent() {
        let dir = File::open(parent).with_path(parent)?;
        dir.sync_all().with_path(parent)?;
    }
    Ok(())
}

fn write_ref_file(repo: &Repo, relative: &str, hash: &Hash) -> Result<()> {
    let path = repo.meta_path().join(relative);
    atomic_write(repo, &path, format!("{}\n", hash.to_hex()).as_bytes())
}

fn read_ref_file(repo: &Repo, relative: &str) -> Result<Hash> {
    let path = repo.meta_path().join(relative);
    let content = fs::read_to_string(&path).map_err(|source| {
        if source.kind() == std::io::ErrorKind::NotFound {
            Error::RefNotFound(relative.to_string())
        } else {
            Error::Io { path: path.clone(), source }
        }
    })?;
    Hash::from_hex(content.trim())
}

fn delete_ref_file(repo: &Repo, relative: &str) -> Result<()> {
    let path = repo.meta_path().join(relative);
    fs::remove_file(&path).map_err(|source| {
        if source.kind() == std::io::ErrorKind::NotFound {
            Error::RefNotFound(relative.to_string())
        } else {
            Error::Io { path, source }
        }
    })
}

fn ref_file_exists(repo: &Repo, relative: &str) -> bool {
    repo.meta_path().join(relative).is_file()
}

/// validate a branch/tag name component (not the `refs/heads/` prefix)
pub fn validate_ref_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::InvalidRef("empty ref name".to_string()));
    }
    if name.starts_with('/') || name.ends_with('/') {
        return Err(Error::InvalidRef(format!("ref name cannot start or end with '/': {name}")));
    }
    if name.contains("//") {
        return Err(Error::InvalidRef(format!("ref name cannot contain '//': {name}")));
    }
    if name.contains('\0') || name.contains(' ') {
        return Err(Error::InvalidRef(format!("ref name contains an invalid character: {name}")));
    }
    for component in name.split('/') {
        if component == "." || component == ".." || component.is_empty() {
            return Err(Error::InvalidRef(format!("ref name cannot contain '.' or '..': {name}")));
        }
    }
    Ok(())
}

// --- branches ---

pub fn write_branch(repo: &Repo, name: &str, hash: &Hash) -> Result<()> {
    validate_ref_name(name)?;
    write_ref_file(repo, &format!("{HEADS_PREFIX}{name}"), hash)
}

pub fn read_branch(repo: &Repo, name: &str) -> Result<Hash> {
    read_ref_file(repo, &format!("{HEADS_PREFIX}{name}"))
}

pub fn delete_branch(repo: &Repo, name: &str) -> Result<()> {
    delete_ref_file(repo, &format!("{HEADS_PREFIX}{name}"))
}

pub fn branch_exists(repo: &Repo, name: &str) -> bool {
    ref_file_exists(repo, &format!("{HEADS_PREFIX}{name}"))
}

pub fn list_branches(repo: &Repo) -> Result<Vec<String>> {
    list_under(&repo.refs_heads_path())
}

// --- tags ---

pub fn write_tag_ref(repo: &Repo, name: &str, hash: &Hash) -> Result<()> {
    validate_ref_name(name)?;
    write_ref_file(repo, &format!("{TAGS_PREFIX}{name}"), hash)
}

pub fn read_tag_ref(repo: &Repo, name: &str) -> Result<Hash> {
    read_ref_file(repo, &format!("{TAGS_PREFIX}{name}"))
}

pub fn delete_tag_ref(repo: &Repo, name: &str) -> Result<()> {
    delete_ref_file(repo, &format!("{TAGS_PREFIX}{name}"))
}

pub fn tag_ref_exists(repo: &Repo, name: &str) -> bool {
    ref_file_exists(repo, &format!("{TAGS_PREFIX}{name}"))
}

pub fn list_tags(repo: &Repo) -> Result<Vec<String>> {
    list_under(&repo.refs_tags_path())
}

fn list_under(dir: &Path) -> Result<Vec<String>> {
    let mut names = Vec::new();
    if dir.is_dir() {
        collect(dir, dir, &mut names)?;
    }
    names.sort();
    Ok(names)
}

fn collect(base: &Path, dir: &Path, out: &mut Vec<String>) -> Result<()> {
    for entry in fs::read_dir(dir).with_path(dir)? {
        let entry = entry.with_path(dir)?;
        let path = entry.path();
        if path.is_dir() {
            collect(base, &path, out)?;
        } else if let Ok(rel) = path.strip_prefix(base) {
            out.push(rel.to_string_lossy().replace(std::path::MAIN_SEPARATOR, "/"));
        }
    }
    Ok(())
}

// --- HEAD ---

pub fn read_head(repo: &Repo) -> Result<Head> {
    let path = repo.head_path();
    let content = fs::read_to_string(&path).with_path(&path)?;
    let content = content.trim();

    if let Some(target) = content.strip_prefix("ref: ") {
        Ok(Head::Symbolic(target.trim().to_string()))
    } else {
        Ok(Head::Detached(Hash::from_hex(content)?))
    }
}

pub fn write_head_symbolic(repo: &Repo, ref_path: &str) -> Result<()> {
    atomic_write(repo, &repo.head_path(), format!("ref: {ref_path}\n").as_bytes())
}

pub fn write_head_detached(repo: &Repo, hash: &Hash) -> Result<()> {
    atomic_write(repo, &repo.head_path(), format!("{}\n", hash.to_hex()).as_bytes())
}

/// the commit HEAD currently resolves to, through one level of symbolic indirection
pub fn head_commit(repo: &Repo) -> Result<Hash> {
    match read_head(repo)? {
        Head::Detached(hash) => Ok(hash),
        Head::Symbolic(target) => read_ref_file(repo, &target),
    }
}

/// the branch name HEAD points to, or `None` when detached
pub fn current_branch(repo: &Repo) -> Result<Option<String>> {
    match read_head(repo)? {
        Head::Symbolic(target) => Ok(target.strip_prefix(HEADS_PREFIX).map(str::to_string)),
        Head::Detached(_) => Ok(None),
    }
}

/// advance whatever HEAD points at (the current branch, or HEAD itself if detached)
pub fn advance_head(repo: &Repo, new_commit: &Hash) -> Result<()> {
    match read_head(repo)? {
        Head::Symbolic(target) => write_ref_file(repo, &target, new_commit),
        Head::Detached(_) => write_head_detached(repo, new_commit),
    }
}

// --- merge state ---

pub fn read_merge_head(repo: &Repo) -> Result<Option<Hash>> {
    match fs::read_to_string(repo.merge_head_path()) {
        Ok(content) => Ok(Some(Hash::from_hex(content.trim())?)),
        Err(source) if source.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(source) => Err(Error::Io { path: repo.merge_head_path(), source }),
    }
}

pub fn write_merge_head(repo: &Repo, hash: &Hash) -> Result<()> {
    atomic_write(repo, &repo.merge_head_path(), format!("{}\n", hash.to_hex()).as_bytes())
}

pub fn clear_merge_head(repo: &Repo) -> Result<()> {
    match fs::remove_file(repo.merge_head_path()) {
        Ok(()) => Ok(()),
        Err(source) if source.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(Error::Io { path: repo.merge_head_path(), source }),
    }
}

pub fn read_merge_msg(repo: &Repo) -> Result<Option<String>> {
    match fs::read_to_string(repo.merge_msg_path()) {
        Ok(content) => Ok(Some(content)),
        Err(source) if source.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(source) => Err(Error::Io { path: repo.merge_msg_path(), source }),
    }
}

pub fn write_merge_msg(repo: &Repo, message: &str) -> Result<()> {
    atomic_write(repo, &repo.merge_msg_path(), message.as_bytes())
}

pub fn clear_merge_msg(repo: &Repo) -> Result<()> {
    match fs::remove_file(repo.merge_msg_path()) {
        Ok(()) => Ok(()),
        Err(source) if source.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(Error::Io { path: repo.merge_msg_path(), source }),
    }
}
