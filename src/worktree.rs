//! bridges the object store to the working directory: scanning files into
//! blobs for `add`, and materializing trees back onto disk for `checkout`

use std::fs::{self, File};
use std::io::Write;
use std::os::unix::fs::{MetadataExt, PermissionsExt};
use std::os::unix::fs::symlink;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::{Error, IoResultExt, Result};
use crate::hash::Hash;
use crate::index::{Index, IndexEntry};
use crate::objects::{self, Tree, TreeEntry, TreeMode};
use crate::path::METADATA_DIR;
use crate::repo::Repo;

/// walk the working tree, skipping the metadata directory, returning repo-relative paths
pub fn scan_worktree(repo: &Repo) -> Result<Vec<String>> {
    let mut paths = Vec::new();
    for entry in WalkDir::new(repo.path()).into_iter().filter_entry(|e| e.file_name() != METADATA_DIR) {
        let entry = entry.map_err(|e| Error::Io {
            path: e.path().unwrap_or(repo.path()).to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::Other, e.to_string()),
        })?;
        let file_type = entry.file_type();
        if file_type.is_dir() {
            continue;
        }
        let rel = crate::path::to_repo_relative(repo.path(), entry.path())?;
        paths.push(rel);
    }
    paths.sort();
    Ok(paths)
}

fn tree_mode_for(metadata: &fs::Metadata) -> Result<TreeMode> {
    if metadata.file_type().is_symlink() {
        Ok(TreeMode::Symlink)
    } else if metadata.file_type().is_file() {
        if metadata.permissions().mode() & 0o111 != 0 {
            Ok(TreeMode::Executable)
        } else {
            Ok(TreeMode::Regular)
        }
    } else {
        Err(Error::InvalidObjectHeader("only regular files and symlinks can be staged".to_string()))
    }
}

fn read_worktree_content(abs_path: &Path, metadata: &fs::Metadata) -> Result<Vec<u8>> {
    if metadata.file_type().is_symlink() {
        let target = fs::read_link(abs_path).with_path(abs_path)?;
        Ok(target.to_string_lossy().into_owned().into_bytes())
    } else {
        fs::read(abs_path).with_path(abs_path)
    }
}

/// stage a single repo-relative path: hash its current worktree content as a
/// blob and record/replace its entry in `index`
pub fn stage_path(repo: &Repo, index: &mut Index, rel_path: &str) -> Result<()> {
    let abs_path = repo.path().join(rel_path);
    let metadata = crate::index::stat(&abs_path)?;
    let mode = tree_mode_for(&metadata)?;
    let content = read_worktree_content(&abs_path, &metadata)?;
    let hash = objects::blob::write_blob(repo, &content)?;

    index.add(IndexEntry::from_metadata(rel_path, hash, mode, &metadata));
    Ok(())
}

/// remove a repo-relative path from the index (used by `add` on a deleted file)
pub fn unstage_path(index: &mut Index, rel_path: &str) {
    index.remove(rel_path);
}

/// does the worktree entry at `rel_path` still match what's staged?
pub fn path_matches_index(repo: &Repo, entry: &IndexEntry) -> Result<bool> {
    let abs_path = repo.path().join(&entry.path);
    let metadata = match fs::symlink_metadata(&abs_path) {
        Ok(m) => m,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(Error::Io { path: abs_path, source: e }),
    };

    if metadata.mtime() as u32 == entry.mtime_sec
        && metadata.mtime_nsec() as u32 == entry.mtime_nsec
        && metadata.size() as u32 == entry.size
        && mode_matches(&metadata, entry)
    {
        return Ok(true);
    }

    // stat mismatch doesn't prove a content change; re-hash to be sure
    let content = read_worktree_content(&abs_path, &metadata)?;
    let hash = crate::hash::hash_object("blob", &content);
    Ok(hash == entry.hash)
}

fn mode_matches(metadata: &fs::Metadata, entry: &IndexEntry) -> bool {
    match (tree_mode_for(metadata), entry.tree_mode()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// remove every worktree path the given index has staged (used before rewriting
/// the tree during checkout, so files dropped by the new tree don't linger)
fn clear_tracked_paths(repo: &Repo, index: &Index) -> Result<()> {
    for entry in index.entries() {
        let abs_path = repo.path().join(&entry.path);
        match fs::remove_file(&abs_path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(Error::Io { path: abs_path, source: e }),
        }
    }
    remove_empty_dirs(repo.path(), repo.path())?;
    Ok(())
}

/// best-effort cleanup of directories left empty by `clear_tracked_paths`
fn remove_empty_dirs(root: &Path, dir: &Path) -> Result<()> {
    if dir != root && dir.file_name().map(|n| n == METADATA_DIR).unwrap_or(false) {
        return Ok(());
    }
    let read_dir = match fs::read_dir(dir) {
        Ok(rd) => rd,
        Err(_) => return Ok(()),
    };
    for entry in read_dir {
        let entry = entry.with_path(dir)?;
        if entry.file_type().with_path(dir)?.is_dir() {
            if entry.file_name() == METADATA_DIR && dir == root {
                continue;
            }
            remove_empty_dirs(root, &entry.path())?;
        }
    }
    if dir != root {
        let _ = fs::remove_dir(dir);
    }
    Ok(())
}

/// replace the working tree and index with the contents of `tree_hash`
pub fn checkout_tree(repo: &Repo, tree_hash: &Hash) -> Result<()> {
    let old_index = Index::read(repo)?;
    clear_tracked_paths(repo, &old_index)?;

    let mut new_index = Index::new();
    write_tree_to_disk(repo, tree_hash, repo.path(), "", &mut new_index)?;
    new_index.write(repo)
}

fn write_tree_to_disk(repo: &Repo, tree_hash: &Hash, abs_dir: &Path, rel_prefix: &str, index: &mut Index) -> Result<()> {
    fs::create_dir_all(abs_dir).with_path(abs_dir)?;
    let tree = objects::tree::read_tree(repo, tree_hash)?;

    for entry in tree.entries() {
        let abs_path = abs_dir.join(&entry.name);
        let rel_path = if rel_prefix.is_empty() { entry.name.clone() } else { format!("{rel_prefix}/{}", entry.name) };

        match entry.mode {
            TreeMode::Directory => write_tree_to_disk(repo, &entry.hash, &abs_path, &rel_path, index)?,
            TreeMode::Regular | TreeMode::Executable => {
                let content = objects::blob::read_blob(repo, &entry.hash)?;
                write_file(&abs_path, &content, entry.mode == TreeMode::Executable)?;
                let metadata = crate::index::stat(&abs_path)?;
                index.add(IndexEntry::from_metadata(rel_path, entry.hash, entry.mode, &metadata));
            }
            TreeMode::Symlink => {
                let content = objects::blob::read_blob(repo, &entry.hash)?;
                let target = String::from_utf8(content).map_err(|_| Error::NonUtf8Path(abs_path.clone()))?;
                write_symlink(&abs_path, &target)?;
                let metadata = crate::index::stat(&abs_path)?;
                index.add(IndexEntry::from_metadata(rel_path, entry.hash, entry.mode, &metadata));
            }
        }
    }
    Ok(())
}

fn write_file(path: &Path, content: &[u8], executable: bool) -> Result<()> {
    let mut file = File::create(path).with_path(path)?;
    file.write_all(content).with_path(path)?;
    let mode = if executable { 0o755 } else { 0o644 };
    file.set_permissions(fs::Permissions::from_mode(mode)).with_path(path)?;
    Ok(())
}

fn write_symlink(path: &Path, target: &str) -> Result<()> {
    if path.symlink_metadata().is_ok() {
        fs::remove_file(path).with_path(path)?;
    }
    symlink(target, path).with_path(path)
}

/// build the tree that the index would produce, without touching the worktree
pub fn index_tree(repo: &Repo, index: &Index) -> Result<Hash> {
    index.build_tree(repo)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn test_repo() -> (tempfile::TempDir, Repo) {
        let dir = tempdir().unwrap();
        let repo = Repo::init(&dir.path().join("repo")).unwrap();
        (dir, repo)
    }

    #[test]
    fn test_stage_path_writes_blob_and_entry() {
        let (_dir, repo) = test_repo();
        fs::write(repo.path().join("hello.txt"), "hi\n").unwrap();

        let mut index = Index::new();
        stage_path(&repo, &mut index, "hello.txt").unwrap();

        let entry = index.entry("hello.txt").unwrap();
        assert_eq!(entry.hash.to_hex(), "45b983be36b73c0788dc9cbcb76cbb80fc7bb057");
        assert_eq!(entry.tree_mode().unwrap(), TreeMode::Regular);
    }

    #[test]
    fn test_stage_path_detects_executable_bit() {
        let (_dir, repo) = test_repo();
        let path = repo.path().join("run.sh");
        fs::write(&path, "#!/bin/sh\necho hi\n").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();

        let mut index = Index::new();
        stage_path(&repo, &mut index, "run.sh").unwrap();

        assert_eq!(index.entry("run.sh").unwrap().tree_mode().unwrap(), TreeMode::Executable);
    }

    #[test]
    fn test_scan_worktree_skips_metadata_dir() {
        let (_dir, repo) = test_repo();
        fs::write(repo.path().join("a.txt"), "a").unwrap();
        fs::create_dir_all(repo.path().join("src")).unwrap();
        fs::write(repo.path().join("src/b.txt"), "b").unwrap();

        let paths = scan_worktree(&repo).unwrap();
        assert_eq!(paths, vec!["a.txt".to_string(), "src/b.txt".to_string()]);
    }

    #[test]
    fn test_checkout_tree_materializes_files() {
        let (_dir, repo) = test_repo();
        let blob_hash = objects::blob::write_blob(&repo, b"hi\n").unwrap();
        let entry = TreeEntry::new(TreeMode::Regular, "hello.txt", blob_hash);
        let tree = Tree::new(vec![entry]).unwrap();
        let tree_hash = objects::tree::write_tree(&repo, &tree).unwrap();

        checkout_tree(&repo, &tree_hash).unwrap();

        let content = fs::read_to_string(repo.path().join("hello.txt")).unwrap();
        assert_eq!(content, "hi\n");

        let index = Index::read(&repo).unwrap();
        assert_eq!(index.entry("hello.txt").unwrap().hash, blob_hash);
    }

    #[test]
    fn test_checkout_tree_removes_stale_files() {
        let (_dir, repo) = test_repo();
        let blob_hash = objects::blob::write_blob(&repo, b"hi\n").unwrap();
        let first_tree = Tree::new(vec![TreeEntry::new(TreeMode::Regular, "old.txt", blob_hash)]).unwrap();
        let first_hash = objects::tree::write_tree(&repo, &first_tree).unwrap();
        checkout_tree(&repo, &first_hash).unwrap();
        assert!(repo.path().join("old.txt").is_file());

        let second_tree = Tree::new(vec![TreeEntry::new(TreeMode::Regular, "new.txt", blob_hash)]).unwrap();
        let second_hash = objects::tree::write_tree(&repo, &second_tree).unwrap();
        checkout_tree(&repo, &second_hash).unwrap();

        assert!(!repo.path().join("old.txt").exists());
        assert!(repo.path().join("new.txt").is_file());
    }

    #[test]
    fn test_checkout_tree_nested_directories() {
        let (_dir, repo) = test_repo();
        let blob_hash = objects::blob::write_blob(&repo, b"content").unwrap();
        let inner = Tree::new(vec![TreeEntry::new(TreeMode::Regular, "lib.rs", blob_hash)]).unwrap();
        let inner_hash = objects::tree::write_tree(&repo, &inner).unwrap();
        let outer = Tree::new(vec![TreeEntry::new(TreeMode::Directory, "src", inner_hash)]).unwrap();
        let outer_hash = objects::tree::write_tree(&repo, &outer).unwrap();

        checkout_tree(&repo, &outer_hash).unwrap();

        assert!(repo.path().join("src/lib.rs").is_file());
        let index = Index::read(&repo).unwrap();
        assert_eq!(index.entry("src/lib.rs").unwrap().hash, blob_hash);
    }

    #[test]
    fn test_path_matches_index_detects_content_change() {
        let (_dir, repo) = test_repo();
        fs::write(repo.path().join("a.txt"), "first").unwrap();

        let mut index = Index::new();
        stage_path(&repo, &mut index, "a.txt").unwrap();
        assert!(path_matches_index(&repo, index.entry("a.txt").unwrap()).unwrap());

        fs::write(repo.path().join("a.txt"), "second").unwrap();
        assert!(!path_matches_index(&repo, index.entry("a.txt").unwrap()).unwrap());
    }
}
