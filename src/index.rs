//! the binary staging index: parse, serialize, add/remove/query entries, build trees

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::Write;
use std::os::unix::fs::MetadataExt;
use std::path::Path;

use crate::error::{Error, IoResultExt, Result};
use crate::hash::{hash_bytes, Hash};
use crate::objects::{Tree, TreeEntry, TreeMode};
use crate::repo::Repo;

const SIGNATURE: &[u8; 4] = b"DIRC";
const VERSION: u32 = 2;

/// a single staged path: blob hash plus enough stat data to detect worktree changes cheaply
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IndexEntry {
    pub ctime_sec: u32,
    pub ctime_nsec: u32,
    pub mtime_sec: u32,
    pub mtime_nsec: u32,
    pub dev: u32,
    pub ino: u32,
    pub mode: u32,
    pub uid: u32,
    pub gid: u32,
    pub size: u32,
    pub hash: Hash,
    pub path: String,
}

impl IndexEntry {
    /// stat metadata for a freshly-written entry, normalized to one of the three tree modes
    pub fn from_metadata(path: impl Into<String>, hash: Hash, mode: TreeMode, metadata: &fs::Metadata) -> Self {
        Self {
            ctime_sec: metadata.ctime() as u32,
            ctime_nsec: metadata.ctime_nsec() as u32,
            mtime_sec: metadata.mtime() as u32,
            mtime_nsec: metadata.mtime_nsec() as u32,
            dev: metadata.dev() as u32,
            ino: metadata.ino() as u32,
            mode: mode_to_bits(mode),
            uid: metadata.uid(),
            gid: metadata.gid(),
            size: metadata.size() as u32,
            hash,
            path: path.into(),
        }
    }

    pub fn tree_mode(&self) -> Result<TreeMode> {
        bits_to_mode(self.mode)
    }
}

fn mode_to_bits(mode: TreeMode) -> u32 {
    match mode {
        TreeMode::Regular => 0o100644,
        TreeMode::Executable => 0o100755,
        TreeMode::Symlink => 0o120000,
        TreeMode::Directory => 0o040000,
    }
}

fn bits_to_mode(bits: u32) -> Result<TreeMode> {
    match bits {
        0o100644 => Ok(TreeMode::Regular),
        0o100755 => Ok(TreeMode::Executable),
        0o120000 => Ok(TreeMode::Symlink),
        other => Err(Error::CorruptIndex(format!("unrecognized index entry mode {other:o}"))),
    }
}

/// the staging area: a flat, sorted map of repo-relative paths to entries
#[derive(Clone, Debug, Default)]
pub struct Index {
    entries: BTreeMap<String, IndexEntry>,
}

impl Index {
    pub fn new() -> Self {
        Self { entries: BTreeMap::new() }
    }

    pub fn entries(&self) -> impl Iterator<Item = &IndexEntry> {
        self.entries.values()
    }

    pub fn entry(&self, path: &str) -> Option<&IndexEntry> {
        self.entries.get(path)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// insert or replace the entry for `entry.path`
    pub fn add(&mut self, entry: IndexEntry) {
        self.entries.insert(entry.path.clone(), entry);
    }

    pub fn remove(&mut self, path: &str) {
        self.entries.remove(path);
    }

    /// read the index file at `repo.index_path()`
    pub fn read(repo: &Repo) -> Result<Self> {
        let path = repo.index_path();
        let data = fs::read(&path).with_path(&path)?;
        Self::decode(&data)
    }

    fn decode(data: &[u8]) -> Result<Self> {
        if data.len() < 12 {
            return Err(Error::CorruptIndex("file too short for header".to_string()));
        }
        if &data[0..4] != SIGNATURE {
            return Err(Error::CorruptIndex("bad signature".to_string()));
        }
        let version = u32::from_be_bytes(data[4..8].try_into().unwrap());
        if version != VERSION {
            return Err(Error::CorruptIndex(format!("unsupported version {version}")));
        }
        let count = u32::from_be_bytes(data[8..12].try_into().unwrap());

        let mut entries = BTreeMap::new();
        let mut pos = 12;

        for _ in 0..count {
            let entry_start = pos;
            if pos + 62 > data.len() {
                return Err(Error::CorruptIndex("truncated entry".to_string()));
            }

            let read_u32 = |off: usize| u32::from_be_bytes(data[entry_start + off..entry_start + off + 4].try_into().unwrap());

            let ctime_sec = read_u32(0);
            let ctime_nsec = read_u32(4);
            let mtime_sec = read_u32(8);
            let mtime_nsec = read_u32(12);
            let dev = read_u32(16);
            let ino = read_u32(20);
            let mode = read_u32(24);
            let uid = read_u32(28);
            let gid = read_u32(32);
            let size = read_u32(36);

            let sha_start = entry_start + 40;
            let mut hash_bytes_arr = [0u8; 20];
            hash_bytes_arr.copy_from_slice(&data[sha_start..sha_start + 20]);
            let hash = Hash::from_bytes(hash_bytes_arr);

            let flags_start = sha_start + 20;
            let flags = u16::from_be_bytes(data[flags_start..flags_start + 2].try_into().unwrap());
            let name_len = (flags & 0x0FFF) as usize;

            let name_start = flags_start + 2;
            let name_end = if name_len == 0x0FFF {
                data[name_start..]
                    .iter()
                    .position(|&b| b == 0)
                    .map(|p| name_start + p)
                    .ok_or_else(|| Error::CorruptIndex("missing path terminator".to_string()))?
            } else {
                name_start + name_len
            };

            if name_end >= data.len() || data[name_end] != 0 {
                return Err(Error::CorruptIndex("path not null-terminated".to_string()));
            }

            let path = std::str::from_utf8(&data[name_start..name_end])
                .map_err(|_| Error::CorruptIndex("path is not utf-8".to_string()))?
                .to_string();

            let raw_len = 62 + (name_end - name_start) + 1;
            let padded_len = ((raw_len + 7) / 8) * 8;
            pos = entry_start + padded_len;

            entries.insert(
                path.clone(),
                IndexEntry {
                    ctime_sec,
                    ctime_nsec,
                    mtime_sec,
                    mtime_nsec,
                    dev,
                    ino,
                    mode,
                    uid,
                    gid,
                    size,
                    hash,
                    path,
                },
            );
        }

        Ok(Self { entries })
    }

    fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(SIGNATURE);
        out.extend_from_slice(&VERSION.to_be_bytes());
        out.extend_from_slice(&(self.entries.len() as u32).to_be_bytes());

        for entry in self.entries.values() {
            let entry_start = out.len();
            out.extend_from_slice(&entry.ctime_sec.to_be_bytes());
            out.extend_from_slice(&entry.ctime_nsec.to_be_bytes());
            out.extend_from_slice(&entry.mtime_sec.to_be_bytes());
            out.extend_from_slice(&entry.mtime_nsec.to_be_bytes());
            out.extend_from_slice(&entry.dev.to_be_bytes());
            out.extend_from_slice(&entry.ino.to_be_bytes());
            out.extend_from_slice(&entry.mode.to_be_bytes());
            out.extend_from_slice(&entry.uid.to_be_bytes());
            out.extend_from_slice(&entry.gid.to_be_bytes());
            out.extend_from_slice(&entry.size.to_be_bytes());
            out.extend_from_slice(entry.hash.as_bytes());

            let name_len = entry.path.len().min(0x0FFF) as u16;
            out.extend_from_slice(&name_len.to_be_bytes());
            out.extend_from_slice(entry.path.as_bytes());
            out.push(0);

            let raw_len = out.len() - entry_start;
            let padded_len = ((raw_len + 7) / 8) * 8;
            out.resize(entry_start + padded_len, 0);
        }

        let checksum = hash_bytes(&out);
        out.extend_from_slice(checksum.as_bytes());
        out
    }

    /// serialize and write atomically to `repo.index_path()`
    pub fn write(&self, repo: &Repo) -> Result<()> {
        let encoded = self.encode();
        let tmp_path = repo.new_tmp_file();
        {
            let mut tmp_file = File::create(&tmp_path).with_path(&tmp_path)?;
            tmp_file.write_all(&encoded).with_path(&tmp_path)?;
            tmp_file.sync_all().with_path(&tmp_path)?;
        }
        fs::rename(&tmp_path, repo.index_path()).with_path(&repo.index_path())?;
        Ok(())
    }

    /// recover the directory hierarchy from the flat entries and write it out as
    /// nested tree objects, bottom-up; returns the root tree's hash
    pub fn build_tree(&self, repo: &Repo) -> Result<Hash> {
        let mut root = DirNode::default();
        for entry in self.entries.values() {
            let components = crate::path::split_components(&entry.path);
            root.insert(&components, entry)?;
        }
        root.write(repo)
    }
}

#[derive(Default)]
struct DirNode {
    files: BTreeMap<String, (TreeMode, Hash)>,
    dirs: BTreeMap<String, DirNode>,
}

impl DirNode {
    fn insert(&mut self, components: &[&str], entry: &IndexEntry) -> Result<()> {
        match components {
            [] => Err(Error::CorruptIndex("empty path in index".to_string())),
            [name] => {
                self.files.insert(name.to_string(), (entry.tree_mode()?, entry.hash));
                Ok(())
            }
            [dir, rest @ ..] => {
                self.dirs.entry(dir.to_string()).or_default().insert(rest, entry)
            }
        }
    }

    fn write(&self, repo: &Repo) -> Result<Hash> {
        let mut entries = Vec::new();

        for (name, (mode, hash)) in &self.files {
            entries.push(TreeEntry::new(*mode, name.clone(), *hash));
        }
        for (name, node) in &self.dirs {
            let hash = node.write(repo)?;
            entries.push(TreeEntry::new(TreeMode::Directory, name.clone(), hash));
        }

        let tree = Tree::new(entries)?;
        crate::objects::tree::write_tree(repo, &tree)
    }
}

/// stat the file at `abs_path` for inclusion in the index
pub fn stat(abs_path: &Path) -> Result<fs::Metadata> {
    fs::symlink_metadata(abs_path).with_path(abs_path)
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

    fn dummy_entry(path: &str, hash: Hash) -> IndexEntry {
        IndexEntry {
            ctime_sec: 1,
            ctime_nsec: 2,
            mtime_sec: 3,
            mtime_nsec: 4,
            dev: 5,
            ino: 6,
            mode: 0o100644,
            uid: 1000,
            gid: 1000,
            size: 7,
            hash,
            path: path.to_string(),
        }
    }

    #[test]
    fn test_encode_decode_roundtrip() {
        let mut index = Index::new();
        index.add(dummy_entry("a.txt", Hash::ZERO));
        index.add(dummy_entry("dir/b.txt", Hash::from_hex("1111111111111111111111111111111111111111").unwrap()));

        let encoded = index.encode();
        let decoded = Index::decode(&encoded).unwrap();

        assert_eq!(decoded.len(), 2);
        assert_eq!(decoded.entry("a.txt"), index.entry("a.txt"));
        assert_eq!(decoded.entry("dir/b.txt"), index.entry("dir/b.txt"));
    }

    #[test]
    fn test_entries_sorted_by_path() {
        let mut index = Index::new();
        index.add(dummy_entry("zebra.txt", Hash::ZERO));
        index.add(dummy_entry("alpha.txt", Hash::ZERO));

        let paths: Vec<_> = index.entries().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, vec!["alpha.txt", "zebra.txt"]);
    }

    #[test]
    fn test_add_replaces_existing_entry() {
        let mut index = Index::new();
        index.add(dummy_entry("a.txt", Hash::ZERO));
        index.add(dummy_entry("a.txt", Hash::from_hex("1111111111111111111111111111111111111111").unwrap()));

        assert_eq!(index.len(), 1);
        assert_ne!(index.entry("a.txt").unwrap().hash, Hash::ZERO);
    }

    #[test]
    fn test_remove() {
        let mut index = Index::new();
        index.add(dummy_entry("a.txt", Hash::ZERO));
        index.remove("a.txt");

        assert!(index.is_empty());
    }

    #[test]
    fn test_write_read_roundtrip() {
        let (_dir, repo) = test_repo();
        let mut index = Index::new();
        index.add(dummy_entry("a.txt", Hash::ZERO));

        index.write(&repo).unwrap();
        let read = Index::read(&repo).unwrap();

        assert_eq!(read.len(), 1);
    }

    #[test]
    fn test_build_tree_single_file() {
        let (_dir, repo) = test_repo();
        let blob_hash = crate::objects::blob::write_blob(&repo, b"hi\n").unwrap();

        let mut index = Index::new();
        index.add(dummy_entry("hello.txt", blob_hash));

        let tree_hash = index.build_tree(&repo).unwrap();
        let tree = crate::objects::tree::read_tree(&repo, &tree_hash).unwrap();

        assert_eq!(tree.len(), 1);
        assert_eq!(tree.get("hello.txt").unwrap().hash, blob_hash);
    }

    #[test]
    fn test_build_tree_nested_directories() {
        let (_dir, repo) = test_repo();
        let blob_hash = crate::objects::blob::write_blob(&repo, b"content").unwrap();

        let mut index = Index::new();
        index.add(dummy_entry("src/lib.rs", blob_hash));
        index.add(dummy_entry("README.md", blob_hash));

        let tree_hash = index.build_tree(&repo).unwrap();
        let tree = crate::objects::tree::read_tree(&repo, &tree_hash).unwrap();

        assert_eq!(tree.len(), 2);
        let src_entry = tree.get("src").unwrap();
        assert_eq!(src_entry.mode, TreeMode::Directory);

        let src_tree = crate::objects::tree::read_tree(&repo, &src_entry.hash).unwrap();
        assert_eq!(src_tree.get("lib.rs").unwrap().hash, blob_hash);
    }

    #[test]
    fn test_decode_rejects_bad_signature() {
        let mut bytes = b"XXXX".to_vec();
        bytes.extend_from_slice(&2u32.to_be_bytes());
        bytes.extend_from_slice(&0u32.to_be_bytes());
        assert!(matches!(Index::decode(&bytes), Err(Error::CorruptIndex(_))));
    }
}
