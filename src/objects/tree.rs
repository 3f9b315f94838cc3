use crate::error::{Error, Result};
use crate::hash::Hash;
use crate::objects::{self, ObjectKind};
use crate::repo::Repo;

/// the four modes a tree entry can carry, encoded as octal ASCII without a leading zero
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TreeMode {
    Regular,
    Executable,
    Symlink,
    Directory,
}

impl TreeMode {
    pub fn as_str(self) -> &'static str {
        match self {
            TreeMode::Regular => "100644",
            TreeMode::Executable => "100755",
            TreeMode::Symlink => "120000",
            TreeMode::Directory => "40000",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "100644" => Ok(TreeMode::Regular),
            "100755" => Ok(TreeMode::Executable),
            "120000" => Ok(TreeMode::Symlink),
            "40000" => Ok(TreeMode::Directory),
            other => Err(Error::InvalidObjectHeader(format!("unknown tree mode {other}"))),
        }
    }

    pub fn is_directory(self) -> bool {
        matches!(self, TreeMode::Directory)
    }
}

/// a single `"<mode> <name>\0<20-byte-sha>"` entry
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TreeEntry {
    pub mode: TreeMode,
    pub name: String,
    pub hash: Hash,
}

impl TreeEntry {
    pub fn new(mode: TreeMode, name: impl Into<String>, hash: Hash) -> Self {
        Self { mode, name: name.into(), hash }
    }
}

/// a directory listing: entries sorted lexicographically by name
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct Tree {
    entries: Vec<TreeEntry>,
}

impl Tree {
    /// build a tree from entries, validating names and sorting
    pub fn new(mut entries: Vec<TreeEntry>) -> Result<Self> {
        for entry in &entries {
            validate_entry_name(&entry.name)?;
        }

        entries.sort_by(|a, b| a.name.as_bytes().cmp(b.name.as_bytes()));

        for window in entries.windows(2) {
            if window[0].name == window[1].name {
                return Err(Error::InvalidObjectHeader(format!("duplicate tree entry name: {}", window[0].name)));
            }
        }

        Ok(Self { entries })
    }

    pub fn empty() -> Self {
        Self { entries: Vec::new() }
    }

    pub fn entries(&self) -> &[TreeEntry] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<TreeEntry> {
        self.entries
    }

    pub fn get(&self, name: &str) -> Option<&TreeEntry> {
        self.entries.binary_search_by(|e| e.name.as_bytes().cmp(name.as_bytes())).ok().map(|i| &self.entries[i])
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// serialize to the exact on-disk tree body: repeated `"<mode> <name>\0<20-byte-sha>"`
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        for entry in &self.entries {
            out.extend_from_slice(entry.mode.as_str().as_bytes());
            out.push(b' ');
            out.extend_from_slice(entry.name.as_bytes());
            out.push(0);
            out.extend_from_slice(entry.hash.as_bytes());
        }
        out
    }

    /// parse a tree body previously produced by `encode`
    pub fn decode(body: &[u8]) -> Result<Self> {
        let mut entries = Vec::new();
        let mut pos = 0;

        while pos < body.len() {
            let space = body[pos..]
                .iter()
                .position(|&b| b == b' ')
                .ok_or_else(|| Error::CorruptObjectMessage(Hash::ZERO, "missing mode separator in tree".to_string()))?
                + pos;
            let mode_str = std::str::from_utf8(&body[pos..space])
                .map_err(|_| Error::CorruptObjectMessage(Hash::ZERO, "non-utf8 tree mode".to_string()))?;
            let mode = TreeMode::parse(mode_str)?;

            let nul = body[space + 1..]
                .iter()
                .position(|&b| b == 0)
                .ok_or_else(|| Error::CorruptObjectMessage(Hash::ZERO, "missing name terminator in tree".to_string()))?
                + space
                + 1;
            let name = std::str::from_utf8(&body[space + 1..nul])
                .map_err(|_| Error::CorruptObjectMessage(Hash::ZERO, "non-utf8 tree entry name".to_string()))?
                .to_string();

            let sha_start = nul + 1;
            let sha_end = sha_start + 20;
            if sha_end > body.len() {
                return Err(Error::CorruptObjectMessage(Hash::ZERO, "truncated tree entry hash".to_string()));
            }
            let mut hash_bytes = [0u8; 20];
            hash_bytes.copy_from_slice(&body[sha_start..sha_end]);

            entries.push(TreeEntry::new(mode, name, Hash::from_bytes(hash_bytes)));
            pos = sha_end;
        }

        Tree::new(entries)
    }
}

fn validate_entry_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::InvalidObjectHeader("empty tree entry name".to_string()));
    }
    if name.contains('/') || name.contains('\0') {
        return Err(Error::InvalidObjectHeader(format!("invalid tree entry name: {name}")));
    }
    if name == "." || name == ".." {
        return Err(Error::InvalidObjectHeader(format!("reserved tree entry name: {name}")));
    }
    Ok(())
}

pub fn write_tree(repo: &Repo, tree: &Tree) -> Result<Hash> {
    objects::write(repo, ObjectKind::Tree, &tree.encode())
}

pub fn read_tree(repo: &Repo, hash: &Hash) -> Result<Tree> {
    let (kind, body) = objects::read(repo, hash)?;
    if kind != ObjectKind::Tree {
        return Err(Error::InvalidObjectType(kind.to_string()));
    }
    Tree::decode(&body)
}

pub fn tree_exists(repo: &Repo, hash: &Hash) -> bool {
    objects::exists(repo, hash)
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
    fn test_sorting() {
        let entries = vec![
            TreeEntry::new(TreeMode::Regular, "zebra", Hash::ZERO),
            TreeEntry::new(TreeMode::Regular, "alpha", Hash::ZERO),
        ];
        let tree = Tree::new(entries).unwrap();
        let names: Vec<_> = tree.entries().iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["alpha", "zebra"]);
    }

    #[test]
    fn test_rejects_duplicate_names() {
        let entries = vec![
            TreeEntry::new(TreeMode::Regular, "same", Hash::ZERO),
            TreeEntry::new(TreeMode::Regular, "same", Hash::ZERO),
        ];
        assert!(Tree::new(entries).is_err());
    }

    #[test]
    fn test_rejects_slash_in_name() {
        let entries = vec![TreeEntry::new(TreeMode::Regular, "a/b", Hash::ZERO)];
        assert!(Tree::new(entries).is_err());
    }

    #[test]
    fn test_encode_decode_roundtrip() {
        let entries = vec![
            TreeEntry::new(TreeMode::Regular, "hello.txt", Hash::from_hex("45b983be36b73c0788dc9cbcb76cbb80fc7bb057").unwrap()),
            TreeEntry::new(TreeMode::Directory, "src", Hash::from_hex("1111111111111111111111111111111111111111").unwrap()),
        ];
        let tree = Tree::new(entries).unwrap();

        let encoded = tree.encode();
        let decoded = Tree::decode(&encoded).unwrap();

        assert_eq!(tree, decoded);
    }

    #[test]
    fn test_write_read_roundtrip() {
        let (_dir, repo) = test_repo();
        let entries = vec![TreeEntry::new(TreeMode::Regular, "file.txt", Hash::ZERO)];
        let tree = Tree::new(entries).unwrap();

        let hash = write_tree(&repo, &tree).unwrap();
        assert!(tree_exists(&repo, &hash));

        let read = read_tree(&repo, &hash).unwrap();
        assert_eq!(tree, read);
    }

    #[test]
    fn test_empty_tree_roundtrip() {
        let (_dir, repo) = test_repo();
        let tree = Tree::empty();

        let hash = write_tree(&repo, &tree).unwrap();
        let read = read_tree(&repo, &hash).unwrap();

        assert!(read.is_empty());
    }

    #[test]
    fn test_single_entry_worked_example() {
        // from the init/add/commit scenario: hello.txt -> sha1("blob 3\0hi\n")
        let blob_hash = Hash::from_hex("45b983be36b73c0788dc9cbcb76cbb80fc7bb057").unwrap();
        let tree = Tree::new(vec![TreeEntry::new(TreeMode::Regular, "hello.txt", blob_hash)]).unwrap();

        assert_eq!(tree.get("hello.txt").unwrap().hash, blob_hash);
        assert_eq!(tree.get("hello.txt").unwrap().mode, TreeMode::Regular);
    }
}
