use crate::error::{Error, Result};
use crate::hash::Hash;
use crate::objects::{self, ObjectKind};
use crate::repo::Repo;
use crate::time::Signature;

/// a commit: tree snapshot, parent links, author/committer identity, message
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Commit {
    pub tree: Hash,
    pub parents: Vec<Hash>,
    pub author: Signature,
    pub committer: Signature,
    pub message: String,
}

impl Commit {
    pub fn new(tree: Hash, parents: Vec<Hash>, author: Signature, committer: Signature, message: impl Into<String>) -> Self {
        Self { tree, parents, author, committer, message: message.into() }
    }

    pub fn is_root(&self) -> bool {
        self.parents.is_empty()
    }

    pub fn is_merge(&self) -> bool {
        self.parents.len() > 1
    }

    /// body in the exact on-disk form: `tree`, `parent`*, `author`, `committer`, blank line, message
    pub fn encode(&self) -> Vec<u8> {
        let mut lines = Vec::new();
        lines.push(format!("tree {}", self.tree));
        for parent in &self.parents {
            lines.push(format!("parent {}", parent));
        }
        lines.push(format!("author {}", self.author.to_header()));
        lines.push(format!("committer {}", self.committer.to_header()));

        let mut body = lines.join("\n");
        body.push_str("\n\n");
        body.push_str(&self.message);
        body.into_bytes()
    }

    pub fn decode(body: &[u8]) -> Result<Self> {
        let text = std::str::from_utf8(body).map_err(|_| Error::CorruptObjectMessage(Hash::ZERO, "commit body is not utf-8".to_string()))?;

        let (header, message) = text
            .split_once("\n\n")
            .ok_or_else(|| Error::CorruptObjectMessage(Hash::ZERO, "commit missing blank line separator".to_string()))?;

        let mut tree = None;
        let mut parents = Vec::new();
        let mut author = None;
        let mut committer = None;

        for line in header.lines() {
            if let Some(rest) = line.strip_prefix("tree ") {
                tree = Some(Hash::from_hex(rest)?);
            } else if let Some(rest) = line.strip_prefix("parent ") {
                parents.push(Hash::from_hex(rest)?);
            } else if let Some(rest) = line.strip_prefix("author ") {
                author = Some(Signature::parse(rest)?);
            } else if let Some(rest) = line.strip_prefix("committer ") {
                committer = Some(Signature::parse(rest)?);
            } else {
                return Err(Error::CorruptObjectMessage(Hash::ZERO, format!("unrecognized commit header line: {line}")));
            }
        }

        let tree = tree.ok_or_else(|| Error::CorruptObjectMessage(Hash::ZERO, "commit missing tree line".to_string()))?;
        let author = author.ok_or_else(|| Error::CorruptObjectMessage(Hash::ZERO, "commit missing author line".to_string()))?;
        let committer = committer.ok_or_else(|| Error::CorruptObjectMessage(Hash::ZERO, "commit missing committer line".to_string()))?;

        Ok(Self { tree, parents, author, committer, message: message.to_string() })
    }
}

pub fn write_commit(repo: &Repo, commit: &Commit) -> Result<Hash> {
    objects::write(repo, ObjectKind::Commit, &commit.encode())
}

pub fn read_commit(repo: &Repo, hash: &Hash) -> Result<Commit> {
    let (kind, body) = objects::read(repo, hash)?;
    if kind != ObjectKind::Commit {
        return Err(Error::InvalidObjectType(kind.to_string()));
    }
    Commit::decode(&body)
}

pub fn commit_exists(repo: &Repo, hash: &Hash) -> bool {
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

    fn sig() -> Signature {
        Signature::new("Ada Lovelace", "ada@example.com", 1_700_000_000, -240)
    }

    #[test]
    fn test_root_commit_has_no_parents() {
        let c = Commit::new(Hash::ZERO, vec![], sig(), sig(), "first");
        assert!(c.is_root());
        assert!(!c.is_merge());
    }

    #[test]
    fn test_merge_commit_has_two_parents() {
        let p1 = Hash::from_hex("1111111111111111111111111111111111111111").unwrap();
        let p2 = Hash::from_hex("2222222222222222222222222222222222222222").unwrap();
        let c = Commit::new(Hash::ZERO, vec![p1, p2], sig(), sig(), "merge");
        assert!(!c.is_root());
        assert!(c.is_merge());
    }

    #[test]
    fn test_encode_decode_roundtrip() {
        let parent = Hash::from_hex("1111111111111111111111111111111111111111").unwrap();
        let c = Commit::new(Hash::ZERO, vec![parent], sig(), sig(), "fix the bug\n\nlonger body here");

        let encoded = c.encode();
        let decoded = Commit::decode(&encoded).unwrap();

        assert_eq!(c, decoded);
    }

    #[test]
    fn test_encode_field_order() {
        let c = Commit::new(Hash::ZERO, vec![], sig(), sig(), "msg");
        let encoded = String::from_utf8(c.encode()).unwrap();

        let tree_idx = encoded.find("tree ").unwrap();
        let author_idx = encoded.find("author ").unwrap();
        let committer_idx = encoded.find("committer ").unwrap();
        let blank_idx = encoded.find("\n\n").unwrap();

        assert!(tree_idx < author_idx);
        assert!(author_idx < committer_idx);
        assert!(committer_idx < blank_idx);
        assert!(encoded.ends_with("msg"));
    }

    #[test]
    fn test_write_read_roundtrip() {
        let (_dir, repo) = test_repo();
        let c = Commit::new(Hash::ZERO, vec![], sig(), sig(), "first commit");

        let hash = write_commit(&repo, &c).unwrap();
        assert!(commit_exists(&repo, &hash));

        let read = read_commit(&repo, &hash).unwrap();
        assert_eq!(c, read);
    }

    #[test]
    fn test_decode_rejects_missing_blank_line() {
        let result = Commit::decode(b"tree 0000000000000000000000000000000000000000\nno blank line here");
        assert!(result.is_err());
    }
}
