//! the content-addressed object store: blobs, trees, commits, and tags

pub mod blob;
pub mod commit;
pub mod tag;
pub mod tree;

use std::fmt;
use std::fs::{self, File};
use std::io::Write;
use std::path::PathBuf;

use crate::codec;
use crate::error::{Error, IoResultExt, Result};
use crate::hash::{hash_object, Hash};
use crate::repo::Repo;

pub use commit::Commit;
pub use tag::Tag;
pub use tree::{Tree, TreeEntry, TreeMode};

/// the four object kinds that appear in the `"<kind> <len>\0"` header
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ObjectKind {
    Blob,
    Tree,
    Commit,
    Tag,
}

impl ObjectKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ObjectKind::Blob => "blob",
            ObjectKind::Tree => "tree",
            ObjectKind::Commit => "commit",
            ObjectKind::Tag => "tag",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "blob" => Ok(ObjectKind::Blob),
            "tree" => Ok(ObjectKind::Tree),
            "commit" => Ok(ObjectKind::Commit),
            "tag" => Ok(ObjectKind::Tag),
            other => Err(Error::InvalidObjectType(other.to_string())),
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// filesystem path for an object, sharded by the first two hex characters of its hash
pub fn object_path(repo: &Repo, hash: &Hash) -> PathBuf {
    let (dir, file) = hash.to_path_components();
    repo.objects_path().join(dir).join(file)
}

/// write `kind body` as an object, skipping the write if the content already exists
pub fn write(repo: &Repo, kind: ObjectKind, body: &[u8]) -> Result<Hash> {
    let hash = hash_object(kind.as_str(), body);
    let path = object_path(repo, &hash);

    if path.exists() {
        return Ok(hash);
    }

    let dir = path.parent().expect("object path always has a parent").to_path_buf();
    fs::create_dir_all(&dir).with_path(&dir)?;

    let mut header = format!("{} {}\0", kind.as_str(), body.len()).into_bytes();
    header.extend_from_slice(body);
    let compressed = codec::compress(&header)?;

    let tmp_path = repo.new_tmp_file();
    {
        let mut tmp_file = File::create(&tmp_path).with_path(&tmp_path)?;
        tmp_file.write_all(&compressed).with_path(&tmp_path)?;
        tmp_file.sync_all().with_path(&tmp_path)?;
    }
    fs::rename(&tmp_path, &path).with_path(&path)?;

    let dir_file = File::open(&dir).with_path(&dir)?;
    dir_file.sync_all().with_path(&dir)?;

    Ok(hash)
}

/// read an object, returning its kind and body (header stripped, length validated)
pub fn read(repo: &Repo, hash: &Hash) -> Result<(ObjectKind, Vec<u8>)> {
    let path = object_path(repo, hash);

    let compressed = fs::read(&path).map_err(|source| {
        if source.kind() == std::io::ErrorKind::NotFound {
            Error::ObjectNotFound(*hash)
        } else {
            Error::Io { path: path.clone(), source }
        }
    })?;

    let raw = codec::decompress(&compressed)?;

    let nul = raw
        .iter()
        .position(|&b| b == 0)
        .ok_or_else(|| Error::CorruptObjectMessage(*hash, "missing header terminator".to_string()))?;
    let header = std::str::from_utf8(&raw[..nul])
        .map_err(|_| Error::CorruptObjectMessage(*hash, "header is not utf-8".to_string()))?;

    let (kind_str, len_str) = header
        .split_once(' ')
        .ok_or_else(|| Error::CorruptObjectMessage(*hash, "malformed header".to_string()))?;
    let kind = ObjectKind::parse(kind_str)?;
    let declared_len: usize = len_str
        .parse()
        .map_err(|_| Error::CorruptObjectMessage(*hash, "non-numeric length".to_string()))?;

    let body = raw[nul + 1..].to_vec();
    if body.len() != declared_len {
        return Err(Error::CorruptObjectMessage(
            *hash,
            format!("declared length {} does not match body length {}", declared_len, body.len()),
        ));
    }

    let actual_hash = hash_object(kind.as_str(), &body);
    if actual_hash != *hash {
        return Err(Error::CorruptObject(*hash));
    }

    Ok((kind, body))
}

pub fn exists(repo: &Repo, hash: &Hash) -> bool {
    object_path(repo, hash).exists()
}

/// resolve a 4-39 character hex prefix to the one object hash it uniquely identifies
pub fn expand(repo: &Repo, short: &str) -> Result<Hash> {
    if short.len() < 4 {
        return Err(Error::ShortHashTooShort(short.to_string()));
    }
    if short.len() >= 40 {
        return Hash::from_hex(short);
    }
    if !short.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(Error::InvalidHashHex(short.to_string()));
    }

    let dir_name = &short[..2];
    let rest_prefix = &short[2..];
    let dir = repo.objects_path().join(dir_name);

    if !dir.is_dir() {
        return Err(Error::NoSuchShortHash(short.to_string()));
    }

    let mut matches = Vec::new();
    for entry in fs::read_dir(&dir).with_path(&dir)? {
        let entry = entry.with_path(&dir)?;
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if name.starts_with(rest_prefix) {
            matches.push(Hash::from_hex(&format!("{dir_name}{name}"))?);
        }
    }

    match matches.len() {
        0 => Err(Error::NoSuchShortHash(short.to_string())),
        1 => Ok(matches[0]),
        n => Err(Error::AmbiguousHash(short.to_string(), n)),
    }
}
