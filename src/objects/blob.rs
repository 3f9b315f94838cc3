use crate::error::{Error, Result};
use crate::hash::Hash;
use crate::objects::{self, ObjectKind};
use crate::repo::Repo;

/// store raw file content as a blob, returning its hash
pub fn write_blob(repo: &Repo, content: &[u8]) -> Result<Hash> {
    objects::write(repo, ObjectKind::Blob, content)
}

/// read blob content back out
pub fn read_blob(repo: &Repo, hash: &Hash) -> Result<Vec<u8>> {
    let (kind, body) = objects::read(repo, hash)?;
    if kind != ObjectKind::Blob {
        return Err(Error::InvalidObjectType(kind.to_string()));
    }
    Ok(body)
}

pub fn blob_exists(repo: &Repo, hash: &Hash) -> bool {
    objects::exists(repo, hash)
}
