use crate::error::{Error, Result};
use crate::hash::Hash;
use crate::objects::{self, ObjectKind};
use crate::repo::Repo;
use crate::time::Signature;

/// an annotated tag: a named, signed pointer to any object, carrying a message
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Tag {
    pub object: Hash,
    pub target_kind: ObjectKind,
    pub name: String,
    pub tagger: Signature,
    pub message: String,
}

impl Tag {
    pub fn new(object: Hash, target_kind: ObjectKind, name: impl Into<String>, tagger: Signature, message: impl Into<String>) -> Self {
        Self { object, target_kind, name: name.into(), tagger, message: message.into() }
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut lines = vec![
            format!("object {}", self.object),
            format!("type {}", self.target_kind),
            format!("tag {}", self.name),
            format!("tagger {}", self.tagger.to_header()),
        ];
        let mut body = lines.join("\n");
        lines.clear();
        body.push_str("\n\n");
        body.push_str(&self.message);
        body.into_bytes()
    }

    pub fn decode(body: &[u8]) -> Result<Self> {
        let text = std::str::from_utf8(body).map_err(|_| Error::CorruptObjectMessage(Hash::ZERO, "tag body is not utf-8".to_string()))?;

        let (header, message) = text
            .split_once("\n\n")
            .ok_or_else(|| Error::CorruptObjectMessage(Hash::ZERO, "tag missing blank line separator".to_string()))?;

        let mut object = None;
        let mut target_kind = None;
        let mut name = None;
        let mut tagger = None;

        for line in header.lines() {
            if let Some(rest) = line.strip_prefix("object ") {
                object = Some(Hash::from_hex(rest)?);
            } else if let Some(rest) = line.strip_prefix("type ") {
                target_kind = Some(ObjectKind::parse(rest)?);
            } else if let Some(rest) = line.strip_prefix("tag ") {
                name = Some(rest.to_string());
            } else if let Some(rest) = line.strip_prefix("tagger ") {
                tagger = Some(Signature::parse(rest)?);
            } else {
                return Err(Error::CorruptObjectMessage(Hash::ZERO, format!("unrecognized tag header line: {line}")));
            }
        }

        Ok(Self {
            object: object.ok_or_else(|| Error::CorruptObjectMessage(Hash::ZERO, "tag missing object line".to_string()))?,
            target_kind: target_kind.ok_or_else(|| Error::CorruptObjectMessage(Hash::ZERO, "tag missing type line".to_string()))?,
            name: name.ok_or_else(|| Error::CorruptObjectMessage(Hash::ZERO, "tag missing tag line".to_string()))?,
            tagger: tagger.ok_or_else(|| Error::CorruptObjectMessage(Hash::ZERO, "tag missing tagger line".to_string()))?,
            message: message.to_string(),
        })
    }
}

pub fn write_tag(repo: &Repo, tag: &Tag) -> Result<Hash> {
    objects::write(repo, ObjectKind::Tag, &tag.encode())
}

pub fn read_tag(repo: &Repo, hash: &Hash) -> Result<Tag> {
    let (kind, body) = objects::read(repo, hash)?;
    if kind != ObjectKind::Tag {
        return Err(Error::InvalidObjectType(kind.to_string()));
    }
    Tag::decode(&body)
}
