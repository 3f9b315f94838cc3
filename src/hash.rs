use sha1::{Digest, Sha1};
use std::fmt;

use crate::Error;

/// 160-bit content hash used for object addressing
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Hash([u8; 20]);

impl Hash {
    pub const ZERO: Hash = Hash([0u8; 20]);

    pub fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// parse a 40-character lowercase hex hash
    pub fn from_hex(s: &str) -> crate::Result<Self> {
        if s.len() != 40 || !s.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(Error::InvalidHashHex(s.to_string()));
        }
        let bytes = hex::decode(s).map_err(|_| Error::InvalidHashHex(s.to_string()))?;
        let mut arr = [0u8; 20];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// split into object-store path components: 2-char directory, 38-char file
    pub fn to_path_components(&self) -> (String, String) {
        let hex = self.to_hex();
        (hex[..2].to_string(), hex[2..].to_string())
    }

    /// true if `s` looks like a hash abbreviation: 4-40 lowercase hex chars
    pub fn is_hex_prefix(s: &str) -> bool {
        (4..=40).contains(&s.len()) && s.bytes().all(|b| b.is_ascii_hexdigit())
    }

    /// first `len` hex characters (clamped to the full 40), for `--abbrev`-style display
    pub fn to_hex_abbrev(&self, len: usize) -> String {
        let hex = self.to_hex();
        hex[..len.min(hex.len())].to_string()
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash({})", &self.to_hex()[..12])
    }
}

/// hash the object body with its `"<kind> <len>\0"` header prepended, per the
/// object store's content-addressing rule
pub fn hash_object(kind: &str, body: &[u8]) -> Hash {
    let mut hasher = Sha1::new();
    hasher.update(kind.as_bytes());
    hasher.update(b" ");
    hasher.update(body.len().to_string().as_bytes());
    hasher.update(b"\0");
    hasher.update(body);
    Hash(hasher.finalize().into())
}

/// streaming hasher over header + body, for large blobs
pub struct ObjectHasher {
    hasher: Sha1,
}

impl ObjectHasher {
    pub fn new(kind: &str, len: usize) -> Self {
        let mut hasher = Sha1::new();
        hasher.update(kind.as_bytes());
        hasher.update(b" ");
        hasher.update(len.to_string().as_bytes());
        hasher.update(b"\0");
        Self { hasher }
    }

    pub fn update(&mut self, data: &[u8]) {
        self.hasher.update(data);
    }

    pub fn finalize(self) -> Hash {
        Hash(self.hasher.finalize().into())
    }
}

/// plain SHA-1 over raw bytes, no header (used for the index checksum trailer)
pub fn hash_bytes(data: &[u8]) -> Hash {
    let digest = Sha1::digest(data);
    Hash(digest.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_hex_roundtrip() {
        let original = Hash::from_hex("abcdef0123456789abcdef0123456789abcdef01").unwrap();
        let hex = original.to_hex();
        let parsed = Hash::from_hex(&hex).unwrap();
        assert_eq!(original, parsed);
    }

    #[test]
    fn test_hash_invalid_hex() {
        assert!(Hash::from_hex("not valid hex string here padded to forty!!").is_err());
        assert!(Hash::from_hex("abcd").is_err());
        assert!(Hash::from_hex("abcdef0123456789abcdef0123456789abcdef01ff").is_err());
    }

    #[test]
    fn test_hash_path_components() {
        let h = Hash::from_hex("abcdef0123456789abcdef0123456789abcdef01").unwrap();
        let (dir, file) = h.to_path_components();
        assert_eq!(dir, "ab");
        assert_eq!(file, "cdef0123456789abcdef0123456789abcdef01");
    }

    #[test]
    fn test_hash_ordering() {
        let h1 = Hash::from_hex("0000000000000000000000000000000000000001").unwrap();
        let h2 = Hash::from_hex("0000000000000000000000000000000000000002").unwrap();
        assert!(h1 < h2);
    }

    #[test]
    fn test_to_hex_abbrev() {
        let h = Hash::from_hex("abcdef0123456789abcdef0123456789abcdef01").unwrap();
        assert_eq!(h.to_hex_abbrev(7), "abcdef0");
        assert_eq!(h.to_hex_abbrev(40), h.to_hex());
        assert_eq!(h.to_hex_abbrev(100), h.to_hex());
    }

    #[test]
    fn test_is_hex_prefix() {
        assert!(Hash::is_hex_prefix("abcd"));
        assert!(Hash::is_hex_prefix("abcdef0123456789abcdef0123456789abcdef01"));
        assert!(!Hash::is_hex_prefix("abc"));
        assert!(!Hash::is_hex_prefix("xyz1"));
        assert!(!Hash::is_hex_prefix("abcdef0123456789abcdef0123456789abcdef011"));
    }

    #[test]
    fn test_hash_object_known_value() {
        // from spec.md's worked example: sha1("blob 3\0hi\n")
        let h = hash_object("blob", b"hi\n");
        assert_eq!(h.to_hex(), "45b983be36b73c0788dc9cbcb76cbb80fc7bb057");
    }

    #[test]
    fn test_hash_object_deterministic() {
        let h1 = hash_object("blob", b"hello");
        let h2 = hash_object("blob", b"hello");
        assert_eq!(h1, h2);
    }

    #[test]
    fn test_hash_object_different_kind_differs() {
        let h1 = hash_object("blob", b"hello");
        let h2 = hash_object("tree", b"hello");
        assert_ne!(h1, h2);
    }

    #[test]
    fn test_streaming_hasher_matches_direct() {
        let direct = hash_object("blob", b"helloworld");

        let mut streaming = ObjectHasher::new("blob", 10);
        streaming.update(b"hello");
        streaming.update(b"world");
        let streamed = streaming.finalize();

        assert_eq!(direct, streamed);
    }
}
