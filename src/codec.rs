use std::io::{Read, Write};

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;

use crate::error::{Error, Result};

/// compress bytes with RFC-1950 deflate at the default level
pub fn compress(data: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(data)
        .map_err(|source| Error::Io { path: "<compress>".into(), source })?;
    encoder
        .finish()
        .map_err(|source| Error::Io { path: "<compress>".into(), source })
}

/// decompress a zlib-wrapped deflate stream
pub fn decompress(data: &[u8]) -> Result<Vec<u8>> {
    let mut decoder = ZlibDecoder::new(data);
    let mut out = Vec::new();
    decoder
        .read_to_end(&mut out)
        .map_err(|source| Error::Io { path: "<decompress>".into(), source })?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip() {
        let data = b"hello world, hello world, hello world".to_vec();
        let compressed = compress(&data).unwrap();
        let decompressed = decompress(&compressed).unwrap();
        assert_eq!(decompressed, data);
    }

    #[test]
    fn test_roundtrip_empty() {
        let data: Vec<u8> = Vec::new();
        let compressed = compress(&data).unwrap();
        let decompressed = decompress(&compressed).unwrap();
        assert_eq!(decompressed, data);
    }

    #[test]
    fn test_compression_actually_shrinks_repetitive_data() {
        let data = vec![b'a'; 10_000];
        let compressed = compress(&data).unwrap();
        assert!(compressed.len() < data.len());
    }
}
