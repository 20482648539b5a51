//! Archive digests.
//!
//! Reference tables record MD5 digests because that is what the ROM-loading
//! client verifies against. Files are hashed by streaming them in fixed-size
//! chunks so large archives never sit in memory.

use std::io::Read;

use md5::{Digest, Md5};

use crate::errors::RomDbResult;

/// Chunk size used when streaming a reader into the digest.
pub const CHUNK_SIZE: usize = 8192;

/// Hash raw bytes and return lowercase hex.
pub fn md5_hex(bytes: &[u8]) -> String {
    let mut h = Md5::new();
    h.update(bytes);
    hex::encode(h.finalize())
}

/// Stream a reader into an MD5 digest. Returns `(hex digest, bytes read)`.
pub fn md5_reader_hex<R: Read>(mut reader: R) -> RomDbResult<(String, u64)> {
    let mut h = Md5::new();
    let mut buf = [0u8; CHUNK_SIZE];
    let mut total = 0u64;
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        h.update(&buf[..n]);
        total += n as u64;
    }
    Ok((hex::encode(h.finalize()), total))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_digest() {
        assert_eq!(md5_hex(b"abc"), "900150983cd24fb0d6963f7d28e17f72");
    }

    #[test]
    fn streaming_matches_one_shot() {
        let data: Vec<u8> = (0..(CHUNK_SIZE * 3 + 17)).map(|i| (i % 251) as u8).collect();
        let (streamed, n) = md5_reader_hex(&data[..]).unwrap();
        assert_eq!(n, data.len() as u64);
        assert_eq!(streamed, md5_hex(&data));
    }

    #[test]
    fn empty_input() {
        let (h, n) = md5_reader_hex(&b""[..]).unwrap();
        assert_eq!(n, 0);
        assert_eq!(h, "d41d8cd98f00b204e9800998ecf8427e");
    }
}
