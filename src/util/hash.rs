//! Hashing utilities for archive verification and Nix hash conversion.

use std::io::{self, Read};

use sha2::{Digest, Sha256};

/// The Nix base32 alphabet (no `e`, `o`, `t`, `u`).
const NIX_BASE32_CHARS: &[u8; 32] = b"0123456789abcdfghijklmnpqrsvwxyz";

/// Compute SHA256 hash of a byte slice.
pub fn sha256_bytes(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Compute SHA256 hash of a string.
pub fn sha256_str(s: &str) -> String {
    sha256_bytes(s.as_bytes())
}

/// A reader that computes the SHA256 of everything read through it.
pub struct HashingReader<R> {
    inner: R,
    hasher: Sha256,
    len: u64,
}

impl<R: Read> HashingReader<R> {
    pub fn new(inner: R) -> Self {
        HashingReader {
            inner,
            hasher: Sha256::new(),
            len: 0,
        }
    }

    /// Bytes read so far.
    pub fn bytes_read(&self) -> u64 {
        self.len
    }

    /// Lowercase hex digest of the bytes read so far.
    pub fn finish(self) -> String {
        hex::encode(self.hasher.finalize())
    }
}

impl<R: Read> Read for HashingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.hasher.update(&buf[..n]);
        self.len += n as u64;
        Ok(n)
    }
}

/// Decode a Nix base32 string into raw bytes.
///
/// Nix base32 is little-endian over the whole string: the last character
/// carries the lowest five bits. Returns `None` on an invalid character or
/// when the high bits overflow the decoded length.
pub fn nix_base32_decode(s: &str) -> Option<Vec<u8>> {
    let input = s.as_bytes();
    let len = input.len() * 5 / 8;
    let mut out = vec![0u8; len];

    for (n, &c) in input.iter().rev().enumerate() {
        let digit = NIX_BASE32_CHARS.iter().position(|&a| a == c)? as u16;
        let b = n * 5;
        let i = b / 8;
        let j = b % 8;

        if i >= len {
            if digit != 0 {
                return None;
            }
            continue;
        }

        out[i] |= (digit << j) as u8;
        let carry = digit >> (8 - j);
        if i + 1 < len {
            out[i + 1] |= carry as u8;
        } else if carry != 0 {
            return None;
        }
    }

    Some(out)
}

/// Convert a narinfo hash (`sha256:<nix-base32>`) to lowercase hex.
///
/// Hex digests are passed through unchanged. Anything else yields an
/// empty string, which downstream treats as "no hash recorded".
pub fn nix_hash_to_hex(value: &str) -> String {
    let Some(digest) = value.strip_prefix("sha256:") else {
        return String::new();
    };

    if digest.len() == 64 && digest.bytes().all(|b| b.is_ascii_hexdigit()) {
        return digest.to_ascii_lowercase();
    }

    match nix_base32_decode(digest) {
        Some(bytes) if bytes.len() == 32 => hex::encode(bytes),
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hashing_reader_matches_one_shot_hash() {
        let data = b"hello".repeat(10_000);
        let mut reader = HashingReader::new(&data[..]);
        let mut sink = Vec::new();
        // Small reads exercise the incremental update.
        let mut buf = [0u8; 7];
        loop {
            let n = reader.read(&mut buf).unwrap();
            if n == 0 {
                break;
            }
            sink.extend_from_slice(&buf[..n]);
        }

        assert_eq!(reader.bytes_read(), data.len() as u64);
        assert_eq!(reader.finish(), sha256_bytes(&data));
        assert_eq!(sink, data);
    }

    #[test]
    fn test_sha256_str() {
        let hash = sha256_str("hello");
        assert_eq!(
            hash,
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
    }

    #[test]
    fn test_nix_hash_to_hex() {
        assert_eq!(
            nix_hash_to_hex("sha256:0gkxy2qfdi81lxzqbsdl2w5mdg0666s24inpa90ilvkb53ssmn3s"),
            "7ad8aaf5286b6e1a4152d74622b43106bc560b17b4e9857fa701c5e6b0f07d3e"
        );
        assert_eq!(
            nix_hash_to_hex("sha256:1fd9f9qbrlckn0yapnybfv4y9bwwsvq473ckp71ccvvspr5602fy"),
            "de09604abe7a6fc6c2b9938d43f0d69cafe4c976cbdbab3cb093d1bc7072a9b9"
        );
    }

    #[test]
    fn test_nix_hash_to_hex_rejects_garbage() {
        assert_eq!(nix_hash_to_hex("invalid"), "");
        assert_eq!(nix_hash_to_hex("sha256:not-base32!"), "");
        assert_eq!(nix_hash_to_hex("md5:abcdef"), "");
    }

    #[test]
    fn test_nix_hash_hex_passthrough() {
        let hex = "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824";
        assert_eq!(nix_hash_to_hex(&format!("sha256:{hex}")), hex);
    }

    #[test]
    fn test_nix_base32_decode_small() {
        // "00" decodes to a single zero byte; "0z" sets the low five bits.
        assert_eq!(nix_base32_decode("00"), Some(vec![0]));
        assert_eq!(nix_base32_decode("0z"), Some(vec![31]));
        assert_eq!(nix_base32_decode("e0"), None);
    }
}
