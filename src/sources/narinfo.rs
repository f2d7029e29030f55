//! `.narinfo` parsing.
//!
//! A narinfo is a list of `Key: value` lines describing one store path:
//!
//! ```text
//! StorePath: /nix/store/<hash>-git-2.44.0
//! URL: nar/<filehash>.nar.xz
//! Compression: xz
//! FileHash: sha256:<nixbase32>
//! FileSize: 4123456
//! NarHash: sha256:<nixbase32>
//! NarSize: 20971520
//! References: <hash>-curl-8.6.0 <hash>-git-2.44.0
//! ```

use crate::core::store_path;
use crate::core::PackageNode;
use crate::util::hash::nix_hash_to_hex;

/// Parsed narinfo metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NarInfo {
    pub store_path: String,
    pub url: String,
    pub compression: String,
    /// `sha256:<nixbase32>` as served
    pub nar_hash: String,
    pub nar_size: u64,
    /// `sha256:<nixbase32>` as served
    pub file_hash: String,
    pub file_size: u64,
    pub references: Vec<String>,
}

impl NarInfo {
    /// Parse narinfo text.
    ///
    /// Unknown keys and lines without `": "` are ignored. Sizes that fail
    /// to parse are zero. Validation of `StorePath` is left to the caller.
    pub fn parse(text: &str) -> NarInfo {
        let mut info = NarInfo::default();

        for line in text.lines() {
            let Some((key, value)) = line.split_once(": ") else {
                continue;
            };
            let value = value.trim();

            match key.trim() {
                "StorePath" => info.store_path = value.to_string(),
                "URL" => info.url = value.to_string(),
                "Compression" => info.compression = value.to_string(),
                "NarHash" => info.nar_hash = value.to_string(),
                "NarSize" => info.nar_size = value.parse().unwrap_or(0),
                "FileHash" => info.file_hash = value.to_string(),
                "FileSize" => info.file_size = value.parse().unwrap_or(0),
                "References" => {
                    info.references = value.split_whitespace().map(str::to_string).collect()
                }
                _ => {}
            }
        }

        info
    }

    /// Convert into a package table entry keyed by store path.
    ///
    /// `queried_hash` is used when the store path carries no parseable hash.
    pub fn into_node(self, queried_hash: &str) -> (String, PackageNode) {
        let hash = store_path::extract_hash(&self.store_path)
            .unwrap_or(queried_hash)
            .to_string();
        let compression = if self.compression.is_empty() {
            "xz".to_string()
        } else {
            self.compression
        };

        let node = PackageNode {
            url: self.url,
            compression,
            hash,
            nar_hash: nix_hash_to_hex(&self.nar_hash),
            nar_size: self.nar_size,
            file_hash: nix_hash_to_hex(&self.file_hash),
            file_size: self.file_size,
            references: self.references,
        };

        (self.store_path, node)
    }
}
