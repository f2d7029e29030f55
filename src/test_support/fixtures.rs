//! Test fixtures: deterministic store paths, package tables and NAR archives.

use crate::core::{PackageNode, PackageTable};
use crate::util::hash::sha256_str;

/// A deterministic 32-character content hash for a short package name.
pub fn hash(name: &str) -> String {
    sha256_str(name)[..32].to_string()
}

/// `<hash>-<name>`
pub fn basename(name: &str) -> String {
    format!("{}-{}", hash(name), name)
}

/// `/nix/store/<hash>-<name>`
pub fn store_path(name: &str) -> String {
    format!("/nix/store/{}", basename(name))
}

/// Cache-relative archive URL used by the fixtures.
pub fn archive_url(name: &str) -> String {
    format!("nar/{}.nar", hash(name))
}

/// A node for `name` referencing the packages named in `references`.
///
/// Archives are uncompressed and carry no hashes.
pub fn node(name: &str, references: &[&str]) -> PackageNode {
    PackageNode {
        url: archive_url(name),
        compression: "none".to_string(),
        hash: hash(name),
        nar_hash: String::new(),
        nar_size: 0,
        file_hash: String::new(),
        file_size: 0,
        references: references.iter().map(|r| basename(r)).collect(),
    }
}

/// A package table from `(name, references)` pairs.
pub fn table(entries: &[(&str, &[&str])]) -> PackageTable {
    let mut table = PackageTable::new();
    for (name, references) in entries {
        table.insert_new(store_path(name), node(name, references));
    }
    table
}

/// Narinfo text for a fixture package.
pub fn narinfo_text(name: &str, references: &[&str]) -> String {
    let refs: Vec<String> = references.iter().map(|r| basename(r)).collect();
    format!(
        "StorePath: {}\nURL: {}\nCompression: none\nNarSize: 0\nReferences: {}\n",
        store_path(name),
        archive_url(name),
        refs.join(" ")
    )
}

/// An in-memory tree to encode as a NAR.
#[derive(Debug, Clone)]
pub enum NarNode {
    Directory(Vec<(String, NarNode)>),
    File { executable: bool, contents: Vec<u8> },
    Symlink(String),
}

impl NarNode {
    pub fn dir<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, NarNode)>,
        S: Into<String>,
    {
        NarNode::Directory(entries.into_iter().map(|(n, e)| (n.into(), e)).collect())
    }

    pub fn file(contents: impl Into<Vec<u8>>) -> Self {
        NarNode::File {
            executable: false,
            contents: contents.into(),
        }
    }

    pub fn exe(contents: impl Into<Vec<u8>>) -> Self {
        NarNode::File {
            executable: true,
            contents: contents.into(),
        }
    }

    pub fn symlink(target: impl Into<String>) -> Self {
        NarNode::Symlink(target.into())
    }

    /// Encode as a NAR archive.
    pub fn to_nar(&self) -> Vec<u8> {
        let mut out = Vec::new();
        write_str(&mut out, b"nix-archive-1");
        self.write(&mut out);
        out
    }

    fn write(&self, out: &mut Vec<u8>) {
        write_str(out, b"(");
        write_str(out, b"type");
        match self {
            NarNode::File {
                executable,
                contents,
            } => {
                write_str(out, b"regular");
                if *executable {
                    write_str(out, b"executable");
                    write_str(out, b"");
                }
                write_str(out, b"contents");
                write_str(out, contents);
            }
            NarNode::Symlink(target) => {
                write_str(out, b"symlink");
                write_str(out, b"target");
                write_str(out, target.as_bytes());
            }
            NarNode::Directory(entries) => {
                write_str(out, b"directory");
                let mut sorted: Vec<&(String, NarNode)> = entries.iter().collect();
                sorted.sort_by(|a, b| a.0.cmp(&b.0));
                for (name, entry) in sorted {
                    write_str(out, b"entry");
                    write_str(out, b"(");
                    write_str(out, b"name");
                    write_str(out, name.as_bytes());
                    write_str(out, b"node");
                    entry.write(out);
                    write_str(out, b")");
                }
            }
        }
        write_str(out, b")");
    }
}

/// Write a length-prefixed, zero-padded NAR string.
pub fn write_str(out: &mut Vec<u8>, s: &[u8]) {
    out.extend_from_slice(&(s.len() as u64).to_le_bytes());
    out.extend_from_slice(s);
    let pad = (8 - s.len() % 8) % 8;
    out.extend(std::iter::repeat(0u8).take(pad));
}

/// A typical package: an executable, a shared library and a symlink.
pub fn sample_package(name: &str) -> NarNode {
    NarNode::dir([
        (
            "bin",
            NarNode::dir([(name.to_string(), NarNode::exe(format!("#!/bin/sh\necho {name}\n")))]),
        ),
        (
            "lib",
            NarNode::dir([
                (format!("lib{name}.so.1"), NarNode::file(b"\x7fELF".to_vec())),
                (format!("lib{name}.so"), NarNode::symlink(format!("lib{name}.so.1"))),
            ]),
        ),
        (
            "share",
            NarNode::dir([("README", NarNode::file(format!("{name}\n")))]),
        ),
    ])
}
