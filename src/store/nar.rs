//! Streaming NAR decoder.
//!
//! A NAR is a sequence of length-prefixed strings: a little-endian `u64`
//! length, the bytes, then zero padding to a multiple of 8. The archive is
//! the magic `nix-archive-1` followed by one node:
//!
//! ```text
//! node  = "(" "type" ( regular | symlink | directory ) ")"
//! regular   = "regular" [ "executable" "" ] "contents" <bytes>
//! symlink   = "symlink" "target" <target>
//! directory = "directory" { "entry" "(" "name" <name> "node" node ")" }
//! ```
//!
//! `NarReader` yields entries in archive order with paths relative to the
//! archive root. The root itself is yielded first with an empty path. File
//! contents are not read with the entry: `copy_contents` streams them to a
//! writer, and contents left unread are skipped by the next `next_entry`.

use std::io::{self, Read, Write};
use std::path::PathBuf;

use thiserror::Error;

const NAR_MAGIC: &[u8] = b"nix-archive-1";

/// Upper bound for names, targets and structural tokens.
const MAX_TOKEN_LEN: u64 = 4096;

/// Error decoding a NAR.
#[derive(Debug, Error)]
pub enum NarError {
    #[error("I/O error reading archive: {0}")]
    Io(#[from] io::Error),

    #[error("malformed archive: {0}")]
    Format(String),

    #[error("invalid entry name `{0}`")]
    InvalidName(String),
}

/// What an entry is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryKind {
    Directory,
    File { executable: bool, size: u64 },
    Symlink { target: String },
}

/// One archive entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// Path relative to the archive root (empty for the root)
    pub path: PathBuf,
    pub kind: EntryKind,
}

/// Sequential reader of NAR entries.
pub struct NarReader<R> {
    reader: R,
    started: bool,
    /// Open directories, innermost last.
    dirs: Vec<PathBuf>,
    /// Length of the current file's contents, while they are unread.
    pending: Option<u64>,
}

impl<R: Read> NarReader<R> {
    pub fn new(reader: R) -> Self {
        NarReader {
            reader,
            started: false,
            dirs: Vec::new(),
            pending: None,
        }
    }

    /// Copy the contents of the file entry just returned into `out`.
    pub fn copy_contents<W: Write + ?Sized>(&mut self, out: &mut W) -> Result<u64, NarError> {
        let Some(len) = self.pending.take() else {
            return Err(NarError::Format("no file contents to read".to_string()));
        };

        let copied = io::copy(&mut (&mut self.reader).take(len), out)?;
        if copied != len {
            return Err(NarError::Io(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "archive truncated",
            )));
        }

        self.read_padding(len)?;
        self.expect(b")")?;
        // Close the `entry` wrapper unless the file is the archive root.
        if !self.dirs.is_empty() {
            self.expect(b")")?;
        }
        Ok(len)
    }

    /// Read the next entry, or `None` at the end of the archive.
    pub fn next_entry(&mut self) -> Result<Option<Entry>, NarError> {
        if self.pending.is_some() {
            self.copy_contents(&mut io::sink())?;
        }

        if !self.started {
            self.started = true;
            let magic = self.read_token()?;
            if magic != NAR_MAGIC {
                return Err(NarError::Format("missing nix-archive-1 header".to_string()));
            }
            return self.read_node(PathBuf::new()).map(Some);
        }

        loop {
            let Some(dir) = self.dirs.last().cloned() else {
                return Ok(None);
            };

            let token = self.read_token()?;
            match token.as_slice() {
                b")" => {
                    self.dirs.pop();
                    // Close the `entry` wrapper around a nested directory.
                    if !self.dirs.is_empty() {
                        self.expect(b")")?;
                    }
                }
                b"entry" => {
                    self.expect(b"(")?;
                    self.expect(b"name")?;
                    let name = self.read_name()?;
                    self.expect(b"node")?;
                    let entry = self.read_node(dir.join(name))?;
                    if let EntryKind::Symlink { .. } = entry.kind {
                        self.expect(b")")?;
                    }
                    return Ok(Some(entry));
                }
                other => {
                    return Err(NarError::Format(format!(
                        "unexpected `{}` in directory {}",
                        String::from_utf8_lossy(other),
                        dir.display()
                    )))
                }
            }
        }
    }

    fn read_node(&mut self, path: PathBuf) -> Result<Entry, NarError> {
        self.expect(b"(")?;
        self.expect(b"type")?;

        let node_type = self.read_token()?;
        let kind = match node_type.as_slice() {
            b"regular" => {
                let mut token = self.read_token()?;
                let mut executable = false;
                if token == b"executable" {
                    executable = true;
                    self.expect(b"")?;
                    token = self.read_token()?;
                }
                if token != b"contents" {
                    return Err(NarError::Format(format!(
                        "expected `contents` for {}",
                        path.display()
                    )));
                }
                let size = self.read_len()?;
                self.pending = Some(size);
                EntryKind::File { executable, size }
            }
            b"symlink" => {
                self.expect(b"target")?;
                let target = String::from_utf8(self.read_token()?).map_err(|_| {
                    NarError::Format(format!("non-UTF-8 symlink target at {}", path.display()))
                })?;
                self.expect(b")")?;
                EntryKind::Symlink { target }
            }
            b"directory" => {
                self.dirs.push(path.clone());
                EntryKind::Directory
            }
            other => {
                return Err(NarError::Format(format!(
                    "unknown node type `{}`",
                    String::from_utf8_lossy(other)
                )))
            }
        };

        Ok(Entry { path, kind })
    }

    fn read_name(&mut self) -> Result<String, NarError> {
        let raw = self.read_token()?;
        let name = String::from_utf8(raw)
            .map_err(|e| NarError::InvalidName(String::from_utf8_lossy(e.as_bytes()).into_owned()))?;
        if !is_valid_name(&name) {
            return Err(NarError::InvalidName(name));
        }
        Ok(name)
    }

    fn expect(&mut self, expected: &[u8]) -> Result<(), NarError> {
        let token = self.read_token()?;
        if token != expected {
            return Err(NarError::Format(format!(
                "expected `{}`, found `{}`",
                String::from_utf8_lossy(expected),
                String::from_utf8_lossy(&token)
            )));
        }
        Ok(())
    }

    fn read_token(&mut self) -> Result<Vec<u8>, NarError> {
        self.read_bytes(MAX_TOKEN_LEN)
    }

    fn read_len(&mut self) -> Result<u64, NarError> {
        let mut len_buf = [0u8; 8];
        self.reader.read_exact(&mut len_buf)?;
        Ok(u64::from_le_bytes(len_buf))
    }

    fn read_bytes(&mut self, max_len: u64) -> Result<Vec<u8>, NarError> {
        let len = self.read_len()?;
        if len > max_len {
            return Err(NarError::Format(format!("string of {} bytes is too long", len)));
        }

        let mut data = Vec::new();
        let read = (&mut self.reader).take(len).read_to_end(&mut data)? as u64;
        if read != len {
            return Err(NarError::Io(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "archive truncated",
            )));
        }

        self.read_padding(len)?;
        Ok(data)
    }

    fn read_padding(&mut self, len: u64) -> Result<(), NarError> {
        let pad = ((8 - len % 8) % 8) as usize;
        if pad > 0 {
            let mut padding = [0u8; 8];
            self.reader.read_exact(&mut padding[..pad])?;
            if padding[..pad].iter().any(|&b| b != 0) {
                return Err(NarError::Format("non-zero padding".to_string()));
            }
        }
        Ok(())
    }
}

/// Entry names are single path components that stay inside their parent.
pub fn is_valid_name(name: &str) -> bool {
    !name.is_empty() && name != "." && name != ".." && !name.contains('/') && !name.contains('\0')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::fixtures::{write_str, NarNode};

    /// Every entry, without reading file contents.
    fn entries(nar: &[u8]) -> Result<Vec<Entry>, NarError> {
        let mut reader = NarReader::new(nar);
        let mut out = Vec::new();
        while let Some(entry) = reader.next_entry()? {
            out.push(entry);
        }
        Ok(out)
    }

    /// Every file path with its contents.
    fn files(nar: &[u8]) -> Result<Vec<(String, Vec<u8>)>, NarError> {
        let mut reader = NarReader::new(nar);
        let mut out = Vec::new();
        while let Some(entry) = reader.next_entry()? {
            if let EntryKind::File { .. } = entry.kind {
                let mut contents = Vec::new();
                reader.copy_contents(&mut contents)?;
                out.push((entry.path.display().to_string(), contents));
            }
        }
        Ok(out)
    }

    #[test]
    fn test_single_file_archive() {
        let nar = NarNode::exe(b"hello".to_vec()).to_nar();
        let all = entries(&nar).unwrap();

        assert_eq!(all.len(), 1);
        assert_eq!(all[0].path, PathBuf::new());
        assert_eq!(
            all[0].kind,
            EntryKind::File {
                executable: true,
                size: 5
            }
        );
        assert_eq!(files(&nar).unwrap(), vec![(String::new(), b"hello".to_vec())]);
    }

    #[test]
    fn test_contents_stream_in_order() {
        let big = vec![0xabu8; 1024 * 1024 + 3];
        let tree = NarNode::dir([
            ("a", NarNode::file(b"first".to_vec())),
            ("b", NarNode::dir([("c", NarNode::file(big.clone()))])),
            ("d", NarNode::exe(b"#!/bin/sh\n".to_vec())),
        ]);

        let all = files(&tree.to_nar()).unwrap();
        assert_eq!(
            all,
            vec![
                ("a".to_string(), b"first".to_vec()),
                ("b/c".to_string(), big),
                ("d".to_string(), b"#!/bin/sh\n".to_vec()),
            ]
        );
    }

    #[test]
    fn test_copy_contents_requires_a_file() {
        let nar = NarNode::dir([("x", NarNode::symlink("y"))]).to_nar();
        let mut reader = NarReader::new(&nar[..]);
        reader.next_entry().unwrap();

        let err = reader.copy_contents(&mut Vec::new()).unwrap_err();
        assert!(matches!(err, NarError::Format(_)));
    }

    #[test]
    fn test_nested_directories() {
        let tree = NarNode::dir([
            (
                "bin",
                NarNode::dir([("git", NarNode::exe(b"#!/bin/sh\n".to_vec()))]),
            ),
            (
                "lib",
                NarNode::dir([
                    ("libgit.so", NarNode::symlink("libgit.so.2")),
                    ("libgit.so.2", NarNode::file(b"\x7fELF".to_vec())),
                ]),
            ),
            ("README", NarNode::file(b"readme".to_vec())),
        ]);
        let all = entries(&tree.to_nar()).unwrap();

        let paths: Vec<String> = all.iter().map(|e| e.path.display().to_string()).collect();
        assert_eq!(
            paths,
            vec![
                "",
                "README",
                "bin",
                "bin/git",
                "lib",
                "lib/libgit.so",
                "lib/libgit.so.2"
            ]
        );
        assert_eq!(
            all[5].kind,
            EntryKind::Symlink {
                target: "libgit.so.2".to_string()
            }
        );
    }

    #[test]
    fn test_empty_contents_and_empty_dir() {
        let tree = NarNode::dir([
            ("empty", NarNode::file(Vec::new())),
            ("nothing", NarNode::dir(Vec::<(String, NarNode)>::new())),
        ]);
        let all = entries(&tree.to_nar()).unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[2].kind, EntryKind::Directory);
    }

    #[test]
    fn test_rejects_escaping_names() {
        for bad in ["..", ".", "", "a/b", "nul\0byte"] {
            let tree = NarNode::dir([(bad, NarNode::file(b"x".to_vec()))]);
            let err = entries(&tree.to_nar()).unwrap_err();
            assert!(matches!(err, NarError::InvalidName(_)), "{bad:?}: {err}");
        }
    }

    #[test]
    fn test_rejects_bad_magic() {
        let mut nar = Vec::new();
        write_str(&mut nar, b"not-a-nar");
        assert!(matches!(entries(&nar), Err(NarError::Format(_))));
    }

    #[test]
    fn test_rejects_truncated_archive() {
        let nar = NarNode::file(b"some contents".to_vec()).to_nar();
        let truncated = &nar[..nar.len() - 20];
        assert!(entries(truncated).is_err());
    }
}
