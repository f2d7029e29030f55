//! Package sources.
//!
//! Sources answer three questions: what is the store path of a package
//! name, what does the cache know about a store path, and what are the
//! bytes of an archive.

pub mod binary_cache;
pub mod hydra;
pub mod narinfo;
pub mod nix;
pub mod source;

pub use narinfo::NarInfo;
pub use nix::NixSource;
pub use source::{ArchiveStream, Source};
