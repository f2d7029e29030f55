//! Source trait - common interface for package metadata and archives.

use std::io::Read;

use crate::resolver::errors::ResolveError;
use crate::sources::narinfo::NarInfo;
use crate::store::errors::FetchError;

/// An archive body, read as it arrives.
pub type ArchiveStream = Box<dyn Read + Send>;

/// A source of package metadata and archives.
///
/// Implementations must be shareable across the fetch worker pool.
pub trait Source: Sync {
    /// Get the source name for display.
    fn name(&self) -> &str;

    /// Fetch the `.narinfo` for a store path content hash.
    fn narinfo(&self, hash: &str) -> Result<NarInfo, ResolveError>;

    /// Resolve a symbolic package name to a store path.
    ///
    /// `channel` replaces the default jobset list when given.
    fn resolve_name(&self, package: &str, channel: Option<&str>) -> Result<String, ResolveError>;

    /// Start downloading an archive by its cache-relative URL.
    ///
    /// Errors that surface mid-stream come out of the reader.
    fn download(&self, url: &str) -> Result<ArchiveStream, FetchError>;
}
