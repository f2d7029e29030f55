//! Test utilities and mocks for nixbazel unit tests.
//!
//! `MockSource` stands in for the binary cache and Hydra so resolution and
//! materialization can be tested without a network. It counts every call,
//! which is how the memoization properties are asserted.
//!
//! # Example
//!
//! ```rust,ignore
//! use nixbazel::test_support::{fixtures, MockSource};
//!
//! let source = MockSource::new()
//!     .with_name("nixpkgs.git", "git")
//!     .with_package("git", &["curl"])
//!     .with_package("curl", &[]);
//! assert_eq!(source.total_narinfo_calls(), 0);
//! ```

pub mod fixtures;

use std::collections::HashMap;
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::resolver::errors::ResolveError;
use crate::sources::{ArchiveStream, NarInfo, Source};
use crate::store::errors::FetchError;

pub use fixtures::NarNode;

/// In-memory `Source` with call counters.
#[derive(Debug, Default)]
pub struct MockSource {
    narinfos: HashMap<String, String>,
    names: HashMap<String, String>,
    archives: HashMap<String, Vec<u8>>,
    narinfo_calls: Mutex<HashMap<String, usize>>,
    download_calls: Mutex<HashMap<String, usize>>,
    resolve_calls: AtomicUsize,
    channels: Mutex<Vec<Option<String>>>,
}

impl MockSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve a narinfo for fixture package `name`.
    pub fn with_package(mut self, name: &str, references: &[&str]) -> Self {
        self.narinfos
            .insert(fixtures::hash(name), fixtures::narinfo_text(name, references));
        self
    }

    /// Serve raw narinfo text for a hash.
    pub fn with_narinfo(mut self, hash: &str, text: impl Into<String>) -> Self {
        self.narinfos.insert(hash.to_string(), text.into());
        self
    }

    /// Resolve package identifier `package` to fixture package `name`.
    pub fn with_name(mut self, package: &str, name: &str) -> Self {
        self.names
            .insert(package.to_string(), fixtures::store_path(name));
        self
    }

    /// Serve archive bytes for fixture package `name`.
    pub fn with_archive(mut self, name: &str, bytes: Vec<u8>) -> Self {
        self.archives.insert(fixtures::archive_url(name), bytes);
        self
    }

    /// Serve archive bytes at an arbitrary URL.
    pub fn with_archive_url(mut self, url: &str, bytes: Vec<u8>) -> Self {
        self.archives.insert(url.to_string(), bytes);
        self
    }

    pub fn narinfo_calls(&self, hash: &str) -> usize {
        lock(&self.narinfo_calls).get(hash).copied().unwrap_or(0)
    }

    pub fn total_narinfo_calls(&self) -> usize {
        lock(&self.narinfo_calls).values().sum()
    }

    pub fn download_calls(&self, url: &str) -> usize {
        lock(&self.download_calls).get(url).copied().unwrap_or(0)
    }

    pub fn total_download_calls(&self) -> usize {
        lock(&self.download_calls).values().sum()
    }

    pub fn resolve_calls(&self) -> usize {
        self.resolve_calls.load(Ordering::SeqCst)
    }

    /// Channels passed to `resolve_name`, in call order.
    pub fn channels(&self) -> Vec<Option<String>> {
        lock(&self.channels).clone()
    }

    /// Total network-equivalent calls of any kind.
    pub fn total_calls(&self) -> usize {
        self.total_narinfo_calls() + self.total_download_calls() + self.resolve_calls()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl Source for MockSource {
    fn name(&self) -> &str {
        "mock"
    }

    fn narinfo(&self, hash: &str) -> Result<NarInfo, ResolveError> {
        *lock(&self.narinfo_calls).entry(hash.to_string()).or_default() += 1;

        let text = self
            .narinfos
            .get(hash)
            .ok_or_else(|| ResolveError::MetadataUnavailable {
                hash: hash.to_string(),
                reason: "HTTP 404 Not Found".to_string(),
            })?;

        let info = NarInfo::parse(text);
        if info.store_path.is_empty() {
            return Err(ResolveError::MetadataUnavailable {
                hash: hash.to_string(),
                reason: "no StorePath".to_string(),
            });
        }
        Ok(info)
    }

    fn resolve_name(&self, package: &str, channel: Option<&str>) -> Result<String, ResolveError> {
        self.resolve_calls.fetch_add(1, Ordering::SeqCst);
        lock(&self.channels).push(channel.map(str::to_string));

        self.names
            .get(package)
            .cloned()
            .ok_or_else(|| ResolveError::ResolutionNotFound {
                package: package.to_string(),
                jobsets: channel.map(|c| vec![c.to_string()]).unwrap_or_default(),
                reason: "HTTP 404 Not Found".to_string(),
            })
    }

    fn download(&self, url: &str) -> Result<ArchiveStream, FetchError> {
        *lock(&self.download_calls).entry(url.to_string()).or_default() += 1;

        let bytes = self
            .archives
            .get(url)
            .cloned()
            .ok_or_else(|| FetchError::DownloadFailed {
                url: url.to_string(),
                reason: "HTTP 404 Not Found".to_string(),
            })?;
        Ok(Box::new(Cursor::new(bytes)))
    }
}
