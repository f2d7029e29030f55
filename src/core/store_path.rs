//! Store path conventions.
//!
//! A store path looks like `/nix/store/<hash>-<name>`, where `<hash>` is 32
//! characters of Nix base32. Narinfo references and Bazel package names use
//! the basename; the package table is keyed by the full path.

use std::path::Path;

/// The Nix store directory.
pub const STORE_DIR: &str = "/nix/store";

/// Length of the content hash prefix of a store path basename.
pub const HASH_LEN: usize = 32;

/// The basename of a store path (`<hash>-<name>`).
///
/// Basenames pass through unchanged.
pub fn basename(store_path: &str) -> &str {
    let trimmed = store_path.trim_end_matches('/');
    match trimmed.rfind('/') {
        Some(idx) => &trimmed[idx + 1..],
        None => trimmed,
    }
}

/// Extract the content hash from a store path, basename, or bare hash.
///
/// Returns `None` when the first `-`-separated segment of the basename is
/// not exactly 32 characters long.
pub fn extract_hash(path: &str) -> Option<&str> {
    let base = basename(path);
    let hash = base.split('-').next()?;
    if hash.len() == HASH_LEN && hash.bytes().all(|b| b.is_ascii_alphanumeric()) {
        Some(hash)
    } else {
        None
    }
}

/// Expand a narinfo reference (a basename) to a full store path.
pub fn from_reference(reference: &str) -> String {
    if reference.starts_with('/') {
        reference.to_string()
    } else {
        format!("{}/{}", STORE_DIR, reference)
    }
}

/// Whether `path` looks like a store path with a content hash.
pub fn is_store_path(path: &str) -> bool {
    Path::new(path).parent() == Some(Path::new(STORE_DIR))
        && extract_hash(path).is_some()
        && basename(path).len() > HASH_LEN + 1
}
