//! Lockfile encoding and decoding.
//!
//! `nix_deps.lock.json` records the store path each repository resolved to
//! and the metadata of every store path in their closures.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::core::PackageTable;
use crate::util::fs::write_atomic;

/// Default lockfile name.
pub const LOCKFILE_NAME: &str = "nix_deps.lock.json";

/// The lockfile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lockfile {
    /// Repository name to resolved store path
    #[serde(default)]
    pub repositories: BTreeMap<String, RepositoryEntry>,

    /// Store path to package metadata
    #[serde(default)]
    pub packages: PackageTable,
}

/// A locked repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryEntry {
    pub store_path: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entrypoint: Option<String>,
}

impl Lockfile {
    /// Parse lockfile JSON.
    pub fn parse(content: &str) -> Result<Self> {
        serde_json::from_str(content).context("failed to parse lockfile")
    }

    /// Load a lockfile from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read lockfile: {}", path.display()))?;

        Self::parse(&content).with_context(|| format!("invalid lockfile: {}", path.display()))
    }

    /// Serialize to pretty JSON with sorted keys and a trailing newline.
    pub fn to_json(&self) -> Result<String> {
        let mut out =
            serde_json::to_string_pretty(self).context("failed to serialize lockfile")?;
        out.push('\n');
        Ok(out)
    }

    /// Write the lockfile, replacing any previous file in one rename.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = self.to_json()?;
        write_atomic(path, content.as_bytes())
    }

    /// The store path locked for a repository.
    pub fn store_path_of(&self, repository: &str) -> Option<&str> {
        self.repositories
            .get(repository)
            .map(|entry| entry.store_path.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::fixtures::{node, store_path};
    use tempfile::TempDir;

    fn sample() -> Lockfile {
        let mut lock = Lockfile::default();
        lock.repositories.insert(
            "git".to_string(),
            RepositoryEntry {
                store_path: store_path("git"),
                entrypoint: Some("bin/git".to_string()),
            },
        );
        lock.repositories.insert(
            "curl".to_string(),
            RepositoryEntry {
                store_path: store_path("curl"),
                entrypoint: None,
            },
        );
        lock.packages.insert_new(store_path("git"), node("git", &["curl"]));
        lock.packages.insert_new(store_path("curl"), node("curl", &[]));
        lock
    }

    #[test]
    fn test_save_and_load() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(LOCKFILE_NAME);

        let lock = sample();
        lock.save(&path).unwrap();

        assert_eq!(Lockfile::load(&path).unwrap(), lock);
    }

    #[test]
    fn test_json_shape() {
        let json = sample().to_json().unwrap();

        assert!(json.ends_with("}\n"));
        assert!(json.contains("\"storePath\""));
        // No entrypoint key for repositories without one.
        assert_eq!(json.matches("\"entrypoint\"").count(), 1);
        // Keys are sorted: curl before git.
        assert!(json.find("\"curl\"").unwrap() < json.find("\"git\"").unwrap());
    }

    #[test]
    fn test_serialization_is_stable() {
        let a = sample().to_json().unwrap();
        let b = Lockfile::parse(&a).unwrap().to_json().unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_accepts_missing_sections() {
        let lock = Lockfile::parse("{}").unwrap();
        assert!(lock.repositories.is_empty());
        assert!(lock.packages.is_empty());
    }
}
