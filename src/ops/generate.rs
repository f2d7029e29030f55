//! Build file generation from a lockfile on disk.

use std::path::Path;

use anyhow::{Context, Result};

use crate::codegen::{generate, GenerateOptions, GenerateSummary};
use crate::ops::lockfile::require_lockfile;

/// Load `lockfile_path` and write build files for it.
pub fn generate_from_lockfile(
    lockfile_path: &Path,
    options: &GenerateOptions,
) -> Result<GenerateSummary> {
    let lock = require_lockfile(lockfile_path)?;
    generate(&lock, options)
        .with_context(|| format!("failed to generate build files in {}", options.out_dir.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::{Lockfile, RepositoryEntry};
    use crate::test_support::fixtures::{basename, store_path, table};
    use tempfile::TempDir;

    #[test]
    fn test_generate_from_saved_lockfile() {
        let tmp = TempDir::new().unwrap();
        let lock_path = tmp.path().join("nix_deps.lock.json");
        let mut lock = Lockfile {
            packages: table(&[("hello", &["glibc"]), ("glibc", &[])]),
            ..Lockfile::default()
        };
        lock.repositories.insert(
            "hello".to_string(),
            RepositoryEntry {
                store_path: store_path("hello"),
                entrypoint: None,
            },
        );
        lock.save(&lock_path).unwrap();

        let out = tmp.path().join("out");
        let summary = generate_from_lockfile(&lock_path, &GenerateOptions::new(&out)).unwrap();

        assert_eq!(summary.packages, 2);
        assert!(out.join(basename("glibc")).join("BUILD.bazel").is_file());
        assert!(out.join("BUILD.bazel").is_file());
    }

    #[test]
    fn test_missing_lockfile() {
        let tmp = TempDir::new().unwrap();
        let err = generate_from_lockfile(
            &tmp.path().join("nix_deps.lock.json"),
            &GenerateOptions::new(tmp.path()),
        )
        .unwrap_err();

        assert!(err.to_string().contains("lockfile not found"));
    }
}
