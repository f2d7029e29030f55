//! Entrypoint discovery and alias targeting.

use std::fs;
use std::path::Path;

use crate::resolver::RepositoryEntry;

/// List the entries of `<package_dir>/bin`, sorted.
///
/// A missing or unreadable directory yields no binaries. Subdirectories
/// are skipped; symlinks are kept.
pub fn discover_binaries(package_dir: &Path) -> Vec<String> {
    let bin_dir = package_dir.join("bin");
    let Ok(entries) = fs::read_dir(&bin_dir) else {
        tracing::debug!("no binaries in {}", bin_dir.display());
        return Vec::new();
    };

    let mut names: Vec<String> = entries
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().map(|t| !t.is_dir()).unwrap_or(false))
        .filter_map(|e| e.file_name().into_string().ok())
        .collect();
    names.sort();
    names
}

/// The file name of a declared entrypoint path.
pub fn entrypoint_target(entrypoint: &str) -> Option<&str> {
    Path::new(entrypoint)
        .file_name()
        .and_then(|n| n.to_str())
        .filter(|n| !n.is_empty())
}

/// Wrapper target name for a declared entrypoint.
///
/// This is the entrypoint's file name, suffixed with `_entrypoint` when a
/// different file of that name is a discovered binary.
pub fn declared_wrapper_name(entrypoint: &str, binaries: &[String]) -> Option<String> {
    let target = entrypoint_target(entrypoint)?;
    let shadows_binary = binaries.iter().any(|b| b == target)
        && Path::new(entrypoint) != Path::new("bin").join(target);
    if shadows_binary {
        Some(format!("{}_entrypoint", target))
    } else {
        Some(target.to_string())
    }
}

/// What a repository alias points at, in order of preference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AliasTarget {
    /// The wrapper for the user-declared entrypoint
    Declared(String),
    /// The wrapper for a binary named like the repository
    Binary(String),
    /// The whole-package filegroup
    Package,
    /// A single-file package, whose filegroup lives in the root package
    File,
}

impl AliasTarget {
    /// Pick the target for repository `name`.
    pub fn resolve(name: &str, entry: &RepositoryEntry, binaries: &[String]) -> Self {
        if let Some(target) = entry
            .entrypoint
            .as_deref()
            .and_then(|e| declared_wrapper_name(e, binaries))
        {
            return AliasTarget::Declared(target);
        }
        if binaries.iter().any(|b| b == name) {
            return AliasTarget::Binary(name.to_string());
        }
        AliasTarget::Package
    }

    /// The Bazel label of this target inside package `basename`.
    pub fn label(&self, basename: &str) -> String {
        match self {
            AliasTarget::Declared(target) | AliasTarget::Binary(target) => {
                format!("//{}:{}", basename, target)
            }
            AliasTarget::Package => format!("//{}:{}", basename, basename),
            AliasTarget::File => format!("//:{}", basename),
        }
    }
}
