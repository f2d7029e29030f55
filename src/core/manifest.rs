//! Input configuration (`nix_deps.json`).
//!
//! Declares the repositories to pin: a name, the package identifier to
//! resolve (a Hydra job name like `nixpkgs.git`, or a store path), and an
//! optional entrypoint relative to the package root.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

/// Default input configuration file name.
pub const MANIFEST_NAME: &str = "nix_deps.json";

/// The parsed input configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub repositories: BTreeMap<String, RepositoryConfig>,
}

/// One declared repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryConfig {
    /// Package identifier or store path
    pub package: String,

    /// Entrypoint relative to the package root, e.g. `bin/git`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entrypoint: Option<String>,
}

impl Manifest {
    /// Load the configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config: {}", path.display()))?;

        Self::parse(&content)
            .with_context(|| format!("invalid config: {}", path.display()))
    }

    /// Parse and validate configuration content.
    pub fn parse(content: &str) -> Result<Self> {
        let manifest: Manifest =
            serde_json::from_str(content).context("failed to parse JSON")?;
        manifest.validate()?;
        Ok(manifest)
    }

    fn validate(&self) -> Result<()> {
        for (name, repo) in &self.repositories {
            if !is_valid_repository_name(name) {
                bail!(
                    "repository name `{}` is not a valid Bazel target name \
                     (letters, digits and `{}`)",
                    name,
                    TARGET_NAME_PUNCTUATION
                );
            }
            if repo.package.trim().is_empty() {
                bail!("repository `{}` has an empty `package`", name);
            }
            if let Some(entry) = &repo.entrypoint {
                if entry.is_empty() || entry.starts_with('/') || entry.split('/').any(|c| c == "..")
                {
                    bail!(
                        "repository `{}` entrypoint `{}` must be a relative path inside the package",
                        name,
                        entry
                    );
                }
            }
        }
        Ok(())
    }
}

/// Punctuation Bazel allows in target names, minus the package separator.
const TARGET_NAME_PUNCTUATION: &str = "!%-@^_\"#$&'()*+,;<=>?[]{|}~.";

/// Repository names become target names in the root package.
fn is_valid_repository_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || TARGET_NAME_PUNCTUATION.contains(c))
}
