//! Configuration file support for nixbazel.
//!
//! Two configuration file locations are consulted:
//! - Global: `<config-dir>/nixbazel/config.toml` - User-wide defaults
//! - Project: `.nixbazel/config.toml` - Project-specific overrides
//!
//! Project config takes precedence over global config. Command-line flags
//! take precedence over both.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Default binary cache serving `.narinfo` files and archives.
pub const DEFAULT_CACHE_URL: &str = "https://cache.nixos.org";

/// Default Hydra instance used to resolve package names.
pub const DEFAULT_HYDRA_URL: &str = "https://hydra.nixos.org";

/// Jobsets tried, in order, when no channel is given.
pub const DEFAULT_JOBSETS: &[&str] = &["nixpkgs/trunk", "nixos/trunk-combined"];

/// nixbazel configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Network settings
    pub net: NetConfig,

    /// Archive fetch settings
    pub fetch: FetchConfig,

    /// External tool overrides
    pub tools: ToolsConfig,
}

/// Network-related configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NetConfig {
    /// Binary cache base URL
    pub cache_url: Option<String>,

    /// Hydra base URL
    pub hydra_url: Option<String>,

    /// Jobsets to try when resolving a package name without a channel
    #[serde(default)]
    pub jobsets: Vec<String>,
}

/// Fetch-related configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Number of parallel downloads (None = number of CPUs)
    pub jobs: Option<usize>,
}

/// Paths to external tools. Unset tools are looked up in PATH.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub patchelf: Option<PathBuf>,
    pub xz: Option<PathBuf>,
    pub bzip2: Option<PathBuf>,
    pub zstd: Option<PathBuf>,
}

impl Config {
    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("failed to parse config file: {}", path.display()))
    }

    /// Load configuration with fallback to defaults if file doesn't exist.
    pub fn load_or_default(path: &Path) -> Self {
        if path.exists() {
            Self::load(path).unwrap_or_else(|e| {
                tracing::warn!("Failed to load config from {}: {:#}", path.display(), e);
                Self::default()
            })
        } else {
            Self::default()
        }
    }

    /// Merge another config into this one (other takes precedence).
    pub fn merge(&mut self, other: Config) {
        // Net settings
        if other.net.cache_url.is_some() {
            self.net.cache_url = other.net.cache_url;
        }
        if other.net.hydra_url.is_some() {
            self.net.hydra_url = other.net.hydra_url;
        }
        if !other.net.jobsets.is_empty() {
            self.net.jobsets = other.net.jobsets;
        }

        // Fetch settings
        if other.fetch.jobs.is_some() {
            self.fetch.jobs = other.fetch.jobs;
        }

        // Tools
        if other.tools.patchelf.is_some() {
            self.tools.patchelf = other.tools.patchelf;
        }
        if other.tools.xz.is_some() {
            self.tools.xz = other.tools.xz;
        }
        if other.tools.bzip2.is_some() {
            self.tools.bzip2 = other.tools.bzip2;
        }
        if other.tools.zstd.is_some() {
            self.tools.zstd = other.tools.zstd;
        }
    }

    /// Binary cache URL without a trailing slash.
    pub fn cache_url(&self) -> &str {
        self.net
            .cache_url
            .as_deref()
            .unwrap_or(DEFAULT_CACHE_URL)
            .trim_end_matches('/')
    }

    /// Hydra URL without a trailing slash.
    pub fn hydra_url(&self) -> &str {
        self.net
            .hydra_url
            .as_deref()
            .unwrap_or(DEFAULT_HYDRA_URL)
            .trim_end_matches('/')
    }

    /// Jobsets to try, in priority order.
    pub fn jobsets(&self) -> Vec<String> {
        if self.net.jobsets.is_empty() {
            DEFAULT_JOBSETS.iter().map(|s| s.to_string()).collect()
        } else {
            self.net.jobsets.clone()
        }
    }
}

/// Load merged configuration from global and project locations.
///
/// Order of precedence (highest to lowest):
/// 1. Project config (.nixbazel/config.toml)
/// 2. Global config (<config-dir>/nixbazel/config.toml)
/// 3. Defaults
pub fn load_config(global_path: Option<&Path>, project_path: &Path) -> Config {
    let mut config = Config::default();

    if let Some(global_path) = global_path {
        config.merge(Config::load_or_default(global_path));
    }

    config.merge(Config::load_or_default(project_path));

    config
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.cache_url(), "https://cache.nixos.org");
        assert_eq!(config.hydra_url(), "https://hydra.nixos.org");
        assert_eq!(config.jobsets(), vec!["nixpkgs/trunk", "nixos/trunk-combined"]);
        assert!(config.fetch.jobs.is_none());
        assert!(config.tools.patchelf.is_none());
    }

    #[test]
    fn test_config_load() {
        let tmp = TempDir::new().unwrap();
        let config_path = tmp.path().join("config.toml");

        std::fs::write(
            &config_path,
            r#"
[net]
cache_url = "https://mirror.example.com/"
jobsets = ["nixpkgs/staging"]

[fetch]
jobs = 8

[tools]
patchelf = "/opt/bin/patchelf"
"#,
        )
        .unwrap();

        let config = Config::load(&config_path).unwrap();
        assert_eq!(config.cache_url(), "https://mirror.example.com");
        assert_eq!(config.jobsets(), vec!["nixpkgs/staging"]);
        assert_eq!(config.fetch.jobs, Some(8));
        assert_eq!(
            config.tools.patchelf,
            Some(PathBuf::from("/opt/bin/patchelf"))
        );
    }

    #[test]
    fn test_config_merge() {
        let mut base = Config::default();
        base.net.cache_url = Some("https://a.example".to_string());
        base.fetch.jobs = Some(4);

        let mut override_cfg = Config::default();
        override_cfg.net.cache_url = Some("https://b.example".to_string());

        base.merge(override_cfg);

        assert_eq!(base.cache_url(), "https://b.example");
        assert_eq!(base.fetch.jobs, Some(4)); // Not overridden
    }

    #[test]
    fn test_load_config_precedence() {
        let tmp = TempDir::new().unwrap();
        let global_path = tmp.path().join("global.toml");
        let project_path = tmp.path().join("project.toml");

        std::fs::write(
            &global_path,
            "[net]\nhydra_url = \"https://hydra.example\"\n\n[fetch]\njobs = 2\n",
        )
        .unwrap();
        std::fs::write(&project_path, "[fetch]\njobs = 16\n").unwrap();

        let config = load_config(Some(&global_path), &project_path);

        assert_eq!(config.hydra_url(), "https://hydra.example");
        assert_eq!(config.fetch.jobs, Some(16));
    }

    #[test]
    fn test_invalid_config_falls_back_to_default() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(&path, "[fetch\njobs = ").unwrap();

        let config = Config::load_or_default(&path);
        assert!(config.fetch.jobs.is_none());
    }
}
