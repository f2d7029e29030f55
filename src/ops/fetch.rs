//! Materializing locked packages.

use std::path::PathBuf;

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;

use crate::core::PackageNode;
use crate::resolver::{Lockfile, PackageGraph};
use crate::sources::Source;
use crate::store::{materialize, Outcome, Tools};
use crate::util::fs::ensure_dir;

/// Options for fetch operations.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// Root of the materialized tree
    pub out_dir: PathBuf,

    /// Number of parallel workers (None = number of CPUs)
    pub jobs: Option<usize>,

    /// External tools for decompression and relocation
    pub tools: Tools,

    /// Draw a progress bar
    pub progress: bool,
}

impl FetchOptions {
    pub fn new(out_dir: impl Into<PathBuf>, tools: Tools) -> Self {
        FetchOptions {
            out_dir: out_dir.into(),
            jobs: None,
            tools,
            progress: false,
        }
    }
}

/// Counts of what a fetch did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchSummary {
    pub unpacked: usize,
    pub skipped: usize,
    pub patched: usize,
}

impl FetchSummary {
    fn add(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Skipped => self.skipped += 1,
            Outcome::Unpacked { patched } => {
                self.unpacked += 1;
                self.patched += patched;
            }
        }
    }
}

/// Materialize every package in the lockfile.
pub fn fetch_all(
    lock: &Lockfile,
    source: &dyn Source,
    options: &FetchOptions,
) -> Result<FetchSummary> {
    let packages: Vec<(&str, &PackageNode)> = lock.packages.iter().collect();
    fetch_packages(&packages, source, options)
}

/// Materialize the closure of one repository.
pub fn fetch_repository(
    lock: &Lockfile,
    repository: &str,
    source: &dyn Source,
    options: &FetchOptions,
) -> Result<FetchSummary> {
    let root = lock
        .store_path_of(repository)
        .with_context(|| format!("repository `{}` is not in the lockfile", repository))?;
    let root_node = lock.packages.get(root).with_context(|| {
        format!(
            "repository `{}` is locked to {}, which has no package entry",
            repository, root
        )
    })?;

    let graph = PackageGraph::from_table(&lock.packages);
    let mut packages = vec![(root, root_node)];
    for path in graph.transitive_closure(root) {
        if let Some(node) = lock.packages.get(path) {
            packages.push((path, node));
        }
    }

    fetch_packages(&packages, source, options)
}

fn fetch_packages(
    packages: &[(&str, &PackageNode)],
    source: &dyn Source,
    options: &FetchOptions,
) -> Result<FetchSummary> {
    ensure_dir(&options.out_dir)?;
    options.tools.warn_missing();

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(options.jobs.unwrap_or(0))
        .build()
        .context("failed to start fetch workers")?;

    let pb = progress_bar(packages.len(), options.progress);
    tracing::info!("Fetching {} packages", packages.len());

    let outcomes: Result<Vec<Outcome>> = pool.install(|| {
        packages
            .par_iter()
            .map(|(path, node)| -> Result<Outcome> {
                let outcome = materialize(path, node, &options.out_dir, source, &options.tools)
                    .with_context(|| format!("failed to fetch {}", path))?;
                pb.inc(1);
                Ok(outcome)
            })
            .collect()
    });

    let outcomes = match outcomes {
        Ok(outcomes) => outcomes,
        Err(e) => {
            pb.abandon();
            return Err(e);
        }
    };
    pb.finish_and_clear();

    let mut summary = FetchSummary::default();
    for outcome in outcomes {
        summary.add(outcome);
    }

    tracing::info!(
        "Unpacked {} packages ({} already present, {} objects relocated)",
        summary.unpacked,
        summary.skipped,
        summary.patched
    );
    Ok(summary)
}

fn progress_bar(total: usize, enabled: bool) -> ProgressBar {
    if !enabled || total <= 1 {
        return ProgressBar::hidden();
    }

    let pb = ProgressBar::new(total as u64);
    let style = ProgressStyle::default_bar()
        .template("{spinner:.green} Fetching [{bar:40.cyan/blue}] {pos}/{len}")
        .map(|style| style.progress_chars("#>-"))
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    pb.set_style(style);
    pb
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::RepositoryEntry;
    use crate::test_support::fixtures::{archive_url, basename, sample_package, store_path, table};
    use crate::test_support::MockSource;
    use tempfile::TempDir;

    fn diamond() -> (Lockfile, MockSource) {
        // app -> left, app -> right, left -> base, right -> base
        let mut lock = Lockfile {
            packages: table(&[
                ("app", &["left", "right"]),
                ("left", &["base"]),
                ("right", &["base"]),
                ("base", &[]),
                ("other", &[]),
            ]),
            ..Lockfile::default()
        };
        lock.repositories.insert(
            "app".to_string(),
            RepositoryEntry {
                store_path: store_path("app"),
                entrypoint: None,
            },
        );

        let mut source = MockSource::new();
        for name in ["app", "left", "right", "base", "other"] {
            source = source.with_archive(name, sample_package(name).to_nar());
        }
        (lock, source)
    }

    #[test]
    fn test_fetch_all_downloads_each_package_once() {
        let tmp = TempDir::new().unwrap();
        let (lock, source) = diamond();
        let mut options = FetchOptions::new(tmp.path(), Tools::default());
        options.jobs = Some(4);

        let summary = fetch_all(&lock, &source, &options).unwrap();

        assert_eq!(summary.unpacked, 5);
        assert_eq!(source.download_calls(&archive_url("base")), 1);
        assert!(tmp.path().join(basename("base")).join("bin/base").is_file());
    }

    #[test]
    fn test_second_fetch_skips_everything() {
        let tmp = TempDir::new().unwrap();
        let (lock, source) = diamond();
        let options = FetchOptions::new(tmp.path(), Tools::default());

        fetch_all(&lock, &source, &options).unwrap();
        let summary = fetch_all(&lock, &source, &options).unwrap();

        assert_eq!(summary.unpacked, 0);
        assert_eq!(summary.skipped, 5);
        assert_eq!(source.total_download_calls(), 5);
    }

    #[test]
    fn test_fetch_repository_only_fetches_its_closure() {
        let tmp = TempDir::new().unwrap();
        let (lock, source) = diamond();
        let options = FetchOptions::new(tmp.path(), Tools::default());

        let summary = fetch_repository(&lock, "app", &source, &options).unwrap();

        assert_eq!(summary.unpacked, 4);
        assert_eq!(source.download_calls(&archive_url("other")), 0);
        assert!(!tmp.path().join(basename("other")).exists());
    }

    #[test]
    fn test_unknown_repository() {
        let tmp = TempDir::new().unwrap();
        let (lock, source) = diamond();
        let options = FetchOptions::new(tmp.path(), Tools::default());

        let err = fetch_repository(&lock, "nope", &source, &options).unwrap_err();
        assert!(err.to_string().contains("`nope`"));
    }

    #[test]
    fn test_missing_archive_names_store_path() {
        let tmp = TempDir::new().unwrap();
        let lock = Lockfile {
            packages: table(&[("lost", &[])]),
            ..Lockfile::default()
        };
        let options = FetchOptions::new(tmp.path(), Tools::default());

        let err = fetch_all(&lock, &MockSource::new(), &options).unwrap_err();
        assert!(err.to_string().contains(&store_path("lost")));
        assert!(!tmp.path().join(basename("lost")).exists());
    }
}
