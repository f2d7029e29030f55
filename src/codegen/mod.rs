//! Bazel build file generation.
//!
//! Every store path in the lockfile becomes a Bazel package named after its
//! basename, holding a filegroup of its files that depends on the
//! filegroups of its whole closure, plus one `nix_binary` per binary. The
//! root package aliases each repository name to its best target.
//!
//! A store path that is a single file cannot hold a `BUILD.bazel`; its
//! filegroup is written to the root package instead.

pub mod build_file;
pub mod entrypoint;
pub mod script;

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::core::store_path;
use crate::resolver::{Lockfile, PackageGraph, LOCKFILE_NAME};
use crate::util::fs::{ensure_dir, set_mode, write_string};

use build_file::{glob_all_except, BuildFile, Rule};
use entrypoint::{declared_wrapper_name, discover_binaries, AliasTarget};

/// Name of the generated build files.
pub const BUILD_FILE_NAME: &str = "BUILD.bazel";

/// Name of the generated re-resolution script.
pub const UPDATE_SCRIPT_NAME: &str = "update_lock.sh";

/// Name of the generated macro file.
pub const NIX_BINARY_BZL_NAME: &str = "nix_binary.bzl";

/// Options for `generate`.
#[derive(Debug, Clone)]
pub struct GenerateOptions {
    /// Root of the materialized tree (the Bazel repository root)
    pub out_dir: PathBuf,
    /// Name of the Bazel repository the tree is mounted as
    pub repo_name: String,
    /// Config file name passed back to `nixbazel resolve`
    pub config_name: String,
    /// Lockfile path, relative to the workspace, written by the script
    pub lockfile_name: String,
    /// Channel passed back to `nixbazel resolve`
    pub channel: Option<String>,
}

impl GenerateOptions {
    pub fn new(out_dir: impl Into<PathBuf>) -> Self {
        GenerateOptions {
            out_dir: out_dir.into(),
            repo_name: "nix_deps".to_string(),
            config_name: crate::core::MANIFEST_NAME.to_string(),
            lockfile_name: LOCKFILE_NAME.to_string(),
            channel: None,
        }
    }
}

/// What `generate` wrote.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerateSummary {
    pub packages: usize,
    pub binaries: usize,
    pub aliases: usize,
    pub dangling: usize,
}

/// Write all build files for `lock` under `options.out_dir`.
pub fn generate(lock: &Lockfile, options: &GenerateOptions) -> Result<GenerateSummary> {
    let out = &options.out_dir;
    ensure_dir(out)?;

    let graph = PackageGraph::from_table(&lock.packages);
    let mut summary = GenerateSummary {
        dangling: graph.dangling().len(),
        ..GenerateSummary::default()
    };

    let single_files: BTreeSet<&str> = lock
        .packages
        .store_paths()
        .map(store_path::basename)
        .filter(|base| is_single_file(&out.join(base)))
        .collect();
    let label = |path: &str| package_label(store_path::basename(path), &single_files);

    let mut root_filegroups = Vec::new();
    for path in lock.packages.store_paths() {
        let base = store_path::basename(path);
        let closure: Vec<String> = graph
            .transitive_closure(path)
            .into_iter()
            .map(label)
            .collect();
        summary.packages += 1;

        if single_files.contains(base) {
            tracing::debug!("{} is a single file", base);
            root_filegroups.push(
                Rule::new("filegroup", base)
                    .list("srcs", [base])
                    .list("data", closure),
            );
            continue;
        }

        let package_dir = out.join(base);
        let references: Vec<&str> = graph
            .direct_deps(path)
            .into_iter()
            .map(store_path::basename)
            .collect();
        let declared = declared_entrypoints(lock, path);
        let binaries = discover_binaries(&package_dir);

        let content = package_build_file(
            base,
            &closure,
            &binaries,
            &declared,
            &references,
            &options.repo_name,
        );
        summary.binaries += binaries.len();

        write_string(&package_dir.join(BUILD_FILE_NAME), &content)?;
    }

    let root = root_build_file(lock, out, &single_files, root_filegroups, &mut summary);
    write_string(&out.join(BUILD_FILE_NAME), &root)?;

    write_string(&out.join(NIX_BINARY_BZL_NAME), script::NIX_BINARY_BZL)?;

    let script_path = out.join(UPDATE_SCRIPT_NAME);
    let script = script::update_lock_script(
        &options.repo_name,
        &options.config_name,
        &options.lockfile_name,
        options.channel.as_deref(),
    );
    write_string(&script_path, &script)?;
    set_mode(&script_path, 0o755)
        .with_context(|| format!("failed to make {} executable", script_path.display()))?;

    tracing::info!(
        "Generated {} packages, {} binaries, {} aliases in {}",
        summary.packages,
        summary.binaries,
        summary.aliases,
        out.display()
    );

    Ok(summary)
}

/// Whether a materialized store path is a plain file rather than a tree.
fn is_single_file(path: &Path) -> bool {
    path.symlink_metadata()
        .map(|meta| !meta.is_dir())
        .unwrap_or(false)
}

/// The label of a package's filegroup.
fn package_label(base: &str, single_files: &BTreeSet<&str>) -> String {
    if single_files.contains(base) {
        format!("//:{}", base)
    } else {
        format!("//{}:{}", base, base)
    }
}

/// Entrypoints declared by repositories locked to `path`, sorted.
fn declared_entrypoints<'a>(lock: &'a Lockfile, path: &str) -> BTreeSet<&'a str> {
    lock.repositories
        .values()
        .filter(|entry| entry.store_path == path)
        .filter_map(|entry| entry.entrypoint.as_deref())
        .collect()
}

/// The `BUILD.bazel` of one package.
///
/// `closure` holds the filegroup labels of every package reachable from
/// this one; `references` the basenames of its direct dependencies.
pub fn package_build_file(
    base: &str,
    closure: &[String],
    binaries: &[String],
    declared: &BTreeSet<&str>,
    references: &[&str],
    repo_name: &str,
) -> String {
    let mut wrappers: Vec<(String, String)> = binaries
        .iter()
        .map(|bin| (bin.clone(), format!("bin/{}", bin)))
        .collect();

    for entry in declared {
        let Some(name) = declared_wrapper_name(entry, binaries) else {
            continue;
        };
        match wrappers.iter().find(|(existing, _)| *existing == name) {
            Some((_, src)) if src != entry => {
                tracing::warn!(
                    "{}: entrypoint `{}` and `{}` both want target `{}`; keeping `{}`",
                    base,
                    src,
                    entry,
                    name,
                    src
                );
            }
            Some(_) => {}
            None => wrappers.push((name, entry.to_string())),
        }
    }

    let mut file = BuildFile::new();
    if !wrappers.is_empty() {
        file.load(
            format!("@{}//:{}", repo_name, NIX_BINARY_BZL_NAME),
            &["nix_binary"],
        );
    }

    file.rule(
        Rule::new("filegroup", base)
            .raw("srcs", glob_all_except(&[BUILD_FILE_NAME]))
            .list("data", closure.iter().map(String::as_str)),
    );

    for (name, src) in &wrappers {
        file.rule(
            Rule::new("nix_binary", name.as_str())
                .string("src", src.as_str())
                .list("data", [format!(":{}", base)])
                .list("references", references.iter().copied()),
        );
    }

    file.render()
}

/// The root `BUILD.bazel`: aliases, single-file packages and the update
/// script target.
fn root_build_file(
    lock: &Lockfile,
    out: &Path,
    single_files: &BTreeSet<&str>,
    filegroups: Vec<Rule>,
    summary: &mut GenerateSummary,
) -> String {
    let mut file = BuildFile::new();

    for (name, entry) in &lock.repositories {
        if !lock.packages.contains(&entry.store_path) {
            tracing::warn!(
                "repository `{}` is locked to {}, which has no package entry; skipping alias",
                name,
                entry.store_path
            );
            continue;
        }
        let base = store_path::basename(&entry.store_path);
        let target = if single_files.contains(base) {
            AliasTarget::File
        } else {
            AliasTarget::resolve(name, entry, &discover_binaries(&out.join(base)))
        };

        file.rule(Rule::new("alias", name.as_str()).string("actual", target.label(base)));
        summary.aliases += 1;
    }

    for rule in filegroups {
        file.rule(rule);
    }

    file.rule(Rule::new("sh_binary", "update_lock").list("srcs", [UPDATE_SCRIPT_NAME]));

    file.render()
}
