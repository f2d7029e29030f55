//! Resolving declared repositories into a lockfile.

use std::collections::BTreeMap;

use anyhow::{Context, Result};

use crate::core::store_path;
use crate::core::{Manifest, PackageTable, RepositoryConfig};
use crate::resolver::{ClosureResolver, Lockfile, RepositoryEntry, ResolveError};
use crate::sources::Source;

/// Options for `resolve_all`.
#[derive(Debug, Clone, Default)]
pub struct ResolveOptions {
    /// Jobset to resolve names in, replacing the default list
    pub channel: Option<String>,

    /// Re-resolve repositories that are already locked
    pub force: bool,
}

/// Resolve every repository in `manifest`.
///
/// Repositories locked in `prior` are copied unchanged unless
/// `options.force` is set. The prior package table seeds the new one, so
/// store paths already known are never fetched again. Repositories no
/// longer declared are dropped; their packages stay in the table.
pub fn resolve_all(
    manifest: &Manifest,
    prior: Option<&Lockfile>,
    source: &dyn Source,
    options: &ResolveOptions,
) -> Result<Lockfile> {
    let mut packages = prior.map(|p| p.packages.clone()).unwrap_or_default();
    let mut repositories = BTreeMap::new();
    let resolver = ClosureResolver::new(source);

    for (name, repo) in &manifest.repositories {
        if !options.force {
            if let Some(entry) = prior.and_then(|p| p.repositories.get(name)) {
                tracing::debug!("{} locked to {}", name, entry.store_path);
                repositories.insert(name.clone(), entry.clone());
                continue;
            }
        }

        tracing::info!("Resolving {} ({})", name, repo.package);
        let entry = resolve_repository(repo, &resolver, &mut packages, source, options)
            .with_context(|| format!("failed to resolve repository `{}`", name))?;
        tracing::info!("Locked {} to {}", name, entry.store_path);
        repositories.insert(name.clone(), entry);
    }

    if let Some(prior) = prior {
        for name in prior.repositories.keys() {
            if !manifest.repositories.contains_key(name) {
                tracing::info!("Dropping {} (no longer declared)", name);
            }
        }
    }

    Ok(Lockfile {
        repositories,
        packages,
    })
}

fn resolve_repository(
    repo: &RepositoryConfig,
    resolver: &ClosureResolver<'_>,
    packages: &mut PackageTable,
    source: &dyn Source,
    options: &ResolveOptions,
) -> Result<RepositoryEntry, ResolveError> {
    let root_hash = root_hash(repo, source, options)?;
    let root = resolver.resolve_closure(&root_hash, packages)?;

    Ok(RepositoryEntry {
        store_path: root.store_path,
        entrypoint: repo.entrypoint.clone(),
    })
}

/// The content hash of a repository's package identifier.
///
/// Identifiers that already carry a content hash (a store path, a
/// `<hash>-<name>` basename or a bare hash) skip name resolution.
fn root_hash(
    repo: &RepositoryConfig,
    source: &dyn Source,
    options: &ResolveOptions,
) -> Result<String, ResolveError> {
    if let Some(hash) = store_path::extract_hash(&repo.package) {
        return Ok(hash.to_string());
    }

    let path = source.resolve_name(&repo.package, options.channel.as_deref())?;
    tracing::debug!("{} resolved to {}", repo.package, path);

    store_path::extract_hash(&path)
        .map(str::to_string)
        .ok_or_else(|| ResolveError::ResolutionNotFound {
            package: repo.package.clone(),
            jobsets: options.channel.iter().cloned().collect(),
            reason: format!("`{}` is not a store path", path),
        })
}
