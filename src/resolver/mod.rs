//! Closure resolution.
//!
//! Starting from a root content hash, the resolver walks narinfo references
//! and fills a `PackageTable` with one node per store path. The table is
//! the memo: anything already in it is never fetched again, which also
//! makes it the only cycle guard the walk needs.

pub mod encode;
pub mod errors;
pub mod graph;

pub use encode::{Lockfile, RepositoryEntry, LOCKFILE_NAME};
pub use errors::ResolveError;
pub use graph::PackageGraph;

use crate::core::store_path;
use crate::core::{PackageNode, PackageTable};
use crate::sources::Source;

/// The root of a resolved closure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedNode {
    pub store_path: String,
    pub node: PackageNode,
}

/// Resolves transitive closures against a source.
pub struct ClosureResolver<'a> {
    source: &'a dyn Source,
}

impl<'a> ClosureResolver<'a> {
    pub fn new(source: &'a dyn Source) -> Self {
        ClosureResolver { source }
    }

    /// Resolve the closure of `root_hash` into `table`.
    ///
    /// On error, nodes inserted before the failure stay in the table.
    pub fn resolve_closure(
        &self,
        root_hash: &str,
        table: &mut PackageTable,
    ) -> Result<ResolvedNode, ResolveError> {
        if let Some((path, node)) = table.find_by_hash(root_hash) {
            tracing::debug!("{} already locked", store_path::basename(path));
            return Ok(ResolvedNode {
                store_path: path.to_string(),
                node: node.clone(),
            });
        }

        let info = self.source.narinfo(root_hash)?;
        let (path, node) = info.into_node(root_hash);

        if !table.insert_new(path.clone(), node.clone()) {
            // Reached under a different hash than its store path carries.
            return Ok(ResolvedNode {
                store_path: path,
                node,
            });
        }
        tracing::debug!("locked {}", store_path::basename(&path));

        for reference in &node.references {
            let Some(ref_hash) = store_path::extract_hash(reference) else {
                tracing::warn!(
                    "{} has a malformed reference `{}`",
                    store_path::basename(&path),
                    reference
                );
                continue;
            };
            if ref_hash == node.hash {
                continue;
            }
            if table.contains(&store_path::from_reference(reference)) {
                continue;
            }
            self.resolve_closure(ref_hash, table)?;
        }

        Ok(ResolvedNode {
            store_path: path,
            node,
        })
    }
}
