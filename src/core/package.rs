//! Package nodes and the package table.
//!
//! A `PackageNode` is the locked metadata of one store path. The
//! `PackageTable` maps store paths to nodes and is the single source of
//! truth shared by resolution, materialization and codegen.

use std::collections::btree_map::{self, BTreeMap};

use serde::{Deserialize, Serialize};

use crate::core::store_path;

fn default_compression() -> String {
    "xz".to_string()
}

/// Locked metadata for one store path. Immutable once written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageNode {
    /// Archive URL relative to the binary cache
    pub url: String,

    /// Archive compression (`xz`, `bzip2`, `zstd`, `none`)
    #[serde(default = "default_compression")]
    pub compression: String,

    /// Content hash of the store path
    pub hash: String,

    /// Hex SHA-256 of the uncompressed NAR (empty if unknown)
    #[serde(default)]
    pub nar_hash: String,

    #[serde(default)]
    pub nar_size: u64,

    /// Hex SHA-256 of the compressed archive (empty if unknown)
    #[serde(default)]
    pub file_hash: String,

    #[serde(default)]
    pub file_size: u64,

    /// Referenced store path basenames, possibly including this package
    #[serde(default)]
    pub references: Vec<String>,
}

impl PackageNode {
    /// Direct references as full store paths, excluding the self-reference.
    pub fn dependencies(&self) -> impl Iterator<Item = String> + '_ {
        self.references
            .iter()
            .filter(move |r| store_path::extract_hash(r) != Some(self.hash.as_str()))
            .map(|r| store_path::from_reference(r))
    }
}

/// Store path to node mapping, serialized as a sorted JSON object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PackageTable {
    nodes: BTreeMap<String, PackageNode>,
}

impl PackageTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, store_path: &str) -> Option<&PackageNode> {
        self.nodes.get(store_path)
    }

    pub fn contains(&self, store_path: &str) -> bool {
        self.nodes.contains_key(store_path)
    }

    /// Insert a node unless its store path is already present.
    ///
    /// Returns `true` if the node was inserted. An existing node is never
    /// replaced.
    pub fn insert_new(&mut self, store_path: String, node: PackageNode) -> bool {
        match self.nodes.entry(store_path) {
            btree_map::Entry::Vacant(slot) => {
                slot.insert(node);
                true
            }
            btree_map::Entry::Occupied(_) => false,
        }
    }

    /// Find the entry whose store path carries `hash`.
    pub fn find_by_hash(&self, hash: &str) -> Option<(&str, &PackageNode)> {
        self.nodes
            .iter()
            .find(|(path, _)| store_path::extract_hash(path) == Some(hash))
            .map(|(path, node)| (path.as_str(), node))
    }

    /// Iterate entries in store path order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &PackageNode)> {
        self.nodes.iter().map(|(path, node)| (path.as_str(), node))
    }

    pub fn store_paths(&self) -> impl Iterator<Item = &str> {
        self.nodes.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
