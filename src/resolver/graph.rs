//! The package graph derived from a package table.
//!
//! Nodes are store paths, edges are references. Self-references are not
//! edges. References with no node in the table are dangling: they are
//! recorded, logged, and never traversed.

use std::collections::{BTreeSet, HashMap};

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::Dfs;

use crate::core::store_path;
use crate::core::PackageTable;

/// A reference from a package to a store path missing from the table.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct DanglingReference {
    pub from: String,
    pub reference: String,
}

/// Read-only dependency graph over a package table.
#[derive(Debug, Clone)]
pub struct PackageGraph {
    graph: DiGraph<String, ()>,
    path_to_node: HashMap<String, NodeIndex>,
    dangling: Vec<DanglingReference>,
}

impl PackageGraph {
    /// Build the graph. Dangling references are logged as warnings.
    pub fn from_table(table: &PackageTable) -> Self {
        let mut graph = DiGraph::new();
        let mut path_to_node = HashMap::new();

        for path in table.store_paths() {
            let node = graph.add_node(path.to_string());
            path_to_node.insert(path.to_string(), node);
        }

        let mut dangling = Vec::new();
        for (path, node) in table.iter() {
            let from = path_to_node[path];
            for dep in node.dependencies() {
                match path_to_node.get(&dep) {
                    Some(&to) => {
                        if !graph.contains_edge(from, to) {
                            graph.add_edge(from, to, ());
                        }
                    }
                    None => {
                        tracing::warn!(
                            "dangling reference: {} refers to {}, which is not in the lockfile",
                            store_path::basename(path),
                            store_path::basename(&dep)
                        );
                        dangling.push(DanglingReference {
                            from: path.to_string(),
                            reference: dep,
                        });
                    }
                }
            }
        }

        PackageGraph {
            graph,
            path_to_node,
            dangling,
        }
    }

    pub fn contains(&self, store_path: &str) -> bool {
        self.path_to_node.contains_key(store_path)
    }

    /// References that could not be followed, in table order.
    pub fn dangling(&self) -> &[DanglingReference] {
        &self.dangling
    }

    /// Direct dependencies present in the table, sorted.
    pub fn direct_deps(&self, store_path: &str) -> Vec<&str> {
        let Some(&node) = self.path_to_node.get(store_path) else {
            return Vec::new();
        };
        let mut deps: Vec<&str> = self
            .graph
            .neighbors(node)
            .map(|n| self.graph[n].as_str())
            .collect();
        deps.sort_unstable();
        deps
    }

    /// All store paths reachable from `root`, excluding `root`, sorted.
    ///
    /// A root that is not in the table has an empty closure.
    pub fn transitive_closure(&self, root: &str) -> Vec<&str> {
        let Some(&start) = self.path_to_node.get(root) else {
            return Vec::new();
        };

        let mut reachable = BTreeSet::new();
        let mut dfs = Dfs::new(&self.graph, start);
        while let Some(node) = dfs.next(&self.graph) {
            if node != start {
                reachable.insert(self.graph[node].as_str());
            }
        }

        reachable.into_iter().collect()
    }
}
