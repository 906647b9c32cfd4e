//! The resource graph
//!
//! A graph owns nodes by identity. Inbound references are a derived
//! view: any mutation that adds nodes or changes payloads invalidates
//! them, and [`Graph::compute_in_refs`] rebuilds the view from the
//! current out-refs.

use std::collections::BTreeMap;

use crate::error::{Error, Result};
use crate::id::ResourceId;
use crate::resource::{Node, Ownership};

/// A set of resource nodes indexed by identity. Iteration order is the
/// ID order, so enumeration is deterministic.
#[derive(Debug, Default)]
pub struct Graph {
    nodes: BTreeMap<ResourceId, Node>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node. Fails if a node with the same identity is already
    /// present.
    pub fn add(&mut self, node: Node) -> Result<&mut Node> {
        let id = node.id().clone();
        if self.nodes.contains_key(&id) {
            return Err(Error::DuplicateId(id));
        }
        Ok(self.nodes.entry(id).or_insert(node))
    }

    pub fn get(&self, id: &ResourceId) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn get_mut(&mut self, id: &ResourceId) -> Option<&mut Node> {
        self.nodes.get_mut(id)
    }

    pub fn contains(&self, id: &ResourceId) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn all(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn all_mut(&mut self) -> impl Iterator<Item = &mut Node> {
        self.nodes.values_mut()
    }

    pub fn ids(&self) -> Vec<ResourceId> {
        self.nodes.keys().cloned().collect()
    }

    /// Rebuild the inbound-reference view from the current out-refs.
    /// Fails with `DanglingRef` if any reference target is not in the
    /// graph.
    pub fn compute_in_refs(&mut self) -> Result<()> {
        for node in self.nodes.values_mut() {
            node.clear_in_refs();
        }

        let mut edges = Vec::new();
        for node in self.nodes.values() {
            for reference in node.out_refs()? {
                if !self.nodes.contains_key(&reference.to) {
                    return Err(Error::DanglingRef {
                        from: reference.from,
                        to: reference.to,
                    });
                }
                edges.push(reference);
            }
        }

        for reference in edges {
            let to = reference.to.clone();
            self.nodes
                .get_mut(&to)
                .expect("checked above")
                .add_in_ref(reference);
        }
        Ok(())
    }

    /// Enforce the graph invariants. Idempotent.
    ///
    /// - No node has unknown ownership.
    /// - Every managed node's out-refs resolve within the graph.
    pub fn validate(&self) -> Result<()> {
        for node in self.all() {
            if node.ownership() == Ownership::Unknown {
                return Err(Error::Planning(format!(
                    "node {} has unknown ownership",
                    node.id()
                )));
            }
        }
        for node in self.all() {
            if node.ownership() != Ownership::Managed {
                continue;
            }
            for reference in node.out_refs()? {
                if !self.contains(&reference.to) {
                    return Err(Error::DanglingRef {
                        from: reference.from,
                        to: reference.to,
                    });
                }
            }
        }
        Ok(())
    }

    /// A new graph with an empty peer of every node: identity, version,
    /// and ownership are preserved; payloads, state, and plans are
    /// dropped.
    pub fn clone_skeleton(&self) -> Graph {
        let mut skeleton = Graph::new();
        for node in self.all() {
            skeleton
                .nodes
                .insert(node.id().clone(), node.new_empty_peer());
        }
        skeleton
    }
}
