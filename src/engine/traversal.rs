//! Graph traversal helpers
//!
//! Both walks require the graph's inbound-reference view to be current;
//! callers run `Graph::compute_in_refs` after any mutation.

use std::collections::VecDeque;

use crate::error::Result;
use crate::graph::Graph;
use crate::id::ResourceId;

/// IDs of all nodes that transitively point into `start`, inclusive of
/// `start` itself. For `a => b => c; d => b`, the result for `b` is
/// `{a, b, d}`.
pub fn transitive_in_refs(graph: &Graph, start: &ResourceId) -> Vec<ResourceId> {
    let mut done: Vec<ResourceId> = Vec::new();
    let mut queue = VecDeque::from([start.clone()]);

    while let Some(id) = queue.pop_front() {
        if done.contains(&id) {
            continue;
        }
        done.push(id.clone());

        let Some(node) = graph.get(&id) else { continue };
        for reference in node.in_refs() {
            if !done.contains(&reference.from) {
                queue.push_back(reference.from.clone());
            }
        }
    }

    done
}

/// IDs of all nodes connected to `start` through references in either
/// direction, inclusive of `start`.
pub fn connected_subgraph(graph: &Graph, start: &ResourceId) -> Result<Vec<ResourceId>> {
    let mut done: Vec<ResourceId> = Vec::new();
    let mut queue = VecDeque::from([start.clone()]);

    while let Some(id) = queue.pop_front() {
        if done.contains(&id) {
            continue;
        }
        done.push(id.clone());

        let Some(node) = graph.get(&id) else { continue };
        for reference in node.out_refs()? {
            if !done.contains(&reference.to) {
                queue.push_back(reference.to);
            }
        }
        for reference in node.in_refs() {
            if !done.contains(&reference.from) {
                queue.push_back(reference.from.clone());
            }
        }
    }

    Ok(done)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::{Scope, Version};
    use crate::resource::url_map::{new_mutable_url_map, url_map_id, url_map_node};
    use crate::resource::{backend_service, Ownership};

    /// a => b; d => b; c isolated, where edges are urlMap defaultService
    /// references onto backend services.
    fn diamond() -> Graph {
        let mut graph = Graph::new();
        let bs = backend_service::backend_service_id("proj", Scope::Global, "b");
        graph
            .add(backend_service::backend_service_node(
                backend_service::new_mutable_backend_service("proj", Scope::Global, "b")
                    .freeze()
                    .unwrap(),
                Ownership::Managed,
            ))
            .unwrap();
        for name in ["a", "d"] {
            let mut m = new_mutable_url_map("proj", Scope::Global, name);
            let link = bs.self_link(Version::Ga);
            m.access(|um| um.default_service = Some(link)).unwrap();
            graph
                .add(url_map_node(m.freeze().unwrap(), Ownership::Managed))
                .unwrap();
        }
        graph
            .add(url_map_node(
                new_mutable_url_map("proj", Scope::Global, "c")
                    .freeze()
                    .unwrap(),
                Ownership::Managed,
            ))
            .unwrap();
        graph.compute_in_refs().unwrap();
        graph
    }

    #[test]
    fn test_transitive_in_refs_reaches_all_referrers() {
        let graph = diamond();
        let mut reached = transitive_in_refs(
            &graph,
            &backend_service::backend_service_id("proj", Scope::Global, "b"),
        );
        reached.sort();
        let names: Vec<&str> = reached.iter().map(|id| id.name.as_str()).collect();
        assert_eq!(names, ["b", "a", "d"]);
    }

    #[test]
    fn test_isolated_node_reaches_only_itself() {
        let graph = diamond();
        let reached = transitive_in_refs(&graph, &url_map_id("proj", Scope::Global, "c"));
        assert_eq!(reached.len(), 1);
    }

    #[test]
    fn test_connected_subgraph_spans_both_directions() {
        let graph = diamond();
        let reached =
            connected_subgraph(&graph, &url_map_id("proj", Scope::Global, "a")).unwrap();
        assert_eq!(reached.len(), 3); // a, b, d — not c
    }
}
