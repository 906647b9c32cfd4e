//! Transitive discovery of the current resource graph
//!
//! Starting from the seed nodes, fetch each node from the cloud, let the
//! `on_get` hook assign ownership, and follow out-refs: every target not
//! yet in the graph is added as an empty peer and enqueued. Externally
//! owned nodes are fences; their references are not followed.

use std::collections::VecDeque;

use tracing::{debug, info};

use crate::cloud::Cloud;
use crate::error::Result;
use crate::graph::Graph;
use crate::resource::{Node, Ownership};

/// Hook invoked on each node right after its fetch, before its out-refs
/// are enumerated. Typically assigns managed/external ownership, e.g.
/// by name prefix.
pub type OnGet<'a> = &'a dyn Fn(&mut Node) -> Result<()>;

/// Configuration for the closure traversal.
#[derive(Default)]
pub struct ClosureConfig<'a> {
    pub on_get: Option<OnGet<'a>>,
}

impl<'a> ClosureConfig<'a> {
    pub fn with_on_get(on_get: OnGet<'a>) -> Self {
        Self {
            on_get: Some(on_get),
        }
    }
}

/// Fetch the transitive closure of the graph from the cloud. Every
/// distinct ID is fetched exactly once per invocation; fetch failures
/// other than "not found" abort the traversal.
pub fn transitive_closure(
    cloud: &dyn Cloud,
    graph: &mut Graph,
    config: &ClosureConfig<'_>,
) -> Result<()> {
    info!(seeds = graph.len(), "transitive closure");

    let mut queue: VecDeque<_> = graph.ids().into();

    while let Some(id) = queue.pop_front() {
        let node = graph
            .get_mut(&id)
            .expect("queued nodes are always in the graph");

        node.get(cloud)?;
        debug!(id = %id, state = %node.state(), "fetched");

        if let Some(on_get) = config.on_get {
            on_get(node)?;
        }

        if node.ownership() == Ownership::External {
            debug!(id = %id, "externally owned; not traversing");
            continue;
        }

        for reference in node.out_refs()? {
            if graph.contains(&reference.to) {
                continue;
            }
            let peer = Node::by_id(&reference.to)?;
            graph.add(peer)?;
            queue.push_back(reference.to);
        }
    }

    Ok(())
}
