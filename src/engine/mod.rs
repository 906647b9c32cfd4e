//! The planning engine
//!
//! [`plan`] drives one full reconciliation pass short of execution:
//! clone the want graph's skeleton, discover the got graph from the
//! cloud, tombstone want entries for discoveries the want graph no
//! longer references, run the local planner, refine the plan globally
//! (recreate propagation and the delete-cascade check), and synthesize
//! the actions.

pub mod closure;
pub mod local;
pub mod traversal;

pub use closure::{ClosureConfig, OnGet};
pub use local::local_plan;

use tracing::{debug, info};

use crate::cloud::Cloud;
use crate::error::{Error, Result};
use crate::exec::Action;
use crate::graph::Graph;
use crate::plan::{Operation, PlanDetails};
use crate::resource::{Node, NodeState, Ownership};

/// Configuration for a planning pass.
#[derive(Default)]
pub struct PlanConfig<'a> {
    /// Ownership hook for discovered nodes. When absent, every
    /// discovered node is treated as managed.
    pub on_get: Option<OnGet<'a>>,
}

/// Outcome of a planning pass: the actions to execute, plus the
/// discovered got graph for inspection.
pub struct PlanResult {
    pub actions: Vec<Box<dyn Action>>,
    pub got: Graph,
}

/// Plan the work needed to converge the cloud onto `want`. On return
/// every want node carries its decided operation; the caller hands the
/// actions to an executor.
pub fn plan(cloud: &dyn Cloud, want: &mut Graph, config: &PlanConfig<'_>) -> Result<PlanResult> {
    want.validate()?;

    // Discover current state, following references out of the wanted
    // resources.
    let mut got = want.clone_skeleton();
    let default_on_get = |node: &mut Node| -> Result<()> {
        node.set_ownership(Ownership::Managed);
        Ok(())
    };
    let closure_config = ClosureConfig {
        on_get: Some(config.on_get.unwrap_or(&default_on_get)),
    };
    closure::transitive_closure(cloud, &mut got, &closure_config)?;
    got.compute_in_refs()?;

    // Discoveries the want graph doesn't mention: managed ones are
    // tombstoned for deletion, external ones are mirrored unchanged.
    for id in got.ids() {
        if want.contains(&id) {
            continue;
        }
        let got_node = got.get(&id).expect("id enumerated from got");
        match got_node.ownership() {
            Ownership::Managed => {
                info!(id = %id, "no longer wanted; marking for deletion");
                let mut tombstone = got_node.new_empty_peer();
                tombstone.set_state(NodeState::DoesNotExist);
                want.add(tombstone)?;
            }
            Ownership::External => {
                want.add(got_node.clone_detached())?;
            }
            Ownership::Unknown => {
                return Err(Error::Planning(format!(
                    "discovered node {id} has unknown ownership"
                )))
            }
        }
    }

    local_plan(&got, want)?;
    propagate_recreates(want)?;
    sanity_check(want)?;

    let mut actions = Vec::new();
    for want_node in want.all() {
        let got_node = got
            .get(want_node.id())
            .expect("got and want hold the same node set");
        actions.extend(want_node.actions(got_node)?);
    }

    Ok(PlanResult { actions, got })
}

/// A recreated resource is torn down, so everything that transitively
/// references it must be recreated too. Reaching an externally owned
/// node is fatal: the engine refuses to mutate externals.
fn propagate_recreates(want: &mut Graph) -> Result<()> {
    want.compute_in_refs()?;

    let recreate_ids: Vec<_> = want
        .all()
        .filter(|n| n.plan().op() == Operation::Recreate)
        .map(|n| n.id().clone())
        .collect();

    let mut done = Vec::new();
    for id in recreate_ids {
        for reached in traversal::transitive_in_refs(want, &id) {
            if done.contains(&reached) {
                continue;
            }
            done.push(reached.clone());

            let node = want.get_mut(&reached).expect("traversal stays in graph");
            if node.ownership() != Ownership::Managed {
                return Err(Error::ExternalRecreateDep {
                    id: id.clone(),
                    external: reached,
                });
            }

            match node.plan().op() {
                // Already being created or destroyed.
                Operation::Create | Operation::Recreate | Operation::Delete => {}
                Operation::Nothing | Operation::Update => {
                    debug!(id = %reached, dependency = %id, "recreate propagated");
                    node.plan_mut().set(PlanDetails::new(
                        Operation::Recreate,
                        format!("dependency {id} is being recreated"),
                    ));
                }
                Operation::Unknown => {
                    return Err(Error::Planning(format!(
                        "node {reached} has no local plan; cannot propagate recreate"
                    )))
                }
            }
        }
    }

    Ok(())
}

/// Whole-graph plan invariants: every node has a decided op, and a
/// deleted node has no surviving referrer.
fn sanity_check(want: &mut Graph) -> Result<()> {
    want.compute_in_refs()?;

    for id in want.ids() {
        let node = want.get(&id).expect("id enumerated from want");
        match node.plan().op() {
            Operation::Unknown => {
                return Err(Error::Planning(format!("node {id} has no planned op")))
            }
            Operation::Delete => {
                for reference in node.in_refs() {
                    let referrer = want.get(&reference.from).ok_or_else(|| {
                        Error::DanglingRef {
                            from: reference.from.clone(),
                            to: id.clone(),
                        }
                    })?;
                    if referrer.plan().op() != Operation::Delete {
                        return Err(Error::DanglingDelete {
                            id: id.clone(),
                            referrer: reference.from.clone(),
                        });
                    }
                }
            }
            _ => {}
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::{Scope, Version};
    use crate::resource::backend_service;
    use crate::resource::url_map::{new_mutable_url_map, url_map_id, url_map_node};

    /// want: um (urlMap) => bs (backendService), both managed and
    /// planned.
    fn um_to_bs(um_op: Operation, bs_op: Operation, um_ownership: Ownership) -> Graph {
        let mut graph = Graph::new();
        let bs_id = backend_service::backend_service_id("proj", Scope::Global, "bs");

        let mut bs = backend_service::backend_service_node(
            backend_service::new_mutable_backend_service("proj", Scope::Global, "bs")
                .freeze()
                .unwrap(),
            Ownership::Managed,
        );
        bs.set_state(NodeState::Exists);
        bs.plan_mut().set(PlanDetails::new(bs_op, "test"));
        graph.add(bs).unwrap();

        let mut m = new_mutable_url_map("proj", Scope::Global, "um");
        let link = bs_id.self_link(Version::Ga);
        m.access(|um| um.default_service = Some(link)).unwrap();
        let mut um = url_map_node(m.freeze().unwrap(), um_ownership);
        um.set_state(NodeState::Exists);
        um.plan_mut().set(PlanDetails::new(um_op, "test"));
        graph.add(um).unwrap();

        graph
    }

    #[test]
    fn test_recreate_propagates_to_referrer() {
        let mut want = um_to_bs(Operation::Nothing, Operation::Recreate, Ownership::Managed);
        propagate_recreates(&mut want).unwrap();

        let um = want.get(&url_map_id("proj", Scope::Global, "um")).unwrap();
        assert_eq!(um.plan().op(), Operation::Recreate);
        assert!(um.plan().details().unwrap().why.contains("recreated"));
    }

    #[test]
    fn test_recreate_leaves_create_and_delete_alone() {
        for op in [Operation::Create, Operation::Delete, Operation::Recreate] {
            let mut want = um_to_bs(op, Operation::Recreate, Ownership::Managed);
            propagate_recreates(&mut want).unwrap();
            let um = want.get(&url_map_id("proj", Scope::Global, "um")).unwrap();
            assert_eq!(um.plan().op(), op);
        }
    }

    #[test]
    fn test_recreate_reaching_external_is_fatal() {
        let mut want = um_to_bs(Operation::Nothing, Operation::Recreate, Ownership::External);
        assert!(matches!(
            propagate_recreates(&mut want),
            Err(Error::ExternalRecreateDep { .. })
        ));
    }

    #[test]
    fn test_delete_with_live_referrer_is_dangling() {
        let mut want = um_to_bs(Operation::Nothing, Operation::Delete, Ownership::Managed);
        match sanity_check(&mut want) {
            Err(Error::DanglingDelete { id, referrer }) => {
                assert_eq!(id.name, "bs");
                assert_eq!(referrer.name, "um");
            }
            other => panic!("expected DanglingDelete, got {other:?}"),
        }
    }

    #[test]
    fn test_delete_cascade_passes_when_referrer_deleted() {
        let mut want = um_to_bs(Operation::Delete, Operation::Delete, Ownership::Managed);
        sanity_check(&mut want).unwrap();
    }

    #[test]
    fn test_unplanned_node_fails_sanity_check() {
        let mut want = um_to_bs(Operation::Unknown, Operation::Nothing, Ownership::Managed);
        assert!(matches!(sanity_check(&mut want), Err(Error::Planning(_))));
    }
}
