//! Per-node (local) planning
//!
//! Decides create/delete/update/recreate/nothing for each node from the
//! (got state, want state) pair and the kind's diff policy. Requires
//! both graphs to hold the same node set; nodes that don't exist carry
//! `DoesNotExist` state rather than being absent.

use tracing::debug;

use crate::error::{Error, Result};
use crate::graph::Graph;
use crate::plan::{Operation, PlanDetails};
use crate::resource::{NodeState, Ownership};

/// Fill in the local plan of every node in `want`.
pub fn local_plan(got: &Graph, want: &mut Graph) -> Result<()> {
    preconditions(got, want)?;

    for id in got.ids() {
        let got_node = got.get(&id).expect("id enumerated from got");
        let want_node = want.get_mut(&id).expect("preconditions checked");

        if want_node.ownership() != Ownership::Managed {
            want_node
                .plan_mut()
                .set(PlanDetails::new(Operation::Nothing, "node is not managed"));
            continue;
        }

        let details = match (got_node.state(), want_node.state()) {
            (NodeState::Exists, NodeState::Exists) => want_node.diff(got_node)?,
            (NodeState::Exists, NodeState::DoesNotExist) => PlanDetails::new(
                Operation::Delete,
                "node exists in got, but not in want",
            ),
            (NodeState::DoesNotExist, NodeState::Exists) => PlanDetails::new(
                Operation::Create,
                "node exists in want, but not in got",
            ),
            (NodeState::DoesNotExist, NodeState::DoesNotExist) => {
                PlanDetails::new(Operation::Nothing, "node does not exist")
            }
            (got_state, want_state) => {
                return Err(Error::Planning(format!(
                    "node {id} is in an invalid state for planning (got={got_state}, want={want_state})"
                )))
            }
        };

        debug!(id = %id, op = %details.operation, why = %details.why, "local plan");
        want_node.plan_mut().set(details);
    }

    Ok(())
}

fn preconditions(got: &Graph, want: &Graph) -> Result<()> {
    for id in got.ids() {
        if !want.contains(&id) {
            return Err(Error::Planning(format!(
                "node {id} is in got but not in want"
            )));
        }
    }
    for id in want.ids() {
        if !got.contains(&id) {
            return Err(Error::Planning(format!(
                "node {id} is in want but not in got"
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::Scope;
    use crate::resource::address::{address_id, address_node, new_mutable_address};
    use crate::resource::Node;

    fn want_address(state: NodeState, ownership: Ownership) -> Graph {
        let mut graph = Graph::new();
        let node = address_node(
            new_mutable_address("proj", Scope::Global, "a")
                .freeze()
                .unwrap(),
            ownership,
        );
        graph.add(node).unwrap().set_state(state);
        graph
    }

    fn got_address(state: NodeState) -> Graph {
        let mut graph = Graph::new();
        let mut node = Node::by_id(&address_id("proj", Scope::Global, "a")).unwrap();
        node.set_ownership(Ownership::Managed);
        node.set_state(state);
        graph.add(node).unwrap();
        graph
    }

    fn planned_op(got: Graph, mut want: Graph) -> Operation {
        local_plan(&got, &mut want).unwrap();
        want.all().next().unwrap().plan().op()
    }

    #[test]
    fn test_missing_in_got_is_create() {
        let op = planned_op(
            got_address(NodeState::DoesNotExist),
            want_address(NodeState::Exists, Ownership::Managed),
        );
        assert_eq!(op, Operation::Create);
    }

    #[test]
    fn test_missing_in_want_is_delete() {
        let op = planned_op(
            got_address(NodeState::Exists),
            want_address(NodeState::DoesNotExist, Ownership::Managed),
        );
        assert_eq!(op, Operation::Delete);
    }

    #[test]
    fn test_absent_on_both_sides_is_nothing() {
        let op = planned_op(
            got_address(NodeState::DoesNotExist),
            want_address(NodeState::DoesNotExist, Ownership::Managed),
        );
        assert_eq!(op, Operation::Nothing);
    }

    #[test]
    fn test_unmanaged_want_is_nothing() {
        let op = planned_op(
            got_address(NodeState::Exists),
            want_address(NodeState::DoesNotExist, Ownership::External),
        );
        assert_eq!(op, Operation::Nothing);
    }

    #[test]
    fn test_unknown_state_is_an_error() {
        let got = got_address(NodeState::Unknown);
        let mut want = want_address(NodeState::Exists, Ownership::Managed);
        assert!(matches!(
            local_plan(&got, &mut want),
            Err(Error::Planning(_))
        ));
    }

    #[test]
    fn test_mismatched_node_sets_rejected() {
        let got = Graph::new();
        let mut want = want_address(NodeState::Exists, Ownership::Managed);
        assert!(local_plan(&got, &mut want).is_err());
    }
}
