//! Load-balancer scenarios
//!
//! A minimal HTTP load balancer: a forwarding rule binding a reserved
//! address and pointing at a target proxy, which routes through a URL
//! map to a backend service backed by one NEG and one health check.
//!
//! ```text
//! fr ──▶ addr
//!  │
//!  └──▶ tp ──▶ um ──▶ bs ──▶ hc
//!                      └───▶ neg (zonal)
//! ```

use std::collections::BTreeMap;

use crate::builder::Builder;
use crate::cloud::MockCloud;
use crate::error::Result;
use crate::graph::Graph;
use crate::resource::backend_service::Backend;
use crate::resource::{
    address, backend_service, forwarding_rule, health_check, network_endpoint_group,
    target_http_proxy, url_map, Node, NodeState, Ownership,
};

use super::{Registry, Step, TestCase};

const PROJECT: &str = "test-project";

pub fn builder() -> Builder {
    Builder::new(PROJECT)
}

/// Knobs distinguishing the scenario variants from the base graph.
struct Variant {
    /// Name of the target proxy the forwarding rule points at.
    target_name: &'static str,
    addr_description: Option<&'static str>,
    fr_labels: Option<BTreeMap<String, String>>,
}

impl Default for Variant {
    fn default() -> Self {
        Self {
            target_name: "tp",
            addr_description: None,
            fr_labels: None,
        }
    }
}

fn graph_with(variant: Variant) -> Result<Graph> {
    let b = builder();
    let mut graph = Graph::new();

    let mut addr = b.n("addr").address().resource();
    if let Some(description) = variant.addr_description {
        addr.access(|a| a.description = Some(description.to_string()))?;
    }
    add_exists(&mut graph, address::address_node(addr.freeze()?, Ownership::Managed))?;

    let hc = b.n("hc").health_check().resource();
    add_exists(
        &mut graph,
        health_check::health_check_node(hc.freeze()?, Ownership::Managed),
    )?;

    let neg = b.n("neg").default_zone().network_endpoint_group().resource();
    add_exists(
        &mut graph,
        network_endpoint_group::network_endpoint_group_node(neg.freeze()?, Ownership::Managed),
    )?;

    let mut bs = b.n("bs").backend_service().resource();
    let neg_link = b.n("neg").default_zone().network_endpoint_group().self_link();
    let hc_link = b.n("hc").health_check().self_link();
    bs.access(|x| {
        x.backends = Some(vec![Backend {
            group: Some(neg_link),
            ..Default::default()
        }]);
        x.health_checks = Some(vec![hc_link]);
    })?;
    add_exists(
        &mut graph,
        backend_service::backend_service_node(bs.freeze()?, Ownership::Managed),
    )?;

    let mut um = b.n("um").url_map().resource();
    let bs_link = b.n("bs").backend_service().self_link();
    um.access(|x| x.default_service = Some(bs_link))?;
    add_exists(
        &mut graph,
        url_map::url_map_node(um.freeze()?, Ownership::Managed),
    )?;

    let mut tp = b.n(variant.target_name).target_http_proxy().resource();
    let um_link = b.n("um").url_map().self_link();
    tp.access(|x| x.url_map = Some(um_link))?;
    add_exists(
        &mut graph,
        target_http_proxy::target_http_proxy_node(tp.freeze()?, Ownership::Managed),
    )?;

    let mut fr = b.n("fr").forwarding_rule().resource();
    let addr_link = b.n("addr").address().self_link();
    let tp_link = b.n(variant.target_name).target_http_proxy().self_link();
    let labels = variant.fr_labels.clone();
    fr.access(|x| {
        x.ip_address = Some(addr_link);
        x.target = Some(tp_link);
        x.labels = labels;
    })?;
    add_exists(
        &mut graph,
        forwarding_rule::forwarding_rule_node(fr.freeze()?, Ownership::Managed),
    )?;

    Ok(graph)
}

fn add_exists(graph: &mut Graph, node: Node) -> Result<()> {
    graph.add(node)?.set_state(NodeState::Exists);
    Ok(())
}

fn want_base() -> Result<Graph> {
    graph_with(Variant::default())
}

fn want_recreate_addr() -> Result<Graph> {
    graph_with(Variant {
        addr_description: Some("updated"),
        ..Default::default()
    })
}

fn want_update_target() -> Result<Graph> {
    graph_with(Variant {
        target_name: "tp-other",
        ..Default::default()
    })
}

fn want_update_labels() -> Result<Graph> {
    graph_with(Variant {
        fr_labels: Some(BTreeMap::from([("foo".to_string(), "bar".to_string())])),
        ..Default::default()
    })
}

/// Teardown declares only the entry point as gone; discovery finds the
/// rest of the balancer and deletes it in reference order.
fn want_teardown() -> Result<Graph> {
    let mut graph = Graph::new();
    let mut node = Node::by_id(&builder().n("fr").forwarding_rule().id())?;
    node.set_ownership(Ownership::Managed);
    node.set_state(NodeState::DoesNotExist);
    graph.add(node)?;
    Ok(graph)
}

/// Seed the cloud with the base load balancer, as if a previous
/// reconciliation had created it.
pub fn seed_base(cloud: &MockCloud) -> anyhow::Result<()> {
    let graph = want_base()?;
    for node in graph.all() {
        let value = node
            .resource_value()?
            .ok_or_else(|| anyhow::anyhow!("seed node {} has no payload", node.id()))?;
        cloud.seed(node.id(), node.version(), value);
    }
    Ok(())
}

/// Register every load-balancer scenario.
pub fn register_all(registry: &mut Registry) -> Result<()> {
    registry.register(TestCase {
        name: "lb/create",
        description: "Create a minimal HTTP load balancer from scratch",
        steps: vec![Step {
            description: "everything is created in reference order",
            setup: None,
            want: want_base,
        }],
    })?;

    registry.register(TestCase {
        name: "lb/recreate-address",
        description: "Change an address field that cannot be updated in place",
        steps: vec![Step {
            description: "address recreates; the forwarding rule follows",
            setup: Some(seed_base),
            want: want_recreate_addr,
        }],
    })?;

    registry.register(TestCase {
        name: "lb/update-target",
        description: "Point the forwarding rule at a different target proxy",
        steps: vec![Step {
            description: "new proxy created, rule updated in place, old proxy deleted",
            setup: Some(seed_base),
            want: want_update_target,
        }],
    })?;

    registry.register(TestCase {
        name: "lb/update-labels",
        description: "Label-only change on the forwarding rule",
        steps: vec![Step {
            description: "labels applied through setLabels; nothing else moves",
            setup: Some(seed_base),
            want: want_update_labels,
        }],
    })?;

    registry.register(TestCase {
        name: "lb/teardown",
        description: "Delete the balancer starting from its entry point",
        steps: vec![Step {
            description: "deletes cascade in reverse reference order",
            setup: Some(seed_base),
            want: want_teardown,
        }],
    })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{plan, PlanConfig};
    use crate::exec::{
        Action, ExecContext, ExecOptions, SerialExecutor, TraceEntry, Tracer,
    };
    use crate::id::ResourceId;
    use crate::plan::Operation;

    /// Tracer that remembers execution order by display label.
    #[derive(Default)]
    struct RecordingTracer {
        executed: Vec<String>,
        stuck: Vec<String>,
    }

    impl Tracer for RecordingTracer {
        fn record(&mut self, entry: &TraceEntry) {
            self.executed.push(entry.action.clone());
        }

        fn finish(&mut self, pending: &[Box<dyn Action>]) {
            self.stuck = pending.iter().map(|a| a.to_string()).collect();
        }
    }

    impl RecordingTracer {
        fn pos(&self, label: &str) -> usize {
            self.executed
                .iter()
                .position(|l| l == label)
                .unwrap_or_else(|| panic!("{label} not executed; executed: {:?}", self.executed))
        }
    }

    fn create_label(id: &ResourceId) -> String {
        format!("Create({id})")
    }

    fn delete_label(id: &ResourceId) -> String {
        format!("Delete({id})")
    }

    fn op_of(graph: &Graph, id: &ResourceId) -> Operation {
        graph.get(id).unwrap().plan().op()
    }

    /// Plan `want` against `cloud` and execute for real, returning the
    /// planned want graph and the trace.
    fn reconcile(cloud: &MockCloud, mut want: Graph) -> (Graph, RecordingTracer) {
        let result = plan(cloud, &mut want, &PlanConfig::default()).unwrap();
        let mut tracer = RecordingTracer::default();
        let outcome = SerialExecutor::new(result.actions, ExecOptions::default()).run(
            &ExecContext::new(),
            cloud,
            Some(&mut tracer),
        );
        assert!(
            outcome.is_success(),
            "stuck: {:?}, errors: {:?}",
            outcome.pending.iter().map(|a| a.to_string()).collect::<Vec<_>>(),
            outcome.errors
        );
        (want, tracer)
    }

    #[test]
    fn test_fresh_create_plans_creates_in_reference_order() {
        let cloud = MockCloud::new();
        let (want, tracer) = reconcile(&cloud, want_base().unwrap());

        for node in want.all() {
            assert_eq!(
                node.plan().op(),
                Operation::Create,
                "unexpected op for {}",
                node.id()
            );
            assert!(cloud.contains(node.id()), "{} was not created", node.id());
        }

        let b = builder();
        let hc = tracer.pos(&create_label(&b.n("hc").health_check().id()));
        let neg = tracer.pos(&create_label(
            &b.n("neg").default_zone().network_endpoint_group().id(),
        ));
        let addr = tracer.pos(&create_label(&b.n("addr").address().id()));
        let bs = tracer.pos(&create_label(&b.n("bs").backend_service().id()));
        let um = tracer.pos(&create_label(&b.n("um").url_map().id()));
        let tp = tracer.pos(&create_label(&b.n("tp").target_http_proxy().id()));
        let fr = tracer.pos(&create_label(&b.n("fr").forwarding_rule().id()));

        assert!(hc < bs && neg < bs, "backends and checks precede the service");
        assert!(bs < um, "service precedes the url map");
        assert!(um < tp, "url map precedes the proxy");
        assert!(tp < fr && addr < fr, "proxy and address precede the rule");
    }

    #[test]
    fn test_second_run_is_a_no_op() {
        let cloud = MockCloud::new();
        reconcile(&cloud, want_base().unwrap());

        let (want, tracer) = reconcile(&cloud, want_base().unwrap());
        for node in want.all() {
            assert_eq!(node.plan().op(), Operation::Nothing);
        }
        // Only the synthetic exists signals ran.
        assert!(tracer.executed.iter().all(|l| l.starts_with("EventOnly(")));
    }

    #[test]
    fn test_recreate_address_propagates_to_forwarding_rule() {
        let cloud = MockCloud::new();
        seed_base(&cloud).unwrap();

        let (want, tracer) = reconcile(&cloud, want_recreate_addr().unwrap());

        let b = builder();
        let addr_id = b.n("addr").address().id();
        let fr_id = b.n("fr").forwarding_rule().id();
        assert_eq!(op_of(&want, &addr_id), Operation::Recreate);
        assert_eq!(op_of(&want, &fr_id), Operation::Recreate);
        for name_and_id in [
            b.n("tp").target_http_proxy().id(),
            b.n("um").url_map().id(),
            b.n("bs").backend_service().id(),
            b.n("hc").health_check().id(),
            b.n("neg").default_zone().network_endpoint_group().id(),
        ] {
            assert_eq!(op_of(&want, &name_and_id), Operation::Nothing);
        }

        // The rule releases its references before the address goes away,
        // and comes back only after the new address exists.
        assert!(tracer.pos(&delete_label(&fr_id)) < tracer.pos(&delete_label(&addr_id)));
        assert!(tracer.pos(&create_label(&addr_id)) < tracer.pos(&create_label(&fr_id)));

        let addr = cloud.object(&addr_id).unwrap();
        assert_eq!(addr["description"], serde_json::json!("updated"));
    }

    #[test]
    fn test_update_target_swaps_proxies_in_place() {
        let cloud = MockCloud::new();
        seed_base(&cloud).unwrap();

        let (want, tracer) = reconcile(&cloud, want_update_target().unwrap());

        let b = builder();
        let fr_id = b.n("fr").forwarding_rule().id();
        let old_tp = b.n("tp").target_http_proxy().id();
        let new_tp = b.n("tp-other").target_http_proxy().id();

        assert_eq!(op_of(&want, &fr_id), Operation::Update);
        assert_eq!(op_of(&want, &new_tp), Operation::Create);
        assert_eq!(op_of(&want, &old_tp), Operation::Delete);

        let update = tracer.pos(&format!("ForwardingRuleUpdate({fr_id})"));
        assert!(tracer.pos(&create_label(&new_tp)) < update);
        assert!(update < tracer.pos(&delete_label(&old_tp)));

        assert!(!cloud.contains(&old_tp));
        let fr = cloud.object(&fr_id).unwrap();
        assert_eq!(
            fr["target"],
            serde_json::json!(b.n("tp-other").target_http_proxy().self_link())
        );
    }

    #[test]
    fn test_update_labels_touches_only_the_rule() {
        let cloud = MockCloud::new();
        seed_base(&cloud).unwrap();

        let (want, _tracer) = reconcile(&cloud, want_update_labels().unwrap());

        let b = builder();
        let fr_id = b.n("fr").forwarding_rule().id();
        assert_eq!(op_of(&want, &fr_id), Operation::Update);
        for node in want.all() {
            if node.id() != &fr_id {
                assert_eq!(node.plan().op(), Operation::Nothing);
            }
        }

        let fr = cloud.object(&fr_id).unwrap();
        assert_eq!(fr["labels"]["foo"], serde_json::json!("bar"));
    }

    #[test]
    fn test_teardown_deletes_in_reverse_reference_order() {
        let cloud = MockCloud::new();
        seed_base(&cloud).unwrap();

        let (want, tracer) = reconcile(&cloud, want_teardown().unwrap());

        let b = builder();
        for node in want.all() {
            assert_eq!(node.plan().op(), Operation::Delete);
            assert!(!cloud.contains(node.id()), "{} survived", node.id());
        }
        assert_eq!(want.len(), 7);

        let fr = tracer.pos(&delete_label(&b.n("fr").forwarding_rule().id()));
        let addr = tracer.pos(&delete_label(&b.n("addr").address().id()));
        let tp = tracer.pos(&delete_label(&b.n("tp").target_http_proxy().id()));
        let um = tracer.pos(&delete_label(&b.n("um").url_map().id()));
        let bs = tracer.pos(&delete_label(&b.n("bs").backend_service().id()));
        let hc = tracer.pos(&delete_label(&b.n("hc").health_check().id()));
        let neg = tracer.pos(&delete_label(
            &b.n("neg").default_zone().network_endpoint_group().id(),
        ));

        assert!(fr < addr && fr < tp, "rule goes before its targets");
        assert!(tp < um, "proxy before the url map");
        assert!(um < bs, "url map before the service");
        assert!(bs < hc && bs < neg, "service before checks and backends");
    }

    #[test]
    fn test_stuck_frontier_is_diagnosed() {
        use crate::exec::testutil::TestAction;
        use crate::exec::Event;

        let cloud = MockCloud::new();
        let mut want = want_base().unwrap();
        let result = plan(&cloud, &mut want, &PlanConfig::default()).unwrap();

        let ghost = builder().n("ghost").address().id();
        let mut actions = result.actions;
        actions.push(TestAction::new(
            "blocked",
            vec![Event::Exists(ghost.clone())],
            vec![],
        ));

        let mut tracer = RecordingTracer::default();
        let outcome = SerialExecutor::new(actions, ExecOptions::default()).run(
            &ExecContext::new(),
            &cloud,
            Some(&mut tracer),
        );

        assert_eq!(outcome.pending.len(), 1);
        assert_eq!(outcome.pending[0].pending_events(), &[Event::Exists(ghost)]);
        assert_eq!(tracer.stuck, vec!["TestAction(blocked)".to_string()]);
    }
}
