//! Graph nodes, polymorphic over a closed set of resource kinds
//!
//! Every kind of resource the engine manages implements [`Kind`]: wire
//! payload types per API version, field traits, a reference extractor,
//! and the per-kind policy that turns a diff into a plan. A [`Node`] is
//! a tagged variant over those kinds carrying identity, observed state,
//! ownership, the frozen payload (if any), and the plan.
//!
//! Nodes hold only IDs for their neighbors; peers are looked up through
//! the graph, and inbound refs are a derived cache rebuilt by
//! `Graph::compute_in_refs`.

pub mod address;
pub mod backend_service;
pub mod forwarding_rule;
pub mod health_check;
pub mod network_endpoint_group;
pub mod target_http_proxy;
pub mod url_map;

use std::fmt;

use tracing::debug;

use crate::actions::{CreateAction, DeleteAction, UpdateAction};
use crate::api::{DiffResult, FieldPath, FieldTraits, Frozen, Payload};
use crate::cloud::Cloud;
use crate::error::{Error, Result};
use crate::exec::{Action, Event, EventOnlyAction};
use crate::id::{ResourceId, Version};
use crate::ops::OpsDescriptor;
use crate::plan::{Operation, Plan, PlanDetails};

/// Whether the engine may modify a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ownership {
    Unknown,
    /// The engine owns this resource and may create, update, or delete it.
    Managed,
    /// The resource belongs to someone else; the engine must not touch
    /// it, and discovery does not traverse through it.
    External,
}

impl fmt::Display for Ownership {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Ownership::Unknown => "Unknown",
            Ownership::Managed => "Managed",
            Ownership::External => "External",
        };
        f.write_str(s)
    }
}

/// Observed (got) or desired (want) existence of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeState {
    Unknown,
    Exists,
    DoesNotExist,
    /// The last fetch failed with something other than "not found".
    Error,
}

impl fmt::Display for NodeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            NodeState::Unknown => "Unknown",
            NodeState::Exists => "Exists",
            NodeState::DoesNotExist => "DoesNotExist",
            NodeState::Error => "Error",
        };
        f.write_str(s)
    }
}

/// A directed reference between resources: the field at `path` in `from`
/// names `to`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRef {
    pub from: ResourceId,
    pub path: FieldPath,
    pub to: ResourceId,
}

/// Capability set of one resource kind.
pub trait Kind: Sized + Send + Sync + 'static {
    type Ga: Payload;
    type Beta: Payload;
    type Alpha: Payload;

    /// Display name, e.g. `"ForwardingRule"`.
    const KIND: &'static str;
    /// Resource path segment, e.g. `"forwardingRules"`.
    const RESOURCE: &'static str;

    fn ops() -> &'static OpsDescriptor;
    fn field_traits() -> FieldTraits;

    /// Extract outbound references from the GA view of a payload.
    /// Duplicate `(from, path, to)` triples are coalesced by the caller.
    fn out_refs(id: &ResourceId, payload: &Self::Ga) -> Result<Vec<ResourceRef>>;

    /// Kind policy: the operation a non-empty diff implies.
    fn plan_for_diff(diff: DiffResult) -> PlanDetails;

    /// Actions implementing a planned update. The default is the generic
    /// whole-payload update; kinds with special verbs override this.
    fn update_actions(want: &NodeBase<Self>, got: &NodeBase<Self>) -> Result<Vec<Box<dyn Action>>> {
        generic_update_actions(want, got)
    }
}

/// State common to all node kinds.
#[derive(Debug)]
pub struct NodeBase<K: Kind> {
    id: ResourceId,
    version: Version,
    state: NodeState,
    ownership: Ownership,
    resource: Option<Frozen<K::Ga, K::Beta, K::Alpha>>,
    in_refs: Vec<ResourceRef>,
    plan: Plan,
    get_error: Option<String>,
}

impl<K: Kind> NodeBase<K> {
    pub fn new(id: ResourceId) -> Self {
        Self {
            id,
            version: Version::Ga,
            state: NodeState::Unknown,
            ownership: Ownership::Unknown,
            resource: None,
            in_refs: Vec::new(),
            plan: Plan::default(),
            get_error: None,
        }
    }

    pub fn from_resource(
        resource: Frozen<K::Ga, K::Beta, K::Alpha>,
        ownership: Ownership,
    ) -> Self {
        let mut node = Self::new(resource.id().clone());
        node.version = resource.version();
        node.ownership = ownership;
        node.resource = Some(resource);
        node
    }

    pub fn id(&self) -> &ResourceId {
        &self.id
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn state(&self) -> NodeState {
        self.state
    }

    pub fn set_state(&mut self, state: NodeState) {
        self.state = state;
    }

    pub fn ownership(&self) -> Ownership {
        self.ownership
    }

    pub fn set_ownership(&mut self, ownership: Ownership) {
        self.ownership = ownership;
    }

    pub fn resource(&self) -> Option<&Frozen<K::Ga, K::Beta, K::Alpha>> {
        self.resource.as_ref()
    }

    pub fn plan(&self) -> &Plan {
        &self.plan
    }

    pub fn plan_mut(&mut self) -> &mut Plan {
        &mut self.plan
    }

    pub fn in_refs(&self) -> &[ResourceRef] {
        &self.in_refs
    }

    pub(crate) fn clear_in_refs(&mut self) {
        self.in_refs.clear();
    }

    pub(crate) fn add_in_ref(&mut self, reference: ResourceRef) {
        self.in_refs.push(reference);
    }

    /// Error from the last fetch, if it failed.
    pub fn get_error(&self) -> Option<&str> {
        self.get_error.as_deref()
    }

    /// Outbound references of the payload, deduplicated.
    pub fn out_refs(&self) -> Result<Vec<ResourceRef>> {
        let Some(resource) = &self.resource else {
            return Ok(Vec::new());
        };
        let ga = resource.to_ga()?;
        let mut refs = K::out_refs(&self.id, &ga)?;
        let mut seen: Vec<ResourceRef> = Vec::new();
        refs.retain(|r| {
            if seen.contains(r) {
                false
            } else {
                seen.push(r.clone());
                true
            }
        });
        Ok(refs)
    }

    /// Fetch the current payload from the cloud at the node's version.
    /// "Not found" becomes `DoesNotExist`, not an error.
    pub fn get(&mut self, cloud: &dyn Cloud) -> Result<()> {
        match K::ops().do_get(cloud, &self.id, self.version) {
            Ok(wire) => {
                let resource =
                    Frozen::from_wire(self.id.clone(), K::field_traits(), self.version, wire)?;
                self.resource = Some(resource);
                self.state = NodeState::Exists;
                self.get_error = None;
                Ok(())
            }
            Err(Error::Cloud { source, .. }) if source.is_not_found() => {
                debug!(id = %self.id, "not found");
                self.state = NodeState::DoesNotExist;
                self.get_error = None;
                Ok(())
            }
            Err(err) => {
                self.state = NodeState::Error;
                self.get_error = Some(err.to_string());
                Err(err)
            }
        }
    }

    /// Same-kind, same-identity node with no payload. Used to seed the
    /// got graph.
    pub fn new_empty_peer(&self) -> Self {
        let mut peer = Self::new(self.id.clone());
        peer.version = self.version;
        peer.ownership = self.ownership;
        peer
    }

    /// Copy of this node carrying the payload and observed state, but
    /// with derived views (in-refs) and the plan dropped. Used to mirror
    /// externally-owned discoveries into the want graph.
    pub fn clone_detached(&self) -> Self {
        let mut peer = self.new_empty_peer();
        peer.state = self.state;
        peer.resource = self.resource.clone();
        peer
    }

    /// Decide what to do about this (want) node given the current (got)
    /// payload, per kind policy.
    pub fn diff(&self, got: &NodeBase<K>) -> Result<PlanDetails> {
        let want_res = self.resource.as_ref().ok_or_else(|| {
            Error::Planning(format!("{}: want node {} has no payload", K::KIND, self.id))
        })?;
        let got_res = got.resource.as_ref().ok_or_else(|| {
            Error::Planning(format!("{}: got node {} has no payload", K::KIND, self.id))
        })?;

        let diff = got_res.diff(want_res)?;
        if !diff.has_diff() {
            return Ok(PlanDetails::new(
                Operation::Nothing,
                "no diff between got and want",
            ));
        }
        Ok(K::plan_for_diff(diff))
    }

    /// Translate the planned operation into actions with event
    /// preconditions. `got` is this node's peer in the got graph.
    pub fn actions(&self, got: &NodeBase<K>) -> Result<Vec<Box<dyn Action>>> {
        match self.plan.op() {
            Operation::Create => self.create_actions(),
            Operation::Delete => delete_actions::<K>(got),
            Operation::Nothing => Ok(vec![EventOnlyAction::exists(self.id.clone())]),
            Operation::Recreate => {
                let mut actions = delete_actions::<K>(got)?;
                actions.extend(self.create_actions_after_delete()?);
                Ok(actions)
            }
            Operation::Update => K::update_actions(self, got),
            Operation::Unknown => Err(Error::Planning(format!(
                "{}: node {} has no planned op",
                K::KIND,
                self.id
            ))),
        }
    }

    fn create_actions(&self) -> Result<Vec<Box<dyn Action>>> {
        Ok(vec![self.create_action(Vec::new())?])
    }

    /// The create half of a recreate additionally waits for the old
    /// incarnation to be gone.
    fn create_actions_after_delete(&self) -> Result<Vec<Box<dyn Action>>> {
        Ok(vec![
            self.create_action(vec![Event::NotExists(self.id.clone())])?
        ])
    }

    fn create_action(&self, extra_want: Vec<Event>) -> Result<Box<dyn Action>> {
        let resource = self.resource.as_ref().ok_or_else(|| {
            Error::Planning(format!(
                "{}: cannot create {} without a payload",
                K::KIND,
                self.id
            ))
        })?;

        // References must exist before creation.
        let mut want: Vec<Event> = self
            .out_refs()?
            .into_iter()
            .map(|r| Event::Exists(r.to))
            .collect();
        want.extend(extra_want);

        Ok(CreateAction::new(
            want,
            K::ops(),
            self.id.clone(),
            self.version,
            resource.to_value()?,
        ))
    }
}

/// Delete waits until no inbound reference to the resource is still
/// held, then releases the references the deleted payload itself held.
fn delete_actions<K: Kind>(got: &NodeBase<K>) -> Result<Vec<Box<dyn Action>>> {
    let want: Vec<Event> = got
        .in_refs()
        .iter()
        .map(|r| Event::DropRef {
            from: r.from.clone(),
            to: got.id.clone(),
        })
        .collect();
    let dropped: Vec<ResourceId> = got.out_refs()?.into_iter().map(|r| r.to).collect();

    Ok(vec![DeleteAction::new(
        want,
        K::ops(),
        got.id.clone(),
        got.version,
        dropped,
    )])
}

/// Generic in-place update: send the whole desired payload, echoing the
/// current fingerprint for fingerprinted kinds. Newly-referenced targets
/// must exist first; references no longer held are dropped.
fn generic_update_actions<K: Kind>(
    want: &NodeBase<K>,
    got: &NodeBase<K>,
) -> Result<Vec<Box<dyn Action>>> {
    let resource = want.resource.as_ref().ok_or_else(|| {
        Error::Planning(format!(
            "{}: cannot update {} without a payload",
            K::KIND,
            want.id
        ))
    })?;

    let want_targets: Vec<ResourceId> = want.out_refs()?.into_iter().map(|r| r.to).collect();
    let got_targets: Vec<ResourceId> = got.out_refs()?.into_iter().map(|r| r.to).collect();

    let want_events: Vec<Event> = want_targets
        .iter()
        .filter(|to| !got_targets.contains(to))
        .cloned()
        .map(Event::Exists)
        .collect();
    let dropped: Vec<ResourceId> = got_targets
        .into_iter()
        .filter(|to| !want_targets.contains(to))
        .collect();

    let got_fingerprint = got.resource.as_ref().and_then(|r| r.fingerprint());

    Ok(vec![
        EventOnlyAction::exists(want.id.clone()),
        UpdateAction::new(
            want_events,
            K::ops(),
            want.id.clone(),
            want.version,
            resource.to_value()?,
            got_fingerprint,
            dropped,
        ),
    ])
}

/// A graph vertex: one resource of any managed kind.
#[derive(Debug)]
pub enum Node {
    Address(NodeBase<address::AddressKind>),
    BackendService(NodeBase<backend_service::BackendServiceKind>),
    ForwardingRule(NodeBase<forwarding_rule::ForwardingRuleKind>),
    HealthCheck(NodeBase<health_check::HealthCheckKind>),
    NetworkEndpointGroup(NodeBase<network_endpoint_group::NetworkEndpointGroupKind>),
    TargetHttpProxy(NodeBase<target_http_proxy::TargetHttpProxyKind>),
    UrlMap(NodeBase<url_map::UrlMapKind>),
}

macro_rules! with_base {
    ($node:expr, $base:ident => $body:expr) => {
        match $node {
            Node::Address($base) => $body,
            Node::BackendService($base) => $body,
            Node::ForwardingRule($base) => $body,
            Node::HealthCheck($base) => $body,
            Node::NetworkEndpointGroup($base) => $body,
            Node::TargetHttpProxy($base) => $body,
            Node::UrlMap($base) => $body,
        }
    };
}

impl Node {
    /// Construct an empty node of the kind named by the ID's resource
    /// segment. Used when discovery encounters a reference to a resource
    /// not yet in the graph.
    pub fn by_id(id: &ResourceId) -> Result<Node> {
        let node = match id.resource {
            "addresses" => Node::Address(NodeBase::new(id.clone())),
            "backendServices" => Node::BackendService(NodeBase::new(id.clone())),
            "forwardingRules" => Node::ForwardingRule(NodeBase::new(id.clone())),
            "healthChecks" => Node::HealthCheck(NodeBase::new(id.clone())),
            "networkEndpointGroups" => Node::NetworkEndpointGroup(NodeBase::new(id.clone())),
            "targetHttpProxies" => Node::TargetHttpProxy(NodeBase::new(id.clone())),
            "urlMaps" => Node::UrlMap(NodeBase::new(id.clone())),
            other => {
                return Err(Error::Planning(format!(
                    "unknown resource kind {other:?} for {id}"
                )))
            }
        };
        Ok(node)
    }

    /// Display name of the node's kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Node::Address(_) => address::AddressKind::KIND,
            Node::BackendService(_) => backend_service::BackendServiceKind::KIND,
            Node::ForwardingRule(_) => forwarding_rule::ForwardingRuleKind::KIND,
            Node::HealthCheck(_) => health_check::HealthCheckKind::KIND,
            Node::NetworkEndpointGroup(_) => network_endpoint_group::NetworkEndpointGroupKind::KIND,
            Node::TargetHttpProxy(_) => target_http_proxy::TargetHttpProxyKind::KIND,
            Node::UrlMap(_) => url_map::UrlMapKind::KIND,
        }
    }

    pub fn id(&self) -> &ResourceId {
        with_base!(self, base => base.id())
    }

    pub fn version(&self) -> Version {
        with_base!(self, base => base.version())
    }

    pub fn state(&self) -> NodeState {
        with_base!(self, base => base.state())
    }

    pub fn set_state(&mut self, state: NodeState) {
        with_base!(self, base => base.set_state(state))
    }

    pub fn ownership(&self) -> Ownership {
        with_base!(self, base => base.ownership())
    }

    pub fn set_ownership(&mut self, ownership: Ownership) {
        with_base!(self, base => base.set_ownership(ownership))
    }

    pub fn plan(&self) -> &Plan {
        with_base!(self, base => base.plan())
    }

    pub fn plan_mut(&mut self) -> &mut Plan {
        with_base!(self, base => base.plan_mut())
    }

    pub fn in_refs(&self) -> &[ResourceRef] {
        with_base!(self, base => base.in_refs())
    }

    pub(crate) fn clear_in_refs(&mut self) {
        with_base!(self, base => base.clear_in_refs())
    }

    pub(crate) fn add_in_ref(&mut self, reference: ResourceRef) {
        with_base!(self, base => base.add_in_ref(reference))
    }

    pub fn get_error(&self) -> Option<&str> {
        with_base!(self, base => base.get_error())
    }

    pub fn out_refs(&self) -> Result<Vec<ResourceRef>> {
        with_base!(self, base => base.out_refs())
    }

    /// Serialized form of the node's payload, if it has one.
    pub fn resource_value(&self) -> Result<Option<serde_json::Value>> {
        with_base!(self, base => base.resource().map(|r| r.to_value()).transpose())
    }

    pub fn get(&mut self, cloud: &dyn Cloud) -> Result<()> {
        with_base!(self, base => base.get(cloud))
    }

    pub fn new_empty_peer(&self) -> Node {
        match self {
            Node::Address(b) => Node::Address(b.new_empty_peer()),
            Node::BackendService(b) => Node::BackendService(b.new_empty_peer()),
            Node::ForwardingRule(b) => Node::ForwardingRule(b.new_empty_peer()),
            Node::HealthCheck(b) => Node::HealthCheck(b.new_empty_peer()),
            Node::NetworkEndpointGroup(b) => Node::NetworkEndpointGroup(b.new_empty_peer()),
            Node::TargetHttpProxy(b) => Node::TargetHttpProxy(b.new_empty_peer()),
            Node::UrlMap(b) => Node::UrlMap(b.new_empty_peer()),
        }
    }

    /// Copy carrying payload and state, without derived views or plan.
    pub fn clone_detached(&self) -> Node {
        match self {
            Node::Address(b) => Node::Address(b.clone_detached()),
            Node::BackendService(b) => Node::BackendService(b.clone_detached()),
            Node::ForwardingRule(b) => Node::ForwardingRule(b.clone_detached()),
            Node::HealthCheck(b) => Node::HealthCheck(b.clone_detached()),
            Node::NetworkEndpointGroup(b) => Node::NetworkEndpointGroup(b.clone_detached()),
            Node::TargetHttpProxy(b) => Node::TargetHttpProxy(b.clone_detached()),
            Node::UrlMap(b) => Node::UrlMap(b.clone_detached()),
        }
    }

    /// Decide what to do about this (want) node given its got peer.
    pub fn diff(&self, got: &Node) -> Result<PlanDetails> {
        match (self, got) {
            (Node::Address(w), Node::Address(g)) => w.diff(g),
            (Node::BackendService(w), Node::BackendService(g)) => w.diff(g),
            (Node::ForwardingRule(w), Node::ForwardingRule(g)) => w.diff(g),
            (Node::HealthCheck(w), Node::HealthCheck(g)) => w.diff(g),
            (Node::NetworkEndpointGroup(w), Node::NetworkEndpointGroup(g)) => w.diff(g),
            (Node::TargetHttpProxy(w), Node::TargetHttpProxy(g)) => w.diff(g),
            (Node::UrlMap(w), Node::UrlMap(g)) => w.diff(g),
            _ => Err(Error::Planning(format!(
                "cannot diff {} ({}) against {} ({})",
                self.id(),
                self.kind(),
                got.id(),
                got.kind()
            ))),
        }
    }

    /// Translate the planned operation into actions.
    pub fn actions(&self, got: &Node) -> Result<Vec<Box<dyn Action>>> {
        match (self, got) {
            (Node::Address(w), Node::Address(g)) => w.actions(g),
            (Node::BackendService(w), Node::BackendService(g)) => w.actions(g),
            (Node::ForwardingRule(w), Node::ForwardingRule(g)) => w.actions(g),
            (Node::HealthCheck(w), Node::HealthCheck(g)) => w.actions(g),
            (Node::NetworkEndpointGroup(w), Node::NetworkEndpointGroup(g)) => w.actions(g),
            (Node::TargetHttpProxy(w), Node::TargetHttpProxy(g)) => w.actions(g),
            (Node::UrlMap(w), Node::UrlMap(g)) => w.actions(g),
            _ => Err(Error::Planning(format!(
                "kind mismatch between want {} and got {}",
                self.id(),
                got.id()
            ))),
        }
    }
}

/// Parse a reference value (a self-link string) out of a diff item side.
/// `Null` and empty strings mean "no reference".
pub(crate) fn parse_ref_value(
    owner: &ResourceId,
    value: &serde_json::Value,
) -> Result<Option<ResourceId>> {
    match value {
        serde_json::Value::Null => Ok(None),
        serde_json::Value::String(s) if s.is_empty() => Ok(None),
        serde_json::Value::String(s) => Ok(Some(ResourceId::parse(s)?)),
        other => Err(Error::Planning(format!(
            "{owner}: reference field holds non-string value {other}"
        ))),
    }
}
