//! Network endpoint group resource
//!
//! NEGs are zonal, terminal in the reference graph, and immutable once
//! created: any change means recreate.

use serde::{Deserialize, Serialize};

use super::{Kind, Node, NodeBase, Ownership, ResourceRef};
use crate::api::{FieldPath, FieldTraits, Frozen, Mutable};
use crate::error::Result;
use crate::id::{ResourceId, Scope};
use crate::ops::{OpsDescriptor, VerbTable, ALL_VERSIONS, ZONAL_ONLY};
use crate::plan::{Operation, PlanDetails};

/// Wire payload of a network endpoint group. The GA, Beta, and Alpha
/// schemas agree.
#[derive(Serialize, Deserialize, Clone, Default, PartialEq, Debug)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NetworkEndpointGroup {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network_endpoint_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subnetwork: Option<String>,

    // Server-populated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creation_timestamp: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub self_link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<String>,
}

pub type MutableNetworkEndpointGroup =
    Mutable<NetworkEndpointGroup, NetworkEndpointGroup, NetworkEndpointGroup>;
pub type FrozenNetworkEndpointGroup =
    Frozen<NetworkEndpointGroup, NetworkEndpointGroup, NetworkEndpointGroup>;

pub fn network_endpoint_group_id(project: &str, scope: Scope, name: &str) -> ResourceId {
    ResourceId::new(NetworkEndpointGroupKind::RESOURCE, project, scope, name)
}

pub fn new_mutable_network_endpoint_group(
    project: &str,
    scope: Scope,
    name: &str,
) -> MutableNetworkEndpointGroup {
    MutableNetworkEndpointGroup::new(
        network_endpoint_group_id(project, scope, name),
        NetworkEndpointGroupKind::field_traits(),
    )
}

pub fn network_endpoint_group_node(
    resource: FrozenNetworkEndpointGroup,
    ownership: Ownership,
) -> Node {
    Node::NetworkEndpointGroup(NodeBase::from_resource(resource, ownership))
}

static NEG_OPS: OpsDescriptor = OpsDescriptor {
    kind: "NetworkEndpointGroup",
    resource: "networkEndpointGroups",
    get: VerbTable::new(ZONAL_ONLY, ALL_VERSIONS),
    create: VerbTable::new(ZONAL_ONLY, ALL_VERSIONS),
    delete: VerbTable::new(ZONAL_ONLY, ALL_VERSIONS),
    update: None,
    requires_fingerprint: false,
};

#[derive(Debug)]
pub enum NetworkEndpointGroupKind {}

impl Kind for NetworkEndpointGroupKind {
    type Ga = NetworkEndpointGroup;
    type Beta = NetworkEndpointGroup;
    type Alpha = NetworkEndpointGroup;

    const KIND: &'static str = "NetworkEndpointGroup";
    const RESOURCE: &'static str = "networkEndpointGroups";

    fn ops() -> &'static OpsDescriptor {
        &NEG_OPS
    }

    fn field_traits() -> FieldTraits {
        FieldTraits::new()
            .output_only(FieldPath::new().field("id"))
            .output_only(FieldPath::new().field("creationTimestamp"))
            .output_only(FieldPath::new().field("zone"))
            .output_only(FieldPath::new().field("size"))
            .output_only(FieldPath::new().field("selfLink"))
            .output_only(FieldPath::new().field("fingerprint"))
    }

    fn out_refs(_id: &ResourceId, _payload: &NetworkEndpointGroup) -> Result<Vec<ResourceRef>> {
        Ok(Vec::new())
    }

    fn plan_for_diff(diff: crate::api::DiffResult) -> PlanDetails {
        PlanDetails::with_diff(
            Operation::Recreate,
            "NetworkEndpointGroup has no update surface; recreate",
            diff,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cloud::{Cloud, MockCloud};
    use crate::error::Error;
    use crate::id::Version;

    fn zonal() -> Scope {
        Scope::Zonal("us-central1-b".to_string())
    }

    #[test]
    fn test_global_scope_is_rejected() {
        let cloud = MockCloud::new();
        let id = network_endpoint_group_id("proj", Scope::Global, "neg");
        let err = NEG_OPS.do_get(&cloud, &id, Version::Ga).unwrap_err();
        assert!(matches!(err, Error::UnsupportedScope { .. }));
    }

    #[test]
    fn test_zonal_get_round_trip() {
        let cloud = MockCloud::new();
        let id = network_endpoint_group_id("proj", zonal(), "neg");
        cloud
            .insert(&id, Version::Ga, serde_json::json!({"name": "neg"}))
            .unwrap();

        let mut node = Node::by_id(&id).unwrap();
        node.get(&cloud).unwrap();
        assert_eq!(node.state(), crate::resource::NodeState::Exists);
    }
}
