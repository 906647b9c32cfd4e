//! Address resource: a reserved IP
//!
//! Addresses are terminal in the reference graph and have no update
//! surface: any change means recreate.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{Kind, Node, NodeBase, Ownership, ResourceRef};
use crate::api::{FieldPath, FieldTraits, Frozen, Mutable};
use crate::error::Result;
use crate::id::{ResourceId, Scope};
use crate::ops::{OpsDescriptor, VerbTable, ALL_VERSIONS, GLOBAL_AND_REGIONAL};
use crate::plan::{Operation, PlanDetails};

/// Wire payload of an address. The GA, Beta, and Alpha schemas agree.
#[derive(Serialize, Deserialize, Clone, Default, PartialEq, Debug)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Address {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network_tier: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub purpose: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<BTreeMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label_fingerprint: Option<String>,

    // Server-populated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creation_timestamp: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub self_link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub users: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<String>,
}

pub type MutableAddress = Mutable<Address, Address, Address>;
pub type FrozenAddress = Frozen<Address, Address, Address>;

pub fn address_id(project: &str, scope: Scope, name: &str) -> ResourceId {
    ResourceId::new(AddressKind::RESOURCE, project, scope, name)
}

pub fn new_mutable_address(project: &str, scope: Scope, name: &str) -> MutableAddress {
    MutableAddress::new(address_id(project, scope, name), AddressKind::field_traits())
}

/// Wrap a frozen address into a graph node.
pub fn address_node(resource: FrozenAddress, ownership: Ownership) -> Node {
    Node::Address(NodeBase::from_resource(resource, ownership))
}

static ADDRESS_OPS: OpsDescriptor = OpsDescriptor {
    kind: "Address",
    resource: "addresses",
    get: VerbTable::new(GLOBAL_AND_REGIONAL, ALL_VERSIONS),
    create: VerbTable::new(GLOBAL_AND_REGIONAL, ALL_VERSIONS),
    delete: VerbTable::new(GLOBAL_AND_REGIONAL, ALL_VERSIONS),
    update: None,
    requires_fingerprint: false,
};

#[derive(Debug)]
pub enum AddressKind {}

impl Kind for AddressKind {
    type Ga = Address;
    type Beta = Address;
    type Alpha = Address;

    const KIND: &'static str = "Address";
    const RESOURCE: &'static str = "addresses";

    fn ops() -> &'static OpsDescriptor {
        &ADDRESS_OPS
    }

    fn field_traits() -> FieldTraits {
        FieldTraits::new()
            .output_only(FieldPath::new().field("id"))
            .output_only(FieldPath::new().field("creationTimestamp"))
            .output_only(FieldPath::new().field("status"))
            .output_only(FieldPath::new().field("region"))
            .output_only(FieldPath::new().field("selfLink"))
            .output_only(FieldPath::new().field("users"))
            .output_only(FieldPath::new().field("fingerprint"))
            .output_only(FieldPath::new().field("labelFingerprint"))
    }

    fn out_refs(_id: &ResourceId, _payload: &Address) -> Result<Vec<ResourceRef>> {
        Ok(Vec::new())
    }

    fn plan_for_diff(diff: crate::api::DiffResult) -> PlanDetails {
        PlanDetails::with_diff(
            Operation::Recreate,
            "Address has no update surface; recreate",
            diff,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::NodeState;

    #[test]
    fn test_any_diff_means_recreate() {
        let mut mutated = new_mutable_address("proj", Scope::Global, "a1");
        mutated
            .access(|a| a.description = Some("changed".to_string()))
            .unwrap();
        let want = NodeBase::<AddressKind>::from_resource(
            mutated.freeze().unwrap(),
            Ownership::Managed,
        );
        let got = NodeBase::<AddressKind>::from_resource(
            new_mutable_address("proj", Scope::Global, "a1")
                .freeze()
                .unwrap(),
            Ownership::Managed,
        );

        let details = want.diff(&got).unwrap();
        assert_eq!(details.operation, Operation::Recreate);
        assert!(details.diff.unwrap().has_diff());
    }

    #[test]
    fn test_no_refs() {
        let node = address_node(
            new_mutable_address("proj", Scope::Global, "a1")
                .freeze()
                .unwrap(),
            Ownership::Managed,
        );
        assert!(node.out_refs().unwrap().is_empty());
        assert_eq!(node.state(), NodeState::Unknown);
    }
}
