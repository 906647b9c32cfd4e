//! Target HTTP proxy resource
//!
//! A proxy references exactly one URL map. It has no update surface:
//! any change means recreate.

use serde::{Deserialize, Serialize};

use super::{Kind, Node, NodeBase, Ownership, ResourceRef};
use crate::api::{FieldPath, FieldTraits, Frozen, Mutable};
use crate::error::Result;
use crate::id::{ResourceId, Scope};
use crate::ops::{OpsDescriptor, VerbTable, ALL_VERSIONS, GLOBAL_AND_REGIONAL};
use crate::plan::{Operation, PlanDetails};

/// Wire payload of a target HTTP proxy. The GA, Beta, and Alpha schemas
/// agree.
#[derive(Serialize, Deserialize, Clone, Default, PartialEq, Debug)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TargetHttpProxy {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url_map: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proxy_bind: Option<bool>,

    // Server-populated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creation_timestamp: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub self_link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<String>,
}

pub type MutableTargetHttpProxy = Mutable<TargetHttpProxy, TargetHttpProxy, TargetHttpProxy>;
pub type FrozenTargetHttpProxy = Frozen<TargetHttpProxy, TargetHttpProxy, TargetHttpProxy>;

pub fn target_http_proxy_id(project: &str, scope: Scope, name: &str) -> ResourceId {
    ResourceId::new(TargetHttpProxyKind::RESOURCE, project, scope, name)
}

pub fn new_mutable_target_http_proxy(
    project: &str,
    scope: Scope,
    name: &str,
) -> MutableTargetHttpProxy {
    MutableTargetHttpProxy::new(
        target_http_proxy_id(project, scope, name),
        TargetHttpProxyKind::field_traits(),
    )
}

pub fn target_http_proxy_node(resource: FrozenTargetHttpProxy, ownership: Ownership) -> Node {
    Node::TargetHttpProxy(NodeBase::from_resource(resource, ownership))
}

static TARGET_HTTP_PROXY_OPS: OpsDescriptor = OpsDescriptor {
    kind: "TargetHttpProxy",
    resource: "targetHttpProxies",
    get: VerbTable::new(GLOBAL_AND_REGIONAL, ALL_VERSIONS),
    create: VerbTable::new(GLOBAL_AND_REGIONAL, ALL_VERSIONS),
    delete: VerbTable::new(GLOBAL_AND_REGIONAL, ALL_VERSIONS),
    update: None,
    requires_fingerprint: false,
};

#[derive(Debug)]
pub enum TargetHttpProxyKind {}

impl Kind for TargetHttpProxyKind {
    type Ga = TargetHttpProxy;
    type Beta = TargetHttpProxy;
    type Alpha = TargetHttpProxy;

    const KIND: &'static str = "TargetHttpProxy";
    const RESOURCE: &'static str = "targetHttpProxies";

    fn ops() -> &'static OpsDescriptor {
        &TARGET_HTTP_PROXY_OPS
    }

    fn field_traits() -> FieldTraits {
        FieldTraits::new()
            .output_only(FieldPath::new().field("id"))
            .output_only(FieldPath::new().field("creationTimestamp"))
            .output_only(FieldPath::new().field("region"))
            .output_only(FieldPath::new().field("selfLink"))
            .output_only(FieldPath::new().field("fingerprint"))
    }

    fn out_refs(id: &ResourceId, payload: &TargetHttpProxy) -> Result<Vec<ResourceRef>> {
        let mut refs = Vec::new();
        if let Some(url_map) = payload.url_map.as_deref().filter(|s| !s.is_empty()) {
            refs.push(ResourceRef {
                from: id.clone(),
                path: FieldPath::new().field("urlMap"),
                to: ResourceId::parse(url_map)?,
            });
        }
        Ok(refs)
    }

    fn plan_for_diff(diff: crate::api::DiffResult) -> PlanDetails {
        PlanDetails::with_diff(
            Operation::Recreate,
            "TargetHttpProxy has no update surface; recreate",
            diff,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::Version;

    #[test]
    fn test_url_map_ref_is_extracted() {
        let um = crate::resource::url_map::url_map_id("proj", Scope::Global, "um");
        let mut mutable = new_mutable_target_http_proxy("proj", Scope::Global, "tp");
        mutable
            .access(|tp| tp.url_map = Some(um.self_link(Version::Ga)))
            .unwrap();
        let node = target_http_proxy_node(mutable.freeze().unwrap(), Ownership::Managed);

        let refs = node.out_refs().unwrap();
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].to, um);
        assert_eq!(refs[0].path.to_string(), "urlMap");
    }

    #[test]
    fn test_empty_proxy_has_no_refs() {
        let node = target_http_proxy_node(
            new_mutable_target_http_proxy("proj", Scope::Global, "tp")
                .freeze()
                .unwrap(),
            Ownership::Managed,
        );
        assert!(node.out_refs().unwrap().is_empty());
    }
}
