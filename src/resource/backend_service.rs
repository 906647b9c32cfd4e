//! Backend service resource
//!
//! A backend service is the hub of the reference graph: it points at
//! backend groups (NEGs), health checks, and security policies. Most
//! fields update in place through the fingerprinted whole-payload verb;
//! the load-balancing scheme and network are fixed at creation, so
//! changing them forces a recreate.

use serde::{Deserialize, Serialize};

use super::{Kind, Node, NodeBase, Ownership, ResourceRef};
use crate::api::{FieldPath, FieldTraits, Frozen, Mutable};
use crate::error::Result;
use crate::id::{ResourceId, Scope};
use crate::ops::{OpsDescriptor, VerbTable, ALL_VERSIONS, GLOBAL_AND_REGIONAL};
use crate::plan::{Operation, PlanDetails};

/// Fields that cannot change on a live backend service.
const IMMUTABLE_FIELDS: &[&str] = &["loadBalancingScheme", "network"];

#[derive(Serialize, Deserialize, Clone, Default, PartialEq, Debug)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Backend {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub balancing_mode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capacity_scaler: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_rate_per_endpoint: Option<f64>,
}

/// Wire payload of a backend service. The GA, Beta, and Alpha schemas
/// agree.
#[derive(Serialize, Deserialize, Clone, Default, PartialEq, Debug)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct BackendService {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backends: Option<Vec<Backend>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub health_checks: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub load_balancing_scheme: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_sec: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_affinity: Option<String>,

    // Attached by the server; referenced, but never written directly.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub security_policy: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub edge_security_policy: Option<String>,

    // Server-populated. The fingerprint is system state: echoed back on
    // update, never part of the semantic diff.
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

pub type MutableBackendService = Mutable<BackendService, BackendService, BackendService>;
pub type FrozenBackendService = Frozen<BackendService, BackendService, BackendService>;

pub fn backend_service_id(project: &str, scope: Scope, name: &str) -> ResourceId {
    ResourceId::new(BackendServiceKind::RESOURCE, project, scope, name)
}

pub fn new_mutable_backend_service(
    project: &str,
    scope: Scope,
    name: &str,
) -> MutableBackendService {
    MutableBackendService::new(
        backend_service_id(project, scope, name),
        BackendServiceKind::field_traits(),
    )
}

pub fn backend_service_node(resource: FrozenBackendService, ownership: Ownership) -> Node {
    Node::BackendService(NodeBase::from_resource(resource, ownership))
}

static BACKEND_SERVICE_OPS: OpsDescriptor = OpsDescriptor {
    kind: "BackendService",
    resource: "backendServices",
    get: VerbTable::new(GLOBAL_AND_REGIONAL, ALL_VERSIONS),
    create: VerbTable::new(GLOBAL_AND_REGIONAL, ALL_VERSIONS),
    delete: VerbTable::new(GLOBAL_AND_REGIONAL, ALL_VERSIONS),
    update: Some(VerbTable::new(GLOBAL_AND_REGIONAL, ALL_VERSIONS)),
    requires_fingerprint: true,
};

#[derive(Debug)]
pub enum BackendServiceKind {}

impl Kind for BackendServiceKind {
    type Ga = BackendService;
    type Beta = BackendService;
    type Alpha = BackendService;

    const KIND: &'static str = "BackendService";
    const RESOURCE: &'static str = "backendServices";

    fn ops() -> &'static OpsDescriptor {
        &BACKEND_SERVICE_OPS
    }

    fn field_traits() -> FieldTraits {
        FieldTraits::new()
            .output_only(FieldPath::new().field("id"))
            .output_only(FieldPath::new().field("creationTimestamp"))
            .output_only(FieldPath::new().field("region"))
            .output_only(FieldPath::new().field("selfLink"))
            .output_only(FieldPath::new().field("securityPolicy"))
            .output_only(FieldPath::new().field("edgeSecurityPolicy"))
            .system(FieldPath::new().field("fingerprint"))
    }

    fn out_refs(id: &ResourceId, payload: &BackendService) -> Result<Vec<ResourceRef>> {
        let mut refs = Vec::new();

        for (idx, backend) in payload.backends.iter().flatten().enumerate() {
            if let Some(group) = backend.group.as_deref().filter(|s| !s.is_empty()) {
                refs.push(ResourceRef {
                    from: id.clone(),
                    path: FieldPath::new().field("backends").index(idx).field("group"),
                    to: ResourceId::parse(group)?,
                });
            }
        }

        for (idx, hc) in payload.health_checks.iter().flatten().enumerate() {
            refs.push(ResourceRef {
                from: id.clone(),
                path: FieldPath::new().field("healthChecks").index(idx),
                to: ResourceId::parse(hc)?,
            });
        }

        if let Some(policy) = payload.security_policy.as_deref().filter(|s| !s.is_empty()) {
            refs.push(ResourceRef {
                from: id.clone(),
                path: FieldPath::new().field("securityPolicy"),
                to: ResourceId::parse(policy)?,
            });
        }

        if let Some(policy) = payload
            .edge_security_policy
            .as_deref()
            .filter(|s| !s.is_empty())
        {
            refs.push(ResourceRef {
                from: id.clone(),
                path: FieldPath::new().field("edgeSecurityPolicy"),
                to: ResourceId::parse(policy)?,
            });
        }

        Ok(refs)
    }

    fn plan_for_diff(diff: crate::api::DiffResult) -> PlanDetails {
        let immutable_changed = diff
            .paths()
            .iter()
            .any(|p| p.first_field().is_some_and(|f| IMMUTABLE_FIELDS.contains(&f)));
        if immutable_changed {
            PlanDetails::with_diff(
                Operation::Recreate,
                "immutable field changed; recreate",
                diff,
            )
        } else {
            PlanDetails::with_diff(Operation::Update, "update in place", diff)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::Version;
    use crate::resource::health_check::health_check_id;
    use crate::resource::network_endpoint_group::network_endpoint_group_id;

    fn zonal() -> Scope {
        Scope::Zonal("us-central1-b".to_string())
    }

    #[test]
    fn test_refs_cover_backends_and_health_checks() {
        let neg = network_endpoint_group_id("proj", zonal(), "neg");
        let hc = health_check_id("proj", Scope::Global, "hc");

        let mut mutable = new_mutable_backend_service("proj", Scope::Global, "bs");
        mutable
            .access(|bs| {
                bs.backends = Some(vec![Backend {
                    group: Some(neg.self_link(Version::Ga)),
                    ..Default::default()
                }]);
                bs.health_checks = Some(vec![hc.self_link(Version::Ga)]);
            })
            .unwrap();
        let node = backend_service_node(mutable.freeze().unwrap(), Ownership::Managed);

        let refs = node.out_refs().unwrap();
        assert_eq!(refs.len(), 2);
        assert_eq!(refs[0].to, neg);
        assert_eq!(refs[0].path.to_string(), "backends[0].group");
        assert_eq!(refs[1].to, hc);
        assert_eq!(refs[1].path.to_string(), "healthChecks[0]");
    }

    #[test]
    fn test_mutable_change_is_update() {
        let make = |timeout: u32| {
            let mut m = new_mutable_backend_service("proj", Scope::Global, "bs");
            m.access(|bs| bs.timeout_sec = Some(timeout)).unwrap();
            NodeBase::<BackendServiceKind>::from_resource(m.freeze().unwrap(), Ownership::Managed)
        };
        let details = make(30).diff(&make(10)).unwrap();
        assert_eq!(details.operation, Operation::Update);
    }

    #[test]
    fn test_immutable_change_is_recreate() {
        let make = |scheme: &str| {
            let mut m = new_mutable_backend_service("proj", Scope::Global, "bs");
            m.access(|bs| bs.load_balancing_scheme = Some(scheme.to_string()))
                .unwrap();
            NodeBase::<BackendServiceKind>::from_resource(m.freeze().unwrap(), Ownership::Managed)
        };
        let details = make("EXTERNAL_MANAGED").diff(&make("EXTERNAL")).unwrap();
        assert_eq!(details.operation, Operation::Recreate);
    }
}
