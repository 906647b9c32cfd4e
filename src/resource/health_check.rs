//! Health check resource
//!
//! Health checks are terminal in the reference graph. Every mutable
//! field can be changed in place through the generic update verb, which
//! does not carry a fingerprint; recreate is never required.

use serde::{Deserialize, Serialize};

use super::{Kind, Node, NodeBase, Ownership, ResourceRef};
use crate::api::{FieldPath, FieldTraits, Frozen, Mutable};
use crate::error::Result;
use crate::id::{ResourceId, Scope};
use crate::ops::{OpsDescriptor, VerbTable, ALL_VERSIONS, GLOBAL_AND_REGIONAL};
use crate::plan::{Operation, PlanDetails};

#[derive(Serialize, Deserialize, Clone, Default, PartialEq, Debug)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct HttpHealthCheck {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_path: Option<String>,
}

/// Wire payload of a health check. The GA, Beta, and Alpha schemas agree.
#[derive(Serialize, Deserialize, Clone, Default, PartialEq, Debug)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct HealthCheck {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub check_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub check_interval_sec: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_sec: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub healthy_threshold: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unhealthy_threshold: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_health_check: Option<HttpHealthCheck>,

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

pub type MutableHealthCheck = Mutable<HealthCheck, HealthCheck, HealthCheck>;
pub type FrozenHealthCheck = Frozen<HealthCheck, HealthCheck, HealthCheck>;

pub fn health_check_id(project: &str, scope: Scope, name: &str) -> ResourceId {
    ResourceId::new(HealthCheckKind::RESOURCE, project, scope, name)
}

pub fn new_mutable_health_check(project: &str, scope: Scope, name: &str) -> MutableHealthCheck {
    MutableHealthCheck::new(
        health_check_id(project, scope, name),
        HealthCheckKind::field_traits(),
    )
}

pub fn health_check_node(resource: FrozenHealthCheck, ownership: Ownership) -> Node {
    Node::HealthCheck(NodeBase::from_resource(resource, ownership))
}

// The update verb is supported for both global and regional scope.
static HEALTH_CHECK_OPS: OpsDescriptor = OpsDescriptor {
    kind: "HealthCheck",
    resource: "healthChecks",
    get: VerbTable::new(GLOBAL_AND_REGIONAL, ALL_VERSIONS),
    create: VerbTable::new(GLOBAL_AND_REGIONAL, ALL_VERSIONS),
    delete: VerbTable::new(GLOBAL_AND_REGIONAL, ALL_VERSIONS),
    update: Some(VerbTable::new(GLOBAL_AND_REGIONAL, ALL_VERSIONS)),
    requires_fingerprint: false,
};

#[derive(Debug)]
pub enum HealthCheckKind {}

impl Kind for HealthCheckKind {
    type Ga = HealthCheck;
    type Beta = HealthCheck;
    type Alpha = HealthCheck;

    const KIND: &'static str = "HealthCheck";
    const RESOURCE: &'static str = "healthChecks";

    fn ops() -> &'static OpsDescriptor {
        &HEALTH_CHECK_OPS
    }

    fn field_traits() -> FieldTraits {
        FieldTraits::new()
            .output_only(FieldPath::new().field("id"))
            .output_only(FieldPath::new().field("creationTimestamp"))
            .output_only(FieldPath::new().field("region"))
            .output_only(FieldPath::new().field("selfLink"))
            .output_only(FieldPath::new().field("fingerprint"))
    }

    fn out_refs(_id: &ResourceId, _payload: &HealthCheck) -> Result<Vec<ResourceRef>> {
        Ok(Vec::new())
    }

    fn plan_for_diff(diff: crate::api::DiffResult) -> PlanDetails {
        PlanDetails::with_diff(Operation::Update, "update in place", diff)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::Ownership;

    #[test]
    fn test_mutable_field_change_is_update() {
        let mut mutated = new_mutable_health_check("proj", Scope::Global, "hc");
        mutated
            .access(|hc| {
                hc.check_interval_sec = Some(10);
                hc.http_health_check = Some(HttpHealthCheck {
                    port: Some(8080),
                    request_path: Some("/healthz".to_string()),
                });
            })
            .unwrap();
        let want = NodeBase::<HealthCheckKind>::from_resource(
            mutated.freeze().unwrap(),
            Ownership::Managed,
        );
        let got = NodeBase::<HealthCheckKind>::from_resource(
            new_mutable_health_check("proj", Scope::Global, "hc")
                .freeze()
                .unwrap(),
            Ownership::Managed,
        );

        let details = want.diff(&got).unwrap();
        assert_eq!(details.operation, Operation::Update);
        let diff = details.diff.unwrap();
        assert!(diff
            .paths()
            .iter()
            .any(|p| p.to_string() == "httpHealthCheck.port"));
    }
}
