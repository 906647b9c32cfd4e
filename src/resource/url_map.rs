//! URL map resource
//!
//! A URL map routes to backend services: its default service plus any
//! per-path-matcher defaults are references. Updates go through the
//! fingerprinted whole-payload verb; recreate is never required.

use serde::{Deserialize, Serialize};

use super::{Kind, Node, NodeBase, Ownership, ResourceRef};
use crate::api::{FieldPath, FieldTraits, Frozen, Mutable};
use crate::error::Result;
use crate::id::{ResourceId, Scope};
use crate::ops::{OpsDescriptor, VerbTable, ALL_VERSIONS, GLOBAL_AND_REGIONAL};
use crate::plan::{Operation, PlanDetails};

#[derive(Serialize, Deserialize, Clone, Default, PartialEq, Debug)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct HostRule {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hosts: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path_matcher: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Default, PartialEq, Debug)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PathRule {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paths: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Default, PartialEq, Debug)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PathMatcher {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_service: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path_rules: Option<Vec<PathRule>>,
}

/// Wire payload of a URL map. The GA, Beta, and Alpha schemas agree.
#[derive(Serialize, Deserialize, Clone, Default, PartialEq, Debug)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UrlMap {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_service: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host_rules: Option<Vec<HostRule>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path_matchers: Option<Vec<PathMatcher>>,

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

pub type MutableUrlMap = Mutable<UrlMap, UrlMap, UrlMap>;
pub type FrozenUrlMap = Frozen<UrlMap, UrlMap, UrlMap>;

pub fn url_map_id(project: &str, scope: Scope, name: &str) -> ResourceId {
    ResourceId::new(UrlMapKind::RESOURCE, project, scope, name)
}

pub fn new_mutable_url_map(project: &str, scope: Scope, name: &str) -> MutableUrlMap {
    MutableUrlMap::new(url_map_id(project, scope, name), UrlMapKind::field_traits())
}

pub fn url_map_node(resource: FrozenUrlMap, ownership: Ownership) -> Node {
    Node::UrlMap(NodeBase::from_resource(resource, ownership))
}

static URL_MAP_OPS: OpsDescriptor = OpsDescriptor {
    kind: "UrlMap",
    resource: "urlMaps",
    get: VerbTable::new(GLOBAL_AND_REGIONAL, ALL_VERSIONS),
    create: VerbTable::new(GLOBAL_AND_REGIONAL, ALL_VERSIONS),
    delete: VerbTable::new(GLOBAL_AND_REGIONAL, ALL_VERSIONS),
    update: Some(VerbTable::new(GLOBAL_AND_REGIONAL, ALL_VERSIONS)),
    requires_fingerprint: true,
};

#[derive(Debug)]
pub enum UrlMapKind {}

impl Kind for UrlMapKind {
    type Ga = UrlMap;
    type Beta = UrlMap;
    type Alpha = UrlMap;

    const KIND: &'static str = "UrlMap";
    const RESOURCE: &'static str = "urlMaps";

    fn ops() -> &'static OpsDescriptor {
        &URL_MAP_OPS
    }

    fn field_traits() -> FieldTraits {
        FieldTraits::new()
            .output_only(FieldPath::new().field("id"))
            .output_only(FieldPath::new().field("creationTimestamp"))
            .output_only(FieldPath::new().field("region"))
            .output_only(FieldPath::new().field("selfLink"))
            .system(FieldPath::new().field("fingerprint"))
    }

    fn out_refs(id: &ResourceId, payload: &UrlMap) -> Result<Vec<ResourceRef>> {
        let mut refs = Vec::new();

        if let Some(service) = payload.default_service.as_deref().filter(|s| !s.is_empty()) {
            refs.push(ResourceRef {
                from: id.clone(),
                path: FieldPath::new().field("defaultService"),
                to: ResourceId::parse(service)?,
            });
        }

        for (idx, matcher) in payload.path_matchers.iter().flatten().enumerate() {
            if let Some(service) = matcher.default_service.as_deref().filter(|s| !s.is_empty()) {
                refs.push(ResourceRef {
                    from: id.clone(),
                    path: FieldPath::new()
                        .field("pathMatchers")
                        .index(idx)
                        .field("defaultService"),
                    to: ResourceId::parse(service)?,
                });
            }
        }

        Ok(refs)
    }

    fn plan_for_diff(diff: crate::api::DiffResult) -> PlanDetails {
        PlanDetails::with_diff(Operation::Update, "update in place", diff)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::Version;
    use crate::resource::backend_service::backend_service_id;

    #[test]
    fn test_default_service_and_matcher_refs() {
        let bs1 = backend_service_id("proj", Scope::Global, "bs1");
        let bs2 = backend_service_id("proj", Scope::Global, "bs2");

        let mut mutable = new_mutable_url_map("proj", Scope::Global, "um");
        mutable
            .access(|um| {
                um.default_service = Some(bs1.self_link(Version::Ga));
                um.path_matchers = Some(vec![PathMatcher {
                    name: Some("api".to_string()),
                    default_service: Some(bs2.self_link(Version::Ga)),
                    path_rules: None,
                }]);
            })
            .unwrap();
        let node = url_map_node(mutable.freeze().unwrap(), Ownership::Managed);

        let refs = node.out_refs().unwrap();
        assert_eq!(refs.len(), 2);
        assert_eq!(refs[0].to, bs1);
        assert_eq!(refs[1].to, bs2);
        assert_eq!(refs[1].path.to_string(), "pathMatchers[0].defaultService");
    }

    #[test]
    fn test_fingerprint_excluded_from_diff() {
        let make = |fingerprint: &str| {
            // Wire payloads carry the fingerprint; rebuild one the way a
            // fetch would.
            let value = serde_json::json!({ "name": "um", "fingerprint": fingerprint });
            FrozenUrlMap::from_wire(
                url_map_id("proj", Scope::Global, "um"),
                UrlMapKind::field_traits(),
                Version::Ga,
                value,
            )
            .unwrap()
        };
        let diff = make("fp-1").diff(&make("fp-2")).unwrap();
        assert!(!diff.has_diff());
    }
}
