//! Forwarding rule resource
//!
//! A forwarding rule is the entry point of a load balancer. It
//! references the reserved address it binds (unless given a literal IP)
//! and the target proxy it forwards to. Target and labels can change in
//! place through the `setTarget` / `setLabels` verbs; any other change
//! forces a recreate.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::net::IpAddr;

use super::{parse_ref_value, Kind, Node, NodeBase, Ownership, ResourceRef};
use crate::actions::ForwardingRuleUpdateAction;
use crate::api::{FieldPath, FieldTraits, Frozen, Mutable};
use crate::error::{Error, Result};
use crate::exec::{Action, Event, EventOnlyAction};
use crate::id::{ResourceId, Scope};
use crate::ops::{OpsDescriptor, VerbTable, ALL_VERSIONS, GLOBAL_AND_REGIONAL};
use crate::plan::{Operation, PlanDetails};

/// GA wire payload of a forwarding rule.
#[derive(Serialize, Deserialize, Clone, Default, PartialEq, Debug)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ForwardingRule {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Reserved address self-link, or a literal IP.
    #[serde(rename = "IPAddress", skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    #[serde(rename = "IPProtocol", skip_serializing_if = "Option::is_none")]
    pub ip_protocol: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port_range: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ports: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub load_balancing_scheme: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network_tier: Option<String>,
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
    pub region: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub self_link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub psc_connection_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub psc_connection_status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_forwarding_rule: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<String>,
}

/// Beta wire payload: the GA schema plus source-IP-range filtering,
/// which GA cannot represent.
#[derive(Serialize, Deserialize, Clone, Default, PartialEq, Debug)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ForwardingRuleBeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "IPAddress", skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    #[serde(rename = "IPProtocol", skip_serializing_if = "Option::is_none")]
    pub ip_protocol: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port_range: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ports: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub load_balancing_scheme: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network_tier: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<BTreeMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label_fingerprint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_ip_ranges: Option<Vec<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creation_timestamp: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub self_link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub psc_connection_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub psc_connection_status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_forwarding_rule: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<String>,
}

/// Alpha wire payload: the Beta schema plus public IP collections.
#[derive(Serialize, Deserialize, Clone, Default, PartialEq, Debug)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ForwardingRuleAlpha {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "IPAddress", skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    #[serde(rename = "IPProtocol", skip_serializing_if = "Option::is_none")]
    pub ip_protocol: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port_range: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ports: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub load_balancing_scheme: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network_tier: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<BTreeMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label_fingerprint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_ip_ranges: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip_collection: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creation_timestamp: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub self_link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub psc_connection_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub psc_connection_status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_forwarding_rule: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<String>,
}

pub type MutableForwardingRule = Mutable<ForwardingRule, ForwardingRuleBeta, ForwardingRuleAlpha>;
pub type FrozenForwardingRule = Frozen<ForwardingRule, ForwardingRuleBeta, ForwardingRuleAlpha>;

pub fn forwarding_rule_id(project: &str, scope: Scope, name: &str) -> ResourceId {
    ResourceId::new(ForwardingRuleKind::RESOURCE, project, scope, name)
}

pub fn new_mutable_forwarding_rule(
    project: &str,
    scope: Scope,
    name: &str,
) -> MutableForwardingRule {
    MutableForwardingRule::new(
        forwarding_rule_id(project, scope, name),
        ForwardingRuleKind::field_traits(),
    )
}

pub fn forwarding_rule_node(resource: FrozenForwardingRule, ownership: Ownership) -> Node {
    Node::ForwardingRule(NodeBase::from_resource(resource, ownership))
}

static FORWARDING_RULE_OPS: OpsDescriptor = OpsDescriptor {
    kind: "ForwardingRule",
    resource: "forwardingRules",
    get: VerbTable::new(GLOBAL_AND_REGIONAL, ALL_VERSIONS),
    create: VerbTable::new(GLOBAL_AND_REGIONAL, ALL_VERSIONS),
    delete: VerbTable::new(GLOBAL_AND_REGIONAL, ALL_VERSIONS),
    update: None,
    requires_fingerprint: false,
};

#[derive(Debug)]
pub enum ForwardingRuleKind {}

impl Kind for ForwardingRuleKind {
    type Ga = ForwardingRule;
    type Beta = ForwardingRuleBeta;
    type Alpha = ForwardingRuleAlpha;

    const KIND: &'static str = "ForwardingRule";
    const RESOURCE: &'static str = "forwardingRules";

    fn ops() -> &'static OpsDescriptor {
        &FORWARDING_RULE_OPS
    }

    fn field_traits() -> FieldTraits {
        FieldTraits::new()
            .output_only(FieldPath::new().field("id"))
            .output_only(FieldPath::new().field("creationTimestamp"))
            .output_only(FieldPath::new().field("region"))
            .output_only(FieldPath::new().field("selfLink"))
            .output_only(FieldPath::new().field("serviceName"))
            .output_only(FieldPath::new().field("pscConnectionId"))
            .output_only(FieldPath::new().field("pscConnectionStatus"))
            .output_only(FieldPath::new().field("baseForwardingRule"))
            .output_only(FieldPath::new().field("fingerprint"))
            .output_only(FieldPath::new().field("labelFingerprint"))
    }

    fn out_refs(id: &ResourceId, payload: &ForwardingRule) -> Result<Vec<ResourceRef>> {
        let mut refs = Vec::new();

        if let Some(ip) = payload.ip_address.as_deref().filter(|s| !s.is_empty()) {
            // A literal IP is ephemeral, not a resource reference.
            if ip.parse::<IpAddr>().is_err() {
                refs.push(ResourceRef {
                    from: id.clone(),
                    path: FieldPath::new().field("IPAddress"),
                    to: ResourceId::parse(ip)?,
                });
            }
        }

        if let Some(target) = payload.target.as_deref().filter(|s| !s.is_empty()) {
            refs.push(ResourceRef {
                from: id.clone(),
                path: FieldPath::new().field("target"),
                to: ResourceId::parse(target)?,
            });
        }

        Ok(refs)
    }

    fn plan_for_diff(diff: crate::api::DiffResult) -> PlanDetails {
        let mut other = false;
        for path in diff.paths() {
            match path.first_field() {
                Some("target") | Some("labels") => {}
                _ => other = true,
            }
        }
        if other {
            PlanDetails::with_diff(
                Operation::Recreate,
                "changed field has no update surface; recreate",
                diff,
            )
        } else {
            PlanDetails::with_diff(Operation::Update, "update target/labels in place", diff)
        }
    }

    /// Target changes go through `setTarget`, label changes through
    /// `setLabels`. The new target must exist before the update runs;
    /// the old target's reference is dropped afterwards.
    fn update_actions(want: &NodeBase<Self>, got: &NodeBase<Self>) -> Result<Vec<Box<dyn Action>>> {
        let details = want.plan().details().ok_or_else(|| {
            Error::Planning(format!("ForwardingRule: node {} has not been planned", want.id()))
        })?;
        let diff = details.diff.as_ref().ok_or_else(|| {
            Error::Planning(format!(
                "ForwardingRule: update of {} planned without a diff",
                want.id()
            ))
        })?;

        let mut want_events = Vec::new();
        let mut target = None;
        let mut old_target = None;
        let mut labels_changed = false;

        for item in &diff.items {
            match item.path.first_field() {
                Some("target") => {
                    old_target = parse_ref_value(want.id(), &item.a)?;
                    target = parse_ref_value(want.id(), &item.b)?;
                    if let Some(new) = &target {
                        want_events.push(Event::Exists(new.clone()));
                    }
                }
                Some("labels") => labels_changed = true,
                _ => {
                    return Err(Error::Planning(format!(
                        "ForwardingRule: update of {} cannot change field {}",
                        want.id(),
                        item.path
                    )))
                }
            }
        }

        let labels = if labels_changed {
            let payload = want
                .resource()
                .ok_or_else(|| {
                    Error::Planning(format!("ForwardingRule: want node {} has no payload", want.id()))
                })?
                .to_ga()?;
            Some(payload.labels.unwrap_or_default())
        } else {
            None
        };

        // The label fingerprint being replaced comes from the payload we
        // fetched, not a second read.
        let label_fingerprint = got
            .resource()
            .map(|r| r.to_ga())
            .transpose()?
            .and_then(|p| p.label_fingerprint)
            .unwrap_or_default();

        Ok(vec![
            EventOnlyAction::exists(want.id().clone()),
            ForwardingRuleUpdateAction::new(
                want_events,
                want.id().clone(),
                want.version(),
                target,
                old_target,
                labels,
                label_fingerprint,
            ),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::Version;
    use crate::resource::address::address_id;
    use crate::resource::target_http_proxy::target_http_proxy_id;

    fn fr_with(ip: Option<&str>, target: Option<&str>) -> Node {
        let mut mutable = new_mutable_forwarding_rule("proj", Scope::Global, "fr");
        mutable
            .access(|fr| {
                fr.ip_address = ip.map(str::to_string);
                fr.target = target.map(str::to_string);
            })
            .unwrap();
        forwarding_rule_node(mutable.freeze().unwrap(), Ownership::Managed)
    }

    #[test]
    fn test_literal_ip_is_not_a_ref() {
        let node = fr_with(Some("10.2.3.4"), None);
        assert!(node.out_refs().unwrap().is_empty());
    }

    #[test]
    fn test_address_and_target_refs() {
        let addr = address_id("proj", Scope::Global, "addr");
        let tp = target_http_proxy_id("proj", Scope::Global, "tp");
        let node = fr_with(
            Some(&addr.self_link(Version::Ga)),
            Some(&tp.self_link(Version::Ga)),
        );

        let refs = node.out_refs().unwrap();
        assert_eq!(refs.len(), 2);
        assert_eq!(refs[0].to, addr);
        assert_eq!(refs[1].to, tp);
    }

    #[test]
    fn test_target_change_is_update() {
        let tp1 = target_http_proxy_id("proj", Scope::Global, "tp1");
        let tp2 = target_http_proxy_id("proj", Scope::Global, "tp2");
        let got = fr_with(None, Some(&tp1.self_link(Version::Ga)));
        let want = fr_with(None, Some(&tp2.self_link(Version::Ga)));

        let details = want.diff(&got).unwrap();
        assert_eq!(details.operation, Operation::Update);
        let diff = details.diff.unwrap();
        assert_eq!(diff.items.len(), 1);
        assert_eq!(diff.items[0].path.to_string(), "target");
    }

    #[test]
    fn test_port_range_change_is_recreate() {
        let make = |range: &str| {
            let mut m = new_mutable_forwarding_rule("proj", Scope::Global, "fr");
            m.access(|fr| fr.port_range = Some(range.to_string())).unwrap();
            forwarding_rule_node(m.freeze().unwrap(), Ownership::Managed)
        };
        let details = make("80").diff(&make("8080")).unwrap();
        assert_eq!(details.operation, Operation::Recreate);
    }

    #[test]
    fn test_beta_only_field_blocks_ga_conversion() {
        let mut mutable = new_mutable_forwarding_rule("proj", Scope::Global, "fr");
        mutable.set_version(Version::Beta).unwrap();
        mutable
            .access_beta(|fr| fr.source_ip_ranges = Some(vec!["10.0.0.0/8".to_string()]))
            .unwrap();
        let frozen = mutable.freeze().unwrap();
        assert!(frozen.to_ga().is_err());
        assert!(frozen.to_alpha().is_ok());
    }
}
