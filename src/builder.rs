//! Fluent builder for resource IDs and mutable resources
//!
//! A convenience wrapper for tests, demos, and the scenario library; not
//! intended for production callers, which construct IDs and resources
//! directly.

use crate::id::{ResourceId, Scope, Version};
use crate::resource::{
    address, backend_service, forwarding_rule, health_check, network_endpoint_group,
    target_http_proxy, url_map,
};

/// Accumulates project, name, and scope, then dispenses per-kind
/// handles. Every combinator returns a fresh copy, so partial builders
/// can be reused.
#[derive(Debug, Clone)]
pub struct Builder {
    project: String,
    name: String,
    region: Option<String>,
    zone: Option<String>,
}

impl Builder {
    pub fn new(project: &str) -> Self {
        Self {
            project: project.to_string(),
            name: String::new(),
            region: None,
            zone: None,
        }
    }

    /// Set the resource name.
    pub fn n(&self, name: &str) -> Self {
        let mut ret = self.clone();
        ret.name = name.to_string();
        ret
    }

    pub fn region(&self, region: &str) -> Self {
        let mut ret = self.clone();
        ret.region = Some(region.to_string());
        ret.zone = None;
        ret
    }

    pub fn zone(&self, zone: &str) -> Self {
        let mut ret = self.clone();
        ret.zone = Some(zone.to_string());
        ret.region = None;
        ret
    }

    pub fn default_region(&self) -> Self {
        self.region("us-central1")
    }

    pub fn default_zone(&self) -> Self {
        self.zone("us-central1-b")
    }

    fn scope(&self) -> Scope {
        match (&self.region, &self.zone) {
            (Some(region), _) => Scope::Regional(region.clone()),
            (_, Some(zone)) => Scope::Zonal(zone.clone()),
            _ => Scope::Global,
        }
    }

    pub fn address(&self) -> AddressBuilder {
        AddressBuilder(self.clone())
    }

    pub fn backend_service(&self) -> BackendServiceBuilder {
        BackendServiceBuilder(self.clone())
    }

    pub fn forwarding_rule(&self) -> ForwardingRuleBuilder {
        ForwardingRuleBuilder(self.clone())
    }

    pub fn health_check(&self) -> HealthCheckBuilder {
        HealthCheckBuilder(self.clone())
    }

    pub fn network_endpoint_group(&self) -> NetworkEndpointGroupBuilder {
        NetworkEndpointGroupBuilder(self.clone())
    }

    pub fn target_http_proxy(&self) -> TargetHttpProxyBuilder {
        TargetHttpProxyBuilder(self.clone())
    }

    pub fn url_map(&self) -> UrlMapBuilder {
        UrlMapBuilder(self.clone())
    }
}

pub struct AddressBuilder(Builder);

impl AddressBuilder {
    pub fn id(&self) -> ResourceId {
        address::address_id(&self.0.project, self.0.scope(), &self.0.name)
    }

    pub fn self_link(&self) -> String {
        self.id().self_link(Version::Ga)
    }

    pub fn resource(&self) -> address::MutableAddress {
        address::new_mutable_address(&self.0.project, self.0.scope(), &self.0.name)
    }
}

pub struct BackendServiceBuilder(Builder);

impl BackendServiceBuilder {
    pub fn id(&self) -> ResourceId {
        backend_service::backend_service_id(&self.0.project, self.0.scope(), &self.0.name)
    }

    pub fn self_link(&self) -> String {
        self.id().self_link(Version::Ga)
    }

    pub fn resource(&self) -> backend_service::MutableBackendService {
        backend_service::new_mutable_backend_service(&self.0.project, self.0.scope(), &self.0.name)
    }
}

pub struct ForwardingRuleBuilder(Builder);

impl ForwardingRuleBuilder {
    pub fn id(&self) -> ResourceId {
        forwarding_rule::forwarding_rule_id(&self.0.project, self.0.scope(), &self.0.name)
    }

    pub fn self_link(&self) -> String {
        self.id().self_link(Version::Ga)
    }

    pub fn resource(&self) -> forwarding_rule::MutableForwardingRule {
        forwarding_rule::new_mutable_forwarding_rule(&self.0.project, self.0.scope(), &self.0.name)
    }
}

pub struct HealthCheckBuilder(Builder);

impl HealthCheckBuilder {
    pub fn id(&self) -> ResourceId {
        health_check::health_check_id(&self.0.project, self.0.scope(), &self.0.name)
    }

    pub fn self_link(&self) -> String {
        self.id().self_link(Version::Ga)
    }

    pub fn resource(&self) -> health_check::MutableHealthCheck {
        health_check::new_mutable_health_check(&self.0.project, self.0.scope(), &self.0.name)
    }
}

pub struct NetworkEndpointGroupBuilder(Builder);

impl NetworkEndpointGroupBuilder {
    pub fn id(&self) -> ResourceId {
        network_endpoint_group::network_endpoint_group_id(
            &self.0.project,
            self.0.scope(),
            &self.0.name,
        )
    }

    pub fn self_link(&self) -> String {
        self.id().self_link(Version::Ga)
    }

    pub fn resource(&self) -> network_endpoint_group::MutableNetworkEndpointGroup {
        network_endpoint_group::new_mutable_network_endpoint_group(
            &self.0.project,
            self.0.scope(),
            &self.0.name,
        )
    }
}

pub struct TargetHttpProxyBuilder(Builder);

impl TargetHttpProxyBuilder {
    pub fn id(&self) -> ResourceId {
        target_http_proxy::target_http_proxy_id(&self.0.project, self.0.scope(), &self.0.name)
    }

    pub fn self_link(&self) -> String {
        self.id().self_link(Version::Ga)
    }

    pub fn resource(&self) -> target_http_proxy::MutableTargetHttpProxy {
        target_http_proxy::new_mutable_target_http_proxy(
            &self.0.project,
            self.0.scope(),
            &self.0.name,
        )
    }
}

pub struct UrlMapBuilder(Builder);

impl UrlMapBuilder {
    pub fn id(&self) -> ResourceId {
        url_map::url_map_id(&self.0.project, self.0.scope(), &self.0.name)
    }

    pub fn self_link(&self) -> String {
        self.id().self_link(Version::Ga)
    }

    pub fn resource(&self) -> url_map::MutableUrlMap {
        url_map::new_mutable_url_map(&self.0.project, self.0.scope(), &self.0.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_combinators() {
        let b = Builder::new("proj");
        assert_eq!(b.n("x").address().id().scope, Scope::Global);
        assert_eq!(
            b.n("x").default_region().address().id().scope,
            Scope::Regional("us-central1".to_string())
        );
        assert_eq!(
            b.n("x").default_zone().network_endpoint_group().id().scope,
            Scope::Zonal("us-central1-b".to_string())
        );
    }

    #[test]
    fn test_self_link_parses_back() {
        let b = Builder::new("proj");
        let link = b.n("fr").forwarding_rule().self_link();
        let id = ResourceId::parse(&link).unwrap();
        assert_eq!(id, b.n("fr").forwarding_rule().id());
    }
}
