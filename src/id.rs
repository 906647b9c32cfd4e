//! Resource identity: kind, project, scope, and name
//!
//! A [`ResourceId`] names exactly one resource in the cloud. It is the
//! key used everywhere in the engine: graph membership, event matching,
//! and the self-link URL form exchanged with the API.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Error, Result};

/// API version of a resource representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Version {
    Ga,
    Beta,
    Alpha,
}

impl Version {
    /// Path segment used in self-link URLs for this version.
    pub fn api_path(&self) -> &'static str {
        match self {
            Version::Ga => "v1",
            Version::Beta => "beta",
            Version::Alpha => "alpha",
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.api_path())
    }
}

/// Scope of a resource: project-global, or bound to a region or zone.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Scope {
    Global,
    Regional(String),
    Zonal(String),
}

impl Scope {
    pub fn kind(&self) -> ScopeKind {
        match self {
            Scope::Global => ScopeKind::Global,
            Scope::Regional(_) => ScopeKind::Regional,
            Scope::Zonal(_) => ScopeKind::Zonal,
        }
    }

    fn path(&self) -> String {
        match self {
            Scope::Global => "global".to_string(),
            Scope::Regional(r) => format!("regions/{r}"),
            Scope::Zonal(z) => format!("zones/{z}"),
        }
    }
}

/// Scope discriminant, used by the per-kind dispatch tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScopeKind {
    Global,
    Regional,
    Zonal,
}

impl fmt::Display for ScopeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScopeKind::Global => f.write_str("global"),
            ScopeKind::Regional => f.write_str("regional"),
            ScopeKind::Zonal => f.write_str("zonal"),
        }
    }
}

/// The resource path segments the engine knows how to manage.
pub(crate) const KNOWN_KINDS: &[&str] = &[
    "addresses",
    "backendServices",
    "forwardingRules",
    "healthChecks",
    "networkEndpointGroups",
    "targetHttpProxies",
    "urlMaps",
];

/// Canonical identity of a cloud resource.
///
/// Two IDs are equal iff kind, project, scope, and name all match. The
/// ordering is total and version-independent, so `ResourceId` can be
/// used directly as a map key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceId {
    /// Resource path segment, e.g. `"forwardingRules"`.
    pub resource: &'static str,
    pub project: String,
    pub scope: Scope,
    pub name: String,
}

impl ResourceId {
    pub fn new(resource: &'static str, project: &str, scope: Scope, name: &str) -> Self {
        Self {
            resource,
            project: project.to_string(),
            scope,
            name: name.to_string(),
        }
    }

    /// Compact, totally-ordered key form. Version-independent.
    pub fn map_key(&self) -> String {
        format!(
            "{}/{}/{}/{}",
            self.resource,
            self.project,
            self.scope.path(),
            self.name
        )
    }

    /// Canonical self-link URL at the given API version.
    pub fn self_link(&self, version: Version) -> String {
        format!(
            "https://www.googleapis.com/compute/{}/projects/{}/{}/{}/{}",
            version.api_path(),
            self.project,
            self.scope.path(),
            self.resource,
            self.name
        )
    }

    /// Parse a self-link URL into a resource identity.
    ///
    /// Recognizes global, regional, and zonal URL forms, with or without
    /// the scheme/host/API-version prefix. The resource kind must be one
    /// the engine knows about.
    pub fn parse(url: &str) -> Result<ResourceId> {
        let err = |reason: &str| Error::Parse {
            url: url.to_string(),
            reason: reason.to_string(),
        };

        let segs: Vec<&str> = url
            .trim_start_matches("https://")
            .trim_start_matches("http://")
            .split('/')
            .filter(|s| !s.is_empty())
            .collect();

        let proj_idx = segs
            .iter()
            .position(|s| *s == "projects")
            .ok_or_else(|| err("no 'projects' segment"))?;
        let rest = &segs[proj_idx + 1..];

        let (project, scoped) = match rest {
            [project, tail @ ..] if !tail.is_empty() => (*project, tail),
            _ => return Err(err("missing project")),
        };

        let (scope, kind_and_name) = match scoped {
            ["global", tail @ ..] => (Scope::Global, tail),
            ["regions", region, tail @ ..] => (Scope::Regional(region.to_string()), tail),
            ["zones", zone, tail @ ..] => (Scope::Zonal(zone.to_string()), tail),
            _ => return Err(err("missing global/regions/zones segment")),
        };

        let (resource, name) = match kind_and_name {
            [resource, name] => (*resource, *name),
            _ => return Err(err("expected <resource>/<name> suffix")),
        };

        let resource = KNOWN_KINDS
            .iter()
            .find(|k| **k == resource)
            .copied()
            .ok_or_else(|| err(&format!("unknown resource kind {resource:?}")))?;

        Ok(ResourceId {
            resource,
            project: project.to_string(),
            scope,
            name: name.to_string(),
        })
    }
}

// Display and map_key agree: events and trace output use Display, tests
// compare against map_key.
impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.map_key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fr_id(scope: Scope) -> ResourceId {
        ResourceId::new("forwardingRules", "proj-1", scope, "fr")
    }

    #[test]
    fn test_self_link_round_trip() {
        for scope in [
            Scope::Global,
            Scope::Regional("us-central1".to_string()),
            Scope::Zonal("us-central1-b".to_string()),
        ] {
            let id = fr_id(scope);
            for version in [Version::Ga, Version::Beta, Version::Alpha] {
                let link = id.self_link(version);
                let parsed = ResourceId::parse(&link).unwrap();
                assert_eq!(parsed, id, "round trip failed for {link}");
            }
        }
    }

    #[test]
    fn test_parse_without_scheme() {
        let id = ResourceId::parse("projects/p/global/urlMaps/um").unwrap();
        assert_eq!(id.resource, "urlMaps");
        assert_eq!(id.project, "p");
        assert_eq!(id.scope, Scope::Global);
        assert_eq!(id.name, "um");
    }

    #[test]
    fn test_parse_rejects_unknown_kind() {
        assert!(ResourceId::parse("projects/p/global/sslPolicies/x").is_err());
    }

    #[test]
    fn test_parse_rejects_truncated() {
        assert!(ResourceId::parse("projects/p/global/urlMaps").is_err());
        assert!(ResourceId::parse("projects/p").is_err());
        assert!(ResourceId::parse("not-a-url").is_err());
    }

    #[test]
    fn test_map_key_orders_by_kind_then_name() {
        let a = ResourceId::new("addresses", "p", Scope::Global, "a");
        let b = ResourceId::new("urlMaps", "p", Scope::Global, "a");
        assert!(a.map_key() < b.map_key());
        assert!(a < b);
    }
}
