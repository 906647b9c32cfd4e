//! Per-kind dispatch to the cloud client surface
//!
//! Every kind declares a static [`OpsDescriptor`]: which scopes and
//! versions each verb supports, whether the kind has a generic update
//! surface at all, and whether updates must echo a server fingerprint.
//! Dispatch checks the table before touching the client; a missing entry
//! is a programming error surfaced as `UnsupportedScope` /
//! `UnsupportedVersion`.

use serde_json::Value;
use tracing::debug;

use crate::cloud::Cloud;
use crate::error::{Error, Result};
use crate::id::{ResourceId, ScopeKind, Version};

pub(crate) const ALL_VERSIONS: &[Version] = &[Version::Ga, Version::Beta, Version::Alpha];
pub(crate) const GLOBAL_AND_REGIONAL: &[ScopeKind] = &[ScopeKind::Global, ScopeKind::Regional];
pub(crate) const ZONAL_ONLY: &[ScopeKind] = &[ScopeKind::Zonal];

/// Supported (scope, version) combinations for one verb.
#[derive(Debug, Clone, Copy)]
pub struct VerbTable {
    pub scopes: &'static [ScopeKind],
    pub versions: &'static [Version],
}

impl VerbTable {
    pub const fn new(scopes: &'static [ScopeKind], versions: &'static [Version]) -> Self {
        Self { scopes, versions }
    }
}

/// Static per-kind dispatch descriptor.
#[derive(Debug)]
pub struct OpsDescriptor {
    /// Display name, e.g. `"ForwardingRule"`.
    pub kind: &'static str,
    /// Resource path segment, e.g. `"forwardingRules"`.
    pub resource: &'static str,
    pub get: VerbTable,
    pub create: VerbTable,
    pub delete: VerbTable,
    /// `None` when the kind has no generic update surface; the planner
    /// must choose recreate instead.
    pub update: Option<VerbTable>,
    /// Update bodies must carry the fingerprint of the payload being
    /// replaced.
    pub requires_fingerprint: bool,
}

impl OpsDescriptor {
    fn check(
        &self,
        verb: &'static str,
        table: Option<&VerbTable>,
        id: &ResourceId,
        version: Version,
    ) -> Result<()> {
        let table = table.ok_or(Error::UnsupportedScope {
            kind: self.kind,
            verb,
            id: id.clone(),
        })?;
        if !table.scopes.contains(&id.scope.kind()) {
            return Err(Error::UnsupportedScope {
                kind: self.kind,
                verb,
                id: id.clone(),
            });
        }
        if !table.versions.contains(&version) {
            return Err(Error::UnsupportedVersion {
                kind: self.kind,
                verb,
                version,
            });
        }
        Ok(())
    }

    /// Fetch the wire payload. `NotFound` is surfaced inside the
    /// `Error::Cloud` variant so the caller can map it to node state.
    pub fn do_get(&self, cloud: &dyn Cloud, id: &ResourceId, version: Version) -> Result<Value> {
        self.check("get", Some(&self.get), id, version)?;
        debug!(kind = self.kind, id = %id, %version, "get");
        cloud.get(id, version).map_err(|source| Error::Cloud {
            id: id.clone(),
            source,
        })
    }

    pub fn do_create(
        &self,
        cloud: &dyn Cloud,
        id: &ResourceId,
        version: Version,
        body: Value,
    ) -> Result<()> {
        self.check("create", Some(&self.create), id, version)?;
        debug!(kind = self.kind, id = %id, %version, "create");
        cloud
            .insert(id, version, body)
            .map_err(|source| Error::Cloud {
                id: id.clone(),
                source,
            })
    }

    pub fn do_delete(&self, cloud: &dyn Cloud, id: &ResourceId, version: Version) -> Result<()> {
        self.check("delete", Some(&self.delete), id, version)?;
        debug!(kind = self.kind, id = %id, %version, "delete");
        cloud.delete(id, version).map_err(|source| Error::Cloud {
            id: id.clone(),
            source,
        })
    }

    /// Generic update. For fingerprinted kinds the got payload's
    /// fingerprint is copied into the outgoing body just before
    /// dispatch; this is the only point where frozen state leaks into a
    /// write, and it is confined here.
    pub fn do_update(
        &self,
        cloud: &dyn Cloud,
        id: &ResourceId,
        version: Version,
        mut body: Value,
        got_fingerprint: Option<&str>,
    ) -> Result<()> {
        self.check("update", self.update.as_ref(), id, version)?;

        if self.requires_fingerprint {
            let fingerprint = got_fingerprint.ok_or_else(|| {
                Error::Planning(format!(
                    "{}: update of {id} requires a fingerprint, but the current payload has none",
                    self.kind
                ))
            })?;
            if let Value::Object(map) = &mut body {
                map.insert("fingerprint".to_string(), Value::from(fingerprint));
            }
        }

        debug!(kind = self.kind, id = %id, %version, "update");
        cloud
            .update(id, version, body)
            .map_err(|source| Error::Cloud {
                id: id.clone(),
                source,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cloud::MockCloud;
    use crate::id::Scope;
    use serde_json::json;

    static TEST_OPS: OpsDescriptor = OpsDescriptor {
        kind: "Widget",
        resource: "addresses",
        get: VerbTable::new(GLOBAL_AND_REGIONAL, ALL_VERSIONS),
        create: VerbTable::new(GLOBAL_AND_REGIONAL, ALL_VERSIONS),
        delete: VerbTable::new(GLOBAL_AND_REGIONAL, ALL_VERSIONS),
        update: None,
        requires_fingerprint: false,
    };

    static FINGERPRINTED_OPS: OpsDescriptor = OpsDescriptor {
        kind: "Widget",
        resource: "urlMaps",
        get: VerbTable::new(GLOBAL_AND_REGIONAL, ALL_VERSIONS),
        create: VerbTable::new(GLOBAL_AND_REGIONAL, ALL_VERSIONS),
        delete: VerbTable::new(GLOBAL_AND_REGIONAL, ALL_VERSIONS),
        update: Some(VerbTable::new(GLOBAL_AND_REGIONAL, ALL_VERSIONS)),
        requires_fingerprint: true,
    };

    fn global_id(resource: &'static str) -> ResourceId {
        ResourceId::new(resource, "proj", Scope::Global, "x")
    }

    fn zonal_id(resource: &'static str) -> ResourceId {
        ResourceId::new(resource, "proj", Scope::Zonal("us-central1-b".to_string()), "x")
    }

    #[test]
    fn test_unsupported_scope() {
        let cloud = MockCloud::new();
        let err = TEST_OPS
            .do_get(&cloud, &zonal_id("addresses"), Version::Ga)
            .unwrap_err();
        assert!(matches!(err, Error::UnsupportedScope { verb: "get", .. }));
    }

    #[test]
    fn test_missing_update_table_is_unsupported() {
        let cloud = MockCloud::new();
        let err = TEST_OPS
            .do_update(&cloud, &global_id("addresses"), Version::Ga, json!({}), None)
            .unwrap_err();
        assert!(matches!(err, Error::UnsupportedScope { verb: "update", .. }));
    }

    #[test]
    fn test_fingerprint_injected_on_update() {
        let cloud = MockCloud::new();
        let id = global_id("urlMaps");
        cloud.insert(&id, Version::Ga, json!({})).unwrap();
        let stored = cloud.get(&id, Version::Ga).unwrap();
        let fingerprint = stored["fingerprint"].as_str().unwrap().to_string();

        FINGERPRINTED_OPS
            .do_update(
                &cloud,
                &id,
                Version::Ga,
                json!({"description": "new"}),
                Some(&fingerprint),
            )
            .unwrap();
        assert_eq!(cloud.object(&id).unwrap()["description"], json!("new"));
    }

    #[test]
    fn test_fingerprint_required_but_missing() {
        let cloud = MockCloud::new();
        let id = global_id("urlMaps");
        let err = FINGERPRINTED_OPS
            .do_update(&cloud, &id, Version::Ga, json!({}), None)
            .unwrap_err();
        assert!(matches!(err, Error::Planning(_)));
    }

    #[test]
    fn test_not_found_is_distinguishable() {
        let cloud = MockCloud::new();
        let err = TEST_OPS
            .do_get(&cloud, &global_id("addresses"), Version::Ga)
            .unwrap_err();
        match err {
            Error::Cloud { source, .. } => assert!(source.is_not_found()),
            other => panic!("expected cloud error, got {other:?}"),
        }
    }
}
