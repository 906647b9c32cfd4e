//! In-memory cloud for tests and scenario replay

use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use tracing::debug;

use super::{Cloud, CloudError, CloudResult, SetLabelsRequest};
use crate::id::{ResourceId, Version};

/// An in-memory [`Cloud`] implementation.
///
/// Objects are stored in wire form keyed by identity. On write the mock
/// fills in the server-populated `selfLink` and `fingerprint` fields so
/// that fetched payloads look like real API responses. Failures can be
/// injected per (identity, verb) to exercise error paths.
#[derive(Debug, Default)]
pub struct MockCloud {
    objects: Mutex<BTreeMap<ResourceId, Value>>,
    failures: Mutex<BTreeMap<(ResourceId, &'static str), CloudError>>,
    fingerprint_seq: AtomicU64,
}

impl MockCloud {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an object directly, bypassing insert semantics.
    pub fn seed(&self, id: &ResourceId, version: Version, body: Value) {
        let body = self.server_fields(id, version, body);
        self.objects.lock().unwrap().insert(id.clone(), body);
    }

    /// Inject a failure for the next matching call of `verb` on `id`.
    pub fn fail_next(&self, id: &ResourceId, verb: &'static str, error: CloudError) {
        self.failures
            .lock()
            .unwrap()
            .insert((id.clone(), verb), error);
    }

    pub fn contains(&self, id: &ResourceId) -> bool {
        self.objects.lock().unwrap().contains_key(id)
    }

    pub fn object(&self, id: &ResourceId) -> Option<Value> {
        self.objects.lock().unwrap().get(id).cloned()
    }

    fn take_failure(&self, id: &ResourceId, verb: &'static str) -> CloudResult<()> {
        if let Some(err) = self
            .failures
            .lock()
            .unwrap()
            .remove(&(id.clone(), verb))
        {
            return Err(err);
        }
        Ok(())
    }

    fn server_fields(&self, id: &ResourceId, version: Version, mut body: Value) -> Value {
        if let Value::Object(map) = &mut body {
            map.insert("selfLink".to_string(), Value::from(id.self_link(version)));
            let seq = self.fingerprint_seq.fetch_add(1, Ordering::Relaxed);
            map.insert("fingerprint".to_string(), Value::from(format!("fp-{seq}")));
        }
        body
    }
}

impl Cloud for MockCloud {
    fn get(&self, id: &ResourceId, _version: Version) -> CloudResult<Value> {
        self.take_failure(id, "get")?;
        self.objects
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .ok_or(CloudError::NotFound)
    }

    fn insert(&self, id: &ResourceId, version: Version, body: Value) -> CloudResult<()> {
        self.take_failure(id, "insert")?;
        let mut objects = self.objects.lock().unwrap();
        if objects.contains_key(id) {
            return Err(CloudError::Conflict);
        }
        debug!(id = %id, "mock insert");
        let body = self.server_fields(id, version, body);
        objects.insert(id.clone(), body);
        Ok(())
    }

    fn update(&self, id: &ResourceId, version: Version, body: Value) -> CloudResult<()> {
        self.take_failure(id, "update")?;
        let mut objects = self.objects.lock().unwrap();
        let current = objects.get(id).ok_or(CloudError::NotFound)?;

        // Fingerprinted kinds must echo the stored fingerprint.
        let stored = current.get("fingerprint").and_then(Value::as_str);
        let sent = body.get("fingerprint").and_then(Value::as_str);
        if let (Some(stored), Some(sent)) = (stored, sent) {
            if stored != sent {
                return Err(CloudError::PreconditionFailed(format!(
                    "fingerprint mismatch: stored {stored}, sent {sent}"
                )));
            }
        }

        debug!(id = %id, "mock update");
        let body = self.server_fields(id, version, body);
        objects.insert(id.clone(), body);
        Ok(())
    }

    fn delete(&self, id: &ResourceId, _version: Version) -> CloudResult<()> {
        self.take_failure(id, "delete")?;
        let mut objects = self.objects.lock().unwrap();
        if objects.remove(id).is_none() {
            return Err(CloudError::NotFound);
        }
        debug!(id = %id, "mock delete");
        Ok(())
    }

    fn set_labels(
        &self,
        id: &ResourceId,
        _version: Version,
        request: SetLabelsRequest,
    ) -> CloudResult<()> {
        self.take_failure(id, "setLabels")?;
        let mut objects = self.objects.lock().unwrap();
        let current = objects.get_mut(id).ok_or(CloudError::NotFound)?;
        if let Value::Object(map) = current {
            let labels: serde_json::Map<String, Value> = request
                .labels
                .into_iter()
                .map(|(k, v)| (k, Value::from(v)))
                .collect();
            map.insert("labels".to_string(), Value::Object(labels));
        }
        Ok(())
    }

    fn set_target(&self, id: &ResourceId, _version: Version, target: &str) -> CloudResult<()> {
        self.take_failure(id, "setTarget")?;
        let mut objects = self.objects.lock().unwrap();
        let current = objects.get_mut(id).ok_or(CloudError::NotFound)?;
        if let Value::Object(map) = current {
            map.insert("target".to_string(), Value::from(target));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::Scope;
    use serde_json::json;

    fn addr_id() -> ResourceId {
        ResourceId::new("addresses", "proj", Scope::Global, "a1")
    }

    #[test]
    fn test_get_missing_is_not_found() {
        let cloud = MockCloud::new();
        assert_eq!(
            cloud.get(&addr_id(), Version::Ga),
            Err(CloudError::NotFound)
        );
    }

    #[test]
    fn test_insert_then_get_fills_server_fields() {
        let cloud = MockCloud::new();
        cloud
            .insert(&addr_id(), Version::Ga, json!({"name": "a1"}))
            .unwrap();
        let body = cloud.get(&addr_id(), Version::Ga).unwrap();
        assert_eq!(body["name"], json!("a1"));
        assert_eq!(body["selfLink"], json!(addr_id().self_link(Version::Ga)));
        assert!(body["fingerprint"].is_string());
    }

    #[test]
    fn test_double_insert_conflicts() {
        let cloud = MockCloud::new();
        cloud.insert(&addr_id(), Version::Ga, json!({})).unwrap();
        assert_eq!(
            cloud.insert(&addr_id(), Version::Ga, json!({})),
            Err(CloudError::Conflict)
        );
    }

    #[test]
    fn test_update_checks_fingerprint() {
        let cloud = MockCloud::new();
        cloud.insert(&addr_id(), Version::Ga, json!({})).unwrap();
        let stored = cloud.get(&addr_id(), Version::Ga).unwrap();
        let fingerprint = stored["fingerprint"].as_str().unwrap();

        let stale = json!({"fingerprint": "fp-stale"});
        assert!(matches!(
            cloud.update(&addr_id(), Version::Ga, stale),
            Err(CloudError::PreconditionFailed(_))
        ));

        let fresh = json!({ "fingerprint": fingerprint, "description": "d" });
        cloud.update(&addr_id(), Version::Ga, fresh).unwrap();
        let body = cloud.get(&addr_id(), Version::Ga).unwrap();
        assert_eq!(body["description"], json!("d"));
    }

    #[test]
    fn test_injected_failure_fires_once() {
        let cloud = MockCloud::new();
        cloud.insert(&addr_id(), Version::Ga, json!({})).unwrap();
        cloud.fail_next(
            &addr_id(),
            "get",
            CloudError::Api {
                code: 500,
                message: "boom".to_string(),
            },
        );
        assert!(matches!(
            cloud.get(&addr_id(), Version::Ga),
            Err(CloudError::Api { code: 500, .. })
        ));
        assert!(cloud.get(&addr_id(), Version::Ga).is_ok());
    }
}
