//! The cloud client surface the engine consumes
//!
//! The engine does not ship API bindings of its own; it talks to a
//! [`Cloud`] implementation through wire-form payloads. The surface
//! distinguishes "not found" from other failures so the fetch path can
//! treat a missing resource as state rather than error.

pub mod mock;

pub use mock::MockCloud;

use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;

use crate::id::{ResourceId, Version};

/// Errors surfaced by the cloud client.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CloudError {
    /// The resource does not exist (HTTP 404).
    #[error("not found")]
    NotFound,

    /// The resource already exists (HTTP 409).
    #[error("already exists")]
    Conflict,

    /// A fingerprint or etag precondition failed (HTTP 412).
    #[error("precondition failed: {0}")]
    PreconditionFailed(String),

    /// The surface has no such verb for this resource.
    #[error("{verb} not implemented for {resource}")]
    Unimplemented {
        verb: &'static str,
        resource: String,
    },

    /// Any other API failure.
    #[error("api error {code}: {message}")]
    Api { code: u16, message: String },
}

impl CloudError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, CloudError::NotFound)
    }
}

pub type CloudResult<T> = std::result::Result<T, CloudError>;

/// Request body for label-setting verbs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SetLabelsRequest {
    pub labels: BTreeMap<String, String>,
    /// Fingerprint of the label set being replaced.
    pub label_fingerprint: String,
}

/// Per-resource CRUD verbs plus the special-purpose verbs label-bearing
/// and target-bearing kinds need. Implementations must be safe for
/// concurrent calls.
pub trait Cloud: Send + Sync {
    fn get(&self, id: &ResourceId, version: Version) -> CloudResult<Value>;
    fn insert(&self, id: &ResourceId, version: Version, body: Value) -> CloudResult<()>;
    fn update(&self, id: &ResourceId, version: Version, body: Value) -> CloudResult<()>;
    fn delete(&self, id: &ResourceId, version: Version) -> CloudResult<()>;

    /// Replace the label set of a resource.
    fn set_labels(
        &self,
        id: &ResourceId,
        version: Version,
        request: SetLabelsRequest,
    ) -> CloudResult<()> {
        let _ = (version, request);
        Err(CloudError::Unimplemented {
            verb: "setLabels",
            resource: id.resource.to_string(),
        })
    }

    /// Repoint a forwarding rule at a new target proxy.
    fn set_target(&self, id: &ResourceId, version: Version, target: &str) -> CloudResult<()> {
        let _ = (version, target);
        Err(CloudError::Unimplemented {
            verb: "setTarget",
            resource: id.resource.to_string(),
        })
    }
}
