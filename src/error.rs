//! Error types for the converge crate

use crate::cloud::CloudError;
use crate::id::ResourceId;
use thiserror::Error;

/// Errors that can occur while building, planning, or executing a
/// resource graph.
#[derive(Error, Debug)]
pub enum Error {
    /// A self-link URL could not be parsed into a resource identity.
    #[error("cannot parse resource URL {url:?}: {reason}")]
    Parse { url: String, reason: String },

    /// No client surface entry for this (verb, version, scope) combination.
    #[error("{kind}: {verb} is not supported for scope of {id}")]
    UnsupportedScope {
        kind: &'static str,
        verb: &'static str,
        id: ResourceId,
    },

    /// No client surface entry for this version.
    #[error("{kind}: {verb} is not supported at version {version}")]
    UnsupportedVersion {
        kind: &'static str,
        verb: &'static str,
        version: crate::id::Version,
    },

    /// A payload could not be represented at the requested version.
    #[error("cannot convert {id} to version {version}: {reason}")]
    Conversion {
        id: ResourceId,
        version: crate::id::Version,
        reason: String,
    },

    /// A mutable resource could not be frozen.
    #[error("cannot freeze {id}: output-only field {path} has been set")]
    Freeze {
        id: ResourceId,
        path: crate::api::FieldPath,
    },

    /// A node with the same identity is already in the graph.
    #[error("graph already contains node {0}")]
    DuplicateId(ResourceId),

    /// An out-ref points at a node that is not in the graph.
    #[error("{from} references {to} which is not in the graph")]
    DanglingRef { from: ResourceId, to: ResourceId },

    /// A node is planned for deletion while a referrer is not.
    #[error("{id} is planned for deletion, but referrer {referrer} is not")]
    DanglingDelete { id: ResourceId, referrer: ResourceId },

    /// A recreate would transitively modify an externally-owned node.
    #[error("{id} is planned for recreate, but dependent {external} is externally owned")]
    ExternalRecreateDep { id: ResourceId, external: ResourceId },

    /// Graph or node state that the planner cannot handle.
    #[error("planning error: {0}")]
    Planning(String),

    /// Error from the cloud client surface.
    #[error("cloud error for {id}: {source}")]
    Cloud {
        id: ResourceId,
        #[source]
        source: CloudError,
    },

    /// The operation was cancelled via the execution context.
    #[error("operation cancelled")]
    Cancelled,
}

/// Result type for converge operations.
pub type Result<T> = std::result::Result<T, Error>;
