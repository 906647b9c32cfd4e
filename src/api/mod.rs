//! Cross-version typed resources
//!
//! A resource holds one payload per API version (GA, Beta, Alpha), with
//! exactly one version *active* at a time. It has two lifecycle phases:
//!
//! - **Mutable**: built by the caller, edited in place via [`Mutable::access`].
//! - **Frozen**: an immutable snapshot tagged with the active version,
//!   safe to place in a graph.
//!
//! Cross-version conversion is a best-effort field mapping over the
//! serialized form: it fails when a populated field has no
//! representation at the target version.

pub mod diff;
pub mod traits;

pub use diff::{DiffItem, DiffResult};
pub use traits::{FieldKind, FieldPath, FieldTraits, PathElem};

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::fmt;

use crate::error::{Error, Result};
use crate::id::{ResourceId, Version};

/// Bound for version payload types.
pub trait Payload:
    Serialize + DeserializeOwned + Clone + Default + PartialEq + fmt::Debug + Send + Sync + 'static
{
}

impl<T> Payload for T where
    T: Serialize
        + DeserializeOwned
        + Clone
        + Default
        + PartialEq
        + fmt::Debug
        + Send
        + Sync
        + 'static
{
}

/// The active payload of a resource, tagged by version.
#[derive(Debug, Clone, PartialEq)]
pub enum VersionedPayload<G, B, A> {
    Ga(G),
    Beta(B),
    Alpha(A),
}

impl<G, B, A> VersionedPayload<G, B, A> {
    pub fn version(&self) -> Version {
        match self {
            VersionedPayload::Ga(_) => Version::Ga,
            VersionedPayload::Beta(_) => Version::Beta,
            VersionedPayload::Alpha(_) => Version::Alpha,
        }
    }
}

fn convert<S: Serialize, D: DeserializeOwned>(
    id: &ResourceId,
    target: Version,
    src: &S,
) -> Result<D> {
    let conversion_err = |reason: String| Error::Conversion {
        id: id.clone(),
        version: target,
        reason,
    };
    let value = serde_json::to_value(src).map_err(|e| conversion_err(e.to_string()))?;
    serde_json::from_value(value).map_err(|e| conversion_err(e.to_string()))
}

/// A resource under construction. Edit it in place, then [`freeze`]
/// (consuming the handle) to obtain an immutable snapshot.
///
/// [`freeze`]: Mutable::freeze
#[derive(Debug, Clone)]
pub struct Mutable<G, B, A> {
    id: ResourceId,
    field_traits: FieldTraits,
    payload: VersionedPayload<G, B, A>,
}

impl<G: Payload, B: Payload, A: Payload> Mutable<G, B, A> {
    pub fn new(id: ResourceId, field_traits: FieldTraits) -> Self {
        Self {
            id,
            field_traits,
            payload: VersionedPayload::Ga(G::default()),
        }
    }

    pub fn id(&self) -> &ResourceId {
        &self.id
    }

    /// Version of the active payload.
    pub fn version(&self) -> Version {
        self.payload.version()
    }

    /// Edit the GA payload in place. Fails if the active payload is at a
    /// different version; use [`Mutable::set_version`] first.
    pub fn access(&mut self, f: impl FnOnce(&mut G)) -> Result<()> {
        match &mut self.payload {
            VersionedPayload::Ga(payload) => {
                f(payload);
                Ok(())
            }
            other => Err(missing_payload(&self.id, Version::Ga, other.version())),
        }
    }

    /// Edit the Beta payload in place.
    pub fn access_beta(&mut self, f: impl FnOnce(&mut B)) -> Result<()> {
        match &mut self.payload {
            VersionedPayload::Beta(payload) => {
                f(payload);
                Ok(())
            }
            other => Err(missing_payload(&self.id, Version::Beta, other.version())),
        }
    }

    /// Edit the Alpha payload in place.
    pub fn access_alpha(&mut self, f: impl FnOnce(&mut A)) -> Result<()> {
        match &mut self.payload {
            VersionedPayload::Alpha(payload) => {
                f(payload);
                Ok(())
            }
            other => Err(missing_payload(&self.id, Version::Alpha, other.version())),
        }
    }

    /// Switch the active version, converting the current payload.
    pub fn set_version(&mut self, version: Version) -> Result<()> {
        if self.version() == version {
            return Ok(());
        }
        self.payload = match (&self.payload, version) {
            (VersionedPayload::Ga(p), Version::Beta) => {
                VersionedPayload::Beta(convert(&self.id, version, p)?)
            }
            (VersionedPayload::Ga(p), Version::Alpha) => {
                VersionedPayload::Alpha(convert(&self.id, version, p)?)
            }
            (VersionedPayload::Beta(p), Version::Ga) => {
                VersionedPayload::Ga(convert(&self.id, version, p)?)
            }
            (VersionedPayload::Beta(p), Version::Alpha) => {
                VersionedPayload::Alpha(convert(&self.id, version, p)?)
            }
            (VersionedPayload::Alpha(p), Version::Ga) => {
                VersionedPayload::Ga(convert(&self.id, version, p)?)
            }
            (VersionedPayload::Alpha(p), Version::Beta) => {
                VersionedPayload::Beta(convert(&self.id, version, p)?)
            }
            _ => unreachable!("same-version conversion handled above"),
        };
        Ok(())
    }

    /// Validate and snapshot the resource. The mutable handle is
    /// consumed; the snapshot is tagged with the active version.
    ///
    /// Fails if any output-only field has been written.
    pub fn freeze(self) -> Result<Frozen<G, B, A>> {
        let value = match &self.payload {
            VersionedPayload::Ga(p) => serde_json::to_value(p),
            VersionedPayload::Beta(p) => serde_json::to_value(p),
            VersionedPayload::Alpha(p) => serde_json::to_value(p),
        }
        .map_err(|e| Error::Planning(format!("serialize {}: {e}", self.id)))?;

        for path in self.field_traits.output_only_paths() {
            if path_is_populated(&value, path.elems()) {
                return Err(Error::Freeze {
                    id: self.id,
                    path: path.clone(),
                });
            }
        }

        Ok(Frozen {
            id: self.id,
            field_traits: self.field_traits,
            payload: self.payload,
        })
    }
}

fn missing_payload(id: &ResourceId, wanted: Version, active: Version) -> Error {
    Error::Conversion {
        id: id.clone(),
        version: wanted,
        reason: format!("no {wanted} payload; active version is {active}"),
    }
}

/// True if any value addressed by `path` (wildcards included) is present
/// and non-null.
fn path_is_populated(value: &Value, path: &[PathElem]) -> bool {
    let Some((head, rest)) = path.split_first() else {
        return !value.is_null();
    };
    match (head, value) {
        (PathElem::Field(name), Value::Object(map)) => map
            .get(name)
            .is_some_and(|v| path_is_populated(v, rest)),
        (PathElem::Index(idx), Value::Array(list)) => list
            .get(*idx)
            .is_some_and(|v| path_is_populated(v, rest)),
        (PathElem::AnyIndex, Value::Array(list)) => {
            list.iter().any(|v| path_is_populated(v, rest))
        }
        _ => false,
    }
}

/// An immutable snapshot of a resource at a fixed version.
#[derive(Debug, Clone)]
pub struct Frozen<G, B, A> {
    id: ResourceId,
    field_traits: FieldTraits,
    payload: VersionedPayload<G, B, A>,
}

impl<G: Payload, B: Payload, A: Payload> Frozen<G, B, A> {
    /// Rehydrate a snapshot from a wire payload fetched at `version`.
    pub(crate) fn from_wire(
        id: ResourceId,
        field_traits: FieldTraits,
        version: Version,
        wire: Value,
    ) -> Result<Self> {
        let conversion_err = |e: serde_json::Error| Error::Conversion {
            id: id.clone(),
            version,
            reason: e.to_string(),
        };
        let payload = match version {
            Version::Ga => VersionedPayload::Ga(serde_json::from_value(wire).map_err(conversion_err)?),
            Version::Beta => {
                VersionedPayload::Beta(serde_json::from_value(wire).map_err(conversion_err)?)
            }
            Version::Alpha => {
                VersionedPayload::Alpha(serde_json::from_value(wire).map_err(conversion_err)?)
            }
        };
        Ok(Self {
            id,
            field_traits,
            payload,
        })
    }

    pub fn id(&self) -> &ResourceId {
        &self.id
    }

    pub fn version(&self) -> Version {
        self.payload.version()
    }

    pub fn field_traits(&self) -> &FieldTraits {
        &self.field_traits
    }

    /// The GA representation, converting if necessary.
    pub fn to_ga(&self) -> Result<G> {
        match &self.payload {
            VersionedPayload::Ga(p) => Ok(p.clone()),
            VersionedPayload::Beta(p) => convert(&self.id, Version::Ga, p),
            VersionedPayload::Alpha(p) => convert(&self.id, Version::Ga, p),
        }
    }

    /// The Beta representation, converting if necessary.
    pub fn to_beta(&self) -> Result<B> {
        match &self.payload {
            VersionedPayload::Ga(p) => convert(&self.id, Version::Beta, p),
            VersionedPayload::Beta(p) => Ok(p.clone()),
            VersionedPayload::Alpha(p) => convert(&self.id, Version::Beta, p),
        }
    }

    /// The Alpha representation, converting if necessary.
    pub fn to_alpha(&self) -> Result<A> {
        match &self.payload {
            VersionedPayload::Ga(p) => convert(&self.id, Version::Alpha, p),
            VersionedPayload::Beta(p) => convert(&self.id, Version::Alpha, p),
            VersionedPayload::Alpha(p) => Ok(p.clone()),
        }
    }

    /// Serialized form of the active payload.
    pub fn to_value(&self) -> Result<Value> {
        match &self.payload {
            VersionedPayload::Ga(p) => serde_json::to_value(p),
            VersionedPayload::Beta(p) => serde_json::to_value(p),
            VersionedPayload::Alpha(p) => serde_json::to_value(p),
        }
        .map_err(|e| Error::Planning(format!("serialize {}: {e}", self.id)))
    }

    /// Serialized form of the payload converted to `version`.
    pub fn to_value_at(&self, version: Version) -> Result<Value> {
        match version {
            Version::Ga => serde_json::to_value(self.to_ga()?),
            Version::Beta => serde_json::to_value(self.to_beta()?),
            Version::Alpha => serde_json::to_value(self.to_alpha()?),
        }
        .map_err(|e| Error::Planning(format!("serialize {}: {e}", self.id)))
    }

    /// Field-wise comparison against `want`, excluding output-only and
    /// system fields. `self` is the current (A) side, `want` the desired
    /// (B) side. The comparison happens at `want`'s version.
    pub fn diff(&self, want: &Frozen<G, B, A>) -> Result<DiffResult> {
        let a = self.to_value_at(want.version())?;
        let b = want.to_value()?;
        Ok(diff::diff_values(&a, &b, &self.field_traits))
    }

    /// The server fingerprint carried by this snapshot, if any.
    pub fn fingerprint(&self) -> Option<String> {
        let value = self.to_value().ok()?;
        value
            .get("fingerprint")
            .and_then(Value::as_str)
            .map(str::to_string)
    }
}
