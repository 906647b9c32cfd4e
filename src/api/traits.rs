//! Field paths and per-field traits
//!
//! A [`FieldPath`] locates a field inside a resource payload, in its
//! serialized (wire) form. [`FieldTraits`] classifies paths as normal,
//! output-only (server-populated, never written), or system (echoed back
//! on update but never diffed).

use serde::{Deserialize, Serialize};
use std::fmt;

/// One step in a field path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PathElem {
    /// Named field of an object.
    Field(String),
    /// Concrete list index.
    Index(usize),
    /// Any list index; only meaningful in trait declarations.
    AnyIndex,
}

/// Path to a field inside a payload, e.g. `backends[0].group`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FieldPath(Vec<PathElem>);

impl FieldPath {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, name: &str) -> Self {
        self.0.push(PathElem::Field(name.to_string()));
        self
    }

    pub fn index(mut self, idx: usize) -> Self {
        self.0.push(PathElem::Index(idx));
        self
    }

    pub fn any_index(mut self) -> Self {
        self.0.push(PathElem::AnyIndex);
        self
    }

    pub fn elems(&self) -> &[PathElem] {
        &self.0
    }

    /// Name of the leading field, if the path starts with one.
    pub fn first_field(&self) -> Option<&str> {
        match self.0.first() {
            Some(PathElem::Field(name)) => Some(name),
            _ => None,
        }
    }

    /// True if `self` is a prefix of `concrete`, treating `AnyIndex` as a
    /// wildcard over concrete indices.
    pub fn is_prefix_of(&self, concrete: &FieldPath) -> bool {
        if self.0.len() > concrete.0.len() {
            return false;
        }
        self.0.iter().zip(&concrete.0).all(|(p, c)| match (p, c) {
            (PathElem::Field(a), PathElem::Field(b)) => a == b,
            (PathElem::Index(a), PathElem::Index(b)) => a == b,
            (PathElem::AnyIndex, PathElem::Index(_)) => true,
            _ => false,
        })
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, elem) in self.0.iter().enumerate() {
            match elem {
                PathElem::Field(name) => {
                    if i > 0 {
                        f.write_str(".")?;
                    }
                    f.write_str(name)?;
                }
                PathElem::Index(idx) => write!(f, "[{idx}]")?,
                PathElem::AnyIndex => f.write_str("[*]")?,
            }
        }
        Ok(())
    }
}

/// Classification of a field path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Normal,
    /// Server-populated. Never sent on write; writing one in a mutable
    /// resource makes freezing fail.
    OutputOnly,
    /// Server bookkeeping (fingerprints). Echoed back on update, excluded
    /// from semantic diff.
    System,
}

/// Per-kind declaration of non-normal fields.
#[derive(Debug, Clone, Default)]
pub struct FieldTraits {
    output_only: Vec<FieldPath>,
    system: Vec<FieldPath>,
}

impl FieldTraits {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn output_only(mut self, path: FieldPath) -> Self {
        self.output_only.push(path);
        self
    }

    pub fn system(mut self, path: FieldPath) -> Self {
        self.system.push(path);
        self
    }

    /// Classify a concrete path. A path inside an output-only or system
    /// subtree inherits that classification.
    pub fn classify(&self, path: &FieldPath) -> FieldKind {
        if self.output_only.iter().any(|p| p.is_prefix_of(path)) {
            FieldKind::OutputOnly
        } else if self.system.iter().any(|p| p.is_prefix_of(path)) {
            FieldKind::System
        } else {
            FieldKind::Normal
        }
    }

    pub fn output_only_paths(&self) -> &[FieldPath] {
        &self.output_only
    }
}
