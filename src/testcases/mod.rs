//! Named reconciliation scenarios
//!
//! A [`TestCase`] is a sequence of steps, each carrying a want graph and
//! an optional cloud set-up hook. The [`Registry`] is an explicit value
//! populated from a deterministic entry point; nothing registers itself
//! behind the scenes.

pub mod lb;

use anyhow::Result as SetupResult;

use crate::cloud::MockCloud;
use crate::error::{Error, Result};
use crate::graph::Graph;

/// One reconciliation step: optionally arrange the cloud, then declare
/// the desired graph.
pub struct Step {
    pub description: &'static str,
    /// Arrange the starting cloud state.
    pub setup: Option<fn(&MockCloud) -> SetupResult<()>>,
    /// The desired end state.
    pub want: fn() -> Result<Graph>,
}

/// A named, described scenario.
pub struct TestCase {
    pub name: &'static str,
    pub description: &'static str,
    pub steps: Vec<Step>,
}

/// Collection of scenarios, keyed by name.
#[derive(Default)]
pub struct Registry {
    cases: Vec<TestCase>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, case: TestCase) -> Result<()> {
        if self.cases.iter().any(|c| c.name == case.name) {
            return Err(Error::Planning(format!(
                "test case {:?} is already registered",
                case.name
            )));
        }
        self.cases.push(case);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&TestCase> {
        self.cases.iter().find(|c| c.name == name)
    }

    pub fn all(&self) -> &[TestCase] {
        &self.cases
    }
}

/// The registry with every built-in scenario.
pub fn default_registry() -> Result<Registry> {
    let mut registry = Registry::new();
    lb::register_all(&mut registry)?;
    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_registry_has_unique_named_cases() {
        let registry = default_registry().unwrap();
        assert!(!registry.all().is_empty());
        assert!(registry.get("lb/create").is_some());
        assert!(registry.get("no-such-case").is_none());
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let mut registry = default_registry().unwrap();
        let err = lb::register_all(&mut registry);
        assert!(err.is_err());
    }

    #[test]
    fn test_every_want_graph_builds_and_validates() {
        let registry = default_registry().unwrap();
        for case in registry.all() {
            for step in &case.steps {
                let graph = (step.want)().unwrap();
                graph.validate().unwrap();
            }
        }
    }
}
