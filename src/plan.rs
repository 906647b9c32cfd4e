//! Per-node plan: the chosen operation and why

use std::fmt;

use crate::api::DiffResult;

/// Operation to perform on a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// No planning has been done.
    Unknown,
    /// Nothing will happen.
    Nothing,
    /// The resource will be created.
    Create,
    /// The resource will be deleted, then created. Required when a field
    /// change has no in-place update surface.
    Recreate,
    /// One or more kind-specific update verbs will be called.
    Update,
    /// The resource will be deleted.
    Delete,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Operation::Unknown => "Unknown",
            Operation::Nothing => "Nothing",
            Operation::Create => "Create",
            Operation::Recreate => "Recreate",
            Operation::Update => "Update",
            Operation::Delete => "Delete",
        };
        f.write_str(s)
    }
}

/// A planned operation with a human-readable reason and the diff that
/// led to it, if any.
#[derive(Debug, Clone)]
pub struct PlanDetails {
    pub operation: Operation,
    pub why: String,
    pub diff: Option<DiffResult>,
}

impl PlanDetails {
    pub fn new(operation: Operation, why: impl Into<String>) -> Self {
        Self {
            operation,
            why: why.into(),
            diff: None,
        }
    }

    pub fn with_diff(operation: Operation, why: impl Into<String>, diff: DiffResult) -> Self {
        Self {
            operation,
            why: why.into(),
            diff: Some(diff),
        }
    }
}

/// Plan for a node. Keeps the history of decisions so a rewritten plan
/// (e.g. recreate propagation) can still be explained.
#[derive(Debug, Clone, Default)]
pub struct Plan {
    history: Vec<PlanDetails>,
}

impl Plan {
    /// The currently planned operation.
    pub fn op(&self) -> Operation {
        self.history
            .last()
            .map(|d| d.operation)
            .unwrap_or(Operation::Unknown)
    }

    /// Details of the current decision, if planned.
    pub fn details(&self) -> Option<&PlanDetails> {
        self.history.last()
    }

    /// Record a new decision, superseding the current one.
    pub fn set(&mut self, details: PlanDetails) {
        self.history.push(details);
    }

    /// All decisions made, oldest first.
    pub fn history(&self) -> &[PlanDetails] {
        &self.history
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.details() {
            Some(d) => write!(f, "{}: {}", d.operation, d.why),
            None => f.write_str("Unknown"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unplanned_is_unknown() {
        assert_eq!(Plan::default().op(), Operation::Unknown);
    }

    #[test]
    fn test_set_supersedes_but_keeps_history() {
        let mut plan = Plan::default();
        plan.set(PlanDetails::new(Operation::Nothing, "no diff"));
        plan.set(PlanDetails::new(Operation::Recreate, "dependency recreated"));
        assert_eq!(plan.op(), Operation::Recreate);
        assert_eq!(plan.history().len(), 2);
        assert_eq!(plan.history()[0].operation, Operation::Nothing);
    }
}
