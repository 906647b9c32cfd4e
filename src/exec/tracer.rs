//! Execution tracing
//!
//! The tracer is the sole supported introspection hook: it receives one
//! entry per executed action with the signals that action produced, and
//! the stuck frontier at termination. [`VizTracer`] renders the trace as
//! a Graphviz document.

use std::fmt::Write;

use super::{Action, Event};

/// One (event, receiving action) pair produced while broadcasting.
#[derive(Debug, Clone)]
pub struct TraceSignal {
    pub event: Event,
    /// Display label of the action that was waiting on the event.
    pub action: String,
}

/// Record of one executed action.
#[derive(Debug, Clone)]
pub struct TraceEntry {
    /// Display label of the executed action.
    pub action: String,
    pub signaled: Vec<TraceSignal>,
}

/// Observer of executor progress.
pub trait Tracer {
    /// Called after each action executes.
    fn record(&mut self, entry: &TraceEntry);

    /// Called once at termination with the stuck frontier.
    fn finish(&mut self, pending: &[Box<dyn Action>]);
}

/// Renders the execution as a Graphviz `dot` document: one box per
/// action, one node per event, edges action → event → action in
/// signaling order. The stuck frontier and its missing events are
/// highlighted.
#[derive(Debug, Default)]
pub struct VizTracer {
    body: String,
}

impl VizTracer {
    pub fn new() -> Self {
        Self::default()
    }

    /// The complete dot document.
    pub fn dot(&self) -> String {
        format!("digraph {{\n{}}}\n", self.body)
    }
}

impl Tracer for VizTracer {
    fn record(&mut self, entry: &TraceEntry) {
        let _ = writeln!(self.body, "  \"{}\" [shape=box]", entry.action);
        for signal in &entry.signaled {
            let _ = writeln!(self.body, "  \"{}\" -> \"{}\"", entry.action, signal.event);
            let _ = writeln!(self.body, "  \"{}\" -> \"{}\"", signal.event, signal.action);
        }
    }

    fn finish(&mut self, pending: &[Box<dyn Action>]) {
        for action in pending {
            let _ = writeln!(
                self.body,
                "  \"{action}\" [style=filled,shape=box,color=pink]"
            );
            let mut seen = Vec::new();
            for event in action.pending_events() {
                if !seen.contains(event) {
                    seen.push(event.clone());
                    let _ = writeln!(self.body, "  \"{event}\" [style=filled,color=pink]");
                }
                let _ = writeln!(self.body, "  \"{event}\" -> \"{action}\"");
            }
        }
    }
}
