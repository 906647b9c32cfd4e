//! Serial cooperative executor
//!
//! Single-threaded loop over the pending action list: event-only actions
//! run first so starting conditions are broadcast, then any ready action
//! is executed and its events are signaled to every still-pending
//! action. The loop stops when nothing is ready; the remainder is either
//! a planning bug or a cycle and is returned for diagnosis rather than
//! resolved.

use tracing::{debug, warn};

use super::tracer::{TraceEntry, TraceSignal, Tracer};
use super::{Action, Event, ExecContext};
use crate::cloud::Cloud;
use crate::error::Error;

/// Options for execution.
#[derive(Debug, Clone, Default)]
pub struct ExecOptions {
    /// Simulate: substitute `dry_run()` for `run()` everywhere.
    pub dry_run: bool,
}

/// An error produced by a single action during execution.
#[derive(Debug)]
pub struct ActionError {
    /// Display label of the failing action.
    pub action: String,
    pub error: Error,
}

/// Outcome of an execution.
#[derive(Default)]
pub struct ExecResult {
    /// Actions that could not be completed: stuck on unsignaled events,
    /// failed, or unreached due to cancellation.
    pub pending: Vec<Box<dyn Action>>,
    /// Errors recorded along the way, in execution order.
    pub errors: Vec<ActionError>,
    /// Number of actions that ran to completion.
    pub completed: usize,
}

impl ExecResult {
    pub fn is_success(&self) -> bool {
        self.pending.is_empty() && self.errors.is_empty()
    }
}

/// Single-threaded executor draining a set of actions.
pub struct SerialExecutor {
    options: ExecOptions,
    pending: Vec<Box<dyn Action>>,
    done: Vec<Box<dyn Action>>,
    failed: Vec<Box<dyn Action>>,
    errors: Vec<ActionError>,
}

impl SerialExecutor {
    pub fn new(pending: Vec<Box<dyn Action>>, options: ExecOptions) -> Self {
        Self {
            options,
            pending,
            done: Vec::new(),
            failed: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// Drain the action set. A failing action's events are not
    /// broadcast; the action joins the residual set and the loop moves
    /// on to whatever else is ready.
    pub fn run(
        mut self,
        ctx: &ExecContext,
        cloud: &dyn Cloud,
        mut tracer: Option<&mut dyn Tracer>,
    ) -> ExecResult {
        self.run_event_only(ctx, cloud, &mut tracer);

        while let Some(action) = self.next_ready() {
            if ctx.is_cancelled() {
                warn!("execution cancelled; surfacing unfinished frontier");
                self.errors.push(ActionError {
                    action: action.to_string(),
                    error: Error::Cancelled,
                });
                self.pending.push(action);
                break;
            }
            self.run_action(ctx, cloud, action, &mut tracer);
        }

        // Failed actions are part of the residual frontier.
        let mut pending = self.pending;
        pending.extend(self.failed);

        if let Some(tracer) = tracer.as_deref_mut() {
            tracer.finish(&pending);
        }

        ExecResult {
            pending,
            errors: self.errors,
            completed: self.done.len(),
        }
    }

    fn run_event_only(
        &mut self,
        ctx: &ExecContext,
        cloud: &dyn Cloud,
        tracer: &mut Option<&mut dyn Tracer>,
    ) {
        let (event_only, rest): (Vec<_>, Vec<_>) = std::mem::take(&mut self.pending)
            .into_iter()
            .partition(|a| a.is_event_only());
        self.pending = rest;
        for action in event_only {
            self.run_action(ctx, cloud, action, tracer);
        }
    }

    fn run_action(
        &mut self,
        ctx: &ExecContext,
        cloud: &dyn Cloud,
        mut action: Box<dyn Action>,
        tracer: &mut Option<&mut dyn Tracer>,
    ) {
        let label = action.to_string();
        debug!(action = %label, dry_run = self.options.dry_run, "running action");

        let outcome = if self.options.dry_run {
            Ok(action.dry_run())
        } else {
            action.run(ctx, cloud)
        };

        match outcome {
            Ok(events) => {
                let mut entry = TraceEntry {
                    action: label,
                    signaled: Vec::new(),
                };
                for event in events {
                    entry.signaled.extend(self.broadcast(&event));
                }
                if let Some(tracer) = tracer.as_deref_mut() {
                    tracer.record(&entry);
                }
                self.done.push(action);
            }
            Err(error) => {
                warn!(action = %label, %error, "action failed; leaving in frontier");
                self.errors.push(ActionError {
                    action: label,
                    error,
                });
                self.failed.push(action);
            }
        }
    }

    /// Remove and return the first ready action, preserving insertion
    /// order for reproducibility.
    fn next_ready(&mut self) -> Option<Box<dyn Action>> {
        let pos = self.pending.iter().position(|a| a.can_run())?;
        Some(self.pending.remove(pos))
    }

    /// Signal one event to every still-pending action. The signaling
    /// step completes before any further `can_run` evaluation.
    fn broadcast(&mut self, event: &Event) -> Vec<TraceSignal> {
        let mut signaled = Vec::new();
        for action in &mut self.pending {
            if action.signal(event) {
                signaled.push(TraceSignal {
                    event: event.clone(),
                    action: action.to_string(),
                });
            }
        }
        signaled
    }
}
