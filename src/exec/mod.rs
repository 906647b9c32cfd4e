//! Event-driven execution
//!
//! An [`Action`] is a unit of cloud-side work gated on [`Event`]s. The
//! executor runs whatever is ready and broadcasts the events each action
//! emits until the frontier drains; whatever is left is stuck and is
//! returned for diagnosis.

pub mod executor;
pub mod tracer;

pub use executor::{ActionError, ExecOptions, ExecResult, SerialExecutor};
pub use tracer::{TraceEntry, TraceSignal, Tracer, VizTracer};

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::cloud::Cloud;
use crate::error::{Error, Result};
use crate::id::ResourceId;

/// A state transition observable by pending actions. Events are values;
/// matching is structural.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// The resource has been observed or created.
    Exists(ResourceId),
    /// The resource has been removed.
    NotExists(ResourceId),
    /// A formerly-held reference from `from` to `to` has been released.
    DropRef { from: ResourceId, to: ResourceId },
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::Exists(id) => write!(f, "Exists({id})"),
            Event::NotExists(id) => write!(f, "NotExists({id})"),
            Event::DropRef { from, to } => write!(f, "DropRef({from} => {to})"),
        }
    }
}

/// Cancellation context threaded through execution. Clones share the
/// underlying flag.
#[derive(Debug, Clone, Default)]
pub struct ExecContext {
    cancelled: Arc<AtomicBool>,
}

impl ExecContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Already-executed actions are not rolled
    /// back; the executor surfaces the unfinished frontier.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Error out promptly if cancellation was requested.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(Error::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// An operation that updates external resources, gated on events.
pub trait Action: fmt::Display + Send {
    /// True iff every wanted event has been signaled.
    fn can_run(&self) -> bool;

    /// Signal an event. Removes one matching want; reports whether the
    /// action was waiting on it.
    fn signal(&mut self, event: &Event) -> bool;

    /// Events still being waited for.
    fn pending_events(&self) -> &[Event];

    /// Perform the side effects. Returns the events to broadcast.
    fn run(&mut self, ctx: &ExecContext, cloud: &dyn Cloud) -> Result<Vec<Event>>;

    /// Pure simulation; returns the same event set a successful `run`
    /// would.
    fn dry_run(&self) -> Vec<Event>;

    /// Zero-work actions that only model starting conditions. The
    /// executor runs these first, before any real work.
    fn is_event_only(&self) -> bool {
        false
    }
}

/// Common want/done bookkeeping for action implementations.
#[derive(Debug, Default)]
pub struct ActionBase {
    /// Events this action is still waiting for.
    pub want: Vec<Event>,
    /// Events that have been signaled, kept for debugging.
    pub done: Vec<Event>,
}

impl ActionBase {
    pub fn new(want: Vec<Event>) -> Self {
        Self {
            want,
            done: Vec::new(),
        }
    }

    pub fn can_run(&self) -> bool {
        self.want.is_empty()
    }

    pub fn signal(&mut self, event: &Event) -> bool {
        if let Some(pos) = self.want.iter().position(|w| w == event) {
            self.done.push(self.want.remove(pos));
            true
        } else {
            false
        }
    }

    pub fn pending_events(&self) -> &[Event] {
        &self.want
    }
}

/// An action with no side effects that signals events which are already
/// true at the start of execution (e.g. the resource already exists).
pub struct EventOnlyAction {
    events: Vec<Event>,
}

impl EventOnlyAction {
    /// Signals `Exists(id)` at the start of execution.
    pub fn exists(id: ResourceId) -> Box<dyn Action> {
        Box::new(Self {
            events: vec![Event::Exists(id)],
        })
    }
}

impl fmt::Display for EventOnlyAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EventOnly(")?;
        for (i, event) in self.events.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{event}")?;
        }
        f.write_str(")")
    }
}

impl Action for EventOnlyAction {
    fn can_run(&self) -> bool {
        true
    }

    fn signal(&mut self, _event: &Event) -> bool {
        false
    }

    fn pending_events(&self) -> &[Event] {
        &[]
    }

    fn run(&mut self, _ctx: &ExecContext, _cloud: &dyn Cloud) -> Result<Vec<Event>> {
        Ok(self.events.clone())
    }

    fn dry_run(&self) -> Vec<Event> {
        self.events.clone()
    }

    fn is_event_only(&self) -> bool {
        true
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::Scope;

    fn id(name: &str) -> ResourceId {
        ResourceId::new("addresses", "p", Scope::Global, name)
    }

    #[test]
    fn test_event_structural_equality() {
        assert_eq!(Event::Exists(id("a")), Event::Exists(id("a")));
        assert_ne!(Event::Exists(id("a")), Event::NotExists(id("a")));
        assert_ne!(Event::Exists(id("a")), Event::Exists(id("b")));
    }

    #[test]
    fn test_action_base_signal_removes_one_match() {
        let mut base = ActionBase::new(vec![Event::Exists(id("a")), Event::Exists(id("a"))]);
        assert!(!base.can_run());
        assert!(base.signal(&Event::Exists(id("a"))));
        assert_eq!(base.pending_events().len(), 1);
        assert!(!base.signal(&Event::Exists(id("b"))));
        assert!(base.signal(&Event::Exists(id("a"))));
        assert!(base.can_run());
    }

    #[test]
    fn test_event_only_action_is_always_ready() {
        let mut action = EventOnlyAction::exists(id("a"));
        assert!(action.can_run());
        assert!(action.is_event_only());
        assert_eq!(action.dry_run(), vec![Event::Exists(id("a"))]);
        assert!(!action.signal(&Event::Exists(id("a"))));
    }

    #[test]
    fn test_context_cancellation_is_shared() {
        let ctx = ExecContext::new();
        let clone = ctx.clone();
        assert!(ctx.check().is_ok());
        clone.cancel();
        assert!(matches!(ctx.check(), Err(Error::Cancelled)));
    }
}
