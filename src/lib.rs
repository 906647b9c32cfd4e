//! # Converge
//!
//! A declarative reconciliation engine for cloud load-balancing
//! resource graphs.
//!
//! Callers declare the desired state as a graph of typed resources (the
//! *want* graph). The engine discovers the current state from the cloud
//! (the *got* graph) by following references transitively, decides a
//! per-resource operation (create, update, recreate, delete, nothing),
//! refines the plan across the whole graph, and turns it into actions
//! whose ordering is expressed through events: a resource is created
//! only after everything it references exists, and deleted only after
//! everything referencing it has let go.
//!
//! ## Core concepts
//!
//! - **Resource**: a cross-version (GA/Beta/Alpha) payload, mutable
//!   while being built, frozen once placed in a graph.
//! - **Graph**: nodes indexed by [`ResourceId`], with reference edges
//!   derived from the payloads themselves.
//! - **Plan**: per-node operation decided locally, then refined
//!   globally (recreates propagate to referrers; deletes must cascade).
//! - **Actions & events**: units of cloud work gated on
//!   exists / not-exists / dropped-reference events, drained by a
//!   serial executor with dry-run and tracing.
//!
//! ## Example
//!
//! ```ignore
//! use converge::{Builder, Graph, MockCloud, NodeState, Ownership};
//! use converge::engine::{plan, PlanConfig};
//! use converge::exec::{ExecContext, ExecOptions, SerialExecutor};
//! use converge::resource::address::address_node;
//!
//! let b = Builder::new("my-project");
//! let addr = b.n("ip").address().resource().freeze()?;
//!
//! let mut want = Graph::new();
//! want.add(address_node(addr, Ownership::Managed))?
//!     .set_state(NodeState::Exists);
//!
//! let cloud = MockCloud::new();
//! let result = plan(&cloud, &mut want, &PlanConfig::default())?;
//! let outcome = SerialExecutor::new(result.actions, ExecOptions::default())
//!     .run(&ExecContext::new(), &cloud, None);
//! assert!(outcome.is_success());
//! ```

pub mod actions;
pub mod api;
pub mod builder;
pub mod cloud;
pub mod engine;
pub mod error;
pub mod exec;
pub mod graph;
pub mod id;
pub mod ops;
pub mod plan;
pub mod resource;
pub mod testcases;

// Re-export the main types at the crate root.
pub use api::{DiffItem, DiffResult, FieldKind, FieldPath, FieldTraits, Frozen, Mutable};
pub use builder::Builder;
pub use cloud::{Cloud, CloudError, MockCloud, SetLabelsRequest};
pub use error::{Error, Result};
pub use exec::{Action, Event, ExecContext, ExecOptions, ExecResult, SerialExecutor};
pub use graph::Graph;
pub use id::{ResourceId, Scope, ScopeKind, Version};
pub use plan::{Operation, Plan, PlanDetails};
pub use resource::{Node, NodeState, Ownership, ResourceRef};
