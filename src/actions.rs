//! Concrete actions synthesized from node plans
//!
//! Creates and deletes are uniform across kinds and dispatch through the
//! per-kind ops descriptor. Updates come in two flavors: the generic
//! fingerprinted whole-payload update, and the forwarding-rule update
//! that goes through the `setTarget` / `setLabels` verbs.

use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

use crate::cloud::{Cloud, SetLabelsRequest};
use crate::error::{Error, Result};
use crate::exec::{Action, ActionBase, Event, ExecContext};
use crate::id::{ResourceId, Version};
use crate::ops::OpsDescriptor;

/// Creates a resource. Emits `Exists(id)`.
pub struct CreateAction {
    base: ActionBase,
    ops: &'static OpsDescriptor,
    id: ResourceId,
    version: Version,
    body: Value,
}

impl CreateAction {
    pub fn new(
        want: Vec<Event>,
        ops: &'static OpsDescriptor,
        id: ResourceId,
        version: Version,
        body: Value,
    ) -> Box<dyn Action> {
        Box::new(Self {
            base: ActionBase::new(want),
            ops,
            id,
            version,
            body,
        })
    }
}

impl fmt::Display for CreateAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Create({})", self.id)
    }
}

impl Action for CreateAction {
    fn can_run(&self) -> bool {
        self.base.can_run()
    }

    fn signal(&mut self, event: &Event) -> bool {
        self.base.signal(event)
    }

    fn pending_events(&self) -> &[Event] {
        self.base.pending_events()
    }

    fn run(&mut self, ctx: &ExecContext, cloud: &dyn Cloud) -> Result<Vec<Event>> {
        ctx.check()?;
        self.ops
            .do_create(cloud, &self.id, self.version, self.body.clone())?;
        Ok(self.dry_run())
    }

    fn dry_run(&self) -> Vec<Event> {
        vec![Event::Exists(self.id.clone())]
    }
}

/// Deletes a resource. Emits `NotExists(id)` plus a `DropRef` for every
/// outbound reference the deleted payload held.
pub struct DeleteAction {
    base: ActionBase,
    ops: &'static OpsDescriptor,
    id: ResourceId,
    version: Version,
    /// Targets of the got payload's out-refs; deleting the node releases
    /// these references.
    dropped: Vec<ResourceId>,
}

impl DeleteAction {
    pub fn new(
        want: Vec<Event>,
        ops: &'static OpsDescriptor,
        id: ResourceId,
        version: Version,
        dropped: Vec<ResourceId>,
    ) -> Box<dyn Action> {
        Box::new(Self {
            base: ActionBase::new(want),
            ops,
            id,
            version,
            dropped,
        })
    }
}

impl fmt::Display for DeleteAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Delete({})", self.id)
    }
}

impl Action for DeleteAction {
    fn can_run(&self) -> bool {
        self.base.can_run()
    }

    fn signal(&mut self, event: &Event) -> bool {
        self.base.signal(event)
    }

    fn pending_events(&self) -> &[Event] {
        self.base.pending_events()
    }

    fn run(&mut self, ctx: &ExecContext, cloud: &dyn Cloud) -> Result<Vec<Event>> {
        ctx.check()?;
        self.ops.do_delete(cloud, &self.id, self.version)?;
        Ok(self.dry_run())
    }

    fn dry_run(&self) -> Vec<Event> {
        let mut events = vec![Event::NotExists(self.id.clone())];
        for to in &self.dropped {
            events.push(Event::DropRef {
                from: self.id.clone(),
                to: to.clone(),
            });
        }
        events
    }
}

/// Generic whole-payload update. For fingerprinted kinds the current
/// payload's fingerprint is echoed into the write. Emits a `DropRef` for
/// every reference the new payload no longer holds.
pub struct UpdateAction {
    base: ActionBase,
    ops: &'static OpsDescriptor,
    id: ResourceId,
    version: Version,
    body: Value,
    got_fingerprint: Option<String>,
    dropped: Vec<ResourceId>,
}

impl UpdateAction {
    pub fn new(
        want: Vec<Event>,
        ops: &'static OpsDescriptor,
        id: ResourceId,
        version: Version,
        body: Value,
        got_fingerprint: Option<String>,
        dropped: Vec<ResourceId>,
    ) -> Box<dyn Action> {
        Box::new(Self {
            base: ActionBase::new(want),
            ops,
            id,
            version,
            body,
            got_fingerprint,
            dropped,
        })
    }
}

impl fmt::Display for UpdateAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Update({})", self.id)
    }
}

impl Action for UpdateAction {
    fn can_run(&self) -> bool {
        self.base.can_run()
    }

    fn signal(&mut self, event: &Event) -> bool {
        self.base.signal(event)
    }

    fn pending_events(&self) -> &[Event] {
        self.base.pending_events()
    }

    fn run(&mut self, ctx: &ExecContext, cloud: &dyn Cloud) -> Result<Vec<Event>> {
        ctx.check()?;
        self.ops.do_update(
            cloud,
            &self.id,
            self.version,
            self.body.clone(),
            self.got_fingerprint.as_deref(),
        )?;
        Ok(self.dry_run())
    }

    fn dry_run(&self) -> Vec<Event> {
        self.dropped
            .iter()
            .map(|to| Event::DropRef {
                from: self.id.clone(),
                to: to.clone(),
            })
            .collect()
    }
}

/// Forwarding-rule in-place update via the `setTarget` and `setLabels`
/// verbs. Waits for the new target to exist; emits a `DropRef` for the
/// replaced target so its delete can proceed.
pub struct ForwardingRuleUpdateAction {
    base: ActionBase,
    id: ResourceId,
    version: Version,
    /// New target to point at, if the target changed.
    target: Option<ResourceId>,
    /// Previous target, released by this update.
    old_target: Option<ResourceId>,
    /// Full replacement label set, if labels changed.
    labels: Option<BTreeMap<String, String>>,
    /// Fingerprint of the label set being replaced, from the current
    /// payload.
    label_fingerprint: String,
}

impl ForwardingRuleUpdateAction {
    pub fn new(
        want: Vec<Event>,
        id: ResourceId,
        version: Version,
        target: Option<ResourceId>,
        old_target: Option<ResourceId>,
        labels: Option<BTreeMap<String, String>>,
        label_fingerprint: String,
    ) -> Box<dyn Action> {
        Box::new(Self {
            base: ActionBase::new(want),
            id,
            version,
            target,
            old_target,
            labels,
            label_fingerprint,
        })
    }
}

impl fmt::Display for ForwardingRuleUpdateAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ForwardingRuleUpdate({})", self.id)
    }
}

impl Action for ForwardingRuleUpdateAction {
    fn can_run(&self) -> bool {
        self.base.can_run()
    }

    fn signal(&mut self, event: &Event) -> bool {
        self.base.signal(event)
    }

    fn pending_events(&self) -> &[Event] {
        self.base.pending_events()
    }

    fn run(&mut self, ctx: &ExecContext, cloud: &dyn Cloud) -> Result<Vec<Event>> {
        ctx.check()?;

        if let Some(labels) = &self.labels {
            cloud
                .set_labels(
                    &self.id,
                    self.version,
                    SetLabelsRequest {
                        labels: labels.clone(),
                        label_fingerprint: self.label_fingerprint.clone(),
                    },
                )
                .map_err(|source| Error::Cloud {
                    id: self.id.clone(),
                    source,
                })?;
        }

        if let Some(target) = &self.target {
            cloud
                .set_target(&self.id, self.version, &target.self_link(self.version))
                .map_err(|source| Error::Cloud {
                    id: self.id.clone(),
                    source,
                })?;
        }

        Ok(self.dry_run())
    }

    fn dry_run(&self) -> Vec<Event> {
        match &self.old_target {
            Some(old) => vec![Event::DropRef {
                from: self.id.clone(),
                to: old.clone(),
            }],
            None => Vec::new(),
        }
    }
}
