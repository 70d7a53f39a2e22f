//! Mount/render entry point.
//!
//! A [`Renderer`] ties one [`Document`] to the reconciler and the runtime.
//! Each container node it has rendered into keeps a root entry: the virtual
//! tree of the last pass and the live binding tree it produced. A pass is
//! reconcile (commit) first, then an effect flush through the runtime task
//! queue; state setters fired from effects or event handlers schedule
//! follow-up passes, and the renderer pumps until everything settles before
//! returning to the caller.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use hashbrown::HashMap;

use crate::error::DomError;
use crate::host::{Document, NodeId};
use crate::reconciler::{Binding, Reconciler};
use crate::runtime::{RenderScheduler, Runtime};
use crate::vnode::VNode;

struct RootEntry {
    vnode: VNode,
    binding: Binding,
}

struct RendererInner {
    document: Document,
    runtime: Runtime,
    roots: RefCell<HashMap<NodeId, RootEntry>>,
    /// Guards against re-entering the pump from a setter fired mid-pass;
    /// the running pump loop picks the new work up instead.
    pumping: Cell<bool>,
}

/// Scheduler wired into the runtime at construction: any dirty root pumps
/// the renderer immediately, so an external setter call is its own
/// reconcile cycle.
struct PumpScheduler {
    renderer: Weak<RendererInner>,
}

impl RenderScheduler for PumpScheduler {
    fn request_render(&self) {
        if let Some(inner) = self.renderer.upgrade() {
            if let Err(error) = inner.pump() {
                log::error!("scheduled render pass failed: {error}");
            }
        }
    }
}

/// Public entry point for mounting and re-rendering virtual trees.
pub struct Renderer {
    inner: Rc<RendererInner>,
}

impl Renderer {
    pub fn new(document: Document) -> Self {
        let inner = Rc::new_cyclic(|weak: &Weak<RendererInner>| {
            let scheduler = Rc::new(PumpScheduler {
                renderer: Weak::clone(weak),
            });
            RendererInner {
                document,
                runtime: Runtime::new(scheduler),
                roots: RefCell::new(HashMap::new()),
                pumping: Cell::new(false),
            }
        });
        Self { inner }
    }

    pub fn document(&self) -> Document {
        self.inner.document.clone()
    }

    /// Reconcile `vnode` into `container`, commit all host mutations, and
    /// flush effects (plus any passes those effects trigger) before
    /// returning. A container the renderer has seen before is diffed
    /// against its previous tree; a missing container is fatal.
    pub fn render(&self, vnode: impl Into<VNode>, container: NodeId) -> Result<(), DomError> {
        // Fails with Missing/KindMismatch before any mutation happens.
        self.inner.document.tag_name(container)?;
        self.inner.guarded_pass(container, vnode.into())?;
        self.inner.pump()
    }

    /// [`render`](Self::render), then invoke `on_done` once the tree is
    /// committed and all effects have flushed.
    pub fn render_then(
        &self,
        vnode: impl Into<VNode>,
        container: NodeId,
        on_done: impl FnOnce(),
    ) -> Result<(), DomError> {
        self.render(vnode, container)?;
        on_done();
        Ok(())
    }

    /// Fire the listener bound for `event` on `target` and let every pass
    /// the handler triggered run to completion, so the caller observes the
    /// committed tree. Returns whether a listener ran.
    pub fn dispatch(&self, target: NodeId, event: &str) -> Result<bool, DomError> {
        let fired = self.inner.document.dispatch(target, event)?;
        self.inner.pump()?;
        Ok(fired)
    }

    /// Drive pending work (dirty roots, queued effects) until idle.
    pub fn pump(&self) -> Result<(), DomError> {
        self.inner.pump()
    }
}

impl RendererInner {
    /// [`run_pass`](Self::run_pass) with the pump guard held. A setter
    /// fired during the walk for an instance that is not itself rendering
    /// (a sibling committed earlier in the same pass) must queue its dirty
    /// root for the pump that follows; re-entering the pump here would
    /// find the container's root entry checked out and drop the update.
    fn guarded_pass(&self, container: NodeId, next: VNode) -> Result<(), DomError> {
        let was_pumping = self.pumping.replace(true);
        let result = self.run_pass(container, next);
        self.pumping.set(was_pumping);
        result
    }

    /// One reconcile-and-commit pass for `container`; queues the pass's
    /// effects on the runtime without flushing them.
    fn run_pass(&self, container: NodeId, next: VNode) -> Result<(), DomError> {
        let previous = self.roots.borrow_mut().remove(&container);
        let handle = self.runtime.handle();
        let mut reconciler = Reconciler::new(self.document.clone(), handle.clone(), container);
        let binding = match previous {
            Some(entry) => {
                reconciler.reconcile(Some((&entry.vnode, entry.binding)), &next, container, None)?
            }
            None => reconciler.reconcile(None, &next, container, None)?,
        };
        for effect in reconciler.finish() {
            handle.spawn_task(effect);
        }
        self.roots
            .borrow_mut()
            .insert(container, RootEntry { vnode: next, binding });
        Ok(())
    }

    /// Re-render a dirty container against its stored tree; the components
    /// under it read their updated state slots during the walk.
    fn rerender_root(&self, container: NodeId) -> Result<(), DomError> {
        let next = match self.roots.borrow().get(&container) {
            Some(entry) => entry.vnode.clone(),
            None => {
                log::debug!("dirty container {container} has no mounted tree");
                return Ok(());
            }
        };
        self.run_pass(container, next)
    }

    fn pump(&self) -> Result<(), DomError> {
        if self.pumping.get() {
            return Ok(());
        }
        self.pumping.set(true);
        let result = self.pump_until_idle();
        self.pumping.set(false);
        result
    }

    fn pump_until_idle(&self) -> Result<(), DomError> {
        let handle = self.runtime.handle();
        loop {
            // Effects first: commits for the pass that queued them are
            // already applied, and their setters dirty roots for the next
            // iteration.
            handle.drain_tasks();
            for container in self.runtime.take_dirty_roots() {
                self.rerender_root(container)?;
            }
            if !handle.has_pending_tasks() && !handle.has_dirty_roots() {
                break;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/renderer_tests.rs"]
mod tests;
