//! Render scheduling and the deferred-work queue.
//!
//! The runtime is the hinge between state setters and the renderer: a
//! setter marks its container dirty here, and the installed
//! [`RenderScheduler`] decides when the renderer pumps. The task queue
//! carries work that must wait until the current commit finishes, which is
//! how effects flush strictly after mutations.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::{Rc, Weak};

use hashbrown::HashSet;

use crate::host::NodeId;

/// Strategy invoked whenever new render work appears.
pub trait RenderScheduler {
    fn request_render(&self);
}

/// Scheduler that never pumps on its own; whoever owns the runtime drains
/// work explicitly. Useful for unit tests around scheduling itself.
#[derive(Default)]
pub struct NoopScheduler;

impl RenderScheduler for NoopScheduler {
    fn request_render(&self) {}
}

struct RuntimeInner {
    scheduler: Rc<dyn RenderScheduler>,
    dirty_roots: RefCell<HashSet<NodeId>>,
    root_queue: RefCell<Vec<NodeId>>,
    pending_tasks: RefCell<VecDeque<Box<dyn FnOnce() + 'static>>>,
}

impl RuntimeInner {
    fn new(scheduler: Rc<dyn RenderScheduler>) -> Self {
        Self {
            scheduler,
            dirty_roots: RefCell::new(HashSet::new()),
            root_queue: RefCell::new(Vec::new()),
            pending_tasks: RefCell::new(VecDeque::new()),
        }
    }

    fn schedule_root(&self, container: NodeId) {
        let inserted = self.dirty_roots.borrow_mut().insert(container);
        if inserted {
            self.root_queue.borrow_mut().push(container);
            log::trace!("render scheduled for container {container}");
            self.scheduler.request_render();
        }
    }

    fn take_dirty_roots(&self) -> Vec<NodeId> {
        let roots: Vec<NodeId> = self.root_queue.borrow_mut().drain(..).collect();
        let mut dirty = self.dirty_roots.borrow_mut();
        for root in &roots {
            dirty.remove(root);
        }
        roots
    }

    fn has_dirty_roots(&self) -> bool {
        !self.dirty_roots.borrow().is_empty()
    }

    fn enqueue_task(&self, task: Box<dyn FnOnce() + 'static>) {
        self.pending_tasks.borrow_mut().push_back(task);
    }

    fn drain_tasks(&self) {
        loop {
            let task = self.pending_tasks.borrow_mut().pop_front();
            match task {
                Some(task) => task(),
                None => break,
            }
        }
    }

    fn has_tasks(&self) -> bool {
        !self.pending_tasks.borrow().is_empty()
    }
}

/// Owning handle to the scheduling state; one per renderer.
#[derive(Clone)]
pub struct Runtime {
    inner: Rc<RuntimeInner>,
}

impl Runtime {
    pub fn new(scheduler: Rc<dyn RenderScheduler>) -> Self {
        Self {
            inner: Rc::new(RuntimeInner::new(scheduler)),
        }
    }

    pub fn handle(&self) -> RuntimeHandle {
        RuntimeHandle(Rc::downgrade(&self.inner))
    }

    pub fn take_dirty_roots(&self) -> Vec<NodeId> {
        self.inner.take_dirty_roots()
    }

    pub fn has_dirty_roots(&self) -> bool {
        self.inner.has_dirty_roots()
    }
}

/// Weak handle carried by component instances and the reconciler. Every
/// method degrades to a no-op once the runtime is gone, except
/// [`spawn_task`](Self::spawn_task), which runs the task inline rather
/// than lose it.
#[derive(Clone)]
pub struct RuntimeHandle(Weak<RuntimeInner>);

impl RuntimeHandle {
    pub fn schedule_root(&self, container: NodeId) {
        if let Some(inner) = self.0.upgrade() {
            inner.schedule_root(container);
        }
    }

    pub fn spawn_task(&self, task: Box<dyn FnOnce() + 'static>) {
        if let Some(inner) = self.0.upgrade() {
            inner.enqueue_task(task);
        } else {
            task();
        }
    }

    pub fn drain_tasks(&self) {
        if let Some(inner) = self.0.upgrade() {
            inner.drain_tasks();
        }
    }

    pub fn has_pending_tasks(&self) -> bool {
        self.0
            .upgrade()
            .map(|inner| inner.has_tasks())
            .unwrap_or(false)
    }

    pub fn has_dirty_roots(&self) -> bool {
        self.0
            .upgrade()
            .map(|inner| inner.has_dirty_roots())
            .unwrap_or(false)
    }
}
