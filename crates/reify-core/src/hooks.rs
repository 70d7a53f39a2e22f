//! Hooks runtime.
//!
//! Every component invocation owns a [`ComponentInstance`]: an ordered
//! vector of hook slots addressed purely by call order, with a cursor that
//! resets to zero at the start of each render. Hooks are methods on a
//! [`Scope`] handed to the component function by the reconciler, so there
//! is no ambient "current component" to get wrong; code that has no scope
//! simply cannot call hooks.
//!
//! Call-order stability is the component author's obligation. The runtime
//! does not try to repair a reordered hook sequence; a slot that changes
//! kind between renders panics with a description of the mismatch.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::{Rc, Weak};

use ahash::AHasher;

use crate::host::NodeId;
use crate::runtime::RuntimeHandle;

/// Persistent mutable cell, shared by clone.
///
/// This is the storage behind [`Scope::use_ref`], and also usable on its
/// own: a ref created outside any component can be threaded into a tree
/// through an element's ref channel.
pub struct Ref<T> {
    inner: Rc<RefCell<T>>,
}

/// Ref channel for host nodes: holds the bound node id while the element
/// is mounted, `None` otherwise.
pub type NodeRef = Ref<Option<NodeId>>;

impl<T> Ref<T> {
    pub fn new(value: T) -> Self {
        Self {
            inner: Rc::new(RefCell::new(value)),
        }
    }

    fn from_cell(inner: Rc<RefCell<T>>) -> Self {
        Self { inner }
    }

    pub fn set(&self, value: T) {
        *self.inner.borrow_mut() = value;
    }

    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.borrow())
    }

    pub fn update(&self, f: impl FnOnce(&mut T)) {
        f(&mut self.inner.borrow_mut());
    }
}

impl<T: Clone> Ref<T> {
    pub fn get(&self) -> T {
        self.inner.borrow().clone()
    }
}

impl<T> Clone for Ref<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T> PartialEq for Ref<T> {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<T: Default> Default for Ref<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T> fmt::Debug for Ref<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Ref(..)")
    }
}

/// Write half of a state slot.
///
/// Calling [`set`](Self::set) outside the owning component's render marks
/// the instance dirty and triggers one immediate reconcile cycle; calls are
/// never batched. During the owning render the slot is mutated silently.
/// Setting a value equal to the current one is a no-op either way. Setters
/// outlive their component; once the instance is gone they do nothing.
pub struct StateSetter<T> {
    cell: Rc<RefCell<T>>,
    instance: Weak<ComponentInstance>,
}

impl<T: Clone + PartialEq + 'static> StateSetter<T> {
    pub fn set(&self, value: T) {
        let Some(instance) = self.instance.upgrade() else {
            log::debug!("state setter called after its component unmounted");
            return;
        };
        if *self.cell.borrow() == value {
            return;
        }
        *self.cell.borrow_mut() = value;
        if instance.rendering.get() {
            return;
        }
        instance.schedule_update();
    }

    pub fn update(&self, f: impl FnOnce(&T) -> T) {
        let current = self.cell.borrow().clone();
        self.set(f(&current));
    }
}

impl<T> Clone for StateSetter<T> {
    fn clone(&self) -> Self {
        Self {
            cell: Rc::clone(&self.cell),
            instance: Weak::clone(&self.instance),
        }
    }
}

impl<T> PartialEq for StateSetter<T> {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.cell, &other.cell)
    }
}

/// What an effect hands back when it finishes: nothing, or a closure that
/// runs before the effect's next run and when the instance unmounts.
pub enum Cleanup {
    None,
    Run(Box<dyn FnOnce()>),
}

impl Cleanup {
    pub fn none() -> Self {
        Cleanup::None
    }

    pub fn run(cleanup: impl FnOnce() + 'static) -> Self {
        Cleanup::Run(Box::new(cleanup))
    }

    fn into_option(self) -> Option<EffectCleanup> {
        match self {
            Cleanup::None => None,
            Cleanup::Run(cleanup) => Some(cleanup),
        }
    }
}

type EffectCleanup = Box<dyn FnOnce()>;
type PendingEffect = Box<dyn FnOnce() -> Option<EffectCleanup>>;

struct EffectSlot {
    committed: bool,
    marker: Option<u64>,
    pending: Option<PendingEffect>,
    cleanup: Option<EffectCleanup>,
}

impl EffectSlot {
    fn new() -> Self {
        Self {
            committed: false,
            marker: None,
            pending: None,
            cleanup: None,
        }
    }
}

impl Drop for EffectSlot {
    fn drop(&mut self) {
        if let Some(cleanup) = self.cleanup.take() {
            cleanup();
        }
    }
}

enum HookSlot {
    State(Rc<dyn Any>),
    Effect(EffectSlot),
    Ref(Rc<dyn Any>),
}

impl HookSlot {
    fn kind(&self) -> &'static str {
        match self {
            HookSlot::State(_) => "state",
            HookSlot::Effect(_) => "effect",
            HookSlot::Ref(_) => "ref",
        }
    }
}

/// Per-component persistent record.
///
/// Created when the reconciler first reaches a component at a position/key
/// and reused for every later render of the same component there. Holds the
/// hook slots, the render cursor, and enough plumbing to schedule a
/// re-render of the container it was rendered under.
pub struct ComponentInstance {
    slots: RefCell<Vec<HookSlot>>,
    cursor: Cell<usize>,
    rendering: Cell<bool>,
    dirty: Cell<bool>,
    container: Cell<NodeId>,
    runtime: RuntimeHandle,
}

impl ComponentInstance {
    pub(crate) fn new(runtime: RuntimeHandle, container: NodeId) -> Self {
        Self {
            slots: RefCell::new(Vec::new()),
            cursor: Cell::new(0),
            rendering: Cell::new(false),
            dirty: Cell::new(false),
            container: Cell::new(container),
            runtime,
        }
    }

    /// Whether a setter has requested a re-render that has not run yet.
    pub fn is_dirty(&self) -> bool {
        self.dirty.get()
    }

    pub(crate) fn begin_render(&self) {
        self.cursor.set(0);
        self.rendering.set(true);
        self.dirty.set(false);
    }

    pub(crate) fn end_render(&self) {
        self.rendering.set(false);
    }

    pub(crate) fn set_container(&self, container: NodeId) {
        self.container.set(container);
    }

    fn schedule_update(&self) {
        self.dirty.set(true);
        self.runtime.schedule_root(self.container.get());
    }

    fn next_slot(&self) -> usize {
        let index = self.cursor.get();
        self.cursor.set(index + 1);
        index
    }

    fn state_cell<T: 'static>(&self, index: usize, init: impl FnOnce() -> T) -> Rc<RefCell<T>> {
        let existing = {
            let slots = self.slots.borrow();
            match slots.get(index) {
                Some(HookSlot::State(any)) => Some(
                    Rc::clone(any)
                        .downcast::<RefCell<T>>()
                        .unwrap_or_else(|_| {
                            panic!("state hook at slot {index} changed value type between renders")
                        }),
                ),
                Some(other) => panic!(
                    "hook order changed: slot {index} holds a {} hook, expected state",
                    other.kind()
                ),
                None => None,
            }
        };
        if let Some(cell) = existing {
            return cell;
        }
        let cell = Rc::new(RefCell::new(init()));
        self.slots
            .borrow_mut()
            .push(HookSlot::State(Rc::clone(&cell) as Rc<dyn Any>));
        cell
    }

    fn ref_cell<T: 'static>(&self, index: usize, init: impl FnOnce() -> T) -> Rc<RefCell<T>> {
        let existing = {
            let slots = self.slots.borrow();
            match slots.get(index) {
                Some(HookSlot::Ref(any)) => Some(
                    Rc::clone(any)
                        .downcast::<RefCell<T>>()
                        .unwrap_or_else(|_| {
                            panic!("ref hook at slot {index} changed value type between renders")
                        }),
                ),
                Some(other) => panic!(
                    "hook order changed: slot {index} holds a {} hook, expected ref",
                    other.kind()
                ),
                None => None,
            }
        };
        if let Some(cell) = existing {
            return cell;
        }
        let cell = Rc::new(RefCell::new(init()));
        self.slots
            .borrow_mut()
            .push(HookSlot::Ref(Rc::clone(&cell) as Rc<dyn Any>));
        cell
    }

    fn effect_slot(&self, index: usize, marker: Option<u64>, pending: PendingEffect) {
        let mut slots = self.slots.borrow_mut();
        if index < slots.len() {
            match &mut slots[index] {
                HookSlot::Effect(effect) => {
                    let changed = !effect.committed || marker.is_none() || effect.marker != marker;
                    if changed {
                        effect.pending = Some(pending);
                        effect.marker = marker;
                    }
                }
                other => panic!(
                    "hook order changed: slot {index} holds a {} hook, expected effect",
                    other.kind()
                ),
            }
            return;
        }
        let mut effect = EffectSlot::new();
        effect.marker = marker;
        effect.pending = Some(pending);
        slots.push(HookSlot::Effect(effect));
    }

    /// Drain effects scheduled during the render that just finished into
    /// the pass's flush queue.
    pub(crate) fn take_effects(self: &Rc<Self>, out: &mut Vec<Box<dyn FnOnce()>>) {
        let mut slots = self.slots.borrow_mut();
        for (index, slot) in slots.iter_mut().enumerate() {
            if let HookSlot::Effect(effect) = slot {
                if let Some(pending) = effect.pending.take() {
                    let instance = Rc::clone(self);
                    out.push(Box::new(move || instance.run_effect(index, pending)));
                }
            }
        }
    }

    fn run_effect(&self, index: usize, pending: PendingEffect) {
        let previous = {
            let mut slots = self.slots.borrow_mut();
            match slots.get_mut(index) {
                Some(HookSlot::Effect(effect)) => {
                    effect.committed = true;
                    effect.cleanup.take()
                }
                _ => None,
            }
        };
        if let Some(cleanup) = previous {
            cleanup();
        }
        // User code runs with no slot borrow held; setters called here only
        // touch their own cells and the runtime queue.
        let next = pending();
        if let Some(HookSlot::Effect(effect)) = self.slots.borrow_mut().get_mut(index) {
            effect.cleanup = next;
        }
    }

    /// Run all outstanding effect cleanups; called when the instance's
    /// position or key disappears from the tree.
    pub(crate) fn teardown(&self) {
        let mut cleanups: Vec<EffectCleanup> = Vec::new();
        {
            let mut slots = self.slots.borrow_mut();
            for slot in slots.iter_mut() {
                if let HookSlot::Effect(effect) = slot {
                    effect.pending = None;
                    if let Some(cleanup) = effect.cleanup.take() {
                        cleanups.push(cleanup);
                    }
                }
            }
        }
        for cleanup in cleanups {
            cleanup();
        }
    }
}

/// Hook entry points for one render of one component.
///
/// The reconciler constructs a scope around the instance, passes it to the
/// component function, and drops it when the function returns.
pub struct Scope<'a> {
    instance: &'a Rc<ComponentInstance>,
}

impl<'a> Scope<'a> {
    pub(crate) fn new(instance: &'a Rc<ComponentInstance>) -> Self {
        Self { instance }
    }

    /// Persistent state slot. `init` runs only when the slot is first
    /// created; later renders return the stored value.
    pub fn use_state<T>(&mut self, init: impl FnOnce() -> T) -> (T, StateSetter<T>)
    where
        T: Clone + PartialEq + 'static,
    {
        let index = self.instance.next_slot();
        let cell = self.instance.state_cell(index, init);
        let value = cell.borrow().clone();
        let setter = StateSetter {
            cell,
            instance: Rc::downgrade(self.instance),
        };
        (value, setter)
    }

    /// Side effect that runs after every commit of this component. The
    /// returned [`Cleanup`] runs before the effect's next run and on
    /// unmount.
    pub fn use_effect<F>(&mut self, effect: F)
    where
        F: FnOnce() -> Cleanup + 'static,
    {
        let index = self.instance.next_slot();
        self.instance
            .effect_slot(index, None, Box::new(move || effect().into_option()));
    }

    /// Side effect that runs after the first commit and again whenever the
    /// hash of `deps` changes. The previous cleanup runs before the new
    /// callback.
    pub fn use_effect_with<D, F>(&mut self, deps: D, effect: F)
    where
        D: Hash,
        F: FnOnce() -> Cleanup + 'static,
    {
        let index = self.instance.next_slot();
        let marker = dep_marker(&deps);
        self.instance
            .effect_slot(index, Some(marker), Box::new(move || effect().into_option()));
    }

    /// Persistent mutable cell that survives re-renders without triggering
    /// them.
    pub fn use_ref<T: 'static>(&mut self, init: impl FnOnce() -> T) -> Ref<T> {
        let index = self.instance.next_slot();
        Ref::from_cell(self.instance.ref_cell(index, init))
    }

    /// Persistent [`NodeRef`]; bind it to an element to observe the host
    /// node it mounts as.
    pub fn use_node_ref(&mut self) -> NodeRef {
        self.use_ref(|| None)
    }
}

fn dep_marker(deps: &impl Hash) -> u64 {
    let mut hasher = AHasher::default();
    deps.hash(&mut hasher);
    hasher.finish()
}

#[cfg(test)]
#[path = "tests/hooks_tests.rs"]
mod tests;
