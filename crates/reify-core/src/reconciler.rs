//! Tree reconciliation.
//!
//! A pass walks the previous virtual tree, the live [`Binding`] tree, and
//! the new virtual tree in lock-step, mutating the host document into the
//! new shape. Reuse rules per node kind:
//!
//! - text: same host node, value rewritten only when it differs;
//! - element: same tag keeps the node, props are diffed, children
//!   reconciled; a different tag unmounts and remounts;
//! - component: same factory and key keep the [`ComponentInstance`];
//!   anything else tears the instance down (running effect cleanups) and
//!   mounts fresh.
//!
//! Keyed children reconcile with a single left-to-right walk over the new
//! list: keyed entries match through a key index of the old list, unkeyed
//! entries consume the remaining unkeyed old children in positional order.
//! The walk tracks the highest old index reused so far and repositions a
//! reused node only when its old index falls below that mark, so runs that
//! are already in order cost nothing. Old children not reused by the end
//! of the walk unmount afterwards, which also keeps mid-walk anchors
//! alive.

use std::collections::VecDeque;
use std::rc::Rc;

use hashbrown::{HashMap, HashSet};

use crate::error::DomError;
use crate::hooks::{ComponentInstance, NodeRef, Scope};
use crate::host::{Document, NodeId};
use crate::props::{apply_props, Props};
use crate::runtime::RuntimeHandle;
use crate::vnode::{Key, VComponent, VElement, VNode};

/// Live counterpart of a rendered [`VNode`]: which host node (or component
/// instance) a description produced. The shape mirrors the virtual tree of
/// the same pass, so later passes can walk both in lock-step.
pub enum Binding {
    Text(TextBinding),
    Element(ElementBinding),
    Component(ComponentBinding),
}

pub struct TextBinding {
    pub node: NodeId,
}

pub struct ElementBinding {
    pub node: NodeId,
    pub children: Vec<Binding>,
}

pub struct ComponentBinding {
    pub instance: Rc<ComponentInstance>,
    /// Output of the instance's last render; the old tree for the next
    /// subtree diff, since it appears nowhere in the parent's vnode tree.
    pub rendered: VNode,
    pub child: Box<Binding>,
}

/// Host node a binding resolves to; for components, the root node of the
/// rendered subtree.
pub fn binding_node(binding: &Binding) -> NodeId {
    match binding {
        Binding::Text(text) => text.node,
        Binding::Element(element) => element.node,
        Binding::Component(component) => binding_node(&component.child),
    }
}

/// One reconcile pass against one container.
pub struct Reconciler {
    document: Document,
    runtime: RuntimeHandle,
    root: NodeId,
    effects: Vec<Box<dyn FnOnce()>>,
}

impl Reconciler {
    pub fn new(document: Document, runtime: RuntimeHandle, root: NodeId) -> Self {
        Self {
            document,
            runtime,
            root,
            effects: Vec::new(),
        }
    }

    /// Effects queued by components rendered during this pass, in flush
    /// order (a component's subtree before the component itself).
    pub fn finish(self) -> Vec<Box<dyn FnOnce()>> {
        self.effects
    }

    /// Diff one position: `old` is the previous description plus its
    /// binding (absent on first mount), `new` the desired one. `anchor`
    /// only matters when something fresh must be attached: the new node is
    /// inserted before it (appended when `None`). Replacements ignore it
    /// and take over the old node's position.
    pub fn reconcile(
        &mut self,
        old: Option<(&VNode, Binding)>,
        new: &VNode,
        parent: NodeId,
        anchor: Option<NodeId>,
    ) -> Result<Binding, DomError> {
        match (old, new) {
            (Some((VNode::Text(old_text), Binding::Text(binding))), VNode::Text(new_text)) => {
                if old_text != new_text {
                    self.document.set_text(binding.node, new_text)?;
                }
                Ok(Binding::Text(binding))
            }
            (Some((VNode::Element(old_el), Binding::Element(binding))), VNode::Element(new_el))
                if old_el.tag == new_el.tag =>
            {
                self.update_element(old_el, binding, new_el)
            }
            (
                Some((VNode::Component(old_comp), Binding::Component(binding))),
                VNode::Component(new_comp),
            ) if old_comp.func == new_comp.func && old_comp.key == new_comp.key => {
                self.update_component(binding, new_comp, parent, anchor)
            }
            (old, new) => {
                if let Some((old_vnode, old_binding)) = old {
                    let slot = self.document.next_sibling(binding_node(&old_binding))?;
                    self.unmount(old_vnode, old_binding)?;
                    self.mount(new, parent, slot)
                } else {
                    self.mount(new, parent, anchor)
                }
            }
        }
    }

    fn update_element(
        &mut self,
        old: &VElement,
        binding: ElementBinding,
        new: &VElement,
    ) -> Result<Binding, DomError> {
        let node = binding.node;
        apply_props(&self.document, node, &old.props, &new.props)?;
        let children =
            self.reconcile_children(node, &old.children, binding.children, &new.children)?;
        sync_node_ref(old.node_ref.as_ref(), new.node_ref.as_ref(), node);
        Ok(Binding::Element(ElementBinding { node, children }))
    }

    fn update_component(
        &mut self,
        binding: ComponentBinding,
        new: &VComponent,
        parent: NodeId,
        anchor: Option<NodeId>,
    ) -> Result<Binding, DomError> {
        let ComponentBinding {
            instance,
            rendered,
            child,
        } = binding;
        instance.set_container(self.root);
        let next_rendered = run_component(&instance, new);
        let next_child = self.reconcile(Some((&rendered, *child)), &next_rendered, parent, anchor)?;
        instance.take_effects(&mut self.effects);
        Ok(Binding::Component(ComponentBinding {
            instance,
            rendered: next_rendered,
            child: Box::new(next_child),
        }))
    }

    fn mount(
        &mut self,
        vnode: &VNode,
        parent: NodeId,
        anchor: Option<NodeId>,
    ) -> Result<Binding, DomError> {
        match vnode {
            VNode::Text(value) => {
                let node = self.document.create_text(value);
                self.document.insert_before(parent, node, anchor)?;
                Ok(Binding::Text(TextBinding { node }))
            }
            VNode::Element(element) => {
                let node = self.document.create_element(&element.tag);
                apply_props(&self.document, node, &Props::new(), &element.props)?;
                self.document.insert_before(parent, node, anchor)?;
                let mut children = Vec::with_capacity(element.children.len());
                for child in &element.children {
                    children.push(self.mount(child, node, None)?);
                }
                if let Some(node_ref) = &element.node_ref {
                    node_ref.set(Some(node));
                }
                Ok(Binding::Element(ElementBinding { node, children }))
            }
            VNode::Component(comp) => {
                let instance = Rc::new(ComponentInstance::new(self.runtime.clone(), self.root));
                let rendered = run_component(&instance, comp);
                let child = self.mount(&rendered, parent, anchor)?;
                instance.take_effects(&mut self.effects);
                Ok(Binding::Component(ComponentBinding {
                    instance,
                    rendered,
                    child: Box::new(child),
                }))
            }
        }
    }

    fn unmount(&mut self, old: &VNode, binding: Binding) -> Result<(), DomError> {
        let node = binding_node(&binding);
        release(Some(old), binding);
        self.document.remove(node)
    }

    fn reconcile_children(
        &mut self,
        parent: NodeId,
        old_children: &[VNode],
        old_bindings: Vec<Binding>,
        new_children: &[VNode],
    ) -> Result<Vec<Binding>, DomError> {
        debug_assert_eq!(old_children.len(), old_bindings.len());
        let mut old_slots: Vec<Option<(&VNode, Binding)>> = old_children
            .iter()
            .zip(old_bindings)
            .map(Some)
            .collect();

        let mut keyed: HashMap<&Key, usize> = HashMap::new();
        let mut unkeyed: VecDeque<usize> = VecDeque::new();
        for (index, child) in old_children.iter().enumerate() {
            match child.key() {
                Some(key) => {
                    if keyed.insert(key, index).is_some() {
                        log::warn!("duplicate key {key:?} among children of node {parent}");
                    }
                }
                None => unkeyed.push_back(index),
            }
        }

        let mut seen: HashSet<&Key> = HashSet::new();
        let mut next = Vec::with_capacity(new_children.len());
        let mut last_reused: Option<usize> = None;
        let mut prev_node: Option<NodeId> = None;

        for new_child in new_children {
            let matched = match new_child.key() {
                Some(key) => {
                    if !seen.insert(key) {
                        log::warn!("duplicate key {key:?} among children of node {parent}");
                    }
                    keyed.remove(key)
                }
                None => unkeyed.pop_front(),
            };

            // Where a fresh or repositioned node goes: right after the
            // previously placed sibling. Stale old nodes may still sit
            // there; they are only removed after the walk.
            let anchor = match prev_node {
                Some(prev) => self.document.next_sibling(prev)?,
                None => self.document.first_child(parent)?,
            };

            let binding = match matched.and_then(|index| old_slots[index].take().map(|pair| (index, pair))) {
                Some((old_index, (old_vnode, old_binding))) => {
                    let moved = matches!(last_reused, Some(last) if old_index < last);
                    last_reused = Some(last_reused.map_or(old_index, |last| last.max(old_index)));
                    let binding =
                        self.reconcile(Some((old_vnode, old_binding)), new_child, parent, anchor)?;
                    if moved {
                        let node = binding_node(&binding);
                        if anchor != Some(node) {
                            log::trace!("move child {node} within parent {parent}");
                            self.document.insert_before(parent, node, anchor)?;
                        }
                    }
                    binding
                }
                None => self.mount(new_child, parent, anchor)?,
            };

            prev_node = Some(binding_node(&binding));
            next.push(binding);
        }

        for slot in old_slots {
            if let Some((old_vnode, old_binding)) = slot {
                self.unmount(old_vnode, old_binding)?;
            }
        }

        Ok(next)
    }
}

fn run_component(instance: &Rc<ComponentInstance>, vnode: &VComponent) -> VNode {
    instance.begin_render();
    let mut scope = Scope::new(instance);
    let rendered = (vnode.func)(&mut scope, &vnode.props, &vnode.children);
    instance.end_render();
    rendered
}

/// Recursive non-host teardown of an unmounting subtree: clear node refs
/// and run component effect cleanups (a component's subtree before the
/// component itself). Host removal happens once, at the subtree root.
fn release(old: Option<&VNode>, binding: Binding) {
    match binding {
        Binding::Text(_) => {}
        Binding::Element(element) => {
            let vnode = match old {
                Some(VNode::Element(el)) => Some(el),
                _ => None,
            };
            if let Some(node_ref) = vnode.and_then(|el| el.node_ref.as_ref()) {
                node_ref.set(None);
            }
            let child_vnodes = vnode.map(|el| el.children.as_slice()).unwrap_or_default();
            for (index, child) in element.children.into_iter().enumerate() {
                release(child_vnodes.get(index), child);
            }
        }
        Binding::Component(component) => {
            let ComponentBinding {
                instance,
                rendered,
                child,
            } = component;
            release(Some(&rendered), *child);
            instance.teardown();
        }
    }
}

fn sync_node_ref(old: Option<&NodeRef>, new: Option<&NodeRef>, node: NodeId) {
    match (old, new) {
        (Some(old_ref), Some(new_ref)) if old_ref == new_ref => {}
        (Some(old_ref), Some(new_ref)) => {
            old_ref.set(None);
            new_ref.set(Some(node));
        }
        (Some(old_ref), None) => old_ref.set(None),
        (None, Some(new_ref)) => new_ref.set(Some(node)),
        (None, None) => {}
    }
}

#[cfg(test)]
#[path = "tests/reconciler_tests.rs"]
mod tests;
