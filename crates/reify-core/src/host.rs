//! In-memory host tree.
//!
//! The engine renders into a [`Document`]: an id-indexed store of element
//! and text nodes with the small mutation surface the reconciler needs.
//! Node ids are never reused, so tests can assert that a reconciled node is
//! the same node and not a lookalike. Every mutating call bumps a counter,
//! which makes "this re-render touched nothing" directly observable.

use std::cell::RefCell;
use std::rc::Rc;

use hashbrown::HashMap;
use indexmap::IndexMap;

use crate::error::DomError;
use crate::props::EventHandler;

pub type NodeId = usize;

/// Payload delivered to event listeners.
#[derive(Clone, Debug)]
pub struct Event {
    pub name: String,
    pub target: NodeId,
}

/// Typed value stored in an element's property table.
///
/// Properties keep their host type, unlike attributes which are plain
/// strings. `defaultChecked = true` reads back as `Bool(true)`, not `"true"`.
#[derive(Clone, Debug, PartialEq)]
pub enum PropertyValue {
    Str(String),
    Bool(bool),
    Int(i64),
    Float(f64),
}

struct ElementData {
    tag: String,
    attributes: IndexMap<String, String>,
    properties: IndexMap<String, PropertyValue>,
    listeners: HashMap<String, EventHandler>,
    children: Vec<NodeId>,
}

struct TextData {
    value: String,
}

enum HostNodeKind {
    Element(ElementData),
    Text(TextData),
}

struct HostNode {
    parent: Option<NodeId>,
    kind: HostNodeKind,
}

struct DocumentInner {
    nodes: Vec<Option<HostNode>>, // slots stay occupied forever; ids are never handed out twice
    body: NodeId,
    mutations: u64,
}

/// Shared handle to the host tree.
///
/// Cloning is cheap and every clone sees the same tree. All methods take
/// `&self`; interior mutability keeps the handle usable from event handlers
/// and effects without threading `&mut` through the engine.
#[derive(Clone)]
pub struct Document {
    inner: Rc<RefCell<DocumentInner>>,
}

impl Document {
    pub fn new() -> Self {
        let body = HostNode {
            parent: None,
            kind: HostNodeKind::Element(ElementData {
                tag: "body".to_string(),
                attributes: IndexMap::new(),
                properties: IndexMap::new(),
                listeners: HashMap::new(),
                children: Vec::new(),
            }),
        };
        Self {
            inner: Rc::new(RefCell::new(DocumentInner {
                nodes: vec![Some(body)],
                body: 0,
                mutations: 0,
            })),
        }
    }

    /// The pre-created root container every fresh document carries.
    pub fn body(&self) -> NodeId {
        self.inner.borrow().body
    }

    pub fn create_element(&self, tag: &str) -> NodeId {
        let mut inner = self.inner.borrow_mut();
        inner.mutations += 1;
        inner.push_node(HostNode {
            parent: None,
            kind: HostNodeKind::Element(ElementData {
                tag: tag.to_string(),
                attributes: IndexMap::new(),
                properties: IndexMap::new(),
                listeners: HashMap::new(),
                children: Vec::new(),
            }),
        })
    }

    pub fn create_text(&self, value: &str) -> NodeId {
        let mut inner = self.inner.borrow_mut();
        inner.mutations += 1;
        inner.push_node(HostNode {
            parent: None,
            kind: HostNodeKind::Text(TextData {
                value: value.to_string(),
            }),
        })
    }

    pub fn set_text(&self, id: NodeId, value: &str) -> Result<(), DomError> {
        let mut inner = self.inner.borrow_mut();
        inner.text_mut(id)?.value = value.to_string();
        inner.mutations += 1;
        Ok(())
    }

    pub fn set_attribute(&self, id: NodeId, name: &str, value: &str) -> Result<(), DomError> {
        let mut inner = self.inner.borrow_mut();
        inner
            .element_mut(id)?
            .attributes
            .insert(name.to_string(), value.to_string());
        inner.mutations += 1;
        Ok(())
    }

    pub fn remove_attribute(&self, id: NodeId, name: &str) -> Result<(), DomError> {
        let mut inner = self.inner.borrow_mut();
        inner.element_mut(id)?.attributes.shift_remove(name);
        inner.mutations += 1;
        Ok(())
    }

    pub fn set_property(
        &self,
        id: NodeId,
        name: &str,
        value: PropertyValue,
    ) -> Result<(), DomError> {
        let mut inner = self.inner.borrow_mut();
        inner
            .element_mut(id)?
            .properties
            .insert(name.to_string(), value);
        inner.mutations += 1;
        Ok(())
    }

    pub fn remove_property(&self, id: NodeId, name: &str) -> Result<(), DomError> {
        let mut inner = self.inner.borrow_mut();
        inner.element_mut(id)?.properties.shift_remove(name);
        inner.mutations += 1;
        Ok(())
    }

    /// Bind `handler` as the single listener for `event` on the node.
    /// A previously bound listener for the same event is replaced.
    pub fn add_listener(
        &self,
        id: NodeId,
        event: &str,
        handler: EventHandler,
    ) -> Result<(), DomError> {
        let mut inner = self.inner.borrow_mut();
        inner
            .element_mut(id)?
            .listeners
            .insert(event.to_string(), handler);
        inner.mutations += 1;
        Ok(())
    }

    pub fn remove_listener(&self, id: NodeId, event: &str) -> Result<(), DomError> {
        let mut inner = self.inner.borrow_mut();
        inner.element_mut(id)?.listeners.remove(event);
        inner.mutations += 1;
        Ok(())
    }

    pub fn has_listener(&self, id: NodeId, event: &str) -> Result<bool, DomError> {
        let inner = self.inner.borrow();
        Ok(inner.element(id)?.listeners.contains_key(event))
    }

    /// Place `node` as a child of `parent`, immediately before `anchor`
    /// (or at the end when `anchor` is `None`).
    ///
    /// A node that already sits somewhere in the tree is detached first, so
    /// this is also the move primitive; the node keeps its id, listeners,
    /// and subtree.
    pub fn insert_before(
        &self,
        parent: NodeId,
        node: NodeId,
        anchor: Option<NodeId>,
    ) -> Result<(), DomError> {
        debug_assert!(anchor != Some(node), "node cannot anchor itself");
        let mut inner = self.inner.borrow_mut();
        inner.detach(node)?;
        {
            let element = inner.element_mut(parent)?;
            let position = match anchor {
                Some(anchor_id) => element
                    .children
                    .iter()
                    .position(|child| *child == anchor_id)
                    .ok_or(DomError::Missing { id: anchor_id })?,
                None => element.children.len(),
            };
            element.children.insert(position, node);
        }
        inner.node_mut(node)?.parent = Some(parent);
        inner.mutations += 1;
        Ok(())
    }

    /// Detach the node from its parent and drop its whole subtree.
    pub fn remove(&self, id: NodeId) -> Result<(), DomError> {
        let mut inner = self.inner.borrow_mut();
        inner.detach(id)?;
        inner.drop_subtree(id);
        inner.mutations += 1;
        log::trace!("removed node {id}");
        Ok(())
    }

    pub fn parent(&self, id: NodeId) -> Result<Option<NodeId>, DomError> {
        Ok(self.inner.borrow().node(id)?.parent)
    }

    pub fn children(&self, id: NodeId) -> Result<Vec<NodeId>, DomError> {
        Ok(self.inner.borrow().element(id)?.children.clone())
    }

    pub fn child_at(&self, id: NodeId, index: usize) -> Result<Option<NodeId>, DomError> {
        Ok(self.inner.borrow().element(id)?.children.get(index).copied())
    }

    pub fn first_child(&self, id: NodeId) -> Result<Option<NodeId>, DomError> {
        self.child_at(id, 0)
    }

    pub fn next_sibling(&self, id: NodeId) -> Result<Option<NodeId>, DomError> {
        let inner = self.inner.borrow();
        let parent = match inner.node(id)?.parent {
            Some(parent) => parent,
            None => return Ok(None),
        };
        let siblings = &inner.element(parent)?.children;
        let position = siblings.iter().position(|child| *child == id);
        Ok(position.and_then(|index| siblings.get(index + 1).copied()))
    }

    pub fn tag_name(&self, id: NodeId) -> Result<String, DomError> {
        Ok(self.inner.borrow().element(id)?.tag.clone())
    }

    pub fn text_value(&self, id: NodeId) -> Result<String, DomError> {
        Ok(self.inner.borrow().text(id)?.value.clone())
    }

    pub fn attribute(&self, id: NodeId, name: &str) -> Result<Option<String>, DomError> {
        Ok(self.inner.borrow().element(id)?.attributes.get(name).cloned())
    }

    pub fn property(&self, id: NodeId, name: &str) -> Result<Option<PropertyValue>, DomError> {
        Ok(self.inner.borrow().element(id)?.properties.get(name).cloned())
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        self.inner
            .borrow()
            .node(id)
            .map(|node| matches!(node.kind, HostNodeKind::Element(_)))
            .unwrap_or(false)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.inner.borrow().node(id).is_ok()
    }

    /// Whether `name` is a typed object property on elements with this tag,
    /// as opposed to a string attribute. The table mirrors the form-control
    /// properties the engine cares about.
    pub fn is_property(tag: &str, name: &str) -> bool {
        matches!(
            (tag, name),
            ("input", "value" | "checked" | "defaultChecked" | "defaultValue" | "disabled")
                | ("textarea", "value" | "disabled")
                | ("select", "value" | "disabled")
                | ("option", "selected" | "disabled")
                | ("button", "disabled")
        )
    }

    /// Fire the listener bound for `event` on `target`, if any.
    ///
    /// Returns whether a listener ran. There are no capture or bubble
    /// phases; dispatch hits exactly the target node.
    pub fn dispatch(&self, target: NodeId, event: &str) -> Result<bool, DomError> {
        let handler = {
            let inner = self.inner.borrow();
            inner.element(target)?.listeners.get(event).cloned()
        };
        match handler {
            Some(handler) => {
                log::trace!("dispatch {event} on node {target}");
                handler.call(&Event {
                    name: event.to_string(),
                    target,
                });
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Serialized markup of the node's children.
    pub fn inner_html(&self, id: NodeId) -> Result<String, DomError> {
        let inner = self.inner.borrow();
        let mut out = String::new();
        for child in &inner.element(id)?.children {
            inner.write_node(*child, &mut out)?;
        }
        Ok(out)
    }

    /// Serialized markup of the node itself, attributes included.
    /// Properties and listeners are not part of markup.
    pub fn outer_html(&self, id: NodeId) -> Result<String, DomError> {
        let inner = self.inner.borrow();
        let mut out = String::new();
        inner.write_node(id, &mut out)?;
        Ok(out)
    }

    /// Total count of mutating calls performed against this document.
    pub fn mutation_count(&self) -> u64 {
        self.inner.borrow().mutations
    }

    /// Number of live nodes, the body included.
    pub fn node_count(&self) -> usize {
        self.inner
            .borrow()
            .nodes
            .iter()
            .filter(|slot| slot.is_some())
            .count()
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentInner {
    fn push_node(&mut self, node: HostNode) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(Some(node));
        id
    }

    fn node(&self, id: NodeId) -> Result<&HostNode, DomError> {
        self.nodes
            .get(id)
            .and_then(|slot| slot.as_ref())
            .ok_or(DomError::Missing { id })
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut HostNode, DomError> {
        self.nodes
            .get_mut(id)
            .and_then(|slot| slot.as_mut())
            .ok_or(DomError::Missing { id })
    }

    fn element(&self, id: NodeId) -> Result<&ElementData, DomError> {
        match &self.node(id)?.kind {
            HostNodeKind::Element(element) => Ok(element),
            HostNodeKind::Text(_) => Err(DomError::KindMismatch {
                id,
                expected: "element",
            }),
        }
    }

    fn element_mut(&mut self, id: NodeId) -> Result<&mut ElementData, DomError> {
        match &mut self.node_mut(id)?.kind {
            HostNodeKind::Element(element) => Ok(element),
            HostNodeKind::Text(_) => Err(DomError::KindMismatch {
                id,
                expected: "element",
            }),
        }
    }

    fn text(&self, id: NodeId) -> Result<&TextData, DomError> {
        match &self.node(id)?.kind {
            HostNodeKind::Text(text) => Ok(text),
            HostNodeKind::Element(_) => Err(DomError::KindMismatch {
                id,
                expected: "text",
            }),
        }
    }

    fn text_mut(&mut self, id: NodeId) -> Result<&mut TextData, DomError> {
        match &mut self.node_mut(id)?.kind {
            HostNodeKind::Text(text) => Ok(text),
            HostNodeKind::Element(_) => Err(DomError::KindMismatch {
                id,
                expected: "text",
            }),
        }
    }

    fn detach(&mut self, id: NodeId) -> Result<(), DomError> {
        let parent = self.node(id)?.parent;
        if let Some(parent_id) = parent {
            if let Ok(element) = self.element_mut(parent_id) {
                element.children.retain(|child| *child != id);
            }
            self.node_mut(id)?.parent = None;
        }
        Ok(())
    }

    fn drop_subtree(&mut self, id: NodeId) {
        let children = match self.nodes.get_mut(id).and_then(|slot| slot.take()) {
            Some(node) => match node.kind {
                HostNodeKind::Element(element) => element.children,
                HostNodeKind::Text(_) => Vec::new(),
            },
            None => return,
        };
        for child in children {
            self.drop_subtree(child);
        }
    }

    fn write_node(&self, id: NodeId, out: &mut String) -> Result<(), DomError> {
        match &self.node(id)?.kind {
            HostNodeKind::Text(text) => escape_text(&text.value, out),
            HostNodeKind::Element(element) => {
                out.push('<');
                out.push_str(&element.tag);
                for (name, value) in &element.attributes {
                    out.push(' ');
                    out.push_str(name);
                    out.push_str("=\"");
                    escape_attribute(value, out);
                    out.push('"');
                }
                out.push('>');
                if is_void_tag(&element.tag) {
                    return Ok(());
                }
                for child in &element.children {
                    self.write_node(*child, out)?;
                }
                out.push_str("</");
                out.push_str(&element.tag);
                out.push('>');
            }
        }
        Ok(())
    }
}

// HTML void elements never take children or a closing tag.
fn is_void_tag(tag: &str) -> bool {
    matches!(
        tag,
        "area"
            | "base"
            | "br"
            | "col"
            | "embed"
            | "hr"
            | "img"
            | "input"
            | "link"
            | "meta"
            | "source"
            | "track"
            | "wbr"
    )
}

fn escape_text(value: &str, out: &mut String) {
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(ch),
        }
    }
}

fn escape_attribute(value: &str, out: &mut String) {
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
}
