//! Virtual node model.
//!
//! A [`VNode`] is an immutable description of desired output: a text run,
//! an element with props and children, or a component invocation. Trees
//! are plain data, cheap to clone and compare, and a new tree is built on
//! every render; the reconciler owns all diffing.
//!
//! [`create`] is the raw constructor with the `key`/`ref` extraction
//! semantics; [`el`], [`text`] and [`component`] are the builder layer
//! most call sites want.

use crate::hooks::{NodeRef, Scope};
use crate::host::Event;
use crate::props::{EventHandler, PropValue, Props};

/// Component factory: a plain function from scope, props, and children to
/// a rendered tree. Function identity (the pointer) is what the reconciler
/// matches on when deciding whether an instance is reusable.
pub type ComponentFn = fn(&mut Scope, &Props, &[VNode]) -> VNode;

/// Sibling identity for list reconciliation. Keys of different variants
/// never match each other.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Key {
    Int(i64),
    Str(String),
}

impl From<i32> for Key {
    fn from(value: i32) -> Self {
        Key::Int(value as i64)
    }
}

impl From<i64> for Key {
    fn from(value: i64) -> Self {
        Key::Int(value)
    }
}

impl From<&str> for Key {
    fn from(value: &str) -> Self {
        Key::Str(value.to_string())
    }
}

impl From<String> for Key {
    fn from(value: String) -> Self {
        Key::Str(value)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct VElement {
    pub tag: String,
    pub props: Props,
    pub children: Vec<VNode>,
    pub key: Option<Key>,
    pub node_ref: Option<NodeRef>,
}

#[derive(Clone, Debug)]
pub struct VComponent {
    pub func: ComponentFn,
    pub props: Props,
    pub children: Vec<VNode>,
    pub key: Option<Key>,
}

impl PartialEq for VComponent {
    fn eq(&self, other: &Self) -> bool {
        self.func == other.func
            && self.key == other.key
            && self.props == other.props
            && self.children == other.children
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum VNode {
    Text(String),
    Element(VElement),
    Component(VComponent),
}

impl VNode {
    pub fn key(&self) -> Option<&Key> {
        match self {
            VNode::Text(_) => None,
            VNode::Element(element) => element.key.as_ref(),
            VNode::Component(component) => component.key.as_ref(),
        }
    }
}

impl From<&str> for VNode {
    fn from(value: &str) -> Self {
        VNode::Text(value.to_string())
    }
}

impl From<String> for VNode {
    fn from(value: String) -> Self {
        VNode::Text(value)
    }
}

impl From<i32> for VNode {
    fn from(value: i32) -> Self {
        VNode::Text(value.to_string())
    }
}

impl From<i64> for VNode {
    fn from(value: i64) -> Self {
        VNode::Text(value.to_string())
    }
}

impl From<usize> for VNode {
    fn from(value: usize) -> Self {
        VNode::Text(value.to_string())
    }
}

/// What [`create`] is building: a host element by tag, or a component by
/// factory function.
pub enum CreateKind {
    Tag(String),
    Func(ComponentFn),
}

impl From<&str> for CreateKind {
    fn from(value: &str) -> Self {
        CreateKind::Tag(value.to_string())
    }
}

impl From<String> for CreateKind {
    fn from(value: String) -> Self {
        CreateKind::Tag(value)
    }
}

impl From<ComponentFn> for CreateKind {
    fn from(value: ComponentFn) -> Self {
        CreateKind::Func(value)
    }
}

/// Build a virtual node from a kind, props, and children.
///
/// The reserved `key` and `ref` props are pulled out of the map into their
/// side channels and never reach the host node. A `ref` on a component has
/// no meaning and is dropped with a warning.
pub fn create(kind: impl Into<CreateKind>, mut props: Props, children: Vec<VNode>) -> VNode {
    let key = take_key(&mut props);
    match kind.into() {
        CreateKind::Tag(tag) => {
            let node_ref = take_node_ref(&mut props);
            VNode::Element(VElement {
                tag,
                props,
                children,
                key,
                node_ref,
            })
        }
        CreateKind::Func(func) => {
            if take_node_ref(&mut props).is_some() {
                log::warn!("ref prop on a component has no effect; dropping it");
            }
            VNode::Component(VComponent {
                func,
                props,
                children,
                key,
            })
        }
    }
}

fn take_key(props: &mut Props) -> Option<Key> {
    match props.shift_remove("key") {
        Some(PropValue::Int(value)) => Some(Key::Int(value)),
        Some(PropValue::Str(value)) => Some(Key::Str(value)),
        Some(other) => {
            log::warn!("ignoring key of unsupported kind: {other:?}");
            None
        }
        None => None,
    }
}

fn take_node_ref(props: &mut Props) -> Option<NodeRef> {
    match props.shift_remove("ref") {
        Some(PropValue::Ref(node_ref)) => Some(node_ref),
        Some(other) => {
            log::warn!("ignoring ref of unsupported kind: {other:?}");
            None
        }
        None => None,
    }
}

/// Text node from anything stringly.
pub fn text(value: impl Into<String>) -> VNode {
    VNode::Text(value.into())
}

/// Start building an element.
pub fn el(tag: impl Into<String>) -> ElementBuilder {
    ElementBuilder {
        tag: tag.into(),
        props: Props::new(),
        children: Vec::new(),
        key: None,
        node_ref: None,
    }
}

/// Start building a component invocation.
pub fn component(func: ComponentFn) -> ComponentBuilder {
    ComponentBuilder {
        func,
        props: Props::new(),
        children: Vec::new(),
        key: None,
    }
}

pub struct ElementBuilder {
    tag: String,
    props: Props,
    children: Vec<VNode>,
    key: Option<Key>,
    node_ref: Option<NodeRef>,
}

impl ElementBuilder {
    pub fn attr(mut self, name: impl Into<String>, value: impl Into<PropValue>) -> Self {
        self.props.insert(name.into(), value.into());
        self
    }

    /// Bind a fresh closure as the listener for `event` (named without the
    /// `on` prefix). Each call builds a new handler identity; use
    /// [`listener`](Self::listener) to reuse a stored one across renders.
    pub fn on(self, event: impl Into<String>, handler: impl Fn(&Event) + 'static) -> Self {
        self.listener(event, EventHandler::new(handler))
    }

    pub fn listener(mut self, event: impl Into<String>, handler: EventHandler) -> Self {
        let name = format!("on{}", event.into());
        self.props.insert(name, PropValue::Handler(handler));
        self
    }

    pub fn key(mut self, key: impl Into<Key>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn node_ref(mut self, node_ref: &NodeRef) -> Self {
        self.node_ref = Some(node_ref.clone());
        self
    }

    pub fn child(mut self, child: impl Into<VNode>) -> Self {
        self.children.push(child.into());
        self
    }

    pub fn maybe_child(mut self, child: Option<impl Into<VNode>>) -> Self {
        if let Some(child) = child {
            self.children.push(child.into());
        }
        self
    }

    pub fn children<I, V>(mut self, children: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<VNode>,
    {
        self.children.extend(children.into_iter().map(Into::into));
        self
    }

    pub fn build(self) -> VNode {
        VNode::Element(VElement {
            tag: self.tag,
            props: self.props,
            children: self.children,
            key: self.key,
            node_ref: self.node_ref,
        })
    }
}

impl From<ElementBuilder> for VNode {
    fn from(builder: ElementBuilder) -> Self {
        builder.build()
    }
}

pub struct ComponentBuilder {
    func: ComponentFn,
    props: Props,
    children: Vec<VNode>,
    key: Option<Key>,
}

impl ComponentBuilder {
    pub fn prop(mut self, name: impl Into<String>, value: impl Into<PropValue>) -> Self {
        self.props.insert(name.into(), value.into());
        self
    }

    pub fn key(mut self, key: impl Into<Key>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn child(mut self, child: impl Into<VNode>) -> Self {
        self.children.push(child.into());
        self
    }

    pub fn children<I, V>(mut self, children: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<VNode>,
    {
        self.children.extend(children.into_iter().map(Into::into));
        self
    }

    pub fn build(self) -> VNode {
        VNode::Component(VComponent {
            func: self.func,
            props: self.props,
            children: self.children,
            key: self.key,
        })
    }
}

impl From<ComponentBuilder> for VNode {
    fn from(builder: ComponentBuilder) -> Self {
        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop(_scope: &mut Scope, _props: &Props, _children: &[VNode]) -> VNode {
        text("")
    }

    #[test]
    fn create_extracts_key_and_ref_from_props() {
        let node_ref = NodeRef::new(None);
        let mut props = Props::new();
        props.insert("key".to_string(), PropValue::Int(4));
        props.insert("ref".to_string(), PropValue::Ref(node_ref.clone()));
        props.insert("class".to_string(), PropValue::from("x"));

        let node = create("div", props, vec![]);
        let VNode::Element(element) = node else {
            panic!("expected element");
        };
        assert_eq!(element.key, Some(Key::Int(4)));
        assert_eq!(element.node_ref, Some(node_ref));
        assert_eq!(element.props.len(), 1);
        assert!(element.props.contains_key("class"));
    }

    #[test]
    fn create_builds_components_from_factories() {
        let mut props = Props::new();
        props.insert("key".to_string(), PropValue::from("a"));
        let node = create(noop as ComponentFn, props, vec![text("child")]);
        let VNode::Component(component) = node else {
            panic!("expected component");
        };
        assert_eq!(component.key, Some(Key::Str("a".to_string())));
        assert_eq!(component.children.len(), 1);
    }

    #[test]
    fn builders_nest_and_coerce_children() {
        let shown = true;
        let node: VNode = el("ul")
            .children((1..=2).map(|n| el("li").key(n).child(n)))
            .maybe_child(shown.then(|| el("li").child("tail")))
            .build();

        let VNode::Element(ul) = node else {
            panic!("expected element");
        };
        assert_eq!(ul.children.len(), 3);
        assert_eq!(ul.children[0].key(), Some(&Key::Int(1)));
        let VNode::Element(li) = &ul.children[0] else {
            panic!("expected li");
        };
        assert_eq!(li.children[0], VNode::Text("1".to_string()));
    }

    #[test]
    fn keys_of_different_variants_never_match() {
        assert_ne!(Key::Int(1), Key::Str("1".to_string()));
        assert_eq!(Key::from("a"), Key::Str("a".to_string()));
    }

    #[test]
    fn component_equality_is_factory_identity() {
        fn other(_scope: &mut Scope, _props: &Props, _children: &[VNode]) -> VNode {
            text("")
        }
        let a = component(noop).build();
        let b = component(noop).build();
        let c = component(other).build();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
