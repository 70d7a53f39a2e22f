//! Prop values and the property/attribute applier.
//!
//! Props are an ordered name/value map on every virtual element. Applying
//! them to a host node is a per-node diff: names absent from the new props
//! are removed, changed values are rewritten, everything else is left
//! untouched. Where a value lands depends on its kind and name:
//!
//! - handler values bind as event listeners (`onClick` -> `click`),
//! - names the host declares as typed properties for the tag are written to
//!   the property table,
//! - everything else becomes a string attribute.

use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::error::DomError;
use crate::hooks::NodeRef;
use crate::host::{Document, Event, NodeId, PropertyValue};

/// Ordered prop map of a virtual element or component.
pub type Props = IndexMap<String, PropValue>;

/// Shared event callback. Equality is pointer identity: a handler compares
/// equal only to clones of itself, which is what lets the applier skip
/// rebinding an unchanged listener across re-renders.
#[derive(Clone)]
pub struct EventHandler {
    callback: Rc<dyn Fn(&Event)>,
}

impl EventHandler {
    pub fn new(callback: impl Fn(&Event) + 'static) -> Self {
        Self {
            callback: Rc::new(callback),
        }
    }

    pub fn call(&self, event: &Event) {
        (self.callback)(event);
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.callback, &other.callback)
    }
}

impl PartialEq for EventHandler {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for EventHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("EventHandler(..)")
    }
}

/// A single prop value.
///
/// `Handler` and `Ref` are compared by pointer; the rest by value. `Ref`
/// only ever travels through [`crate::vnode::create`], which extracts it to
/// the element's ref channel; the applier never writes it to the host.
#[derive(Clone, Debug)]
pub enum PropValue {
    Str(String),
    Bool(bool),
    Int(i64),
    Float(f64),
    Handler(EventHandler),
    Ref(NodeRef),
}

impl PartialEq for PropValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (PropValue::Str(a), PropValue::Str(b)) => a == b,
            (PropValue::Bool(a), PropValue::Bool(b)) => a == b,
            (PropValue::Int(a), PropValue::Int(b)) => a == b,
            (PropValue::Float(a), PropValue::Float(b)) => a == b,
            (PropValue::Handler(a), PropValue::Handler(b)) => a.ptr_eq(b),
            (PropValue::Ref(a), PropValue::Ref(b)) => a == b,
            _ => false,
        }
    }
}

impl PropValue {
    fn as_property(&self) -> Option<PropertyValue> {
        match self {
            PropValue::Str(value) => Some(PropertyValue::Str(value.clone())),
            PropValue::Bool(value) => Some(PropertyValue::Bool(*value)),
            PropValue::Int(value) => Some(PropertyValue::Int(*value)),
            PropValue::Float(value) => Some(PropertyValue::Float(*value)),
            PropValue::Handler(_) | PropValue::Ref(_) => None,
        }
    }

    fn as_attribute_text(&self) -> Option<String> {
        match self {
            PropValue::Str(value) => Some(value.clone()),
            PropValue::Bool(value) => Some(value.to_string()),
            PropValue::Int(value) => Some(value.to_string()),
            PropValue::Float(value) => Some(value.to_string()),
            PropValue::Handler(_) | PropValue::Ref(_) => None,
        }
    }

    fn is_handler(&self) -> bool {
        matches!(self, PropValue::Handler(_))
    }
}

impl From<&str> for PropValue {
    fn from(value: &str) -> Self {
        PropValue::Str(value.to_string())
    }
}

impl From<String> for PropValue {
    fn from(value: String) -> Self {
        PropValue::Str(value)
    }
}

impl From<bool> for PropValue {
    fn from(value: bool) -> Self {
        PropValue::Bool(value)
    }
}

impl From<i32> for PropValue {
    fn from(value: i32) -> Self {
        PropValue::Int(value as i64)
    }
}

impl From<i64> for PropValue {
    fn from(value: i64) -> Self {
        PropValue::Int(value)
    }
}

impl From<f64> for PropValue {
    fn from(value: f64) -> Self {
        PropValue::Float(value)
    }
}

impl From<EventHandler> for PropValue {
    fn from(value: EventHandler) -> Self {
        PropValue::Handler(value)
    }
}

impl From<NodeRef> for PropValue {
    fn from(value: NodeRef) -> Self {
        PropValue::Ref(value)
    }
}

impl From<&NodeRef> for PropValue {
    fn from(value: &NodeRef) -> Self {
        PropValue::Ref(value.clone())
    }
}

/// Listener event name for a handler prop: `onClick`/`onclick` -> `click`.
fn event_name(name: &str) -> String {
    name.strip_prefix("on").unwrap_or(name).to_ascii_lowercase()
}

/// Diff `old` against `new` and apply the difference to one host node.
///
/// Unchanged values are skipped entirely; for handlers "unchanged" means
/// pointer-equal, so a stored callback survives re-renders without a
/// rebind. A value whose kind flips between handler and data is removed
/// from its old table before the new value is written.
pub fn apply_props(
    document: &Document,
    node: NodeId,
    old: &Props,
    new: &Props,
) -> Result<(), DomError> {
    let tag = document.tag_name(node)?;

    for (name, old_value) in old {
        let keep = new
            .get(name)
            .is_some_and(|new_value| new_value.is_handler() == old_value.is_handler());
        if !keep {
            remove_prop(document, node, &tag, name, old_value)?;
        }
    }

    for (name, new_value) in new {
        if old.get(name) == Some(new_value) {
            continue;
        }
        set_prop(document, node, &tag, name, new_value)?;
    }

    Ok(())
}

fn set_prop(
    document: &Document,
    node: NodeId,
    tag: &str,
    name: &str,
    value: &PropValue,
) -> Result<(), DomError> {
    match value {
        PropValue::Handler(handler) => {
            document.add_listener(node, &event_name(name), handler.clone())
        }
        PropValue::Ref(_) => {
            log::warn!("ref must be passed via create(); ignoring prop {name:?} on node {node}");
            Ok(())
        }
        other => {
            if Document::is_property(tag, name) {
                if let Some(property) = other.as_property() {
                    document.set_property(node, name, property)?;
                }
            } else if let Some(text) = other.as_attribute_text() {
                document.set_attribute(node, name, &text)?;
            }
            Ok(())
        }
    }
}

fn remove_prop(
    document: &Document,
    node: NodeId,
    tag: &str,
    name: &str,
    old_value: &PropValue,
) -> Result<(), DomError> {
    match old_value {
        PropValue::Handler(_) => document.remove_listener(node, &event_name(name)),
        PropValue::Ref(_) => Ok(()),
        _ => {
            if Document::is_property(tag, name) {
                document.remove_property(node, name)
            } else {
                document.remove_attribute(node, name)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn props(entries: Vec<(&str, PropValue)>) -> Props {
        entries
            .into_iter()
            .map(|(name, value)| (name.to_string(), value))
            .collect()
    }

    #[test]
    fn applies_attributes_properties_and_listeners() {
        let document = Document::new();
        let input = document.create_element("input");
        let clicks = Rc::new(Cell::new(0));
        let handler = {
            let clicks = Rc::clone(&clicks);
            EventHandler::new(move |_| clicks.set(clicks.get() + 1))
        };

        let new = props(vec![
            ("type", PropValue::from("checkbox")),
            ("defaultChecked", PropValue::from(true)),
            ("onClick", PropValue::Handler(handler)),
        ]);
        apply_props(&document, input, &Props::new(), &new).expect("apply");

        assert_eq!(
            document.attribute(input, "type").expect("read"),
            Some("checkbox".to_string())
        );
        assert_eq!(
            document.property(input, "defaultChecked").expect("read"),
            Some(PropertyValue::Bool(true))
        );
        assert!(document.dispatch(input, "click").expect("dispatch"));
        assert_eq!(clicks.get(), 1);
    }

    #[test]
    fn removes_entries_absent_from_new_props() {
        let document = Document::new();
        let input = document.create_element("input");
        let old = props(vec![
            ("type", PropValue::from("checkbox")),
            ("checked", PropValue::from(true)),
            ("onClick", PropValue::Handler(EventHandler::new(|_| {}))),
        ]);
        apply_props(&document, input, &Props::new(), &old).expect("mount");

        apply_props(&document, input, &old, &Props::new()).expect("clear");

        assert_eq!(document.attribute(input, "type").expect("read"), None);
        assert_eq!(document.property(input, "checked").expect("read"), None);
        assert!(!document.has_listener(input, "click").expect("read"));
    }

    #[test]
    fn pointer_equal_handler_is_not_rebound() {
        let document = Document::new();
        let div = document.create_element("div");
        let handler = EventHandler::new(|_| {});
        let old = props(vec![("onClick", PropValue::Handler(handler.clone()))]);
        apply_props(&document, div, &Props::new(), &old).expect("mount");

        let before = document.mutation_count();
        let new = props(vec![("onClick", PropValue::Handler(handler))]);
        apply_props(&document, div, &old, &new).expect("rerender");

        assert_eq!(document.mutation_count(), before);
    }

    #[test]
    fn fresh_handler_instance_rebinds() {
        let document = Document::new();
        let div = document.create_element("div");
        let old = props(vec![("onClick", PropValue::Handler(EventHandler::new(|_| {})))]);
        apply_props(&document, div, &Props::new(), &old).expect("mount");

        let before = document.mutation_count();
        let new = props(vec![("onClick", PropValue::Handler(EventHandler::new(|_| {})))]);
        apply_props(&document, div, &old, &new).expect("rerender");

        assert_eq!(document.mutation_count() - before, 1);
    }

    #[test]
    fn kind_flip_removes_from_the_old_table() {
        let document = Document::new();
        let div = document.create_element("div");
        let old = props(vec![("onClick", PropValue::from("shout"))]);
        apply_props(&document, div, &Props::new(), &old).expect("mount");
        assert_eq!(
            document.attribute(div, "onClick").expect("read"),
            Some("shout".to_string())
        );

        let new = props(vec![("onClick", PropValue::Handler(EventHandler::new(|_| {})))]);
        apply_props(&document, div, &old, &new).expect("flip");

        assert_eq!(document.attribute(div, "onClick").expect("read"), None);
        assert!(document.has_listener(div, "click").expect("read"));
    }

    #[test]
    fn event_names_normalize_case() {
        assert_eq!(event_name("onClick"), "click");
        assert_eq!(event_name("onclick"), "click");
        assert_eq!(event_name("onMouseDown"), "mousedown");
    }

    #[test]
    fn value_changes_overwrite_in_place() {
        let document = Document::new();
        let div = document.create_element("div");
        let old = props(vec![("class", PropValue::from("a"))]);
        apply_props(&document, div, &Props::new(), &old).expect("mount");

        let before = document.mutation_count();
        let new = props(vec![("class", PropValue::from("b"))]);
        apply_props(&document, div, &old, &new).expect("update");

        assert_eq!(document.attribute(div, "class").expect("read"), Some("b".to_string()));
        assert_eq!(document.mutation_count() - before, 1);
    }
}
