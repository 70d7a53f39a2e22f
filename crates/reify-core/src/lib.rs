//! A minimal declarative rendering engine.
//!
//! Callers describe what should exist as a tree of [`VNode`]s; the engine
//! keeps an in-memory host [`Document`] synchronized with it across
//! repeated re-descriptions. The interesting parts are the reconciler
//! (keyed list diffing with host-node reuse) and the hooks runtime
//! (call-order-addressed state, effects, and refs on persistent component
//! instances).
//!
//! ```no_run
//! use reify_core::{component, el, ComponentFn, Document, Props, Renderer, Scope, VNode};
//!
//! fn counter(scope: &mut Scope, _props: &Props, _children: &[VNode]) -> VNode {
//!     let (count, set_count) = scope.use_state(|| 0);
//!     el("button")
//!         .on("click", move |_| set_count.update(|n| n + 1))
//!         .child(count)
//!         .build()
//! }
//!
//! let document = Document::new();
//! let renderer = Renderer::new(document.clone());
//! renderer
//!     .render(component(counter as ComponentFn).build(), document.body())
//!     .expect("mount");
//! ```

pub mod error;
pub mod hooks;
pub mod host;
pub mod props;
pub mod reconciler;
pub mod renderer;
pub mod runtime;
pub mod vnode;

pub use error::DomError;
pub use hooks::{Cleanup, NodeRef, Ref, Scope, StateSetter};
pub use host::{Document, Event, NodeId, PropertyValue};
pub use props::{apply_props, EventHandler, PropValue, Props};
pub use reconciler::{binding_node, Binding, Reconciler};
pub use renderer::Renderer;
pub use runtime::{NoopScheduler, RenderScheduler, Runtime, RuntimeHandle};
pub use vnode::{component, create, el, text, ComponentFn, CreateKind, Key, VComponent, VElement, VNode};
