use std::cell::{Cell, RefCell};
use std::rc::Rc;

use super::*;
use crate::error::DomError;
use crate::hooks::{Cleanup, Scope, StateSetter};
use crate::props::{EventHandler, Props};
use crate::vnode::{component, el};

fn host() -> (Renderer, Document, NodeId) {
    let document = Document::new();
    let renderer = Renderer::new(document.clone());
    let body = document.body();
    (renderer, document, body)
}

fn body_html(document: &Document) -> String {
    document.inner_html(document.body()).expect("serialize")
}

#[test]
fn render_commits_before_on_done_runs() {
    let (renderer, document, body) = host();
    let done = Rc::new(Cell::new(false));

    {
        let done = Rc::clone(&done);
        let document = document.clone();
        renderer
            .render_then(el("div").child("hi"), body, move || {
                assert_eq!(body_html(&document), "<div>hi</div>");
                done.set(true);
            })
            .expect("render");
    }

    assert!(done.get());
}

#[test]
fn missing_or_wrong_kind_container_is_fatal() {
    let (renderer, document, _) = host();

    assert_eq!(
        renderer.render(el("div"), 9999).unwrap_err(),
        DomError::Missing { id: 9999 }
    );

    let text_node = document.create_text("x");
    assert_eq!(
        renderer.render(el("div"), text_node).unwrap_err(),
        DomError::KindMismatch {
            id: text_node,
            expected: "element"
        }
    );
}

#[test]
fn rerendering_an_identical_tree_is_mutation_free() {
    let (renderer, document, body) = host();
    let tree = el("div")
        .child(el("span").attr("class", "foo").child("test"))
        .build();

    renderer.render(tree.clone(), body).expect("mount");
    let ids_before = document.children(body).expect("children");
    let before = document.mutation_count();

    renderer.render(tree, body).expect("rerender");

    assert_eq!(document.mutation_count(), before);
    assert_eq!(document.children(body).expect("children"), ids_before);
}

thread_local! {
    static DOCUMENT: RefCell<Option<Document>> = RefCell::new(None);
    static OBSERVED_HTML: RefCell<Option<String>> = RefCell::new(None);
    static SETTER: RefCell<Option<StateSetter<i64>>> = RefCell::new(None);
    static RENDERS: Cell<usize> = Cell::new(0);
    static REF_SEEN: Cell<Option<NodeId>> = Cell::new(None);
}

fn probe(scope: &mut Scope, _props: &Props, _children: &[VNode]) -> VNode {
    scope.use_effect(|| {
        let document = DOCUMENT.with(|slot| slot.borrow().clone()).expect("document");
        OBSERVED_HTML.with(|slot| *slot.borrow_mut() = Some(body_html(&document)));
        Cleanup::none()
    });
    el("div").child("ready").build()
}

#[test]
fn effects_observe_the_committed_tree() {
    let (renderer, document, body) = host();
    DOCUMENT.with(|slot| *slot.borrow_mut() = Some(document.clone()));
    OBSERVED_HTML.with(|slot| *slot.borrow_mut() = None);

    renderer.render(component(probe).build(), body).expect("render");

    assert_eq!(
        OBSERVED_HTML.with(|slot| slot.borrow().clone()),
        Some("<div>ready</div>".to_string())
    );
}

fn counter(scope: &mut Scope, _props: &Props, _children: &[VNode]) -> VNode {
    RENDERS.with(|renders| renders.set(renders.get() + 1));
    let (count, set_count) = scope.use_state(|| 0i64);
    SETTER.with(|slot| *slot.borrow_mut() = Some(set_count.clone()));
    el("button")
        .on("click", move |_| set_count.update(|n| n + 1))
        .child(count)
        .build()
}

#[test]
fn external_setter_triggers_an_immediate_pass() {
    let (renderer, document, body) = host();
    RENDERS.with(|renders| renders.set(0));

    renderer.render(component(counter).build(), body).expect("mount");
    assert_eq!(body_html(&document), "<button>0</button>");

    let setter = SETTER.with(|slot| slot.borrow().clone()).expect("setter");
    setter.set(3);

    // No explicit pump; the setter's own cycle already committed.
    assert_eq!(body_html(&document), "<button>3</button>");
    RENDERS.with(|renders| assert_eq!(renders.get(), 2));
}

#[test]
fn click_commits_exactly_one_extra_render_before_returning() {
    let (renderer, document, body) = host();
    RENDERS.with(|renders| renders.set(0));

    renderer.render(component(counter).build(), body).expect("mount");
    let button = document.children(body).expect("children")[0];

    assert!(renderer.dispatch(button, "click").expect("dispatch"));

    assert_eq!(body_html(&document), "<button>1</button>");
    assert_eq!(document.children(body).expect("children"), vec![button]);
    RENDERS.with(|renders| assert_eq!(renders.get(), 2));
}

fn ref_probe(scope: &mut Scope, _props: &Props, _children: &[VNode]) -> VNode {
    let node_ref = scope.use_node_ref();
    {
        let node_ref = node_ref.clone();
        scope.use_effect(move || {
            REF_SEEN.with(|slot| slot.set(node_ref.get()));
            Cleanup::none()
        });
    }
    el("div").node_ref(&node_ref).build()
}

#[test]
fn node_ref_is_bound_before_effects_run() {
    let (renderer, document, body) = host();
    REF_SEEN.with(|slot| slot.set(None));

    renderer.render(component(ref_probe).build(), body).expect("render");

    let div = document.children(body).expect("children")[0];
    assert_eq!(REF_SEEN.with(|slot| slot.get()), Some(div));
}

fn chain(scope: &mut Scope, _props: &Props, _children: &[VNode]) -> VNode {
    RENDERS.with(|renders| renders.set(renders.get() + 1));
    let (n, setter) = scope.use_state(|| 0i64);
    scope.use_effect_with(n, move || {
        if n == 0 {
            setter.set(1);
        }
        Cleanup::none()
    });
    el("p").child(n).build()
}

#[test]
fn setter_from_an_effect_schedules_a_follow_up_pass() {
    let (renderer, document, body) = host();
    RENDERS.with(|renders| renders.set(0));

    renderer.render(component(chain).build(), body).expect("render");

    assert_eq!(body_html(&document), "<p>1</p>");
    RENDERS.with(|renders| assert_eq!(renders.get(), 2));
}

fn flag(scope: &mut Scope, _props: &Props, _children: &[VNode]) -> VNode {
    let (value, setter) = scope.use_state(|| 0i64);
    SETTER.with(|slot| *slot.borrow_mut() = Some(setter));
    el("p").child(value).build()
}

fn pusher(_scope: &mut Scope, _props: &Props, _children: &[VNode]) -> VNode {
    SETTER.with(|slot| {
        if let Some(setter) = slot.borrow().as_ref() {
            setter.set(7);
        }
    });
    el("span").child("pushed").build()
}

#[test]
fn render_phase_setter_on_an_earlier_sibling_still_commits() {
    let (renderer, document, body) = host();
    SETTER.with(|slot| *slot.borrow_mut() = None);

    // `pusher` writes `flag`'s state while the mounting pass is still
    // walking; the update must land in the follow-up pass, not vanish.
    let tree = el("div")
        .child(component(flag))
        .child(component(pusher))
        .build();
    renderer.render(tree, body).expect("mount");

    assert_eq!(body_html(&document), "<div><p>7</p><span>pushed</span></div>");
}

#[test]
fn stored_handler_fires_once_and_is_never_rebound() {
    let (renderer, document, body) = host();
    let hits = Rc::new(Cell::new(0));
    let handler = {
        let hits = Rc::clone(&hits);
        EventHandler::new(move |_| hits.set(hits.get() + 1))
    };
    let tree = |handler: &EventHandler| {
        el("button")
            .listener("click", handler.clone())
            .child("go")
            .build()
    };

    renderer.render(tree(&handler), body).expect("mount");
    let before = document.mutation_count();
    renderer.render(tree(&handler), body).expect("rerender");
    assert_eq!(document.mutation_count(), before);

    let button = document.children(body).expect("children")[0];
    assert!(renderer.dispatch(button, "click").expect("dispatch"));
    assert_eq!(hits.get(), 1);
}
