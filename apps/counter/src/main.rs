//! Headless counter demo: mounts a stateful component into the in-memory
//! document and drives it by dispatching click events, printing the
//! serialized markup after every pass.

use reify_core::{
    component, el, Cleanup, ComponentFn, Document, DomError, NodeId, Props, Renderer, Scope, VNode,
};

fn counter(scope: &mut Scope, _props: &Props, _children: &[VNode]) -> VNode {
    let (count, set_count) = scope.use_state(|| 0i64);

    scope.use_effect_with(count, move || {
        log::info!("count committed: {count}");
        Cleanup::run(move || log::info!("count {count} leaving the tree"))
    });

    el("div")
        .child(el("p").child(format!("count: {count}")))
        .child(
            el("button")
                .attr("id", "increment")
                .on("click", move |_| set_count.update(|n| n + 1))
                .child("+1"),
        )
        .build()
}

fn find_button(document: &Document) -> Result<NodeId, DomError> {
    let root = document.children(document.body())?[0];
    for child in document.children(root)? {
        if document.attribute(child, "id")? == Some("increment".to_string()) {
            return Ok(child);
        }
    }
    Err(DomError::Missing { id: root })
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let document = Document::new();
    let renderer = Renderer::new(document.clone());

    renderer.render(component(counter as ComponentFn).build(), document.body())?;
    println!("{}", document.inner_html(document.body())?);

    let button = find_button(&document)?;
    for _ in 0..3 {
        renderer.dispatch(button, "click")?;
        println!("{}", document.inner_html(document.body())?);
    }

    println!("host mutations: {}", document.mutation_count());
    Ok(())
}
