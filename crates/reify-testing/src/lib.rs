//! Headless test harness for the reify rendering engine.
//!
//! [`TestHost`] owns a fresh in-memory [`Document`] and a [`Renderer`]
//! wired to it, and exposes the handful of helpers integration tests keep
//! reaching for: render a tree into the body, click a node, read the
//! serialized markup back. Anything it does not wrap is reachable through
//! [`document`](TestHost::document).

use reify_core::{Document, DomError, NodeId, Renderer, VNode};

pub struct TestHost {
    renderer: Renderer,
    document: Document,
}

impl TestHost {
    pub fn new() -> Self {
        let document = Document::new();
        let renderer = Renderer::new(document.clone());
        Self { renderer, document }
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn body(&self) -> NodeId {
        self.document.body()
    }

    /// Render `vnode` into the body, committing and flushing effects
    /// before returning.
    pub fn render(&self, vnode: impl Into<VNode>) -> Result<(), DomError> {
        self.renderer.render(vnode, self.document.body())
    }

    /// [`render`](Self::render), then invoke `on_done` once effects have
    /// flushed.
    pub fn render_then(
        &self,
        vnode: impl Into<VNode>,
        on_done: impl FnOnce(),
    ) -> Result<(), DomError> {
        self.renderer
            .render_then(vnode, self.document.body(), on_done)
    }

    /// Fire `event` on `target` and let every triggered render pass settle.
    /// Returns whether a listener ran.
    pub fn dispatch(&self, target: NodeId, event: &str) -> Result<bool, DomError> {
        self.renderer.dispatch(target, event)
    }

    pub fn click(&self, target: NodeId) -> Result<bool, DomError> {
        self.dispatch(target, "click")
    }

    /// Drive pending render work until idle.
    pub fn pump(&self) -> Result<(), DomError> {
        self.renderer.pump()
    }

    /// Serialized markup of everything mounted under the body.
    pub fn body_html(&self) -> Result<String, DomError> {
        self.document.inner_html(self.document.body())
    }

    /// Child node ids of the body, in document order.
    pub fn body_children(&self) -> Result<Vec<NodeId>, DomError> {
        self.document.children(self.document.body())
    }

    /// Concatenated text of every text node under `id`, the way the DOM's
    /// `textContent` reads.
    pub fn text_content(&self, id: NodeId) -> Result<String, DomError> {
        if !self.document.is_element(id) {
            return self.document.text_value(id);
        }
        let mut out = String::new();
        for child in self.document.children(id)? {
            out.push_str(&self.text_content(child)?);
        }
        Ok(out)
    }
}

impl Default for TestHost {
    fn default() -> Self {
        Self::new()
    }
}

/// Convenience wrapper for tests that only need a throwaway host.
pub fn run_host_test<R>(f: impl FnOnce(&mut TestHost) -> R) -> R {
    let mut host = TestHost::new();
    f(&mut host)
}
