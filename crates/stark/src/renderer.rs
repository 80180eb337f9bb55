//! Turning rendered pages into HTTP responses.

use serde_json::json;
use stark_router::Response;

use crate::views::Page;

/// Produces the response body for a rendered page.
///
/// Implement this to plug in a template engine; [`Page::template`] names the
/// template and the page itself is the context.
pub trait Renderer: Send + Sync {
    fn render(&self, page: &Page) -> Response;
}

/// Answers with `{"template": ..., "context": ...}` as JSON.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonRenderer;

impl Renderer for JsonRenderer {
    fn render(&self, page: &Page) -> Response {
        Response::json(&json!({
            "template": page.template(),
            "context": page,
        }))
    }
}
