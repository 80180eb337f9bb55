//! Per-request state handed to every handler operation.

use std::sync::Arc;

use stark_router::{Method, PathParams, QueryParams, Request, UrlResolver};

/// Everything a handler operation may read about the current request.
///
/// Built fresh by the route wrapper for every dispatch and passed by
/// reference; handlers never store it.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub method: Method,
    /// Path without the query string.
    pub path: String,
    /// Query parameters, in order.
    pub query: QueryParams,
    /// Url-encoded body parameters; empty for GET.
    pub form: QueryParams,
    /// Parameters captured from the route pattern.
    pub params: PathParams,
    /// Named routes of the router, for reverse lookups.
    pub urls: Arc<UrlResolver>,
}

impl RequestContext {
    /// Captures the state of a dispatched request.
    pub fn from_request(request: &Request) -> Self {
        let form = if request.method == Method::Post {
            request.form()
        } else {
            QueryParams::new()
        };
        Self {
            method: request.method,
            path: request.path.clone(),
            query: request.query.clone(),
            form,
            params: request.params.clone(),
            urls: Arc::clone(&request.urls),
        }
    }

    pub fn is_post(&self) -> bool {
        self.method == Method::Post
    }

    /// The `pk` path parameter, when present and numeric.
    pub fn pk(&self) -> Option<i64> {
        self.params.parse("pk")
    }

    /// Primary keys of the rows ticked in a list form.
    ///
    /// Values that are not integers are dropped.
    pub fn selected_pks(&self) -> Vec<i64> {
        self.form
            .get_all("pk")
            .into_iter()
            .filter_map(|v| v.trim().parse().ok())
            .collect()
    }
}
