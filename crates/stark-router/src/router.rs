//! Main router implementation.

use std::future::Future;
use std::sync::Arc;

use crate::error::{Result, RouterError};
use crate::middleware::{BoxFuture, Middleware, MiddlewareResult};
use crate::path::PathPattern;
use crate::request::{Method, PathParams, Request};
use crate::resolver::UrlResolver;
use crate::response::Response;

/// A boxed async handler function.
pub type Handler = Arc<dyn Fn(Request) -> BoxFuture<'static, Response> + Send + Sync>;

/// A single route definition.
#[derive(Clone)]
pub struct Route {
    /// Optional route name for reverse URL lookup.
    pub name: Option<String>,
    /// HTTP methods this route answers.
    pub methods: Vec<Method>,
    /// Path pattern.
    pub pattern: PathPattern,
    /// Request handler.
    pub handler: Handler,
}

impl std::fmt::Debug for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Route")
            .field("name", &self.name)
            .field("methods", &self.methods)
            .field("pattern", &self.pattern.pattern())
            .finish_non_exhaustive()
    }
}

impl Route {
    /// Creates a new route answering a single method.
    pub fn new<F, Fut>(method: Method, pattern: &str, handler: F) -> Self
    where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Response> + Send + 'static,
    {
        Self::with_methods(&[method], pattern, handler)
    }

    /// Creates a route answering several methods with one handler.
    pub fn with_methods<F, Fut>(methods: &[Method], pattern: &str, handler: F) -> Self
    where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Response> + Send + 'static,
    {
        Self {
            name: None,
            methods: methods.to_vec(),
            pattern: PathPattern::new(pattern),
            handler: Arc::new(move |req| Box::pin(handler(req))),
        }
    }

    /// Sets the route name.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Returns whether this route answers `method`.
    pub fn allows(&self, method: Method) -> bool {
        self.methods.contains(&method)
    }
}

/// A group of routes with a common prefix and an optional namespace.
///
/// Groups nest: a child's prefix is appended to its parent's, and route
/// names are qualified by every enclosing namespace (`outer:inner:name`).
#[derive(Clone, Default)]
pub struct RouteGroup {
    /// URL prefix for all routes in this group.
    prefix: String,
    /// Namespace qualifying route names.
    namespace: Option<String>,
    /// Routes in this group, relative to `prefix`.
    routes: Vec<Route>,
    /// Nested groups, relative to `prefix`.
    groups: Vec<RouteGroup>,
}

impl RouteGroup {
    /// Creates a new route group with the given prefix.
    pub fn new(prefix: &str) -> Self {
        Self {
            prefix: prefix.to_string(),
            ..Self::default()
        }
    }

    /// Sets the namespace used to qualify route names.
    #[must_use]
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Returns the group prefix.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Adds a GET route.
    #[must_use]
    pub fn get<F, Fut>(self, path: &str, handler: F) -> Self
    where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Response> + Send + 'static,
    {
        self.route(Route::new(Method::Get, path, handler))
    }

    /// Adds a POST route.
    #[must_use]
    pub fn post<F, Fut>(self, path: &str, handler: F) -> Self
    where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Response> + Send + 'static,
    {
        self.route(Route::new(Method::Post, path, handler))
    }

    /// Adds a prebuilt route, relative to this group's prefix.
    #[must_use]
    pub fn route(mut self, route: Route) -> Self {
        self.routes.push(route);
        self
    }

    /// Nests a group under this group's prefix.
    #[must_use]
    pub fn group(mut self, group: RouteGroup) -> Self {
        self.groups.push(group);
        self
    }

    /// Flattens the group into absolute routes with qualified names.
    ///
    /// Direct routes come first, then nested groups in insertion order.
    pub fn into_routes(self) -> Vec<Route> {
        let mut flat = Vec::new();
        self.flatten_into("", None, &mut flat);
        flat
    }

    /// Collects the qualified names of every named route in the group.
    ///
    /// Returns [`RouterError::InvalidPattern`] when two routes share a name.
    pub fn resolver(&self) -> Result<UrlResolver> {
        let mut resolver = UrlResolver::new();
        for route in self.clone().into_routes() {
            if let Some(name) = route.name {
                if resolver.insert(name.clone(), route.pattern) {
                    return Err(RouterError::InvalidPattern(format!(
                        "duplicate route name {name}"
                    )));
                }
            }
        }
        Ok(resolver)
    }

    fn flatten_into(self, parent_prefix: &str, parent_ns: Option<&str>, out: &mut Vec<Route>) {
        let prefix = join_paths(parent_prefix, &self.prefix);
        let namespace = match (parent_ns, self.namespace.as_deref()) {
            (Some(outer), Some(inner)) => Some(format!("{outer}:{inner}")),
            (Some(outer), None) => Some(outer.to_string()),
            (None, Some(inner)) => Some(inner.to_string()),
            (None, None) => None,
        };

        for mut route in self.routes {
            route.pattern = route.pattern.prefixed(&prefix);
            if let (Some(ns), Some(name)) = (namespace.as_deref(), route.name.as_deref()) {
                route.name = Some(format!("{ns}:{name}"));
            }
            out.push(route);
        }

        for group in self.groups {
            group.flatten_into(&prefix, namespace.as_deref(), out);
        }
    }
}

/// Joins two path fragments with exactly one `/` between them.
fn join_paths(base: &str, tail: &str) -> String {
    let base = base.trim_end_matches('/');
    let tail = tail.trim_matches('/');
    if tail.is_empty() {
        base.to_string()
    } else {
        format!("{base}/{tail}")
    }
}

/// The main router for handling HTTP requests.
pub struct Router {
    /// Registered routes.
    routes: Vec<Route>,
    /// Global middleware.
    middleware: Vec<Arc<dyn Middleware>>,
    /// Named routes for reverse URL lookup.
    named_routes: Arc<UrlResolver>,
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

impl Router {
    /// Creates a new empty router.
    pub fn new() -> Self {
        Self {
            routes: Vec::new(),
            middleware: Vec::new(),
            named_routes: Arc::new(UrlResolver::new()),
        }
    }

    /// Adds a GET route.
    #[must_use]
    pub fn get<F, Fut>(self, path: &str, handler: F) -> Self
    where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Response> + Send + 'static,
    {
        self.route(Route::new(Method::Get, path, handler))
    }

    /// Adds a POST route.
    #[must_use]
    pub fn post<F, Fut>(self, path: &str, handler: F) -> Self
    where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Response> + Send + 'static,
    {
        self.route(Route::new(Method::Post, path, handler))
    }

    /// Adds a prebuilt route; named routes become reversible.
    #[must_use]
    pub fn route(mut self, route: Route) -> Self {
        if let Some(name) = &route.name {
            Arc::make_mut(&mut self.named_routes).insert(name.clone(), route.pattern.clone());
        }
        self.routes.push(route);
        self
    }

    /// Adds global middleware.
    #[must_use]
    pub fn middleware(mut self, mw: impl Middleware + 'static) -> Self {
        self.middleware.push(Arc::new(mw));
        self
    }

    /// Adds a route group.
    #[must_use]
    pub fn group(self, group: RouteGroup) -> Self {
        group.into_routes().into_iter().fold(self, Self::route)
    }

    /// Returns the named routes of this router.
    pub fn urls(&self) -> &UrlResolver {
        &self.named_routes
    }

    /// Generates a URL for a named route.
    pub fn url_for(&self, name: &str, params: &[(&str, &str)]) -> Result<String> {
        self.named_routes.reverse(name, params)
    }

    /// Handles an incoming request.
    pub fn handle(&self, mut request: Request) -> BoxFuture<'_, Response> {
        Box::pin(async move {
            // Run before middleware
            for mw in &self.middleware {
                match mw.before(&request).await {
                    MiddlewareResult::Continue(req) => request = req,
                    MiddlewareResult::Response(res) => {
                        // Run after middleware even on early return
                        let mut response = res;
                        for mw in self.middleware.iter().rev() {
                            response = mw.after(response).await;
                        }
                        return response;
                    }
                }
            }

            let mut response = match self.find_route(&request) {
                Ok((route, params)) => {
                    request.params = params;
                    request.urls = Arc::clone(&self.named_routes);
                    (route.handler)(request).await
                }
                Err(RouterError::NotFound { .. }) => Response::not_found(),
                Err(RouterError::MethodNotAllowed { .. }) => Response::method_not_allowed(),
                Err(_) => Response::internal_server_error(),
            };

            // Run after middleware
            for mw in self.middleware.iter().rev() {
                response = mw.after(response).await;
            }

            response
        })
    }

    /// Finds a matching route for the request.
    fn find_route(&self, request: &Request) -> Result<(&Route, PathParams)> {
        let mut method_matched = false;

        for route in &self.routes {
            if let Some(params) = route.pattern.match_path(&request.path) {
                method_matched = true;
                if route.allows(request.method) {
                    return Ok((route, params));
                }
            }
        }

        if method_matched {
            Err(RouterError::MethodNotAllowed {
                method: request.method.to_string(),
                path: request.path.clone(),
            })
        } else {
            Err(RouterError::NotFound {
                method: request.method.to_string(),
                path: request.path.clone(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn hello_handler(_req: Request) -> Response {
        Response::text("Hello, World!")
    }

    async fn pk_handler(req: Request) -> Response {
        let pk = req.params.get("pk").unwrap_or("unknown");
        Response::text(format!("pk: {pk}"))
    }

    async fn reverse_handler(req: Request) -> Response {
        match req.urls.reverse("stark:app01_user_list", &[]) {
            Ok(url) => Response::text(url),
            Err(err) => Response::text(err.to_string()).status(500),
        }
    }

    #[tokio::test]
    async fn test_basic_routing() {
        let router = Router::new()
            .get("/", hello_handler)
            .get("/users/{pk}", pk_handler);

        let res = router.handle(Request::get("/")).await;
        assert_eq!(res.status, 200);
        assert_eq!(res.body_string(), Some("Hello, World!".to_string()));
    }

    #[tokio::test]
    async fn test_path_params() {
        let router = Router::new().get("/users/{pk}", pk_handler);

        let res = router.handle(Request::get("/users/123")).await;
        assert_eq!(res.body_string(), Some("pk: 123".to_string()));
    }

    #[tokio::test]
    async fn test_not_found() {
        let router = Router::new().get("/", hello_handler);

        let res = router.handle(Request::get("/nonexistent")).await;
        assert_eq!(res.status, 404);
    }

    #[tokio::test]
    async fn test_method_not_allowed() {
        let router = Router::new().get("/", hello_handler);

        let res = router.handle(Request::post("/")).await;
        assert_eq!(res.status, 405);
    }

    #[tokio::test]
    async fn test_multi_method_route() {
        let route = Route::with_methods(&[Method::Get, Method::Post], "/list/", hello_handler);
        let router = Router::new().route(route);

        assert_eq!(router.handle(Request::get("/list/")).await.status, 200);
        assert_eq!(router.handle(Request::post("/list/")).await.status, 200);
    }

    #[tokio::test]
    async fn test_nested_namespaced_groups() {
        let entity = RouteGroup::new("/app01/user/")
            .route(Route::new(Method::Get, "/list/", reverse_handler).name("app01_user_list"))
            .route(Route::new(Method::Get, "/edit/{pk}/", pk_handler).name("app01_user_edit"));
        let site = RouteGroup::new("/stark").namespace("stark").group(entity);

        let resolver = site.resolver().unwrap();
        assert!(resolver.contains("stark:app01_user_edit"));

        let router = Router::new().group(site);
        assert_eq!(
            router.url_for("stark:app01_user_edit", &[("pk", "9")]).unwrap(),
            "/stark/app01/user/edit/9/"
        );

        let res = router.handle(Request::get("/stark/app01/user/list/")).await;
        assert_eq!(res.body_string(), Some("/stark/app01/user/list/".to_string()));
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let group = RouteGroup::new("/x")
            .route(Route::new(Method::Get, "/a/", hello_handler).name("same"))
            .route(Route::new(Method::Get, "/b/", hello_handler).name("same"));
        assert!(matches!(group.resolver(), Err(RouterError::InvalidPattern(_))));
    }

    #[test]
    fn test_join_paths() {
        assert_eq!(join_paths("", "/stark"), "/stark");
        assert_eq!(join_paths("/stark", "/app01/user/"), "/stark/app01/user");
        assert_eq!(join_paths("/stark/", ""), "/stark");
    }
}
