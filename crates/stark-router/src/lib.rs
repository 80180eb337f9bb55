//! # stark-router
//!
//! A lightweight URL routing library with middleware support.
//!
//! This crate provides:
//! - Path pattern matching with parameters (`{name}`, `{*rest}`)
//! - Routes answering one or several HTTP methods
//! - Route groups with prefixes, namespaces and nesting
//! - Named routes for reverse URL lookup, shared with every handler
//! - Ordered, multi-valued query and form parameters
//! - Middleware support (before/after hooks)
//!
//! ## Quick Start
//!
//! ```ignore
//! use stark_router::{Request, Response, Router};
//!
//! async fn hello_handler(_req: Request) -> Response {
//!     Response::text("Hello, World!")
//! }
//!
//! let router = Router::new().get("/", hello_handler);
//! let response = router.handle(Request::get("/")).await;
//! ```
//!
//! ## Named, Nested Groups
//!
//! ```ignore
//! use stark_router::{Method, Route, RouteGroup, Router};
//!
//! let users = RouteGroup::new("/app01/user/")
//!     .route(Route::with_methods(&[Method::Get, Method::Post], "/list/", list).name("app01_user_list"));
//!
//! let router = Router::new().group(RouteGroup::new("/stark").namespace("stark").group(users));
//!
//! assert_eq!(
//!     router.url_for("stark:app01_user_list", &[]).unwrap(),
//!     "/stark/app01/user/list/",
//! );
//! ```
//!
//! Handlers see the same table through `request.urls`, so they can build
//! links without holding a reference to the router.

mod error;
mod middleware;
mod path;
mod query;
mod request;
mod resolver;
mod response;
mod router;

pub use error::{Result, RouterError};
pub use middleware::{BoxFuture, Middleware, MiddlewareResult, TracingMiddleware};
pub use path::PathPattern;
pub use query::QueryParams;
pub use request::{Method, PathParams, Request};
pub use resolver::UrlResolver;
pub use response::Response;
pub use router::{Handler, Route, RouteGroup, Router};
