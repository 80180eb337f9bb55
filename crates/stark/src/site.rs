//! The site registry: handlers are registered here and turned into routes.

use std::sync::Arc;

use stark_orm::query::split_lookup;
use stark_orm::{Entity, PK_FIELD};
use stark_router::{
    Method, Request, Response, Route, RouteGroup, Router, RouterError, TracingMiddleware,
};
use tracing::{debug, error, info};

use crate::actions::ActionMap;
use crate::config::SiteConfig;
use crate::context::RequestContext;
use crate::error::{Result, StarkError};
use crate::handler::EntityHandler;
use crate::renderer::{JsonRenderer, Renderer};
use crate::urls::{ADD, DELETE, EDIT, LIST, UrlNames};
use crate::views::{ViewResponse, add_view, delete_view, edit_view, list_view};

/// The views every handler serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum View {
    List,
    Add,
    Edit,
    Delete,
}

/// A registered handler together with what the views need around it.
pub(crate) struct HandlerBinding<H: EntityHandler> {
    pub(crate) handler: H,
    pub(crate) urls: UrlNames,
    pub(crate) actions: ActionMap<H::Entity>,
    pub(crate) config: Arc<SiteConfig>,
}

impl<H: EntityHandler> HandlerBinding<H> {
    async fn dispatch(&self, view: View, ctx: &RequestContext) -> Result<ViewResponse> {
        match view {
            View::List => list_view(self, ctx).await,
            View::Add => add_view(self, ctx).await,
            View::Edit => edit_view(self, ctx).await,
            View::Delete => delete_view(self, ctx).await,
        }
    }

    async fn respond(&self, view: View, request: Request, renderer: &dyn Renderer) -> Response {
        let ctx = RequestContext::from_request(&request);
        match self.dispatch(view, &ctx).await {
            Ok(ViewResponse::Render(page)) => renderer.render(&page),
            Ok(ViewResponse::Redirect(url)) => Response::redirect(url),
            Ok(ViewResponse::Message(message)) => Response::text(message),
            Ok(ViewResponse::Response(response)) => response,
            Err(err) => {
                error!(%err, method = %ctx.method, path = %ctx.path, "view failed");
                Response::internal_server_error()
            }
        }
    }
}

/// What the site needs from a binding without knowing its handler type.
trait ErasedBinding: Send + Sync {
    fn urls(&self) -> &UrlNames;

    /// Checks the handler's options against the entity metadata.
    fn validate(&self) -> Result<()>;

    fn routes(self: Arc<Self>, renderer: &Arc<dyn Renderer>) -> RouteGroup;
}

impl<H: EntityHandler> ErasedBinding for HandlerBinding<H> {
    fn urls(&self) -> &UrlNames {
        &self.urls
    }

    fn validate(&self) -> Result<()> {
        let meta = H::Entity::meta();
        let known = |field: &str| field == PK_FIELD || meta.has_field(field);
        let unknown = |option: &'static str, field: &str| StarkError::UnknownField {
            model: meta.model_name.to_string(),
            option,
            field: field.to_string(),
        };

        if self.handler.per_page().unwrap_or(self.config.per_page) == 0 {
            return Err(StarkError::InvalidConfig(format!(
                "{}: per_page must be at least 1",
                meta.model_name
            )));
        }
        for column in self.handler.list_display() {
            if let Some(field) = column.field_name().filter(|f| !known(f)) {
                return Err(unknown("list_display", field));
            }
        }
        for spec in self.handler.search_list() {
            let (field, _) = split_lookup(&spec);
            if !known(field) {
                return Err(unknown("search_list", field));
            }
        }
        for key in self.handler.order_list() {
            let field = key.strip_prefix('-').unwrap_or(&key);
            if !known(field) {
                return Err(unknown("order_list", field));
            }
        }
        for option in self.handler.search_group() {
            option.validate(&meta)?;
        }
        if let Some(action) = self.actions.duplicates().first() {
            return Err(StarkError::DuplicateAction {
                model: meta.model_name.to_string(),
                action: action.clone(),
            });
        }
        Ok(())
    }

    fn routes(self: Arc<Self>, renderer: &Arc<dyn Renderer>) -> RouteGroup {
        let mut group = RouteGroup::new(&self.urls.base_path());
        for (view, op, pattern) in [
            (View::List, LIST, "/list/"),
            (View::Add, ADD, "/add/"),
            (View::Edit, EDIT, "/edit/{pk}/"),
            (View::Delete, DELETE, "/delete/{pk}/"),
        ] {
            let binding = Arc::clone(&self);
            let renderer = Arc::clone(renderer);
            let route = Route::with_methods(&[Method::Get, Method::Post], pattern, move |req| {
                let binding = Arc::clone(&binding);
                let renderer = Arc::clone(&renderer);
                async move { binding.respond(view, req, renderer.as_ref()).await }
            });
            group = group.route(route.name(self.urls.url_name(op)));
        }
        for route in self.handler.extra_routes(&self.urls) {
            group = group.route(route);
        }
        group
    }
}

/// A set of registered handlers sharing one URL prefix and namespace.
///
/// ```
/// use stark::{SiteConfig, StarkHandler, StarkSite};
/// # use stark_orm::{Entity, EntityMeta, FieldMeta, MemoryStorage};
/// # #[derive(Clone, serde::Serialize, serde::Deserialize)]
/// # struct User { id: i64, name: String }
/// # impl std::fmt::Display for User {
/// #     fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { f.write_str(&self.name) }
/// # }
/// # impl Entity for User {
/// #     fn meta() -> EntityMeta {
/// #         EntityMeta::new("app01", "user").field(FieldMeta::char("name", "Name", 32))
/// #     }
/// #     fn pk(&self) -> i64 { self.id }
/// # }
///
/// let site = StarkSite::new(SiteConfig::default())
///     .register(StarkHandler::new(MemoryStorage::<User>::new()), None)
///     .register(StarkHandler::new(MemoryStorage::<User>::new()), Some("private"));
/// let router = site.router().unwrap();
/// assert_eq!(
///     router.url_for("stark:app01_user_private_list", &[]).unwrap(),
///     "/stark/app01/user/private/list/"
/// );
/// ```
pub struct StarkSite {
    config: Arc<SiteConfig>,
    bindings: Vec<Arc<dyn ErasedBinding>>,
    renderer: Arc<dyn Renderer>,
}

impl Default for StarkSite {
    fn default() -> Self {
        Self::new(SiteConfig::default())
    }
}

impl StarkSite {
    pub fn new(config: SiteConfig) -> Self {
        Self {
            config: Arc::new(config),
            bindings: Vec::new(),
            renderer: Arc::new(JsonRenderer),
        }
    }

    /// Replaces the renderer used for every rendered page.
    #[must_use]
    pub fn with_renderer(mut self, renderer: impl Renderer + 'static) -> Self {
        self.renderer = Arc::new(renderer);
        self
    }

    /// Registers a handler for its entity, optionally under an extra path
    /// segment.
    ///
    /// Registering the same entity twice without distinct segments is only
    /// reported by [`StarkSite::build_routes`], as duplicate URL names.
    #[must_use]
    pub fn register<H: EntityHandler>(mut self, handler: H, prev: Option<&str>) -> Self {
        let meta = H::Entity::meta();
        let urls = UrlNames::new(
            self.config.namespace.as_str(),
            meta.app_label,
            meta.model_name,
            prev,
        )
        .filter_param(self.config.filter_param.as_str());
        debug!(
            app = meta.app_label,
            model = meta.model_name,
            prev,
            "registering handler"
        );

        let actions = ActionMap::new(handler.action_list());
        self.bindings.push(Arc::new(HandlerBinding {
            handler,
            urls,
            actions,
            config: Arc::clone(&self.config),
        }));
        self
    }

    pub fn config(&self) -> &SiteConfig {
        &self.config
    }

    pub fn app_name(&self) -> &str {
        &self.config.app_name
    }

    pub fn namespace(&self) -> &str {
        &self.config.namespace
    }

    /// URL names of every registration, in registration order.
    pub fn registrations(&self) -> impl Iterator<Item = &UrlNames> {
        self.bindings.iter().map(|binding| binding.urls())
    }

    /// Validates every registration and builds the site's route group.
    pub fn build_routes(&self) -> Result<RouteGroup> {
        let mut site =
            RouteGroup::new(&self.config.url_prefix).namespace(self.config.namespace.clone());
        for binding in &self.bindings {
            binding.validate()?;
            site = site.group(Arc::clone(binding).routes(&self.renderer));
        }

        // Reject duplicate names before anything is served.
        site.resolver().map_err(|err| match err {
            RouterError::InvalidPattern(message) => StarkError::DuplicateUrlName(
                message
                    .strip_prefix("duplicate route name ")
                    .unwrap_or(&message)
                    .to_string(),
            ),
            other => other.into(),
        })?;

        info!(
            prefix = %self.config.url_prefix,
            handlers = self.bindings.len(),
            "routes built"
        );
        Ok(site)
    }

    /// A router serving the site, with request logging.
    pub fn router(&self) -> Result<Router> {
        Ok(Router::new()
            .middleware(TracingMiddleware)
            .group(self.build_routes()?))
    }
}
