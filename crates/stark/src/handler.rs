//! The per-entity handler: what a registered entity lists, searches, edits
//! and how it saves.
//!
//! [`EntityHandler`] is the customization seam. Every method except
//! [`EntityHandler::storage`] has a default, so a handler only overrides what
//! differs. [`StarkHandler`] is the ready-made implementation configured with
//! builder methods.

use std::sync::Arc;

use ironhtml::typed::Element;
use ironhtml_elements::A;
use stark_forms::{BoundForm, FormBuilder, FormFieldDef};
use stark_orm::{BoxFuture, Entity, FieldKind, Storage};
use stark_router::Route;
use tracing::{debug, warn};

use crate::actions::Action;
use crate::columns::{ColumnCtx, ColumnSpec};
use crate::context::RequestContext;
use crate::error::Result;
use crate::search::SearchOption;
use crate::urls::UrlNames;

/// Behaviour of one registered entity.
pub trait EntityHandler: Send + Sync + 'static {
    type Entity: Entity;

    /// The collection this handler reads and writes.
    fn storage(&self) -> &dyn Storage<Self::Entity>;

    /// Columns of the list view. Empty means a single column showing each
    /// entity's display string.
    fn list_display(&self) -> Vec<ColumnSpec<Self::Entity>> {
        Vec::new()
    }

    /// Page size; `None` uses the site default.
    fn per_page(&self) -> Option<usize> {
        None
    }

    fn has_add_btn(&self) -> bool {
        true
    }

    /// Ordering keys in priority order, `-` for descending.
    fn order_list(&self) -> Vec<String> {
        vec!["-id".to_string()]
    }

    /// Fields searched by the `q` parameter, optionally with a `__lookup`
    /// suffix. Plain names search with `contains`.
    fn search_list(&self) -> Vec<String> {
        Vec::new()
    }

    fn action_list(&self) -> Vec<Arc<dyn Action<Self::Entity>>> {
        Vec::new()
    }

    fn search_group(&self) -> Vec<SearchOption> {
        Vec::new()
    }

    /// Markup of the add button, or `None` to hide it.
    fn add_btn(&self, ctx: &ColumnCtx<'_>) -> Option<String> {
        if !self.has_add_btn() {
            return None;
        }
        match ctx.urls.reverse_add_url(ctx.request) {
            Ok(url) => Some(
                Element::<A>::new()
                    .attr("href", &url)
                    .class("btn btn-primary")
                    .text("Add")
                    .render(),
            ),
            Err(err) => {
                warn!(%err, "cannot reverse add url");
                None
            }
        }
    }

    /// Fields of the add and edit forms.
    fn form_fields<'a>(
        &'a self,
        _ctx: &'a RequestContext,
    ) -> BoxFuture<'a, Result<Vec<FormFieldDef>>> {
        Box::pin(model_form_fields(self.storage()))
    }

    /// Persists a validated form. `existing` is the entity being edited,
    /// `None` when adding.
    fn save<'a>(
        &'a self,
        _ctx: &'a RequestContext,
        form: &'a BoundForm,
        existing: Option<&'a Self::Entity>,
    ) -> BoxFuture<'a, Result<Self::Entity>> {
        Box::pin(async move {
            let saved = self.storage().save(form.cleaned_data(), existing).await?;
            debug!(
                model = Self::Entity::meta().model_name,
                pk = saved.pk(),
                is_update = existing.is_some(),
                "saved"
            );
            Ok(saved)
        })
    }

    /// Additional routes mounted next to list/add/edit/delete.
    ///
    /// Name them with [`UrlNames::url_name`] so they can be reversed with
    /// [`UrlNames::reverse_url`].
    fn extra_routes(&self, _urls: &UrlNames) -> Vec<Route> {
        Vec::new()
    }
}

/// Form fields derived from the entity's editable fields.
///
/// Relation fields offer the rows of their related collection. Every field
/// gets `class="form-control"`.
pub async fn model_form_fields<E: Entity>(
    storage: &dyn Storage<E>,
) -> Result<Vec<FormFieldDef>> {
    let meta = E::meta();
    let mut builder = FormBuilder::new();

    for field in meta.editable_fields() {
        let def = match &field.kind {
            FieldKind::Auto => continue,
            FieldKind::Char => {
                let def = FormFieldDef::text(field.name);
                match field.max_length {
                    Some(max) => def.max_length(max),
                    None => def,
                }
            }
            FieldKind::Text => FormFieldDef::text(field.name),
            FieldKind::Integer => FormFieldDef::integer(field.name),
            FieldKind::Boolean => FormFieldDef::boolean(field.name),
            FieldKind::Email => FormFieldDef::email(field.name),
            FieldKind::Choices(choices) => FormFieldDef::choice(field.name, choices.clone()),
            FieldKind::ForeignKey { to } => {
                FormFieldDef::choice(field.name, storage.related_choices(to, None).await?)
            }
            FieldKind::ManyToMany { to } => {
                FormFieldDef::multiple_choice(field.name, storage.related_choices(to, None).await?)
            }
        };
        builder = builder.field(
            def.label(field.verbose_name.clone())
                .required(field.required),
        );
    }

    Ok(builder.widget_attr("class", "form-control").build())
}

/// The default handler, configured with builder methods.
///
/// ```
/// use std::sync::Arc;
/// use stark::{ColumnSpec, MultiDeleteAction, StarkHandler, display_edit};
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
/// let handler = StarkHandler::new(MemoryStorage::<User>::new())
///     .list_display([ColumnSpec::<User>::field("name"), display_edit()])
///     .search_list(["name"])
///     .action(Arc::new(MultiDeleteAction))
///     .per_page(20);
/// ```
pub struct StarkHandler<E: Entity> {
    storage: Arc<dyn Storage<E>>,
    list_display: Vec<ColumnSpec<E>>,
    per_page: Option<usize>,
    has_add_btn: bool,
    order_list: Vec<String>,
    search_list: Vec<String>,
    action_list: Vec<Arc<dyn Action<E>>>,
    search_group: Vec<SearchOption>,
}

impl<E: Entity> StarkHandler<E> {
    pub fn new(storage: impl Storage<E> + 'static) -> Self {
        Self::shared(Arc::new(storage))
    }

    /// Creates a handler over storage that is also used elsewhere.
    pub fn shared(storage: Arc<dyn Storage<E>>) -> Self {
        Self {
            storage,
            list_display: Vec::new(),
            per_page: None,
            has_add_btn: true,
            order_list: vec!["-id".to_string()],
            search_list: Vec::new(),
            action_list: Vec::new(),
            search_group: Vec::new(),
        }
    }

    #[must_use]
    pub fn list_display<C: Into<ColumnSpec<E>>>(
        mut self,
        columns: impl IntoIterator<Item = C>,
    ) -> Self {
        self.list_display = columns.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn per_page(mut self, per_page: usize) -> Self {
        self.per_page = Some(per_page);
        self
    }

    #[must_use]
    pub fn has_add_btn(mut self, show: bool) -> Self {
        self.has_add_btn = show;
        self
    }

    #[must_use]
    pub fn order_list<S: Into<String>>(mut self, keys: impl IntoIterator<Item = S>) -> Self {
        self.order_list = keys.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn search_list<S: Into<String>>(mut self, fields: impl IntoIterator<Item = S>) -> Self {
        self.search_list = fields.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn action(mut self, action: Arc<dyn Action<E>>) -> Self {
        self.action_list.push(action);
        self
    }

    #[must_use]
    pub fn search_group(mut self, option: SearchOption) -> Self {
        self.search_group.push(option);
        self
    }
}

impl<E: Entity> EntityHandler for StarkHandler<E> {
    type Entity = E;

    fn storage(&self) -> &dyn Storage<E> {
        self.storage.as_ref()
    }

    fn list_display(&self) -> Vec<ColumnSpec<E>> {
        self.list_display.clone()
    }

    fn per_page(&self) -> Option<usize> {
        self.per_page
    }

    fn has_add_btn(&self) -> bool {
        self.has_add_btn
    }

    fn order_list(&self) -> Vec<String> {
        self.order_list.clone()
    }

    fn search_list(&self) -> Vec<String> {
        self.search_list.clone()
    }

    fn action_list(&self) -> Vec<Arc<dyn Action<E>>> {
        self.action_list.clone()
    }

    fn search_group(&self) -> Vec<SearchOption> {
        self.search_group.clone()
    }
}

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};
    use serde_json::json;
    use stark_forms::FieldType;
    use stark_orm::{EntityMeta, FieldMeta, MemoryStorage};
    use stark_router::{PathPattern, Request, UrlResolver};

    use super::*;
    use crate::columns::display_edit;

    #[derive(Debug, Clone, Serialize, Deserialize)]
    struct Depart {
        id: i64,
        title: String,
    }

    impl std::fmt::Display for Depart {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str(&self.title)
        }
    }

    impl Entity for Depart {
        fn meta() -> EntityMeta {
            EntityMeta::new("app01", "depart")
        }

        fn pk(&self) -> i64 {
            self.id
        }
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    struct User {
        id: i64,
        name: String,
        email: String,
        depart: i64,
    }

    impl std::fmt::Display for User {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str(&self.name)
        }
    }

    impl Entity for User {
        fn meta() -> EntityMeta {
            EntityMeta::new("app01", "userinfo")
                .field(FieldMeta::auto("id"))
                .field(FieldMeta::char("name", "Name", 32))
                .field(FieldMeta::email("email", "Email"))
                .field(FieldMeta::foreign_key("depart", "Department", "depart"))
        }

        fn pk(&self) -> i64 {
            self.id
        }
    }

    fn storage() -> MemoryStorage<User> {
        MemoryStorage::new().with_related(
            "depart",
            [
                Depart {
                    id: 1,
                    title: "IT".into(),
                },
                Depart {
                    id: 2,
                    title: "Sales".into(),
                },
            ],
        )
    }

    #[tokio::test]
    async fn test_model_form_fields() {
        let storage = storage();
        let fields = model_form_fields(&storage).await.unwrap();

        let names: Vec<_> = fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["name", "email", "depart"]);
        assert!(fields
            .iter()
            .all(|f| f.attrs.get("class").map(String::as_str) == Some("form-control")));

        let depart = &fields[2];
        assert_eq!(depart.field_type, FieldType::Choice);
        assert_eq!(depart.label, "Department");
        assert_eq!(depart.choices[1], (json!(2), "Sales".to_string()));
    }

    #[tokio::test]
    async fn test_default_save_creates_then_updates() {
        let handler = StarkHandler::new(storage());
        let ctx = RequestContext::from_request(&Request::post("/add/"));
        let fields = handler.form_fields(&ctx).await.unwrap();

        let form = BoundForm::bind(
            fields.clone(),
            serde_json::Map::new(),
            [("name", "ann"), ("email", "ann@example.com"), ("depart", "1")],
        );
        assert!(form.is_valid(), "{:?}", form.errors());
        let created = handler.save(&ctx, &form, None).await.unwrap();
        assert_eq!(created.name, "ann");
        assert_eq!(created.depart, 1);

        let form = BoundForm::bind(
            fields,
            created.to_map(),
            [("name", "anna"), ("email", "ann@example.com"), ("depart", "2")],
        );
        let updated = handler.save(&ctx, &form, Some(&created)).await.unwrap();
        assert_eq!(updated.id, created.id);
        assert_eq!(updated.name, "anna");
        assert_eq!(handler.storage().count(&Default::default()).await.unwrap(), 1);
    }

    #[test]
    fn test_builder_and_add_btn() {
        let handler = StarkHandler::new(storage())
            .list_display([ColumnSpec::<User>::field("name"), display_edit()])
            .order_list(["name"])
            .search_list(["name", "email__icontains"]);
        assert_eq!(EntityHandler::list_display(&handler).len(), 2);
        assert_eq!(EntityHandler::order_list(&handler), ["name"]);
        assert_eq!(EntityHandler::per_page(&handler), None);

        let mut resolver = UrlResolver::new();
        resolver.insert(
            "stark:app01_userinfo_add",
            PathPattern::new("/stark/app01/userinfo/add/"),
        );
        let mut req = Request::get("/stark/app01/userinfo/list/?page=2");
        req.urls = Arc::new(resolver);
        let request = RequestContext::from_request(&req);
        let urls = UrlNames::new("stark", "app01", "userinfo", None);
        let meta = User::meta();
        let ctx = ColumnCtx {
            request: &request,
            urls: &urls,
            meta: &meta,
        };

        let button = handler.add_btn(&ctx).unwrap();
        assert!(button.contains("/stark/app01/userinfo/add/?_filter=page%3D2"));
        assert!(button.contains(">Add</a>"));

        let hidden = StarkHandler::new(storage()).has_add_btn(false);
        assert!(hidden.add_btn(&ctx).is_none());
    }
}
