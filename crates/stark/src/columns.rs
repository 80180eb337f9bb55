//! Column definitions for list views.
//!
//! A column is either a raw entity field or a computed column made of a
//! header function and a cell function. Header functions never see an
//! entity.

use std::sync::Arc;

use ironhtml::typed::Element;
use ironhtml_elements::{A, Input};
use serde::Serialize;
use serde_json::Value;
use stark_orm::{Entity, EntityMeta};
use tracing::warn;

use crate::context::RequestContext;
use crate::urls::UrlNames;

/// Content of one table cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum Cell {
    /// Plain text, to be escaped by the template.
    Text(String),
    /// Trusted markup, to be emitted as is.
    Html(String),
}

impl Cell {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Text(s) | Self::Html(s) => s,
        }
    }
}

/// What a column function may look at.
#[derive(Debug, Clone, Copy)]
pub struct ColumnCtx<'a> {
    pub request: &'a RequestContext,
    pub urls: &'a UrlNames,
    pub meta: &'a EntityMeta,
}

pub type HeaderFn = Arc<dyn Fn(&ColumnCtx<'_>) -> String + Send + Sync>;
pub type CellFn<E> = Arc<dyn Fn(&ColumnCtx<'_>, &E) -> Cell + Send + Sync>;

/// A list column.
pub enum ColumnSpec<E> {
    /// A field of the entity, headed by its verbose name.
    Field(String),
    /// A column computed by functions.
    Computed { header: HeaderFn, value: CellFn<E> },
}

impl<E> Clone for ColumnSpec<E> {
    fn clone(&self) -> Self {
        match self {
            Self::Field(name) => Self::Field(name.clone()),
            Self::Computed { header, value } => Self::Computed {
                header: Arc::clone(header),
                value: Arc::clone(value),
            },
        }
    }
}

impl<E> std::fmt::Debug for ColumnSpec<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Field(name) => f.debug_tuple("Field").field(name).finish(),
            Self::Computed { .. } => f.write_str("Computed"),
        }
    }
}

impl<E: Entity> ColumnSpec<E> {
    pub fn field(name: impl Into<String>) -> Self {
        Self::Field(name.into())
    }

    pub fn computed(
        header: impl Fn(&ColumnCtx<'_>) -> String + Send + Sync + 'static,
        value: impl Fn(&ColumnCtx<'_>, &E) -> Cell + Send + Sync + 'static,
    ) -> Self {
        Self::Computed {
            header: Arc::new(header),
            value: Arc::new(value),
        }
    }

    /// The entity field this column reads, for raw field columns.
    pub fn field_name(&self) -> Option<&str> {
        match self {
            Self::Field(name) => Some(name),
            Self::Computed { .. } => None,
        }
    }

    pub fn header(&self, ctx: &ColumnCtx<'_>) -> String {
        match self {
            Self::Field(name) => ctx
                .meta
                .get_field(name)
                .map_or_else(|| name.clone(), |f| f.verbose_name.clone()),
            Self::Computed { header, .. } => header(ctx),
        }
    }

    pub fn cell(&self, ctx: &ColumnCtx<'_>, obj: &E) -> Cell {
        match self {
            Self::Field(name) => Cell::Text(display_value(obj.value(name).as_ref())),
            Self::Computed { value, .. } => value(ctx, obj),
        }
    }
}

impl<E: Entity> From<&str> for ColumnSpec<E> {
    fn from(name: &str) -> Self {
        Self::field(name)
    }
}

/// Text shown for a raw field value.
fn display_value(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::Array(items)) => items
            .iter()
            .map(stark_forms::value_to_string)
            .collect::<Vec<_>>()
            .join(", "),
        Some(v) => stark_forms::value_to_string(v),
    }
}

/// Shows the label of a choice field instead of its stored value.
///
/// Values without a declared label fall back to the raw value.
pub fn get_choice_text<E: Entity>(title: &str, field: &str) -> ColumnSpec<E> {
    let title = title.to_string();
    let field = field.to_string();
    ColumnSpec::computed(
        move |_| title.clone(),
        move |ctx, obj: &E| {
            let value = obj.value(&field);
            let label = value.as_ref().and_then(|v| {
                ctx.meta
                    .get_field(&field)
                    .and_then(|meta| meta.choice_label(v))
            });
            Cell::Text(label.map_or_else(|| display_value(value.as_ref()), str::to_string))
        },
    )
}

/// A checkbox named `pk`, used to select rows for bulk actions.
pub fn display_checkbox<E: Entity>() -> ColumnSpec<E> {
    ColumnSpec::computed(
        |_| "Select".to_string(),
        |_, obj: &E| {
            let pk = obj.pk().to_string();
            Cell::Html(
                Element::<Input>::new()
                    .attr("type", "checkbox")
                    .attr("name", "pk")
                    .attr("value", &pk)
                    .render(),
            )
        },
    )
}

/// A link to the row's edit page, keeping the current list filter.
pub fn display_edit<E: Entity>() -> ColumnSpec<E> {
    ColumnSpec::computed(
        |_| "Edit".to_string(),
        |ctx, obj: &E| link(ctx.urls.reverse_edit_url(ctx.request, obj.pk()), "Edit"),
    )
}

/// A link to the row's delete page, keeping the current list filter.
pub fn display_del<E: Entity>() -> ColumnSpec<E> {
    ColumnSpec::computed(
        |_| "Delete".to_string(),
        |ctx, obj: &E| link(ctx.urls.reverse_delete_url(ctx.request, obj.pk()), "Delete"),
    )
}

fn link(url: crate::Result<String>, text: &str) -> Cell {
    match url {
        Ok(url) => Cell::Html(Element::<A>::new().attr("href", &url).text(text).render()),
        Err(err) => {
            warn!(%err, "cannot reverse row link");
            Cell::Text(String::new())
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde::{Deserialize, Serialize};
    use stark_orm::FieldMeta;
    use stark_router::{PathPattern, Request, UrlResolver};

    use super::*;

    #[derive(Debug, Clone, Serialize, Deserialize)]
    struct User {
        id: i64,
        name: String,
        gender: i64,
        roles: Vec<i64>,
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
                .field(FieldMeta::choices("gender", "Gender", [(1, "Male"), (2, "Female")]))
                .field(FieldMeta::many_to_many("roles", "Roles", "role"))
        }

        fn pk(&self) -> i64 {
            self.id
        }
    }

    fn user() -> User {
        User {
            id: 3,
            name: "ann".into(),
            gender: 2,
            roles: vec![1, 4],
        }
    }

    fn request(path: &str) -> RequestContext {
        let mut resolver = UrlResolver::new();
        resolver.insert(
            "stark:app01_userinfo_edit",
            PathPattern::new("/stark/app01/userinfo/edit/{pk}/"),
        );
        let mut req = Request::get(path);
        req.urls = Arc::new(resolver);
        RequestContext::from_request(&req)
    }

    #[test]
    fn test_field_column() {
        let request = request("/");
        let urls = UrlNames::new("stark", "app01", "userinfo", None);
        let meta = User::meta();
        let ctx = ColumnCtx { request: &request, urls: &urls, meta: &meta };

        let col: ColumnSpec<User> = "name".into();
        assert_eq!(col.header(&ctx), "Name");
        assert_eq!(col.cell(&ctx, &user()), Cell::Text("ann".into()));

        let roles = ColumnSpec::<User>::field("roles");
        assert_eq!(roles.cell(&ctx, &user()).as_str(), "1, 4");
    }

    #[test]
    fn test_choice_text() {
        let request = request("/");
        let urls = UrlNames::new("stark", "app01", "userinfo", None);
        let meta = User::meta();
        let ctx = ColumnCtx { request: &request, urls: &urls, meta: &meta };

        let col = get_choice_text::<User>("Sex", "gender");
        assert_eq!(col.header(&ctx), "Sex");
        assert_eq!(col.cell(&ctx, &user()), Cell::Text("Female".into()));

        let mut odd = user();
        odd.gender = 9;
        assert_eq!(col.cell(&ctx, &odd), Cell::Text("9".into()));
    }

    #[test]
    fn test_builtin_columns() {
        let request = request("/stark/app01/userinfo/list/?q=ann");
        let urls = UrlNames::new("stark", "app01", "userinfo", None);
        let meta = User::meta();
        let ctx = ColumnCtx { request: &request, urls: &urls, meta: &meta };

        let checkbox = display_checkbox::<User>().cell(&ctx, &user());
        assert!(matches!(checkbox, Cell::Html(_)));
        assert!(checkbox.as_str().contains("name=\"pk\""));
        assert!(checkbox.as_str().contains("value=\"3\""));

        let edit = display_edit::<User>().cell(&ctx, &user());
        assert!(edit.as_str().contains("/stark/app01/userinfo/edit/3/?_filter=q%3Dann"));
        assert!(edit.as_str().contains(">Edit</a>"));

        // No delete route registered: the cell degrades to empty text.
        let delete = display_del::<User>().cell(&ctx, &user());
        assert_eq!(delete, Cell::Text(String::new()));
        assert_eq!(display_del::<User>().header(&ctx), "Delete");
    }
}
