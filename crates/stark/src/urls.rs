//! URL names per entity and filter-preserving reverse helpers.
//!
//! Every handler's routes are named `{app}_{model}_{op}`, or
//! `{app}_{model}_{prev}_{op}` when registered with a prefix. The add, edit
//! and delete links carry the current list query in a `_filter` parameter so
//! that returning to the list restores exactly the same search, filter and
//! page.

use stark_router::QueryParams;

use crate::context::RequestContext;
use crate::error::Result;

/// The four operations every handler serves.
pub const LIST: &str = "list";
pub const ADD: &str = "add";
pub const EDIT: &str = "edit";
pub const DELETE: &str = "delete";

/// URL naming for one registered handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlNames {
    namespace: String,
    app_label: String,
    model_name: String,
    prev: Option<String>,
    filter_param: String,
}

impl UrlNames {
    pub fn new(
        namespace: impl Into<String>,
        app_label: impl Into<String>,
        model_name: impl Into<String>,
        prev: Option<&str>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            app_label: app_label.into(),
            model_name: model_name.into(),
            prev: prev.map(str::to_string),
            filter_param: "_filter".to_string(),
        }
    }

    /// Sets the query parameter that carries the preserved list filter.
    #[must_use]
    pub fn filter_param(mut self, param: impl Into<String>) -> Self {
        self.filter_param = param.into();
        self
    }

    pub fn prev(&self) -> Option<&str> {
        self.prev.as_deref()
    }

    /// Path segment the handler's routes are mounted under.
    pub fn base_path(&self) -> String {
        match &self.prev {
            Some(prev) => format!("/{}/{}/{prev}/", self.app_label, self.model_name),
            None => format!("/{}/{}/", self.app_label, self.model_name),
        }
    }

    /// Unqualified URL name of an operation.
    pub fn url_name(&self, op: &str) -> String {
        match &self.prev {
            Some(prev) => format!("{}_{}_{prev}_{op}", self.app_label, self.model_name),
            None => format!("{}_{}_{op}", self.app_label, self.model_name),
        }
    }

    /// Namespace-qualified URL name, as used for reverse lookups.
    pub fn qualified(&self, op: &str) -> String {
        format!("{}:{}", self.namespace, self.url_name(op))
    }

    pub fn list_name(&self) -> String {
        self.url_name(LIST)
    }

    pub fn add_name(&self) -> String {
        self.url_name(ADD)
    }

    pub fn edit_name(&self) -> String {
        self.url_name(EDIT)
    }

    pub fn delete_name(&self) -> String {
        self.url_name(DELETE)
    }

    /// Reverses any of the handler's routes, including extra ones.
    pub fn reverse_url(
        &self,
        ctx: &RequestContext,
        op: &str,
        params: &[(&str, &str)],
    ) -> Result<String> {
        Ok(ctx.urls.reverse(&self.qualified(op), params)?)
    }

    /// Add URL carrying the current query as `_filter`.
    pub fn reverse_add_url(&self, ctx: &RequestContext) -> Result<String> {
        let base = self.reverse_url(ctx, ADD, &[])?;
        Ok(self.with_filter(base, &ctx.query))
    }

    /// Edit URL for `pk` carrying the current query as `_filter`.
    pub fn reverse_edit_url(&self, ctx: &RequestContext, pk: i64) -> Result<String> {
        let pk = pk.to_string();
        let base = self.reverse_url(ctx, EDIT, &[("pk", &pk)])?;
        Ok(self.with_filter(base, &ctx.query))
    }

    /// Delete URL for `pk` carrying the current query as `_filter`.
    pub fn reverse_delete_url(&self, ctx: &RequestContext, pk: i64) -> Result<String> {
        let pk = pk.to_string();
        let base = self.reverse_url(ctx, DELETE, &[("pk", &pk)])?;
        Ok(self.with_filter(base, &ctx.query))
    }

    /// List URL restoring the query preserved in `_filter`, if any.
    pub fn reverse_list_url(&self, ctx: &RequestContext) -> Result<String> {
        let base = self.reverse_url(ctx, LIST, &[])?;
        match ctx.query.get(&self.filter_param) {
            Some(filter) if !filter.is_empty() => Ok(format!("{base}?{filter}")),
            _ => Ok(base),
        }
    }

    fn with_filter(&self, base: String, query: &QueryParams) -> String {
        if query.is_empty() {
            return base;
        }
        format!(
            "{base}?{}={}",
            urlencoding::encode(&self.filter_param),
            urlencoding::encode(&query.urlencode())
        )
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use stark_router::{PathPattern, Request, UrlResolver};

    use super::*;

    fn names(prev: Option<&str>) -> UrlNames {
        UrlNames::new("stark", "app01", "userinfo", prev)
    }

    fn ctx(path: &str) -> RequestContext {
        let mut resolver = UrlResolver::new();
        for op in [LIST, ADD] {
            resolver.insert(
                format!("stark:app01_userinfo_{op}"),
                PathPattern::new(&format!("/stark/app01/userinfo/{op}/")),
            );
        }
        for op in [EDIT, DELETE] {
            resolver.insert(
                format!("stark:app01_userinfo_{op}"),
                PathPattern::new(&format!("/stark/app01/userinfo/{op}/{{pk}}/")),
            );
        }
        let mut req = Request::get(path);
        req.urls = Arc::new(resolver);
        RequestContext::from_request(&req)
    }

    #[test]
    fn test_url_names() {
        assert_eq!(names(None).list_name(), "app01_userinfo_list");
        assert_eq!(names(Some("private")).edit_name(), "app01_userinfo_private_edit");
        assert_eq!(names(None).qualified(DELETE), "stark:app01_userinfo_delete");
        assert_eq!(names(None).base_path(), "/app01/userinfo/");
        assert_eq!(names(Some("private")).base_path(), "/app01/userinfo/private/");
    }

    #[test]
    fn test_reverse_without_query_has_no_filter() {
        let ctx = ctx("/stark/app01/userinfo/list/");
        let urls = names(None);
        assert_eq!(urls.reverse_add_url(&ctx).unwrap(), "/stark/app01/userinfo/add/");
        assert_eq!(
            urls.reverse_edit_url(&ctx, 4).unwrap(),
            "/stark/app01/userinfo/edit/4/"
        );
        assert_eq!(urls.reverse_list_url(&ctx).unwrap(), "/stark/app01/userinfo/list/");
    }

    #[test]
    fn test_reverse_preserves_query() {
        let list = ctx("/stark/app01/userinfo/list/?q=ann&page=2");
        let urls = names(None);

        let edit = urls.reverse_edit_url(&list, 4).unwrap();
        assert_eq!(edit, "/stark/app01/userinfo/edit/4/?_filter=q%3Dann%26page%3D2");

        // Landing on the edit page, the list URL restores the original query.
        let on_edit = ctx(&edit);
        assert_eq!(
            urls.reverse_list_url(&on_edit).unwrap(),
            "/stark/app01/userinfo/list/?q=ann&page=2"
        );
    }

    #[test]
    fn test_round_trip_with_special_characters() {
        let list = ctx("/stark/app01/userinfo/list/?q=a%26b%3Dc&gender=1&gender=2");
        let urls = names(None);
        let delete = urls.reverse_delete_url(&list, 9).unwrap();
        let back = urls.reverse_list_url(&ctx(&delete)).unwrap();
        let restored = ctx(&back);
        assert_eq!(restored.query, list.query);
    }

    #[test]
    fn test_unknown_route_is_an_error() {
        let ctx = ctx("/");
        assert!(names(Some("private")).reverse_add_url(&ctx).is_err());
    }
}
