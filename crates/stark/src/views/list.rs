use serde::Serialize;
use stark_orm::query::split_lookup;
use stark_orm::{Entity, Q, QuerySet};
use tracing::{info, warn};

use super::{Page, ViewResponse};
use crate::actions::ActionDescriptor;
use crate::columns::{Cell, ColumnCtx};
use crate::context::RequestContext;
use crate::error::Result;
use crate::handler::EntityHandler;
use crate::pagination::{PagerContext, Pagination};
use crate::search::SearchGroupRow;
use crate::site::HandlerBinding;

/// One table row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowContext {
    pub pk: i64,
    pub cells: Vec<Cell>,
}

/// Template context of the list page.
#[derive(Debug, Clone, Serialize)]
pub struct ListContext {
    pub title: String,
    pub headers: Vec<String>,
    pub rows: Vec<RowContext>,
    pub pager: PagerContext,
    /// Markup of the add button, when shown.
    pub add_btn: Option<String>,
    pub action_dict: Vec<ActionDescriptor>,
    /// Set when the posted action was rejected.
    pub action_error: Option<String>,
    pub search_list: Vec<String>,
    pub search_value: String,
    pub search_group: Vec<SearchGroupRow>,
}

/// ORs one predicate per search field. Plain field names match with
/// `contains`; `field__lookup` specs use that lookup.
pub(crate) fn search_filter(fields: &[String], value: &str) -> Option<Q> {
    if value.is_empty() {
        return None;
    }
    Q::any(fields.iter().map(|spec| match split_lookup(spec) {
        (field, None) => Q::contains(field, value),
        _ => Q::lookup(spec, value),
    }))
}

pub(crate) async fn list_view<H: EntityHandler>(
    binding: &HandlerBinding<H>,
    ctx: &RequestContext,
) -> Result<ViewResponse> {
    let handler = &binding.handler;
    let config = &binding.config;
    let storage = handler.storage();
    let meta = H::Entity::meta();

    let mut action_error = None;
    if ctx.is_post() {
        if let Some(name) = ctx.form.get("action").filter(|name| !name.is_empty()) {
            match binding.actions.get(name) {
                Ok(action) => {
                    let selected = ctx.selected_pks();
                    info!(
                        model = meta.model_name,
                        action = name,
                        selected = selected.len(),
                        "running action"
                    );
                    if let Some(response) = action.execute(storage, ctx, &selected).await? {
                        return Ok(response);
                    }
                }
                Err(err) => {
                    warn!(model = meta.model_name, %err, "rejected action");
                    action_error = Some(err.to_string());
                }
            }
        }
    }

    let search_list = handler.search_list();
    let search_value = ctx
        .query
        .get(&config.search_param)
        .map(str::trim)
        .unwrap_or_default()
        .to_string();

    let mut qs = QuerySet::new();
    if let Some(q) = search_filter(&search_list, &search_value) {
        qs = qs.filter(q);
    }

    let search_group = handler.search_group();
    for option in &search_group {
        let values = option.selected(&ctx.query);
        if !values.is_empty() {
            qs = qs.filter(Q::in_list(&option.field, values));
        }
    }

    qs = qs.order_by_clear(&handler.order_list());

    let total = storage.count(&qs).await?;
    let pager = Pagination::new(
        ctx.query.get(&config.page_param),
        total,
        ctx.path.clone(),
        &ctx.query,
        handler.per_page().unwrap_or(config.per_page),
        config.max_pager_count,
        &config.page_param,
    );
    let objects = storage.fetch(&qs, pager.start(), pager.end()).await?;

    let col_ctx = ColumnCtx {
        request: ctx,
        urls: &binding.urls,
        meta: &meta,
    };
    let columns = handler.list_display();
    let (headers, rows) = if columns.is_empty() {
        let rows = objects
            .iter()
            .map(|obj| RowContext {
                pk: obj.pk(),
                cells: vec![Cell::Text(obj.to_string())],
            })
            .collect();
        (vec![meta.verbose_name.clone()], rows)
    } else {
        let headers = columns.iter().map(|col| col.header(&col_ctx)).collect();
        let rows = objects
            .iter()
            .map(|obj| RowContext {
                pk: obj.pk(),
                cells: columns.iter().map(|col| col.cell(&col_ctx, obj)).collect(),
            })
            .collect();
        (headers, rows)
    };

    let mut group_rows = Vec::with_capacity(search_group.len());
    for option in &search_group {
        group_rows.push(
            option
                .resolve(&meta, storage, ctx, &config.page_param)
                .await?,
        );
    }

    Ok(ViewResponse::Render(Page::List(ListContext {
        title: meta.verbose_name.clone(),
        headers,
        rows,
        pager: pager.context(),
        add_btn: handler.add_btn(&col_ctx),
        action_dict: binding.actions.descriptors().to_vec(),
        action_error,
        search_list,
        search_value,
        search_group: group_rows,
    })))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn row(name: &str, email: &str) -> serde_json::Map<String, serde_json::Value> {
        match json!({ "name": name, "email": email }) {
            serde_json::Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_search_is_an_or_of_contains() {
        let fields = vec!["name".to_string(), "email".to_string()];
        let q = search_filter(&fields, "ann").unwrap();

        assert!(q.matches(&row("ann", "x@example.com")));
        assert!(q.matches(&row("bob", "joanna@example.com")));
        assert!(!q.matches(&row("bob", "bob@example.com")));
    }

    #[test]
    fn test_search_lookup_suffix() {
        let fields = vec!["name__istartswith".to_string()];
        let q = search_filter(&fields, "AN").unwrap();
        assert!(q.matches(&row("ann", "")));
        assert!(!q.matches(&row("joanna", "")));
    }

    #[test]
    fn test_empty_search_is_unfiltered() {
        let fields = vec!["name".to_string()];
        assert!(search_filter(&fields, "").is_none());
        assert!(search_filter(&[], "ann").is_none());
    }
}
