use serde::Serialize;
use stark_forms::{BoundForm, FormContext};
use stark_orm::{Entity, StorageError};
use tracing::{debug, info};

use super::{NOT_FOUND, Page, ViewResponse, load_object};
use crate::context::RequestContext;
use crate::error::{Result, StarkError};
use crate::handler::EntityHandler;
use crate::site::HandlerBinding;

/// Template context of the add and edit pages.
#[derive(Debug, Clone, Serialize)]
pub struct ChangeContext {
    pub title: String,
    pub is_update: bool,
    pub form: FormContext,
    /// List URL with the preserved filter.
    pub cancel_url: String,
}

pub(crate) async fn add_view<H: EntityHandler>(
    binding: &HandlerBinding<H>,
    ctx: &RequestContext,
) -> Result<ViewResponse> {
    change(binding, ctx, None).await
}

pub(crate) async fn edit_view<H: EntityHandler>(
    binding: &HandlerBinding<H>,
    ctx: &RequestContext,
) -> Result<ViewResponse> {
    match load_object(&binding.handler, ctx).await? {
        Some(obj) => change(binding, ctx, Some(obj)).await,
        None => {
            debug!(path = %ctx.path, "edit target not found");
            Ok(ViewResponse::Message(NOT_FOUND.to_string()))
        }
    }
}

async fn change<H: EntityHandler>(
    binding: &HandlerBinding<H>,
    ctx: &RequestContext,
    existing: Option<H::Entity>,
) -> Result<ViewResponse> {
    let handler = &binding.handler;
    let meta = H::Entity::meta();
    let fields = handler.form_fields(ctx).await?;
    let initial = existing.as_ref().map(Entity::to_map).unwrap_or_default();

    let form = if ctx.is_post() {
        let mut form = BoundForm::bind(fields, initial, ctx.form.iter());
        if form.is_valid() {
            match handler.save(ctx, &form, existing.as_ref()).await {
                Ok(saved) => {
                    info!(
                        model = meta.model_name,
                        pk = saved.pk(),
                        is_update = existing.is_some(),
                        "object saved"
                    );
                    return Ok(ViewResponse::Redirect(binding.urls.reverse_list_url(ctx)?));
                }
                Err(StarkError::Storage(StorageError::Validation(errors))) => {
                    form.add_errors(errors);
                }
                Err(StarkError::Storage(StorageError::NotFound(pk))) => {
                    debug!(model = meta.model_name, pk, "row vanished before save");
                    return Ok(ViewResponse::Message(NOT_FOUND.to_string()));
                }
                Err(err) => return Err(err),
            }
        }
        form
    } else {
        BoundForm::unbound(fields, initial)
    };

    let title = match &existing {
        Some(obj) => format!("Edit {} {obj}", meta.verbose_name),
        None => format!("Add {}", meta.verbose_name),
    };

    Ok(ViewResponse::Render(Page::Change(ChangeContext {
        title,
        is_update: existing.is_some(),
        form: form.context(),
        cancel_url: binding.urls.reverse_list_url(ctx)?,
    })))
}
