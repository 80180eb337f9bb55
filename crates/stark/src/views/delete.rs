use serde::Serialize;
use stark_orm::Entity;
use tracing::info;

use super::{NOT_FOUND, Page, ViewResponse, load_object};
use crate::context::RequestContext;
use crate::error::Result;
use crate::handler::EntityHandler;
use crate::site::HandlerBinding;

/// Template context of the delete confirmation page.
#[derive(Debug, Clone, Serialize)]
pub struct DeleteContext {
    pub title: String,
    /// Display string of the object about to be deleted.
    pub object: String,
    pub cancel_url: String,
}

pub(crate) async fn delete_view<H: EntityHandler>(
    binding: &HandlerBinding<H>,
    ctx: &RequestContext,
) -> Result<ViewResponse> {
    let Some(obj) = load_object(&binding.handler, ctx).await? else {
        return Ok(ViewResponse::Message(NOT_FOUND.to_string()));
    };
    let meta = H::Entity::meta();
    let list_url = binding.urls.reverse_list_url(ctx)?;

    if ctx.is_post() {
        let pk = obj.pk();
        binding.handler.storage().delete(&[pk]).await?;
        info!(model = meta.model_name, pk, "object deleted");
        return Ok(ViewResponse::Redirect(list_url));
    }

    Ok(ViewResponse::Render(Page::Delete(DeleteContext {
        title: format!("Delete {}", meta.verbose_name),
        object: obj.to_string(),
        cancel_url: list_url,
    })))
}
