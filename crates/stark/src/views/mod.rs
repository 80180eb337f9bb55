//! List, add/edit and delete views.
//!
//! Views produce a [`ViewResponse`]; turning a rendered [`Page`] into bytes
//! is the [`Renderer`](crate::Renderer)'s job.

mod change;
mod delete;
mod list;

use serde::Serialize;
use stark_router::Response;

use crate::context::RequestContext;
use crate::error::Result;
use crate::handler::EntityHandler;

pub use change::ChangeContext;
pub use delete::DeleteContext;
pub use list::{ListContext, RowContext};

pub(crate) use change::{add_view, edit_view};
pub(crate) use delete::delete_view;
pub(crate) use list::list_view;

/// Outcome of a view.
#[derive(Debug)]
pub enum ViewResponse {
    /// A page for the renderer.
    Render(Page),
    /// Redirect to a URL.
    Redirect(String),
    /// A plain informational message, such as for a missing object.
    Message(String),
    /// A response built by the handler itself.
    Response(Response),
}

/// Template context of a rendered view.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Page {
    List(ListContext),
    Change(ChangeContext),
    Delete(DeleteContext),
}

impl Page {
    /// Name of the template the page is meant for.
    pub const fn template(&self) -> &'static str {
        match self {
            Self::List(_) => "stark/data_list.html",
            Self::Change(_) => "stark/change.html",
            Self::Delete(_) => "stark/delete.html",
        }
    }
}

/// Message returned when the object addressed by the URL does not exist.
pub(crate) const NOT_FOUND: &str = "The object does not exist, please select again.";

/// Loads the entity addressed by the `pk` path parameter.
///
/// A missing or non-numeric `pk` is treated like an absent row.
pub(crate) async fn load_object<H: EntityHandler>(
    handler: &H,
    ctx: &RequestContext,
) -> Result<Option<H::Entity>> {
    match ctx.pk() {
        Some(pk) => Ok(handler.storage().get(pk).await?),
        None => Ok(None),
    }
}
