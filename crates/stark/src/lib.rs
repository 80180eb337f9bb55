//! # stark
//!
//! A registry-driven admin scaffold. Register a handler per entity and get a
//! list page with search, filters, pagination and bulk actions, plus add,
//! edit and delete pages, all mounted under one URL prefix.
//!
//! - Columns are fields or computed functions ([`ColumnSpec`]), with built-in
//!   checkbox, edit, delete and choice-label columns
//! - `q` searches the handler's `search_list` with OR'd `contains` lookups
//! - Search groups ([`SearchOption`]) render toggle links for choice and
//!   relation fields and filter the list by the selected values
//! - Add, edit and delete links carry the current list query in `_filter`, so
//!   the list comes back exactly as it was
//! - Bulk actions are looked up by name in a static map; unknown names are
//!   rejected
//!
//! ## Quick Start
//!
//! Run the user admin example:
//!
//! ```bash
//! cargo run -p stark --example user_admin
//! ```
//!
//! Then open <http://localhost:3000/stark/app01/userinfo/list/>.
//!
//! ## Customizing
//!
//! [`StarkHandler`] covers the common options with builder methods. For
//! anything else, implement [`EntityHandler`] yourself; every method but
//! `storage` has a default.
//!
//! ## Rendering
//!
//! Views produce a [`Page`] naming its template (`stark/data_list.html`,
//! `stark/change.html` or `stark/delete.html`). The default
//! [`JsonRenderer`] answers with the template name and the context as JSON;
//! plug a template engine in through [`Renderer`].

pub mod actions;
pub mod columns;
pub mod config;
pub mod context;
pub mod error;
pub mod handler;
pub mod pagination;
pub mod renderer;
pub mod search;
pub mod site;
pub mod urls;
pub mod views;

// Re-export main types
pub use actions::{Action, ActionDescriptor, ActionMap, CustomAction, MultiDeleteAction};
pub use columns::{
    Cell, ColumnCtx, ColumnSpec, display_checkbox, display_del, display_edit, get_choice_text,
};
pub use config::SiteConfig;
pub use context::RequestContext;
pub use error::{Result, StarkError};
pub use handler::{EntityHandler, StarkHandler, model_form_fields};
pub use pagination::{PageLink, PagerContext, Pagination};
pub use renderer::{JsonRenderer, Renderer};
pub use search::{GroupChoice, SearchGroupRow, SearchOption};
pub use site::StarkSite;
pub use urls::UrlNames;
pub use views::{ChangeContext, DeleteContext, ListContext, Page, RowContext, ViewResponse};
