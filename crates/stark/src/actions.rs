//! Bulk actions run from the list view.
//!
//! A handler declares its actions once; the site turns them into an
//! [`ActionMap`] keyed by name. The `action` value posted by the list form
//! is only ever looked up in that map.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use stark_orm::{BoxFuture, Entity, Storage};
use tracing::info;

use crate::context::RequestContext;
use crate::error::{Result, StarkError};
use crate::views::ViewResponse;

/// A bulk operation over the selected rows.
///
/// Returning `Some(response)` ends the request with that response;
/// `None` lets the list render as usual.
pub trait Action<E: Entity>: Send + Sync {
    /// Name posted by the list form.
    fn name(&self) -> &str;

    /// Human-readable label.
    fn label(&self) -> &str;

    fn execute<'a>(
        &'a self,
        storage: &'a dyn Storage<E>,
        ctx: &'a RequestContext,
        selected: &'a [i64],
    ) -> BoxFuture<'a, Result<Option<ViewResponse>>>;
}

/// Name and label of an action, as shown in the list's action menu.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionDescriptor {
    pub name: String,
    pub label: String,
}

/// Deletes the selected rows.
#[derive(Debug, Clone, Copy, Default)]
pub struct MultiDeleteAction;

impl<E: Entity> Action<E> for MultiDeleteAction {
    fn name(&self) -> &str {
        "multi_delete"
    }

    fn label(&self) -> &str {
        "Delete selected"
    }

    fn execute<'a>(
        &'a self,
        storage: &'a dyn Storage<E>,
        _ctx: &'a RequestContext,
        selected: &'a [i64],
    ) -> BoxFuture<'a, Result<Option<ViewResponse>>> {
        Box::pin(async move {
            if selected.is_empty() {
                return Ok(None);
            }
            let deleted = storage.delete(selected).await?;
            info!(model = E::meta().model_name, deleted, "bulk delete");
            Ok(None)
        })
    }
}

type CustomFn = dyn Fn(RequestContext, Vec<i64>) -> BoxFuture<'static, Result<Option<ViewResponse>>>
    + Send
    + Sync;

/// An action backed by a closure.
///
/// The closure receives owned copies of the request context and the
/// selection, so it can be `async move` without borrowing.
pub struct CustomAction {
    name: String,
    label: String,
    handler: Arc<CustomFn>,
}

impl CustomAction {
    pub fn new<F>(name: impl Into<String>, label: impl Into<String>, handler: F) -> Self
    where
        F: Fn(RequestContext, Vec<i64>) -> BoxFuture<'static, Result<Option<ViewResponse>>>
            + Send
            + Sync
            + 'static,
    {
        Self {
            name: name.into(),
            label: label.into(),
            handler: Arc::new(handler),
        }
    }
}

impl<E: Entity> Action<E> for CustomAction {
    fn name(&self) -> &str {
        &self.name
    }

    fn label(&self) -> &str {
        &self.label
    }

    fn execute<'a>(
        &'a self,
        _storage: &'a dyn Storage<E>,
        ctx: &'a RequestContext,
        selected: &'a [i64],
    ) -> BoxFuture<'a, Result<Option<ViewResponse>>> {
        (self.handler)(ctx.clone(), selected.to_vec())
    }
}

/// Declared actions keyed by name.
pub struct ActionMap<E> {
    descriptors: Vec<ActionDescriptor>,
    actions: BTreeMap<String, Arc<dyn Action<E>>>,
    duplicates: Vec<String>,
}

impl<E: Entity> ActionMap<E> {
    /// Builds the map. When two actions share a name the first one wins
    /// and the name is remembered in [`ActionMap::duplicates`].
    pub fn new(actions: Vec<Arc<dyn Action<E>>>) -> Self {
        let mut map = Self {
            descriptors: Vec::new(),
            actions: BTreeMap::new(),
            duplicates: Vec::new(),
        };
        for action in actions {
            let name = action.name().to_string();
            if map.actions.contains_key(&name) {
                map.duplicates.push(name);
                continue;
            }
            map.descriptors.push(ActionDescriptor {
                name: name.clone(),
                label: action.label().to_string(),
            });
            map.actions.insert(name, action);
        }
        map
    }

    /// Name and label of every action, in declaration order.
    pub fn descriptors(&self) -> &[ActionDescriptor] {
        &self.descriptors
    }

    pub fn duplicates(&self) -> &[String] {
        &self.duplicates
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Looks an action up by the name a client posted.
    pub fn get(&self, name: &str) -> Result<&Arc<dyn Action<E>>> {
        self.actions
            .get(name)
            .ok_or_else(|| StarkError::UnknownAction(name.to_string()))
    }
}
