//! The storage abstraction the admin reads and writes through.

use std::future::Future;
use std::pin::Pin;

use serde_json::{Map, Value};

use crate::error::Result;
use crate::model::Entity;
use crate::query::Q;
use crate::queryset::QuerySet;

/// A boxed future, used to keep [`Storage`] object-safe.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A queryable collection of entities.
///
/// Every operation is atomic from the caller's point of view. Implementations
/// must be shareable across requests.
pub trait Storage<E: Entity>: Send + Sync {
    /// Counts the rows matching `qs`.
    fn count<'a>(&'a self, qs: &'a QuerySet) -> BoxFuture<'a, Result<usize>>;

    /// Returns rows `[start, end)` of the ordered result of `qs`.
    fn fetch<'a>(
        &'a self,
        qs: &'a QuerySet,
        start: usize,
        end: usize,
    ) -> BoxFuture<'a, Result<Vec<E>>>;

    /// Loads one row by primary key.
    fn get(&self, pk: i64) -> BoxFuture<'_, Result<Option<E>>>;

    /// Deletes the given primary keys, returning how many rows went away.
    /// Unknown keys are ignored.
    fn delete<'a>(&'a self, pks: &'a [i64]) -> BoxFuture<'a, Result<usize>>;

    /// Creates a row from `data`, or updates `existing` with it.
    ///
    /// Keys of `data` override the existing values; keys it lacks keep
    /// them. Rejected data yields [`StorageError::Validation`].
    ///
    /// [`StorageError::Validation`]: crate::StorageError::Validation
    fn save<'a>(
        &'a self,
        data: &'a Map<String, Value>,
        existing: Option<&'a E>,
    ) -> BoxFuture<'a, Result<E>>;

    /// Lists `(pk, label)` pairs of a related collection, optionally
    /// narrowed by `condition`.
    fn related_choices<'a>(
        &'a self,
        target: &'a str,
        condition: Option<&'a Q>,
    ) -> BoxFuture<'a, Result<Vec<(Value, String)>>>;
}
