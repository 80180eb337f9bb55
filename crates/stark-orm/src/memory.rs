//! In-process [`Storage`] backed by a `RwLock`ed vector.

use std::collections::BTreeMap;
use std::future::ready;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use stark_forms::ValidationErrors;
use tracing::debug;

use crate::error::{Result, StorageError};
use crate::model::{Entity, PK_FIELD};
use crate::query::{Q, loose_eq};
use crate::queryset::QuerySet;
use crate::storage::{BoxFuture, Storage};

/// A row of a related collection: its key, label and data for filtering.
#[derive(Debug, Clone)]
struct RelatedRow {
    pk: i64,
    label: String,
    data: Map<String, Value>,
}

#[derive(Debug)]
struct Table<E> {
    rows: Vec<E>,
    next_id: i64,
}

/// Storage keeping every row in memory.
///
/// Rows are converted through their JSON form: saving merges the submitted
/// data into the existing row's JSON object and deserializes the result.
///
/// # Example
///
/// ```ignore
/// let storage = MemoryStorage::new()
///     .with_rows(users)
///     .with_related("depart", departs);
/// let count = storage.count(&QuerySet::new()).await?;
/// ```
#[derive(Debug)]
pub struct MemoryStorage<E> {
    table: RwLock<Table<E>>,
    related: BTreeMap<String, Vec<RelatedRow>>,
}

impl<E: Entity + DeserializeOwned> Default for MemoryStorage<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Entity + DeserializeOwned> MemoryStorage<E> {
    pub fn new() -> Self {
        Self {
            table: RwLock::new(Table {
                rows: Vec::new(),
                next_id: 1,
            }),
            related: BTreeMap::new(),
        }
    }

    /// Seeds the storage with rows; ids keep counting after the largest.
    #[must_use]
    pub fn with_rows(self, rows: impl IntoIterator<Item = E>) -> Self {
        if let Ok(mut table) = self.table.write() {
            for row in rows {
                table.next_id = table.next_id.max(row.pk() + 1);
                table.rows.push(row);
            }
        }
        self
    }

    /// Registers a related collection, labelled by each entity's display
    /// string.
    #[must_use]
    pub fn with_related<R: Entity>(
        mut self,
        target: impl Into<String>,
        rows: impl IntoIterator<Item = R>,
    ) -> Self {
        let rows = rows
            .into_iter()
            .map(|r| RelatedRow {
                pk: r.pk(),
                label: r.to_string(),
                data: r.to_map(),
            })
            .collect();
        self.related.insert(target.into(), rows);
        self
    }

    /// Returns the number of stored rows.
    pub fn len(&self) -> usize {
        self.read().map(|t| t.rows.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns a copy of every row, in insertion order.
    pub fn all(&self) -> Result<Vec<E>> {
        Ok(self.read()?.rows.clone())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Table<E>>> {
        self.table
            .read()
            .map_err(|_| StorageError::Backend("storage lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Table<E>>> {
        self.table
            .write()
            .map_err(|_| StorageError::Backend("storage lock poisoned".to_string()))
    }

    fn select(&self, qs: &QuerySet) -> Result<Vec<(Map<String, Value>, E)>> {
        let table = self.read()?;
        let mut hits: Vec<_> = table
            .rows
            .iter()
            .map(|row| (row.to_map(), row))
            .filter(|(map, _)| qs.matches(map))
            .map(|(map, row)| (map, row.clone()))
            .collect();
        hits.sort_by(|(a, _), (b, _)| qs.compare(a, b));
        Ok(hits)
    }

    fn check_unique(&self, table: &Table<E>, row: &Map<String, Value>, pk: i64) -> Result<()> {
        let meta = E::meta();
        let mut errors = ValidationErrors::new();

        for field in meta.fields.iter().filter(|f| f.unique) {
            let Some(value) = row.get(field.name).filter(|v| !v.is_null()) else {
                continue;
            };
            let taken = table
                .rows
                .iter()
                .filter(|other| other.pk() != pk)
                .any(|other| other.value(field.name).is_some_and(|v| loose_eq(&v, value)));
            if taken {
                errors.add(
                    field.name,
                    format!(
                        "{} with this {} already exists.",
                        meta.verbose_name, field.verbose_name
                    ),
                );
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(StorageError::Validation(errors))
        }
    }

    fn save_now(&self, data: &Map<String, Value>, existing: Option<&E>) -> Result<E> {
        let mut table = self.write()?;

        let (pk, mut row) = match existing {
            Some(entity) if table.rows.iter().any(|r| r.pk() == entity.pk()) => {
                (entity.pk(), entity.to_map())
            }
            Some(entity) => return Err(StorageError::NotFound(entity.pk())),
            None => (table.next_id, Map::new()),
        };
        for (key, value) in data {
            if key != PK_FIELD {
                row.insert(key.clone(), value.clone());
            }
        }
        row.insert(PK_FIELD.to_string(), Value::from(pk));

        self.check_unique(&table, &row, pk)?;
        let entity: E = serde_json::from_value(Value::Object(row))?;

        match table.rows.iter_mut().find(|r| r.pk() == pk) {
            Some(slot) => *slot = entity.clone(),
            None => {
                table.rows.push(entity.clone());
                table.next_id = table.next_id.max(pk + 1);
            }
        }
        debug!(model = E::meta().model_name, pk, "saved row");
        Ok(entity)
    }

    fn related_now(&self, target: &str, condition: Option<&Q>) -> Result<Vec<(Value, String)>> {
        let rows = self
            .related
            .get(target)
            .ok_or_else(|| StorageError::UnknownRelation(target.to_string()))?;
        Ok(rows
            .iter()
            .filter(|r| condition.is_none_or(|q| q.matches(&r.data)))
            .map(|r| (Value::from(r.pk), r.label.clone()))
            .collect())
    }
}

impl<E: Entity + DeserializeOwned> Storage<E> for MemoryStorage<E> {
    fn count<'a>(&'a self, qs: &'a QuerySet) -> BoxFuture<'a, Result<usize>> {
        Box::pin(ready(self.select(qs).map(|rows| rows.len())))
    }

    fn fetch<'a>(
        &'a self,
        qs: &'a QuerySet,
        start: usize,
        end: usize,
    ) -> BoxFuture<'a, Result<Vec<E>>> {
        let result = self.select(qs).map(|rows| {
            rows.into_iter()
                .skip(start)
                .take(end.saturating_sub(start))
                .map(|(_, row)| row)
                .collect()
        });
        Box::pin(ready(result))
    }

    fn get(&self, pk: i64) -> BoxFuture<'_, Result<Option<E>>> {
        let result = self
            .read()
            .map(|table| table.rows.iter().find(|r| r.pk() == pk).cloned());
        Box::pin(ready(result))
    }

    fn delete<'a>(&'a self, pks: &'a [i64]) -> BoxFuture<'a, Result<usize>> {
        let result = self.write().map(|mut table| {
            let before = table.rows.len();
            table.rows.retain(|r| !pks.contains(&r.pk()));
            before - table.rows.len()
        });
        if let Ok(deleted) = &result {
            debug!(model = E::meta().model_name, deleted, "deleted rows");
        }
        Box::pin(ready(result))
    }

    fn save<'a>(
        &'a self,
        data: &'a Map<String, Value>,
        existing: Option<&'a E>,
    ) -> BoxFuture<'a, Result<E>> {
        Box::pin(ready(self.save_now(data, existing)))
    }

    fn related_choices<'a>(
        &'a self,
        target: &'a str,
        condition: Option<&'a Q>,
    ) -> BoxFuture<'a, Result<Vec<(Value, String)>>> {
        Box::pin(ready(self.related_now(target, condition)))
    }
}
