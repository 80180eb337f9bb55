//! QuerySet: a backend-neutral description of which rows to read.
//!
//! A QuerySet holds filters, excludes and ordering. It never touches data
//! itself; a [`Storage`](crate::Storage) implementation evaluates it. The
//! helpers [`QuerySet::matches`] and [`QuerySet::compare`] let in-process
//! backends do so without re-implementing the semantics.

use std::cmp::Ordering;

use serde_json::{Map, Value};

use crate::query::{Q, loose_cmp};

/// Order direction for sorting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderDirection {
    /// Ascending order (ASC)
    Asc,
    /// Descending order (DESC)
    Desc,
}

/// An ordering specification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    /// Field to order by
    pub field: String,
    /// Order direction
    pub direction: OrderDirection,
}

impl OrderBy {
    /// Creates a new ascending order specification.
    pub fn asc(field: &str) -> Self {
        Self {
            field: field.to_string(),
            direction: OrderDirection::Asc,
        }
    }

    /// Creates a new descending order specification.
    pub fn desc(field: &str) -> Self {
        Self {
            field: field.to_string(),
            direction: OrderDirection::Desc,
        }
    }

    /// Parses a Django-style order specification.
    ///
    /// Prefix with `-` for descending order.
    /// Example: `"-id"` for descending, `"name"` for ascending.
    pub fn parse(spec: &str) -> Self {
        if let Some(field) = spec.strip_prefix('-') {
            Self::desc(field)
        } else {
            Self::asc(spec)
        }
    }

    fn compare(&self, a: &Map<String, Value>, b: &Map<String, Value>) -> Ordering {
        let null = Value::Null;
        let left = a.get(&self.field).unwrap_or(&null);
        let right = b.get(&self.field).unwrap_or(&null);
        let ord = loose_cmp(left, right).unwrap_or(Ordering::Equal);
        match self.direction {
            OrderDirection::Asc => ord,
            OrderDirection::Desc => ord.reverse(),
        }
    }
}

impl std::fmt::Display for OrderBy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.direction {
            OrderDirection::Asc => write!(f, "{}", self.field),
            OrderDirection::Desc => write!(f, "-{}", self.field),
        }
    }
}

/// A chainable query description.
///
/// QuerySets are immutable values - each method returns a new QuerySet with
/// the modification applied.
///
/// # Example
///
/// ```rust
/// use stark_orm::{Q, QuerySet};
///
/// let qs = QuerySet::new()
///     .filter(Q::icontains("name", "ann").or(Q::icontains("email", "ann")))
///     .exclude(Q::eq("status", "banned"))
///     .order_by("-id");
/// assert_eq!(qs.ordering().len(), 1);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuerySet {
    /// Filter expressions (combined with AND)
    filters: Vec<Q>,
    /// Exclude expressions (each one negated, then combined with AND)
    excludes: Vec<Q>,
    /// Ordering specifications
    order_by: Vec<OrderBy>,
}

impl QuerySet {
    /// Creates a new QuerySet matching every row.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a filter to the QuerySet.
    ///
    /// Multiple filters are combined with AND.
    #[must_use]
    pub fn filter(mut self, q: Q) -> Self {
        self.filters.push(q);
        self
    }

    /// Adds an exclude filter to the QuerySet.
    #[must_use]
    pub fn exclude(mut self, q: Q) -> Self {
        self.excludes.push(q);
        self
    }

    /// Appends an ordering key. Use `-` prefix for descending order.
    #[must_use]
    pub fn order_by(mut self, spec: &str) -> Self {
        self.order_by.push(OrderBy::parse(spec));
        self
    }

    /// Clears all ordering and sets new ordering.
    #[must_use]
    pub fn order_by_clear<S: AsRef<str>>(mut self, specs: &[S]) -> Self {
        self.order_by = specs.iter().map(|s| OrderBy::parse(s.as_ref())).collect();
        self
    }

    pub fn filters(&self) -> &[Q] {
        &self.filters
    }

    pub fn excludes(&self) -> &[Q] {
        &self.excludes
    }

    pub fn ordering(&self) -> &[OrderBy] {
        &self.order_by
    }

    /// Returns whether a row passes every filter and no exclude.
    pub fn matches(&self, row: &Map<String, Value>) -> bool {
        self.filters.iter().all(|q| q.matches(row)) && !self.excludes.iter().any(|q| q.matches(row))
    }

    /// Compares two rows by the ordering keys, in priority order.
    pub fn compare(&self, a: &Map<String, Value>, b: &Map<String, Value>) -> Ordering {
        self.order_by
            .iter()
            .map(|o| o.compare(a, b))
            .find(|ord| *ord != Ordering::Equal)
            .unwrap_or(Ordering::Equal)
    }
}
