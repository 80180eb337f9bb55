//! Q objects for complex query filtering.
//!
//! Q objects build predicate trees that can be combined with AND, OR, and
//! NOT, similar to Django's Q objects. A storage backend either translates
//! the tree into its own query language or evaluates it directly against a
//! row with [`Q::matches`].

use std::cmp::Ordering;
use std::fmt;

use serde_json::{Map, Value};

/// A filter expression that can be combined with other expressions.
///
/// # Example
///
/// ```rust
/// use stark_orm::Q;
///
/// // Simple equality
/// let filter = Q::eq("status", "active");
///
/// // Complex boolean logic
/// let filter = Q::eq("status", "active")
///     .and(Q::gt("age", 18).or(Q::eq("verified", true)));
///
/// // Django-style lookups
/// let filter = Q::lookup("name__icontains", "ann");
/// assert_eq!(filter.to_string(), "name ICONTAINS \"ann\"");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Q {
    expr: FilterExpr,
}

/// Internal filter expression representation.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterExpr {
    /// Simple comparison: field op value
    Comparison {
        field: String,
        op: CompareOp,
        value: Value,
    },
    /// IS NULL check
    IsNull { field: String },
    /// IN list check
    InList { field: String, values: Vec<Value> },
    /// Substring or prefix match on the field's text form
    Text {
        field: String,
        op: TextOp,
        value: String,
    },
    /// AND combination
    And(Box<FilterExpr>, Box<FilterExpr>),
    /// OR combination
    Or(Box<FilterExpr>, Box<FilterExpr>),
    /// NOT negation
    Not(Box<FilterExpr>),
}

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    /// Equal (=)
    Eq,
    /// Not equal (!=)
    Ne,
    /// Greater than (>)
    Gt,
    /// Greater than or equal (>=)
    Gte,
    /// Less than (<)
    Lt,
    /// Less than or equal (<=)
    Lte,
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Eq => write!(f, "="),
            Self::Ne => write!(f, "!="),
            Self::Gt => write!(f, ">"),
            Self::Gte => write!(f, ">="),
            Self::Lt => write!(f, "<"),
            Self::Lte => write!(f, "<="),
        }
    }
}

/// Text matching operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextOp {
    Contains,
    IContains,
    StartsWith,
    IStartsWith,
    IExact,
}

impl fmt::Display for TextOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Contains => write!(f, "CONTAINS"),
            Self::IContains => write!(f, "ICONTAINS"),
            Self::StartsWith => write!(f, "STARTSWITH"),
            Self::IStartsWith => write!(f, "ISTARTSWITH"),
            Self::IExact => write!(f, "IEXACT"),
        }
    }
}

/// Splits `field__lookup` into the field and a known lookup suffix.
///
/// Unknown suffixes are treated as part of the field name.
pub fn split_lookup(spec: &str) -> (&str, Option<&str>) {
    const LOOKUPS: [&str; 11] = [
        "exact",
        "iexact",
        "contains",
        "icontains",
        "startswith",
        "istartswith",
        "gt",
        "gte",
        "lt",
        "lte",
        "in",
    ];

    match spec.rsplit_once("__") {
        Some((field, lookup)) if !field.is_empty() && LOOKUPS.contains(&lookup) => {
            (field, Some(lookup))
        }
        _ => (spec, None),
    }
}

impl Q {
    fn comparison(field: &str, op: CompareOp, value: impl Into<Value>) -> Self {
        Self {
            expr: FilterExpr::Comparison {
                field: field.to_string(),
                op,
                value: value.into(),
            },
        }
    }

    fn text(field: &str, op: TextOp, value: &str) -> Self {
        Self {
            expr: FilterExpr::Text {
                field: field.to_string(),
                op,
                value: value.to_string(),
            },
        }
    }

    /// Creates an equality filter (field = value).
    pub fn eq(field: &str, value: impl Into<Value>) -> Self {
        Self::comparison(field, CompareOp::Eq, value)
    }

    /// Creates an inequality filter (field != value).
    pub fn ne(field: &str, value: impl Into<Value>) -> Self {
        Self::comparison(field, CompareOp::Ne, value)
    }

    /// Creates a greater-than filter (field > value).
    pub fn gt(field: &str, value: impl Into<Value>) -> Self {
        Self::comparison(field, CompareOp::Gt, value)
    }

    /// Creates a greater-than-or-equal filter (field >= value).
    pub fn gte(field: &str, value: impl Into<Value>) -> Self {
        Self::comparison(field, CompareOp::Gte, value)
    }

    /// Creates a less-than filter (field < value).
    pub fn lt(field: &str, value: impl Into<Value>) -> Self {
        Self::comparison(field, CompareOp::Lt, value)
    }

    /// Creates a less-than-or-equal filter (field <= value).
    pub fn lte(field: &str, value: impl Into<Value>) -> Self {
        Self::comparison(field, CompareOp::Lte, value)
    }

    /// Creates an IS NULL filter.
    pub fn is_null(field: &str) -> Self {
        Self {
            expr: FilterExpr::IsNull {
                field: field.to_string(),
            },
        }
    }

    /// Creates an IN list filter.
    pub fn in_list<V: Into<Value>>(field: &str, values: impl IntoIterator<Item = V>) -> Self {
        Self {
            expr: FilterExpr::InList {
                field: field.to_string(),
                values: values.into_iter().map(Into::into).collect(),
            },
        }
    }

    /// Creates a case-sensitive contains filter.
    pub fn contains(field: &str, value: &str) -> Self {
        Self::text(field, TextOp::Contains, value)
    }

    /// Creates a case-insensitive contains filter.
    pub fn icontains(field: &str, value: &str) -> Self {
        Self::text(field, TextOp::IContains, value)
    }

    /// Creates a starts-with filter.
    pub fn startswith(field: &str, value: &str) -> Self {
        Self::text(field, TextOp::StartsWith, value)
    }

    /// Creates a case-insensitive starts-with filter.
    pub fn istartswith(field: &str, value: &str) -> Self {
        Self::text(field, TextOp::IStartsWith, value)
    }

    /// Creates a filter from a Django-style `field__lookup` spec.
    ///
    /// A spec without a lookup suffix is an exact match. `__in` splits
    /// `value` on commas.
    pub fn lookup(spec: &str, value: &str) -> Self {
        let (field, lookup) = split_lookup(spec);
        match lookup {
            None | Some("exact") => Self::eq(field, value),
            Some("iexact") => Self::text(field, TextOp::IExact, value),
            Some("contains") => Self::contains(field, value),
            Some("icontains") => Self::icontains(field, value),
            Some("startswith") => Self::startswith(field, value),
            Some("istartswith") => Self::istartswith(field, value),
            Some("gt") => Self::gt(field, value),
            Some("gte") => Self::gte(field, value),
            Some("lt") => Self::lt(field, value),
            Some("lte") => Self::lte(field, value),
            Some(_) => Self::in_list(field, value.split(',').map(str::trim)),
        }
    }

    /// ORs every filter together; `None` when the iterator is empty.
    pub fn any(filters: impl IntoIterator<Item = Q>) -> Option<Q> {
        filters.into_iter().reduce(Q::or)
    }

    /// ANDs every filter together; `None` when the iterator is empty.
    pub fn all(filters: impl IntoIterator<Item = Q>) -> Option<Q> {
        filters.into_iter().reduce(Q::and)
    }

    /// Combines this filter with another using AND.
    #[must_use]
    pub fn and(self, other: Q) -> Q {
        Q {
            expr: FilterExpr::And(Box::new(self.expr), Box::new(other.expr)),
        }
    }

    /// Combines this filter with another using OR.
    #[must_use]
    pub fn or(self, other: Q) -> Q {
        Q {
            expr: FilterExpr::Or(Box::new(self.expr), Box::new(other.expr)),
        }
    }

    /// Negates this filter with NOT.
    #[must_use]
    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> Q {
        Q {
            expr: FilterExpr::Not(Box::new(self.expr)),
        }
    }

    /// Returns the internal filter expression.
    pub fn expr(&self) -> &FilterExpr {
        &self.expr
    }

    /// Returns the names of every field the filter reads.
    pub fn fields(&self) -> Vec<&str> {
        let mut out = Vec::new();
        collect_fields(&self.expr, &mut out);
        out
    }

    /// Evaluates the filter against a row.
    ///
    /// A missing field never matches, except under NOT. A field holding an
    /// array (a many-to-many relation) matches when any element does.
    pub fn matches(&self, row: &Map<String, Value>) -> bool {
        eval(&self.expr, row)
    }
}

impl From<Q> for FilterExpr {
    fn from(q: Q) -> Self {
        q.expr
    }
}

impl fmt::Display for Q {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_expr(&self.expr, f)
    }
}

fn write_expr(expr: &FilterExpr, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match expr {
        FilterExpr::Comparison { field, op, value } => write!(f, "{field} {op} {value}"),
        FilterExpr::IsNull { field } => write!(f, "{field} IS NULL"),
        FilterExpr::InList { field, values } => {
            let items: Vec<String> = values.iter().map(Value::to_string).collect();
            write!(f, "{field} IN ({})", items.join(", "))
        }
        FilterExpr::Text { field, op, value } => write!(f, "{field} {op} {value:?}"),
        FilterExpr::And(left, right) => {
            write!(f, "(")?;
            write_expr(left, f)?;
            write!(f, ") AND (")?;
            write_expr(right, f)?;
            write!(f, ")")
        }
        FilterExpr::Or(left, right) => {
            write!(f, "(")?;
            write_expr(left, f)?;
            write!(f, ") OR (")?;
            write_expr(right, f)?;
            write!(f, ")")
        }
        FilterExpr::Not(inner) => {
            write!(f, "NOT (")?;
            write_expr(inner, f)?;
            write!(f, ")")
        }
    }
}

fn collect_fields<'a>(expr: &'a FilterExpr, out: &mut Vec<&'a str>) {
    match expr {
        FilterExpr::Comparison { field, .. }
        | FilterExpr::IsNull { field }
        | FilterExpr::InList { field, .. }
        | FilterExpr::Text { field, .. } => out.push(field),
        FilterExpr::And(left, right) | FilterExpr::Or(left, right) => {
            collect_fields(left, out);
            collect_fields(right, out);
        }
        FilterExpr::Not(inner) => collect_fields(inner, out),
    }
}

fn eval(expr: &FilterExpr, row: &Map<String, Value>) -> bool {
    match expr {
        FilterExpr::Comparison { field, op, value } => {
            any_scalar(row.get(field), |v| compare_op(v, *op, value))
        }
        FilterExpr::IsNull { field } => row.get(field).is_none_or(Value::is_null),
        FilterExpr::InList { field, values } => {
            any_scalar(row.get(field), |v| values.iter().any(|want| loose_eq(v, want)))
        }
        FilterExpr::Text { field, op, value } => {
            any_scalar(row.get(field), |v| text_match(&text_of(v), *op, value))
        }
        FilterExpr::And(left, right) => eval(left, row) && eval(right, row),
        FilterExpr::Or(left, right) => eval(left, row) || eval(right, row),
        FilterExpr::Not(inner) => !eval(inner, row),
    }
}

/// Applies `pred` to a scalar, or to every element of an array.
fn any_scalar(value: Option<&Value>, pred: impl Fn(&Value) -> bool) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Array(items)) => items.iter().any(pred),
        Some(v) => pred(v),
    }
}

fn compare_op(left: &Value, op: CompareOp, right: &Value) -> bool {
    match op {
        CompareOp::Eq => loose_eq(left, right),
        CompareOp::Ne => !loose_eq(left, right),
        CompareOp::Gt => loose_cmp(left, right) == Some(Ordering::Greater),
        CompareOp::Gte => matches!(
            loose_cmp(left, right),
            Some(Ordering::Greater | Ordering::Equal)
        ),
        CompareOp::Lt => loose_cmp(left, right) == Some(Ordering::Less),
        CompareOp::Lte => matches!(
            loose_cmp(left, right),
            Some(Ordering::Less | Ordering::Equal)
        ),
    }
}

fn text_match(haystack: &str, op: TextOp, needle: &str) -> bool {
    match op {
        TextOp::Contains => haystack.contains(needle),
        TextOp::IContains => haystack.to_lowercase().contains(&needle.to_lowercase()),
        TextOp::StartsWith => haystack.starts_with(needle),
        TextOp::IStartsWith => haystack.to_lowercase().starts_with(&needle.to_lowercase()),
        TextOp::IExact => haystack.to_lowercase() == needle.to_lowercase(),
    }
}

/// Text form of a scalar as it would appear in a query string.
pub(crate) fn text_of(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Equality that treats `1` and `"1"` as the same value.
///
/// Query strings only carry text, so filters built from request parameters
/// must still match numeric and boolean fields.
pub fn loose_eq(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(_), _) | (_, Value::Number(_)) => {
            match (as_number(left), as_number(right)) {
                (Some(a), Some(b)) => a == b,
                _ => false,
            }
        }
        _ => text_of(left) == text_of(right),
    }
}

/// Ordering with numeric comparison when both sides look like numbers.
pub fn loose_cmp(left: &Value, right: &Value) -> Option<Ordering> {
    match (as_number(left), as_number(right)) {
        (Some(a), Some(b)) => a.partial_cmp(&b),
        _ => match (left, right) {
            (Value::Null, Value::Null) => Some(Ordering::Equal),
            (Value::Null, _) => Some(Ordering::Less),
            (_, Value::Null) => Some(Ordering::Greater),
            _ => Some(text_of(left).cmp(&text_of(right))),
        },
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn row(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    fn ann() -> Map<String, Value> {
        row(json!({
            "id": 7,
            "name": "Annie",
            "email": "annie@example.com",
            "age": 30,
            "gender": 2,
            "roles": [1, 3],
            "depart": null,
        }))
    }

    #[test]
    fn test_simple_eq() {
        let q = Q::eq("status", "active");
        assert_eq!(q.to_string(), "status = \"active\"");
        assert!(Q::eq("name", "Annie").matches(&ann()));
        assert!(!Q::eq("name", "annie").matches(&ann()));
    }

    #[test]
    fn test_and_or_not() {
        let q = Q::eq("status", "active").and(Q::gt("age", 18).or(Q::eq("verified", true)));
        assert_eq!(
            q.to_string(),
            "(status = \"active\") AND ((age > 18) OR (verified = true))"
        );

        let row = ann();
        assert!(Q::gt("age", 18).and(Q::lt("age", 40)).matches(&row));
        assert!(Q::eq("age", 1).or(Q::eq("age", 30)).matches(&row));
        assert!(Q::eq("age", 1).not().matches(&row));
    }

    #[test]
    fn test_string_values_match_numbers() {
        let row = ann();
        assert!(Q::eq("gender", "2").matches(&row));
        assert!(Q::gte("age", "30").matches(&row));
        assert!(Q::in_list("gender", ["1", "2"]).matches(&row));
        assert!(!Q::in_list("gender", ["1"]).matches(&row));
    }

    #[test]
    fn test_array_fields_match_any_element() {
        let row = ann();
        assert!(Q::eq("roles", 3).matches(&row));
        assert!(Q::in_list("roles", ["2", "3"]).matches(&row));
        assert!(!Q::eq("roles", 2).matches(&row));
    }

    #[test]
    fn test_text_lookups() {
        let row = ann();
        assert!(Q::contains("name", "nni").matches(&row));
        assert!(!Q::contains("name", "ann").matches(&row));
        assert!(Q::icontains("name", "ANN").matches(&row));
        assert!(Q::startswith("email", "annie@").matches(&row));
        assert!(Q::contains("id", "7").matches(&row));
    }

    #[test]
    fn test_missing_and_null_fields() {
        let row = ann();
        assert!(!Q::eq("missing", 1).matches(&row));
        assert!(Q::eq("missing", 1).not().matches(&row));
        assert!(Q::is_null("depart").matches(&row));
        assert!(Q::is_null("missing").matches(&row));
        assert!(!Q::is_null("name").matches(&row));
    }

    #[test]
    fn test_lookup_spec() {
        assert_eq!(split_lookup("name__icontains"), ("name", Some("icontains")));
        assert_eq!(split_lookup("name"), ("name", None));
        assert_eq!(split_lookup("depart__title"), ("depart__title", None));

        assert_eq!(Q::lookup("name__icontains", "ann"), Q::icontains("name", "ann"));
        assert_eq!(Q::lookup("age__gte", "18"), Q::gte("age", "18"));
        assert_eq!(Q::lookup("name", "ann"), Q::eq("name", "ann"));
        assert!(Q::lookup("gender__in", "1, 2").matches(&ann()));
    }

    #[test]
    fn test_any_and_all() {
        assert!(Q::any(Vec::new()).is_none());
        let q = Q::any([Q::contains("name", "zzz"), Q::contains("email", "annie")]).unwrap();
        assert!(q.matches(&ann()));
        let q = Q::all([Q::contains("name", "Ann"), Q::eq("age", 99)]).unwrap();
        assert!(!q.matches(&ann()));
        assert_eq!(q.fields(), vec!["name", "age"]);
    }
}
