//! Reverse URL lookup for named routes.

use std::collections::BTreeMap;

use crate::error::{Result, RouterError};
use crate::path::PathPattern;

/// Maps fully qualified route names (`namespace:name`) to their patterns.
#[derive(Debug, Clone, Default)]
pub struct UrlResolver {
    patterns: BTreeMap<String, PathPattern>,
}

impl UrlResolver {
    /// Creates an empty resolver.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a pattern under `name`, replacing any previous entry.
    ///
    /// Returns `true` when `name` was already present.
    pub fn insert(&mut self, name: impl Into<String>, pattern: PathPattern) -> bool {
        self.patterns.insert(name.into(), pattern).is_some()
    }

    /// Returns whether `name` is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.patterns.contains_key(name)
    }

    /// Returns the registered names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.patterns.keys().map(String::as_str)
    }

    /// Returns the number of named routes.
    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    /// Returns whether no routes are named.
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Builds the path for a named route.
    ///
    /// ```
    /// use stark_router::{PathPattern, UrlResolver};
    ///
    /// let mut urls = UrlResolver::new();
    /// urls.insert("stark:app01_user_edit", PathPattern::new("/stark/app01/user/edit/{pk}/"));
    /// assert_eq!(
    ///     urls.reverse("stark:app01_user_edit", &[("pk", "3")]).unwrap(),
    ///     "/stark/app01/user/edit/3/",
    /// );
    /// ```
    pub fn reverse(&self, name: &str, params: &[(&str, &str)]) -> Result<String> {
        let pattern = self
            .patterns
            .get(name)
            .ok_or_else(|| RouterError::RouteNotFound(name.to_string()))?;

        pattern.reverse(params).ok_or_else(|| {
            let param = pattern
                .param_names()
                .iter()
                .find(|p| !params.iter().any(|(k, _)| *k == p.as_str()))
                .cloned()
                .unwrap_or_default();
            RouterError::MissingParam {
                name: name.to_string(),
                param,
            }
        })
    }

    /// Copies every entry of `other` into this resolver.
    pub fn extend(&mut self, other: &Self) {
        for (name, pattern) in &other.patterns {
            self.patterns.insert(name.clone(), pattern.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reverse_unknown_name() {
        let urls = UrlResolver::new();
        assert!(matches!(
            urls.reverse("stark:nope", &[]),
            Err(RouterError::RouteNotFound(_))
        ));
    }

    #[test]
    fn test_reverse_missing_param() {
        let mut urls = UrlResolver::new();
        urls.insert("detail", PathPattern::new("/posts/{id}/"));
        match urls.reverse("detail", &[]) {
            Err(RouterError::MissingParam { param, .. }) => assert_eq!(param, "id"),
            other => panic!("expected MissingParam, got {other:?}"),
        }
    }

    #[test]
    fn test_insert_reports_duplicates() {
        let mut urls = UrlResolver::new();
        assert!(!urls.insert("a", PathPattern::new("/a/")));
        assert!(urls.insert("a", PathPattern::new("/b/")));
        assert_eq!(urls.len(), 1);
        assert_eq!(urls.reverse("a", &[]).unwrap(), "/b/");
    }
}
