//! Site-wide settings.

use serde::Deserialize;

use crate::error::Result;

/// Settings shared by every handler of a [`StarkSite`](crate::StarkSite).
///
/// Every key is optional when loading from JSON:
///
/// ```
/// use stark::SiteConfig;
///
/// let config = SiteConfig::from_json(r#"{"url_prefix": "/admin", "per_page": 20}"#).unwrap();
/// assert_eq!(config.url_prefix, "/admin");
/// assert_eq!(config.per_page, 20);
/// assert_eq!(config.namespace, "stark");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Application name.
    pub app_name: String,
    /// Namespace qualifying every URL name (`namespace:url_name`).
    pub namespace: String,
    /// Path every handler is mounted under.
    pub url_prefix: String,
    /// Page size for handlers that do not set one.
    pub per_page: usize,
    /// Number of page links shown around the current page.
    pub max_pager_count: usize,
    /// Query parameter carrying the preserved list filter.
    pub filter_param: String,
    /// Query parameter carrying the search text.
    pub search_param: String,
    /// Query parameter carrying the page number.
    pub page_param: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            app_name: "stark".to_string(),
            namespace: "stark".to_string(),
            url_prefix: "/stark".to_string(),
            per_page: 10,
            max_pager_count: 11,
            filter_param: "_filter".to_string(),
            search_param: "q".to_string(),
            page_param: "page".to_string(),
        }
    }
}

impl SiteConfig {
    /// Parses a JSON document, filling missing keys with defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    #[must_use]
    pub fn url_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.url_prefix = prefix.into();
        self
    }

    #[must_use]
    pub fn per_page(mut self, per_page: usize) -> Self {
        self.per_page = per_page;
        self
    }
}
