//! Path pattern matching.

use regex::Regex;

use crate::request::PathParams;

/// A segment in a path pattern.
#[derive(Debug, Clone)]
pub enum PathSegment {
    /// A literal string segment.
    Literal(String),
    /// A parameter segment (e.g., {id}).
    Param(String),
    /// A wildcard segment (matches remainder of path).
    Wildcard(String),
}

/// A compiled path pattern for matching URLs.
#[derive(Debug, Clone)]
pub struct PathPattern {
    /// The original pattern string.
    pattern: String,
    /// Parsed segments.
    segments: Vec<PathSegment>,
    /// Compiled regex for matching.
    regex: Regex,
    /// Parameter names in order.
    param_names: Vec<String>,
    /// Whether reversed paths end with `/`.
    trailing_slash: bool,
}

impl PathPattern {
    /// Parses a path pattern string.
    ///
    /// Pattern syntax:
    /// - `/users` - Literal path
    /// - `/users/{id}` - Path with parameter
    /// - `/files/{*path}` - Wildcard parameter (matches rest of path)
    ///
    /// # Example
    ///
    /// ```
    /// use stark_router::PathPattern;
    ///
    /// let pattern = PathPattern::new("/stark/app01/user/edit/{pk}/");
    /// let params = pattern.match_path("/stark/app01/user/edit/12/").unwrap();
    /// assert_eq!(params.get("pk"), Some("12"));
    /// assert!(pattern.match_path("/stark/app01/user/edit/12/extra/").is_none());
    /// ```
    pub fn new(pattern: &str) -> Self {
        let mut segments = Vec::new();
        let mut param_names = Vec::new();
        let mut regex_str = String::from("^");

        for part in pattern.split('/').filter(|s| !s.is_empty()) {
            regex_str.push('/');

            if let Some(param) = part.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
                if let Some(name) = param.strip_prefix('*') {
                    segments.push(PathSegment::Wildcard(name.to_string()));
                    param_names.push(name.to_string());
                    regex_str.push_str("(.+)");
                } else {
                    segments.push(PathSegment::Param(param.to_string()));
                    param_names.push(param.to_string());
                    regex_str.push_str("([^/]+)");
                }
            } else {
                segments.push(PathSegment::Literal(part.to_string()));
                regex_str.push_str(&regex::escape(part));
            }
        }

        regex_str.push_str("/?$");

        // Literals are escaped and parameter groups are fixed, so the
        // expression is always valid.
        let regex = Regex::new(&regex_str).expect("Invalid path pattern regex");

        Self {
            pattern: pattern.to_string(),
            segments,
            regex,
            param_names,
            trailing_slash: pattern.len() > 1 && pattern.ends_with('/'),
        }
    }

    /// Attempts to match a path against this pattern.
    ///
    /// Returns extracted parameters if the path matches.
    pub fn match_path(&self, path: &str) -> Option<PathParams> {
        let caps = self.regex.captures(path)?;

        let mut params = PathParams::new();

        for (i, name) in self.param_names.iter().enumerate() {
            if let Some(value) = caps.get(i + 1) {
                params.insert(name.clone(), value.as_str().to_string());
            }
        }

        Some(params)
    }

    /// Returns the original pattern string.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Returns the parameter names.
    pub fn param_names(&self) -> &[String] {
        &self.param_names
    }

    /// Returns a new pattern with `prefix` prepended.
    #[must_use]
    pub fn prefixed(&self, prefix: &str) -> Self {
        let prefix = prefix.trim_end_matches('/');
        if prefix.is_empty() {
            return self.clone();
        }
        Self::new(&format!("{prefix}/{}", self.pattern.trim_start_matches('/')))
    }

    /// Generates a path from parameters.
    ///
    /// Returns `None` when a parameter is missing.
    ///
    /// # Example
    ///
    /// ```
    /// use stark_router::PathPattern;
    ///
    /// let pattern = PathPattern::new("/posts/{id}/");
    /// assert_eq!(pattern.reverse(&[("id", "123")]).unwrap(), "/posts/123/");
    /// ```
    pub fn reverse(&self, params: &[(&str, &str)]) -> Option<String> {
        let lookup = |name: &str| {
            params
                .iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| *value)
        };

        let mut path = String::new();

        for segment in &self.segments {
            path.push('/');
            match segment {
                PathSegment::Literal(s) => path.push_str(s),
                PathSegment::Param(name) | PathSegment::Wildcard(name) => {
                    path.push_str(lookup(name)?);
                }
            }
        }

        if path.is_empty() || self.trailing_slash {
            path.push('/');
        }

        Some(path)
    }
}
