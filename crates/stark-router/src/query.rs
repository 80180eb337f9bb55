//! Ordered, multi-valued query parameters.

use std::borrow::Cow;
use std::fmt;

/// Query string or form-encoded body parameters.
///
/// Keeps insertion order and repeated keys, so `urlencode()` reproduces the
/// same string for the same parameters. `get` returns the last value for a
/// key and `get_all` returns every value in order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    pairs: Vec<(String, String)>,
}

impl QueryParams {
    /// Creates an empty parameter set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses an `application/x-www-form-urlencoded` string.
    ///
    /// A leading `?` is ignored, `+` decodes to a space and empty pairs are
    /// skipped.
    ///
    /// ```
    /// use stark_router::QueryParams;
    ///
    /// let params = QueryParams::parse("q=ann+lee&page=2&pk=1&pk=3");
    /// assert_eq!(params.get("q"), Some("ann lee"));
    /// assert_eq!(params.get_all("pk"), vec!["1", "3"]);
    /// ```
    pub fn parse(query: &str) -> Self {
        let query = query.strip_prefix('?').unwrap_or(query);
        let pairs = query
            .split('&')
            .filter(|pair| !pair.is_empty())
            .map(|pair| {
                let mut parts = pair.splitn(2, '=');
                let key = parts.next().unwrap_or_default();
                let value = parts.next().unwrap_or_default();
                (decode_component(key), decode_component(value))
            })
            .collect();
        Self { pairs }
    }

    /// Returns the last value for `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Returns every value for `key`, in order.
    pub fn get_all(&self, key: &str) -> Vec<&str> {
        self.pairs
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .collect()
    }

    /// Returns whether `key` is present at least once.
    pub fn contains_key(&self, key: &str) -> bool {
        self.pairs.iter().any(|(k, _)| k == key)
    }

    /// Returns whether there are no parameters.
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Returns the number of key/value pairs.
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Appends a value, keeping existing values for the same key.
    pub fn append(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.pairs.push((key.into(), value.into()));
    }

    /// Replaces every value of `key` with a single value.
    ///
    /// The new pair takes the position of the first existing occurrence, or
    /// is appended when the key is new.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.pairs.iter().position(|(k, _)| *k == key) {
            Some(first) => {
                self.pairs[first].1 = value;
                let mut index = 0;
                self.pairs.retain(|(k, _)| {
                    let keep = *k != key || index == first;
                    index += 1;
                    keep
                });
            }
            None => self.pairs.push((key, value)),
        }
    }

    /// Removes every value of `key`.
    pub fn remove(&mut self, key: &str) {
        self.pairs.retain(|(k, _)| k != key);
    }

    /// Returns a copy without the given key.
    #[must_use]
    pub fn without(&self, key: &str) -> Self {
        let mut copy = self.clone();
        copy.remove(key);
        copy
    }

    /// Iterates over the pairs in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Encodes the parameters back into a query string (without `?`).
    pub fn urlencode(&self) -> String {
        self.pairs
            .iter()
            .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&")
    }
}

impl fmt::Display for QueryParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.urlencode())
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for QueryParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            pairs: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

/// Decodes one form-encoded component, falling back to the raw text when
/// the escapes do not form valid UTF-8.
fn decode_component(raw: &str) -> String {
    let spaced: Cow<'_, str> = if raw.contains('+') {
        Cow::Owned(raw.replace('+', " "))
    } else {
        Cow::Borrowed(raw)
    };
    match urlencoding::decode(&spaced) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => spaced.into_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_get() {
        let params = QueryParams::parse("?name=John+Doe&age=30&city=New%20York");
        assert_eq!(params.get("name"), Some("John Doe"));
        assert_eq!(params.get("age"), Some("30"));
        assert_eq!(params.get("city"), Some("New York"));
        assert_eq!(params.get("missing"), None);
    }

    #[test]
    fn test_repeated_keys() {
        let params = QueryParams::parse("pk=1&pk=2&action=multi_delete&pk=5");
        assert_eq!(params.get_all("pk"), vec!["1", "2", "5"]);
        assert_eq!(params.get("pk"), Some("5"));
        assert_eq!(params.len(), 4);
    }

    #[test]
    fn test_urlencode_is_stable() {
        let raw = "q=ann%20lee&page=3&gender=1&gender=2";
        let params = QueryParams::parse(raw);
        assert_eq!(params.urlencode(), raw);
        assert_eq!(QueryParams::parse(&params.urlencode()), params);
    }

    #[test]
    fn test_encode_decode_reserved_characters() {
        let mut params = QueryParams::new();
        params.append("_filter", "q=a&b+c&page=2");
        let encoded = params.urlencode();
        assert!(!encoded.contains("&b"));
        let decoded = QueryParams::parse(&encoded);
        assert_eq!(decoded.get("_filter"), Some("q=a&b+c&page=2"));
    }

    #[test]
    fn test_set_replaces_all_values() {
        let mut params = QueryParams::parse("page=1&q=x&page=4");
        params.set("page", "2");
        assert_eq!(params.urlencode(), "page=2&q=x");

        params.set("depart", "3");
        assert_eq!(params.urlencode(), "page=2&q=x&depart=3");
    }

    #[test]
    fn test_without() {
        let params = QueryParams::parse("page=1&q=x");
        assert_eq!(params.without("page").urlencode(), "q=x");
        assert!(params.contains_key("page"));
    }

    #[test]
    fn test_empty() {
        let params = QueryParams::parse("");
        assert!(params.is_empty());
        assert_eq!(params.urlencode(), "");
    }
}
