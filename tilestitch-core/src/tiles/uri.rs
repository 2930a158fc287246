use std::collections::HashSet;

use url::{Url, form_urlencoded};

/// Query string parameters in their original order, allowing repeated keys.
///
/// Lookups are exact, while the editing helpers [`remove_all`](Self::remove_all),
/// [`add_override`](Self::add_override) and [`set_default`](Self::set_default)
/// ignore ASCII case, since OGC services treat parameter names that way.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams(Vec<(String, String)>);

impl QueryParams {
    /// Parses the query of `url`.
    #[must_use]
    pub fn from_url(url: &Url) -> Self {
        url.query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect()
    }

    /// Parses a raw query string such as `a=1&a=2&c`. Keys without a value get
    /// an empty one.
    #[must_use]
    pub fn from_query(query: &str) -> Self {
        form_urlencoded::parse(query.as_bytes())
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect()
    }

    /// Number of key/value pairs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True without any pair.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Appends a pair, keeping existing values of the same key.
    pub fn put(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.push((key.into(), value.into()));
    }

    /// All values of `key`, in order.
    #[must_use]
    pub fn get_all(&self, key: &str) -> Vec<&str> {
        self.0
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .collect()
    }

    /// True if `key` has at least one value.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.iter().any(|(k, _)| k == key)
    }

    /// True if `key` has the given `value`.
    #[must_use]
    pub fn contains_entry(&self, key: &str, value: &str) -> bool {
        self.0.iter().any(|(k, v)| k == key && v == value)
    }

    /// Removes every value of `key`, ignoring case. Returns how many were removed.
    pub fn remove_all(&mut self, key: &str) -> usize {
        let before = self.0.len();
        self.0.retain(|(k, _)| !k.eq_ignore_ascii_case(key));
        before - self.0.len()
    }

    /// Replaces all values of `key` (ignoring case) by `value`.
    pub fn add_override(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        self.remove_all(&key);
        self.put(key, value);
    }

    /// Sets `key` to `value` unless it already has a value, ignoring case.
    pub fn set_default(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        if !self.0.iter().any(|(k, _)| k.eq_ignore_ascii_case(&key)) {
            self.put(key, value);
        }
    }

    /// Iterates over the pairs in order.
    pub fn pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for QueryParams {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// Adds `params` to the query of `url`.
///
/// Keys listed in `overrides` replace any existing values of that key, all
/// other parameters are appended to what the URL already has.
#[must_use]
pub fn add_params(url: &Url, params: &QueryParams, overrides: &HashSet<String>) -> Url {
    let mut merged = QueryParams::from_url(url);
    for key in overrides {
        if params.contains_key(key) {
            merged.remove_all(key);
        }
    }
    for (key, value) in params.pairs() {
        merged.put(key, value);
    }
    set_query_params(url, &merged)
}

/// Replaces the whole query of `url`, percent-encoding keys and values.
///
/// Everything else (credentials, host, port, path, fragment) is kept.
#[must_use]
pub fn set_query_params(url: &Url, params: &QueryParams) -> Url {
    let mut url = url.clone();
    if params.is_empty() {
        url.set_query(None);
    } else {
        url.query_pairs_mut().clear().extend_pairs(params.pairs());
    }
    url
}

#[cfg(test)]
mod tests {
    use rstest::{fixture, rstest};

    use super::*;

    const TEST_QUERY: &str = "a=1&a=2&b=b1&b=b2&c&d=1";

    #[fixture]
    fn url() -> Url {
        Url::parse(&format!("http://server:8080/path1/path2?{TEST_QUERY}")).unwrap()
    }

    fn assert_test_params(params: &QueryParams) {
        assert!(params.contains_entry("a", "1"));
        assert!(params.contains_entry("a", "2"));
        assert!(params.contains_entry("b", "b1"));
        assert!(params.contains_entry("b", "b2"));
        assert!(params.contains_entry("c", ""));
        assert!(params.contains_entry("d", "1"));
    }

    #[rstest]
    fn test_parse_url(url: Url) {
        let params = QueryParams::from_url(&url);
        assert_eq!(params.len(), 6);
        assert_test_params(&params);
    }

    #[test]
    fn test_parse_query() {
        let params = QueryParams::from_query(TEST_QUERY);
        assert_eq!(params.len(), 6);
        assert_test_params(&params);
        assert_eq!(params.get_all("a"), vec!["1", "2"]);
    }

    #[rstest]
    fn test_add_params_without_overrides(url: Url) {
        let new_params: QueryParams = [("a", "n1"), ("e", "e1")].into_iter().collect();
        let updated = QueryParams::from_url(&add_params(&url, &new_params, &HashSet::new()));

        assert_eq!(updated.len(), 8);
        assert_test_params(&updated);
        assert!(updated.contains_entry("a", "n1"));
        assert!(updated.contains_entry("e", "e1"));
    }

    #[rstest]
    fn test_add_params_with_overrides(url: Url) {
        let new_params: QueryParams = [("a", "n1"), ("b", "nb1"), ("e", "e1")]
            .into_iter()
            .collect();
        let overrides = HashSet::from(["a".to_string()]);
        let updated = QueryParams::from_url(&add_params(&url, &new_params, &overrides));

        assert_eq!(updated.len(), 7);
        assert_eq!(updated.get_all("a"), vec!["n1"]);
        assert_eq!(updated.get_all("b"), vec!["b1", "b2", "nb1"]);
        assert!(updated.contains_entry("c", ""));
        assert!(updated.contains_entry("d", "1"));
        assert!(updated.contains_entry("e", "e1"));
    }

    #[rstest]
    fn test_add_override(url: Url) {
        let mut params = QueryParams::from_url(&url);
        params.add_override("a", "n1");

        assert_eq!(params.len(), 5);
        assert!(params.contains_entry("a", "n1"));
        assert!(!params.contains_entry("a", "1"));
        assert!(params.contains_entry("b", "b1"));
        assert!(params.contains_entry("b", "b2"));
        assert!(params.contains_entry("c", ""));
        assert!(params.contains_entry("d", "1"));
    }

    #[test]
    fn test_override_ignores_case() {
        let mut params = QueryParams::from_query("layer=a&LAYER=b&Style=x");
        params.add_override("Layer", "c");
        assert_eq!(params.len(), 2);
        assert!(params.contains_entry("Layer", "c"));

        params.set_default("STYLE", "default");
        assert_eq!(params.len(), 2);
        assert!(params.contains_entry("Style", "x"));
    }

    #[rstest]
    fn test_set_default(url: Url) {
        let mut params = QueryParams::from_url(&url);
        params.set_default("a", "n1");
        assert_eq!(params.len(), 6);
        assert_test_params(&params);

        params.set_default("e", "n1");
        assert_eq!(params.len(), 7);
        assert_test_params(&params);
        assert!(params.contains_entry("e", "n1"));
    }

    #[rstest]
    #[case(
        "http://un:ps@server.com:9876/p1/p2?z=3,y=4#fragment",
        "http://un:ps@server.com:9876/p1/p2?a=1&b=2&b=3#fragment"
    )]
    #[case(
        "http://un:ps@server.com:9876/p1/p2?z=3&y=4#fragment",
        "http://un:ps@server.com:9876/p1/p2?a=1&b=2&b=3#fragment"
    )]
    #[case(
        "http://center_wmts_fixedscale.com:1234/wmts",
        "http://center_wmts_fixedscale.com:1234/wmts?a=1&b=2&b=3"
    )]
    #[case(
        "http://center_wmts_fixedscale.com:1234/wmts?a=3#fragment",
        "http://center_wmts_fixedscale.com:1234/wmts?a=1&b=2&b=3#fragment"
    )]
    fn test_set_query_params(#[case] initial: &str, #[case] expected: &str) {
        let params: QueryParams = [("a", "1"), ("b", "2"), ("b", "3")].into_iter().collect();
        let updated = set_query_params(&Url::parse(initial).unwrap(), &params);
        assert_eq!(updated.as_str(), expected);
    }

    #[test]
    fn test_set_query_params_encodes() {
        let params: QueryParams = [("a # param", "a value &time=1#trickFrag")]
            .into_iter()
            .collect();
        let initial = Url::parse("http://un:ps@server.com:9876/p1/p2?z=3,y=4#fragment").unwrap();
        let updated = set_query_params(&initial, &params);

        let text = updated.as_str();
        assert!(!text.contains("a #"));
        assert!(!text.contains("1#t"));
        assert!(!text.contains(" &time"));
        assert!(!text.contains("#trick"));
        assert_eq!(updated.scheme(), "http");
        assert_eq!(updated.fragment(), Some("fragment"));
        assert_eq!(updated.host_str(), Some("server.com"));
        assert_eq!(updated.path(), "/p1/p2");
        assert_eq!(updated.port(), Some(9876));
        assert_eq!(
            QueryParams::from_url(&updated).get_all("a # param"),
            vec!["a value &time=1#trickFrag"]
        );
    }

    #[test]
    fn test_empty_params_drop_query() {
        let initial = Url::parse("http://server.com/wmts?a=3").unwrap();
        let updated = set_query_params(&initial, &QueryParams::default());
        assert_eq!(updated.as_str(), "http://server.com/wmts");
    }
}
