//! The reserved `/.netlify/` namespace.

use std::collections::BTreeMap;

use url::Url;

const INTERNAL_PREFIX: &str = "/.netlify/";

/// Header carrying the pre-rewrite path to the functions runtime.
pub const ORIGINAL_PATHNAME_HEADER: &str = "x-netlify-original-pathname";

pub fn is_internal(path: &str) -> bool {
    path.starts_with(INTERNAL_PREFIX)
}

/// `/.netlify/functions/<name>` or `/.netlify/builders/<name>`.
pub fn function_name(path: &str) -> Option<&str> {
    let rest = path.strip_prefix(INTERNAL_PREFIX)?;
    let rest = rest
        .strip_prefix("functions/")
        .or_else(|| rest.strip_prefix("builders/"))?;
    let name = rest.split(['/', '?']).next().unwrap_or_default();
    (!name.is_empty()).then_some(name)
}

pub fn is_function_path(path: &str) -> bool {
    function_name(path).is_some()
}

/// Map `/.netlify/<namespace>/<rest>` onto the add-on's base URL.
pub fn addon_destination(path_and_query: &str, addons: &BTreeMap<String, Url>) -> Option<Url> {
    let rest = path_and_query.strip_prefix(INTERNAL_PREFIX)?;
    let slash = rest.find('/')?;
    let (namespace, remainder) = rest.split_at(slash);
    let base = addons.get(namespace)?;
    Url::parse(&format!("{}{}", base.as_str().trim_end_matches('/'), remainder)).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn function_paths() {
        assert_eq!(function_name("/.netlify/functions/hello"), Some("hello"));
        assert_eq!(function_name("/.netlify/functions/hello/sub"), Some("hello"));
        assert_eq!(function_name("/.netlify/builders/render"), Some("render"));
        assert_eq!(function_name("/.netlify/functions/"), None);
        assert_eq!(function_name("/.netlify/identity/user"), None);
        assert_eq!(function_name("/functions/hello"), None);
    }

    #[test]
    fn addon_mapping() {
        let mut addons = BTreeMap::new();
        addons.insert("identity".to_string(), Url::parse("https://identity.example.com").unwrap());
        addons.insert("search".to_string(), Url::parse("http://127.0.0.1:7000/api/").unwrap());

        let url = addon_destination("/.netlify/identity/user?x=1", &addons).unwrap();
        assert_eq!(url.as_str(), "https://identity.example.com/user?x=1");

        let url = addon_destination("/.netlify/search/q", &addons).unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:7000/api/q");

        assert!(addon_destination("/.netlify/identity", &addons).is_none());
        assert!(addon_destination("/.netlify/unknown/x", &addons).is_none());
    }
}
