//! The normalized request view used for rule matching.

use std::collections::BTreeMap;

use axum::http::{header, request::Parts, HeaderMap};
use url::Url;

/// Cookie carrying the preferred language.
pub const LANGUAGE_COOKIE: &str = "nf_lang";
/// Cookie carrying the preferred country.
pub const COUNTRY_COOKIE: &str = "nf_country";

const DEFAULT_LANGUAGE: &str = "en";
const DEFAULT_COUNTRY: &str = "us";

/// Read-only description of an inbound request, built once per request.
#[derive(Debug, Clone, Default)]
pub struct MatchRequest {
    pub scheme: String,
    /// Hostname without port.
    pub host: String,
    /// Host with port, used as the base of relative destinations.
    pub authority: String,
    /// Percent-decoded path.
    pub path: String,
    /// Raw query string without `?`.
    pub query: String,
    /// Lowercased header names, including the synthesized
    /// `x-language` / `x-country`.
    pub headers: BTreeMap<String, String>,
    pub cookies: BTreeMap<String, String>,
    /// Roles supplied by the caller. `None` defers role checks to the gate.
    pub roles: Option<Vec<String>>,
}

impl MatchRequest {
    /// Build the view from request parts.
    pub fn from_parts(parts: &Parts, scheme: &str, geo_country: Option<&str>) -> Self {
        let authority = parts
            .headers
            .get(header::HOST)
            .and_then(|h| h.to_str().ok())
            .map(str::to_string)
            .or_else(|| parts.uri.authority().map(|a| a.to_string()))
            .unwrap_or_else(|| "localhost".to_string());
        let host = hostname(&authority).to_ascii_lowercase();

        let raw_path = parts.uri.path();
        let path = urlencoding::decode(raw_path)
            .map(|p| p.into_owned())
            .unwrap_or_else(|_| raw_path.to_string());

        let cookies = parse_cookies(&parts.headers);

        let mut headers = BTreeMap::new();
        let language = cookies
            .get(LANGUAGE_COOKIE)
            .cloned()
            .unwrap_or_else(|| language_from_headers(&parts.headers));
        let country = cookies
            .get(COUNTRY_COOKIE)
            .cloned()
            .or_else(|| geo_country.map(str::to_string))
            .unwrap_or_else(|| DEFAULT_COUNTRY.to_string());
        headers.insert("x-language".to_string(), language);
        headers.insert("x-country".to_string(), country);

        // Real headers win over the synthesized ones.
        for (name, value) in &parts.headers {
            if let Ok(value) = value.to_str() {
                headers.insert(name.as_str().to_string(), value.to_string());
            }
        }

        Self {
            scheme: parts
                .uri
                .scheme_str()
                .unwrap_or(scheme)
                .to_string(),
            host,
            authority,
            path,
            query: parts.uri.query().unwrap_or_default().to_string(),
            headers,
            cookies,
            roles: None,
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }

    pub fn language(&self) -> &str {
        self.header("x-language").unwrap_or(DEFAULT_LANGUAGE)
    }

    pub fn country(&self) -> &str {
        self.header("x-country").unwrap_or(DEFAULT_COUNTRY)
    }

    /// First value of a query parameter.
    pub fn query_value(&self, key: &str) -> Option<String> {
        url::form_urlencoded::parse(self.query.as_bytes())
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.into_owned())
    }

    /// Resolve `to` against this request's origin.
    ///
    /// When `to` carries no query string, the request's query is passed
    /// through.
    pub fn destination(&self, to: &str) -> Option<Url> {
        let base = Url::parse(&format!("{}://{}/", self.scheme, self.authority)).ok()?;
        let mut destination = base.join(to).ok()?;
        let has_query = destination.query().is_some_and(|q| !q.is_empty());
        if !has_query && !self.query.is_empty() {
            destination.set_query(Some(&self.query));
        }
        Some(destination)
    }
}

/// Parse every `Cookie` header. The first occurrence of a name wins.
pub fn parse_cookies(headers: &HeaderMap) -> BTreeMap<String, String> {
    let mut cookies = BTreeMap::new();
    for value in headers.get_all(header::COOKIE) {
        let Ok(value) = value.to_str() else {
            continue;
        };
        for pair in value.split(';') {
            let Some((name, raw)) = pair.split_once('=') else {
                continue;
            };
            let name = name.trim();
            if name.is_empty() || cookies.contains_key(name) {
                continue;
            }
            let raw = raw.trim().trim_matches('"');
            let decoded = urlencoding::decode(raw)
                .map(|v| v.into_owned())
                .unwrap_or_else(|_| raw.to_string());
            cookies.insert(name.to_string(), decoded);
        }
    }
    cookies
}

/// Two-letter language from the first `Accept-Language` entry.
pub fn language_from_headers(headers: &HeaderMap) -> String {
    headers
        .get(header::ACCEPT_LANGUAGE)
        .and_then(|h| h.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(|first| first.trim().chars().take(2).collect::<String>())
        .filter(|lang| !lang.is_empty())
        .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string())
}

fn hostname(authority: &str) -> &str {
    if let Some(rest) = authority.strip_prefix('[') {
        // [::1]:8888
        return rest.split(']').next().unwrap_or(rest);
    }
    authority.split(':').next().unwrap_or(authority)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts(uri: &str, headers: &[(&str, &str)]) -> Parts {
        let mut builder = Request::builder().uri(uri);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn synthesized_headers_from_cookies_and_geo() {
        let p = parts(
            "/x",
            &[("host", "localhost:8888"), ("cookie", "nf_lang=de; nf_jwt=abc")],
        );
        let req = MatchRequest::from_parts(&p, "http", Some("NL"));
        assert_eq!(req.language(), "de");
        assert_eq!(req.country(), "NL");
        assert_eq!(req.cookie("nf_jwt"), Some("abc"));
        assert_eq!(req.host, "localhost");
        assert_eq!(req.authority, "localhost:8888");
    }

    #[test]
    fn language_falls_back_to_accept_language() {
        let p = parts("/", &[("accept-language", "ur,en;q=0.8")]);
        let req = MatchRequest::from_parts(&p, "http", None);
        assert_eq!(req.language(), "ur");
        assert_eq!(req.country(), "us");
    }

    #[test]
    fn real_header_overrides_synthesized() {
        let p = parts("/", &[("x-country", "jp")]);
        let req = MatchRequest::from_parts(&p, "http", Some("nl"));
        assert_eq!(req.country(), "jp");
    }

    #[test]
    fn path_is_decoded() {
        let p = parts("/caf%C3%A9/menu?x=1", &[]);
        let req = MatchRequest::from_parts(&p, "http", None);
        assert_eq!(req.path, "/café/menu");
        assert_eq!(req.query, "x=1");
        assert_eq!(req.query_value("x").as_deref(), Some("1"));
    }

    #[test]
    fn destination_passes_query_through() {
        let p = parts("/old?a=1", &[("host", "localhost:8888")]);
        let req = MatchRequest::from_parts(&p, "http", None);

        let dest = req.destination("/new").unwrap();
        assert_eq!(dest.as_str(), "http://localhost:8888/new?a=1");

        let dest = req.destination("/new?b=2").unwrap();
        assert_eq!(dest.query(), Some("b=2"));

        let dest = req.destination("https://example.com/x").unwrap();
        assert_eq!(dest.as_str(), "https://example.com/x?a=1");
    }
}
