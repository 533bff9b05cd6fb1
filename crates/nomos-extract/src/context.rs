//! Raw parameter sources of one request.
//!
//! A [`ParameterContext`] gathers everything a parameter can be read from:
//! the router's raw path parameters, the decoded query pairs, the headers
//! and the cookies. Decoders only ever borrow from it.

use std::collections::HashMap;

use http::{header, HeaderMap, Uri};
use nomos_core::ParseError;

/// Request data that parameters are decoded from.
///
/// # Example
///
/// ```
/// use std::collections::HashMap;
/// use http::{HeaderMap, HeaderValue, Uri};
/// use nomos_extract::ParameterContext;
///
/// let mut headers = HeaderMap::new();
/// headers.insert(http::header::COOKIE, HeaderValue::from_static("session=abc123; theme=dark"));
/// let path_params = HashMap::from([("petId".to_string(), "42".to_string())]);
/// let uri = Uri::from_static("/pets/42?status=sold&status=pending");
///
/// let ctx = ParameterContext::new(&path_params, &uri, &headers).unwrap();
/// assert_eq!(ctx.path_param("petId"), Some("42"));
/// assert_eq!(ctx.query_values("status"), vec!["sold", "pending"]);
/// assert_eq!(ctx.cookie("theme"), Some("dark"));
/// ```
#[derive(Debug, Clone)]
pub struct ParameterContext<'a> {
    path_params: &'a HashMap<String, String>,
    query: Vec<(String, String)>,
    headers: &'a HeaderMap,
    cookies: Cookies,
}

impl<'a> ParameterContext<'a> {
    /// Collects the parameter sources of a request.
    ///
    /// # Errors
    ///
    /// Fails when the query string cannot be decoded.
    pub fn new(
        path_params: &'a HashMap<String, String>,
        uri: &Uri,
        headers: &'a HeaderMap,
    ) -> Result<Self, ParseError> {
        let query = match uri.query() {
            Some(query) => parse_query(query)?,
            None => Vec::new(),
        };
        Ok(Self {
            path_params,
            query,
            headers,
            cookies: Cookies::from_headers(headers),
        })
    }

    /// The raw, still percent-encoded value of a path parameter.
    pub fn path_param(&self, name: &str) -> Option<&str> {
        self.path_params.get(name).map(String::as_str)
    }

    /// Every decoded query pair, in request order.
    pub fn query_pairs(&self) -> &[(String, String)] {
        &self.query
    }

    /// All values of a query key, in request order.
    pub fn query_values(&self, name: &str) -> Vec<&str> {
        self.query
            .iter()
            .filter(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
            .collect()
    }

    /// Whether the query string carries `name` at all.
    pub fn has_query(&self, name: &str) -> bool {
        self.query.iter().any(|(key, _)| key == name)
    }

    /// A header value; repeated headers are joined with `,`.
    pub fn header(&self, name: &str) -> Option<String> {
        let values: Vec<&str> = self
            .headers
            .get_all(name)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .collect();
        if values.is_empty() {
            None
        } else {
            Some(values.join(","))
        }
    }

    /// A cookie value.
    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies.get(name)
    }

    /// The parsed cookies.
    pub fn cookies(&self) -> &Cookies {
        &self.cookies
    }
}

/// Splits a raw query string into decoded pairs.
///
/// # Errors
///
/// Fails when the decoded query is not UTF-8.
pub fn parse_query(query: &str) -> Result<Vec<(String, String)>, ParseError> {
    serde_urlencoded::from_str(query)
        .map_err(|e| ParseError::invalid_format(query, "malformed query string").with_source(e))
}

/// Cookies from the `Cookie` header.
#[derive(Debug, Clone, Default)]
pub struct Cookies {
    cookies: HashMap<String, String>,
}

impl Cookies {
    /// Parses every `Cookie` header of a request.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let mut cookies = HashMap::new();
        for value in headers.get_all(header::COOKIE) {
            if let Ok(value) = value.to_str() {
                cookies.extend(Self::parse(value).cookies);
            }
        }
        Self { cookies }
    }

    /// Parses a `Cookie` header value.
    pub fn parse(header_value: &str) -> Self {
        let mut cookies = HashMap::new();
        for cookie in header_value.split(';') {
            if let Some((name, value)) = cookie.trim().split_once('=') {
                cookies.insert(
                    name.trim().to_string(),
                    value.trim().trim_matches('"').to_string(),
                );
            }
        }
        Self { cookies }
    }

    /// A cookie value by name.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }

    /// Number of cookies.
    pub fn len(&self) -> usize {
        self.cookies.len()
    }

    /// Whether there are no cookies.
    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;

    #[test]
    fn test_query_is_decoded() {
        let pairs = parse_query("q=a%20b&tag=x+y&flag").unwrap();
        assert_eq!(
            pairs,
            vec![
                ("q".to_string(), "a b".to_string()),
                ("tag".to_string(), "x y".to_string()),
                ("flag".to_string(), String::new()),
            ]
        );
    }

    #[test]
    fn test_repeated_headers_are_joined() {
        let mut headers = HeaderMap::new();
        headers.append("x-ids", HeaderValue::from_static("1,2"));
        headers.append("x-ids", HeaderValue::from_static("3"));
        let params = HashMap::new();
        let uri = Uri::from_static("/");

        let ctx = ParameterContext::new(&params, &uri, &headers).unwrap();
        assert_eq!(ctx.header("X-Ids").as_deref(), Some("1,2,3"));
        assert_eq!(ctx.header("x-missing"), None);
        assert!(!ctx.has_query("x"));
    }

    #[test]
    fn test_cookie_parsing() {
        let cookies = Cookies::parse("session=abc123; theme=\"dark\"; broken");
        assert_eq!(cookies.get("session"), Some("abc123"));
        assert_eq!(cookies.get("theme"), Some("dark"));
        assert_eq!(cookies.len(), 2);
    }
}
