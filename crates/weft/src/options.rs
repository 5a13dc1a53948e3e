use std::time::Duration;

use bytes::Bytes;
use http::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use http::Method;
use url::Url;

use crate::error::RequestError;

/// Configuration for one outgoing request.
///
/// Every field is optional; [`RequestOptions::merged_over`] layers explicit
/// call arguments over a client's configured defaults, and
/// [`RequestOptions::prepare`] turns the merged result into the finalized
/// [`PreparedRequest`] the pipeline runs with. Precedence is always
/// call args > defaults > the `GET` method fallback.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub uri: Option<String>,
    pub base_url: Option<String>,
    pub method: Option<Method>,
    pub headers: HeaderMap,
    pub query: Vec<(String, String)>,
    pub body: Option<Bytes>,
    pub json: Option<serde_json::Value>,
    pub timeout: Option<Duration>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn uri(mut self, uri: impl Into<String>) -> Self {
        self.uri = Some(uri.into());
        self
    }

    /// Alias for [`RequestOptions::uri`]; both spellings are accepted.
    pub fn url(self, url: impl Into<String>) -> Self {
        self.uri(url)
    }

    /// Base URL that relative request uris are joined onto.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// JSON request body; encoded during preparation unless a raw body is
    /// also set (the raw body wins).
    pub fn json(mut self, json: serde_json::Value) -> Self {
        self.json = Some(json);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Layer `self` (the explicit call arguments) over `defaults`.
    ///
    /// Scalar fields from `self` win; header maps merge key-wise with
    /// `self` overwriting; query pairs append after the defaults'.
    pub fn merged_over(self, defaults: &RequestOptions) -> RequestOptions {
        let mut headers = defaults.headers.clone();
        for (name, value) in &self.headers {
            headers.insert(name.clone(), value.clone());
        }

        let mut query = defaults.query.clone();
        query.extend(self.query);

        RequestOptions {
            uri: self.uri.or_else(|| defaults.uri.clone()),
            base_url: self.base_url.or_else(|| defaults.base_url.clone()),
            method: self.method.or_else(|| defaults.method.clone()),
            headers,
            query,
            body: self.body.or_else(|| defaults.body.clone()),
            json: self.json.or_else(|| defaults.json.clone()),
            timeout: self.timeout.or(defaults.timeout),
        }
    }

    /// Finalize the options into the request the pipeline runs with.
    ///
    /// Resolves the uri against the base url, applies the `GET` method
    /// fallback, and encodes a JSON body. The base-url rules follow the
    /// classic client contract: the uri must be a relative path (an
    /// absolute uri is only accepted when it already starts with the base
    /// url, in which case the base url is ignored), and an empty uri
    /// resolves to the base url itself.
    pub fn prepare(self) -> Result<PreparedRequest, RequestError> {
        let url = resolve_url(self.uri.as_deref(), self.base_url.as_deref())?;
        if url.scheme() == "unix" {
            return Err(RequestError::UnixScheme);
        }

        let mut headers = self.headers;
        let body = match (self.body, self.json) {
            (Some(body), _) => Some(body),
            (None, Some(json)) => {
                if !headers.contains_key(CONTENT_TYPE) {
                    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
                }
                Some(Bytes::from(serde_json::to_vec(&json)?))
            }
            (None, None) => None,
        };

        Ok(PreparedRequest {
            url,
            method: self.method.unwrap_or(Method::GET),
            headers,
            query: self.query,
            body,
            timeout: self.timeout,
        })
    }
}

fn is_absolute(uri: &str) -> bool {
    uri.starts_with("//") || uri.contains("://")
}

fn resolve_url(uri: Option<&str>, base_url: Option<&str>) -> Result<Url, RequestError> {
    match (uri, base_url) {
        (Some(uri), Some(base)) if is_absolute(uri) => {
            if uri.starts_with(base) {
                Ok(Url::parse(uri)?)
            } else {
                Err(RequestError::AbsoluteUriWithBaseUrl)
            }
        }
        (Some(uri), Some(base)) => {
            let base = Url::parse(base)?;
            if uri.is_empty() {
                Ok(base)
            } else {
                Ok(base.join(uri)?)
            }
        }
        (Some(uri), None) => Ok(Url::parse(uri)?),
        (None, Some(base)) => Ok(Url::parse(base)?),
        (None, None) => Err(RequestError::MissingUri),
    }
}

/// The finalized, mutable request configuration handlers operate on and the
/// transport ultimately receives.
#[derive(Debug, Clone)]
pub struct PreparedRequest {
    pub url: Url,
    pub method: Method,
    pub headers: HeaderMap,
    pub query: Vec<(String, String)>,
    pub body: Option<Bytes>,
    pub timeout: Option<Duration>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn call_args_override_defaults_which_override_get() {
        let defaults = RequestOptions::new()
            .base_url("http://example.com/")
            .method(Method::PUT);

        let prepared = RequestOptions::new()
            .uri("widgets")
            .method(Method::POST)
            .merged_over(&defaults)
            .prepare()
            .unwrap();
        assert_eq!(prepared.method, Method::POST);
        assert_eq!(prepared.url.as_str(), "http://example.com/widgets");

        let prepared = RequestOptions::new()
            .uri("widgets")
            .merged_over(&defaults)
            .prepare()
            .unwrap();
        assert_eq!(prepared.method, Method::PUT);

        let prepared = RequestOptions::new()
            .uri("http://example.com/widgets")
            .prepare()
            .unwrap();
        assert_eq!(prepared.method, Method::GET);
    }

    #[test]
    fn headers_merge_with_call_args_winning() {
        let defaults = RequestOptions::new()
            .header(
                HeaderName::from_static("x-shared"),
                HeaderValue::from_static("default"),
            )
            .header(
                HeaderName::from_static("x-default-only"),
                HeaderValue::from_static("1"),
            );

        let merged = RequestOptions::new()
            .header(
                HeaderName::from_static("x-shared"),
                HeaderValue::from_static("call"),
            )
            .merged_over(&defaults);

        assert_eq!(merged.headers["x-shared"], "call");
        assert_eq!(merged.headers["x-default-only"], "1");
    }

    #[test]
    fn url_is_an_alias_for_uri() {
        let options = RequestOptions::new().url("http://example.com/a");
        assert_eq!(options.uri.as_deref(), Some("http://example.com/a"));
    }

    #[test]
    fn missing_uri_is_rejected() {
        let err = RequestOptions::new().prepare().unwrap_err();
        assert!(matches!(err, RequestError::MissingUri));
    }

    #[test]
    fn base_url_joins_relative_uris() {
        let prepared = RequestOptions::new()
            .base_url("http://example.com/api/")
            .uri("things/1")
            .prepare()
            .unwrap();
        assert_eq!(prepared.url.as_str(), "http://example.com/api/things/1");
    }

    #[test]
    fn empty_uri_resolves_to_the_base_url() {
        let prepared = RequestOptions::new()
            .base_url("http://example.com/api")
            .uri("")
            .prepare()
            .unwrap();
        assert_eq!(prepared.url.as_str(), "http://example.com/api");
    }

    #[test]
    fn absolute_uri_with_foreign_base_url_is_rejected() {
        let err = RequestOptions::new()
            .base_url("http://example.com")
            .uri("http://other.example/x")
            .prepare()
            .unwrap_err();
        assert!(matches!(err, RequestError::AbsoluteUriWithBaseUrl));

        let err = RequestOptions::new()
            .base_url("http://example.com")
            .uri("//other.example/x")
            .prepare()
            .unwrap_err();
        assert!(matches!(err, RequestError::AbsoluteUriWithBaseUrl));
    }

    #[test]
    fn absolute_uri_already_under_the_base_url_is_accepted() {
        let prepared = RequestOptions::new()
            .base_url("http://example.com")
            .uri("http://example.com/x")
            .prepare()
            .unwrap();
        assert_eq!(prepared.url.as_str(), "http://example.com/x");
    }

    #[test]
    fn unix_scheme_is_rejected() {
        let err = RequestOptions::new()
            .uri("unix:/var/run/thing.sock")
            .prepare()
            .unwrap_err();
        assert!(matches!(err, RequestError::UnixScheme));
    }

    #[test]
    fn json_body_is_encoded_with_content_type() {
        let prepared = RequestOptions::new()
            .uri("http://example.com")
            .json(json!({"a": 1}))
            .prepare()
            .unwrap();
        assert_eq!(prepared.headers[CONTENT_TYPE], "application/json");
        assert_eq!(prepared.body.as_deref(), Some(br#"{"a":1}"#.as_slice()));
    }

    #[test]
    fn raw_body_wins_over_json() {
        let prepared = RequestOptions::new()
            .uri("http://example.com")
            .body("raw")
            .json(json!({"a": 1}))
            .prepare()
            .unwrap();
        assert_eq!(prepared.body.as_deref(), Some(b"raw".as_slice()));
        assert!(!prepared.headers.contains_key(CONTENT_TYPE));
    }
}
