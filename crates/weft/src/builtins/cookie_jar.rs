use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use http::header::{HeaderValue, COOKIE, SET_COOKIE};
use parking_lot::Mutex;
use serde_json::Value;
use url::Url;
use weft_phase::{HookError, HookResult, PhaseHandler};

use crate::context::{RequestContext, ResponseContext};
use crate::plugin::Plugin;

/// Hook-state flag set by the request half so the response half only runs
/// for calls that went through it.
const ACTIVE_KEY: &str = "cookie-jar.active";

/// Asynchronous cookie storage behind the `cookie-jar` plugin.
///
/// The store may be backed by anything reachable with an await (a database,
/// a remote cache); lookups suspend only the call they belong to.
#[async_trait]
pub trait CookieStore: Send + Sync {
    /// The `Cookie` header value to send for `url`, if any.
    async fn cookie_header(&self, url: &Url) -> Result<Option<String>, HookError>;

    /// Persist the `Set-Cookie` header values received from `url`.
    async fn store_cookies(&self, url: &Url, set_cookies: &[String]) -> Result<(), HookError>;
}

/// In-memory [`CookieStore`] keyed by host. Suitable for tests and
/// short-lived processes; cookie attributes are not interpreted.
#[derive(Debug, Default)]
pub struct MemoryCookieStore {
    cookies: Mutex<HashMap<String, Vec<(String, String)>>>,
}

impl MemoryCookieStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn host_key(url: &Url) -> String {
    url.host_str().unwrap_or_default().to_string()
}

#[async_trait]
impl CookieStore for MemoryCookieStore {
    async fn cookie_header(&self, url: &Url) -> Result<Option<String>, HookError> {
        let cookies = self.cookies.lock();
        let header = cookies.get(&host_key(url)).map(|pairs| {
            pairs
                .iter()
                .map(|(name, value)| format!("{name}={value}"))
                .collect::<Vec<_>>()
                .join("; ")
        });
        Ok(header.filter(|header| !header.is_empty()))
    }

    async fn store_cookies(&self, url: &Url, set_cookies: &[String]) -> Result<(), HookError> {
        let mut cookies = self.cookies.lock();
        let jar = cookies.entry(host_key(url)).or_default();
        for set_cookie in set_cookies {
            // "name=value; Path=/; ..." — attributes are ignored
            let pair = set_cookie.split(';').next().unwrap_or_default();
            let Some((name, value)) = pair.split_once('=') else {
                continue;
            };
            let name = name.trim().to_string();
            let value = value.trim().to_string();
            if let Some(existing) = jar.iter_mut().find(|(n, _)| *n == name) {
                existing.1 = value;
            } else {
                jar.push((name, value));
            }
        }
        Ok(())
    }
}

/// Cookie-jar plugin backed by `store`.
///
/// On request `initial`, cookies for the target URL are prepended to the
/// `Cookie` header without clobbering caller-supplied cookies. On response
/// `initial`, `Set-Cookie` headers are written back to the store.
pub fn cookie_jar(store: Arc<dyn CookieStore>) -> Plugin {
    Plugin::new("cookie-jar")
        .on_request(
            "initial",
            SendCookies {
                store: Arc::clone(&store),
            },
        )
        .on_response("initial", ReceiveCookies { store })
}

struct SendCookies {
    store: Arc<dyn CookieStore>,
}

#[async_trait]
impl PhaseHandler<RequestContext> for SendCookies {
    async fn handle(&self, ctx: &mut RequestContext) -> HookResult {
        ctx.state.insert(ACTIVE_KEY, Value::Bool(true));

        let Some(cookies) = self.store.cookie_header(&ctx.request.url).await? else {
            return Ok(());
        };

        let existing = ctx
            .request
            .headers
            .get(COOKIE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default();
        let merged = if existing.is_empty() {
            cookies
        } else {
            format!("{cookies}; {existing}")
        };
        ctx.request.headers.insert(COOKIE, HeaderValue::from_str(&merged)?);
        Ok(())
    }
}

struct ReceiveCookies {
    store: Arc<dyn CookieStore>,
}

#[async_trait]
impl PhaseHandler<ResponseContext> for ReceiveCookies {
    async fn handle(&self, ctx: &mut ResponseContext) -> HookResult {
        if !ctx.state.contains(ACTIVE_KEY) {
            return Ok(());
        }
        let Some(response) = &ctx.response else {
            return Ok(());
        };

        let set_cookies: Vec<String> = response
            .headers
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .map(str::to_string)
            .collect();
        if set_cookies.is_empty() {
            return Ok(());
        }

        tracing::debug!(
            url = %response.url,
            count = set_cookies.len(),
            "storing cookies from response"
        );
        self.store.store_cookies(&response.url, &set_cookies).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::HookState;
    use crate::options::RequestOptions;
    use crate::transport::ResponseHead;
    use bytes::Bytes;
    use http::header::HeaderName;
    use http::{HeaderMap, StatusCode};

    fn request_ctx(url: &str) -> RequestContext {
        RequestContext {
            request: RequestOptions::new().uri(url).prepare().unwrap(),
            state: HookState::new(),
        }
    }

    #[tokio::test]
    async fn memory_store_round_trip() {
        let store = MemoryCookieStore::new();
        let url = Url::parse("http://example.com/login").unwrap();

        assert!(store.cookie_header(&url).await.unwrap().is_none());

        store
            .store_cookies(
                &url,
                &["session=abc; Path=/; HttpOnly".into(), "theme=dark".into()],
            )
            .await
            .unwrap();
        assert_eq!(
            store.cookie_header(&url).await.unwrap().as_deref(),
            Some("session=abc; theme=dark")
        );

        // same cookie name replaces the value
        store
            .store_cookies(&url, &["session=def".into()])
            .await
            .unwrap();
        assert_eq!(
            store.cookie_header(&url).await.unwrap().as_deref(),
            Some("session=def; theme=dark")
        );

        // other hosts see nothing
        let other = Url::parse("http://other.example/").unwrap();
        assert!(store.cookie_header(&other).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn jar_cookies_do_not_clobber_caller_cookies() {
        let store = Arc::new(MemoryCookieStore::new());
        let url = Url::parse("http://example.com/").unwrap();
        store
            .store_cookies(&url, &["session=abc".into()])
            .await
            .unwrap();

        let handler = SendCookies {
            store: store.clone(),
        };
        let mut ctx = request_ctx("http://example.com/");
        ctx.request.headers.insert(
            HeaderName::from_static("cookie"),
            HeaderValue::from_static("caller=1"),
        );

        handler.handle(&mut ctx).await.unwrap();
        assert_eq!(ctx.request.headers[COOKIE], "session=abc; caller=1");
        assert!(ctx.state.contains(ACTIVE_KEY));
    }

    #[tokio::test]
    async fn response_half_skips_calls_it_did_not_see() {
        let store = Arc::new(MemoryCookieStore::new());
        let handler = ReceiveCookies {
            store: store.clone(),
        };

        let mut headers = HeaderMap::new();
        headers.insert(SET_COOKIE, HeaderValue::from_static("session=abc"));
        let url = Url::parse("http://example.com/").unwrap();
        let mut ctx = ResponseContext {
            state: HookState::new(), // ACTIVE_KEY never set
            request: RequestOptions::new()
                .uri("http://example.com/")
                .prepare()
                .unwrap(),
            error: None,
            response: Some(ResponseHead {
                status: StatusCode::OK,
                headers,
                url: url.clone(),
            }),
            body: Some(Bytes::new()),
        };

        handler.handle(&mut ctx).await.unwrap();
        assert!(store.cookie_header(&url).await.unwrap().is_none());
    }
}
