use std::collections::HashMap;

use bytes::Bytes;
use http::StatusCode;
use serde_json::Value;
use weft_phase::HookError;

use crate::options::PreparedRequest;
use crate::transport::ResponseHead;

/// Per-call scratch space shared by every handler of one outward call.
///
/// A fresh `HookState` is created for each call and travels from the request
/// pipeline into the response pipeline of that same call; it is never shared
/// across concurrent calls. Plugins use it to hand values from their request
/// hooks to their response hooks.
#[derive(Debug, Default)]
pub struct HookState {
    values: HashMap<String, Value>,
}

impl HookState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.values.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.values.remove(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Context handed to request-side handlers.
#[derive(Debug)]
pub struct RequestContext {
    /// The request configuration; handlers mutate it in place.
    pub request: PreparedRequest,
    /// Shared per-call state, also visible to response-side handlers.
    pub state: HookState,
}

/// Context handed to response-side handlers.
///
/// Built once the transport delivers its outcome. Handlers may overwrite
/// `error`, `response`, and `body`; whatever is present after the response
/// pipeline ran — not the transport's originals — is what the caller sees.
#[derive(Debug)]
pub struct ResponseContext {
    /// The same per-call state the request handlers saw.
    pub state: HookState,
    /// The request configuration the transport was invoked with.
    pub request: PreparedRequest,
    pub error: Option<HookError>,
    pub response: Option<ResponseHead>,
    pub body: Option<Bytes>,
}

/// Final result of one outward call, delivered exactly once.
#[derive(Debug)]
pub struct Exchange {
    pub error: Option<HookError>,
    pub response: Option<ResponseHead>,
    pub body: Option<Bytes>,
}

impl Exchange {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    pub fn status(&self) -> Option<StatusCode> {
        self.response.as_ref().map(|response| response.status)
    }

    /// The response body decoded as UTF-8, replacing invalid sequences.
    pub fn body_text(&self) -> Option<String> {
        self.body
            .as_ref()
            .map(|body| String::from_utf8_lossy(body).into_owned())
    }

    /// Deserialize the response body as JSON. An absent body reads as empty
    /// input and fails the same way malformed JSON does.
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(self.body.as_deref().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn hook_state_round_trip() {
        let mut state = HookState::new();
        assert!(state.is_empty());

        state.insert("plugin.started", json!(true));
        state.insert("plugin.count", json!(3));

        assert!(state.contains("plugin.started"));
        assert_eq!(state.get("plugin.count"), Some(&json!(3)));
        assert_eq!(state.len(), 2);

        assert_eq!(state.remove("plugin.count"), Some(json!(3)));
        assert!(state.get("plugin.count").is_none());
    }

    #[test]
    fn exchange_accessors() {
        let exchange = Exchange {
            error: None,
            response: None,
            body: Some(Bytes::from_static(b"hello")),
        };
        assert!(exchange.is_success());
        assert_eq!(exchange.status(), None);
        assert_eq!(exchange.body_text().as_deref(), Some("hello"));

        let failed = Exchange {
            error: Some("nope".into()),
            response: None,
            body: None,
        };
        assert!(!failed.is_success());
        assert!(failed.body_text().is_none());
    }

    #[test]
    fn exchange_json_decoding() {
        let exchange = Exchange {
            error: None,
            response: None,
            body: Some(Bytes::from_static(br#"{"id": 7}"#)),
        };
        let value: Value = exchange.json().unwrap();
        assert_eq!(value, json!({"id": 7}));

        let empty = Exchange {
            error: None,
            response: None,
            body: None,
        };
        assert!(empty.json::<Value>().is_err());
    }
}
