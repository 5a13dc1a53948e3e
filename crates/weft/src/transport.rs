use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use http::{HeaderMap, StatusCode};
use parking_lot::Mutex;
use thiserror::Error;
use tokio::sync::oneshot;
use url::Url;

use crate::options::PreparedRequest;

/// Status line, headers, and final URL of a completed exchange.
#[derive(Debug, Clone)]
pub struct ResponseHead {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub url: Url,
}

/// Failure reported by a transport.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("http transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("transport finished without delivering an outcome")]
    Dropped,

    #[error("{0}")]
    Other(String),
}

/// What a transport delivers through its [`Completion`] handle.
#[derive(Debug, Default)]
pub struct TransportOutcome {
    pub error: Option<TransportError>,
    pub response: Option<ResponseHead>,
    pub body: Option<Bytes>,
}

/// Single-fire completion handle given to the transport.
///
/// However many completion paths a transport has (callback, error event,
/// complete event), exactly one outcome gets through: the underlying oneshot
/// sender is consumed on first delivery and later attempts are dropped with
/// a warning, never re-invoking caller logic.
#[derive(Clone)]
pub struct Completion {
    tx: Arc<Mutex<Option<oneshot::Sender<TransportOutcome>>>>,
}

impl Completion {
    pub(crate) fn channel() -> (Self, oneshot::Receiver<TransportOutcome>) {
        let (tx, rx) = oneshot::channel();
        (
            Self {
                tx: Arc::new(Mutex::new(Some(tx))),
            },
            rx,
        )
    }

    /// Deliver a successful exchange.
    pub fn succeed(&self, response: ResponseHead, body: Bytes) {
        self.finish(TransportOutcome {
            error: None,
            response: Some(response),
            body: Some(body),
        });
    }

    /// Deliver a transport failure.
    pub fn fail(&self, error: TransportError) {
        self.finish(TransportOutcome {
            error: Some(error),
            response: None,
            body: None,
        });
    }

    /// Deliver a raw outcome.
    pub fn finish(&self, outcome: TransportOutcome) {
        match self.tx.lock().take() {
            Some(tx) => {
                // receiver dropped means the call was abandoned; nothing to do
                let _ = tx.send(outcome);
            }
            None => {
                tracing::warn!("multiple attempts to deliver a request outcome; dropping");
            }
        }
    }

    /// Whether an outcome has already been delivered.
    pub fn is_finished(&self) -> bool {
        self.tx.lock().is_none()
    }
}

impl std::fmt::Debug for Completion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Completion")
            .field("finished", &self.is_finished())
            .finish()
    }
}

/// The collaborator performing the actual network exchange.
///
/// Implementations receive the finalized request and must deliver exactly
/// one outcome through `completion`; the handle enforces that later
/// deliveries are dropped.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: PreparedRequest, completion: Completion);
}

/// Default transport backed by a shared [`reqwest::Client`].
#[derive(Debug, Clone, Default)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    async fn exchange(&self, request: PreparedRequest) -> Result<(ResponseHead, Bytes), reqwest::Error> {
        let mut builder = self
            .client
            .request(request.method, request.url)
            .headers(request.headers);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await?;
        let head = ResponseHead {
            status: response.status(),
            headers: response.headers().clone(),
            url: response.url().clone(),
        };
        let body = response.bytes().await?;
        Ok((head, body))
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: PreparedRequest, completion: Completion) {
        match self.exchange(request).await {
            Ok((head, body)) => completion.succeed(head, body),
            Err(error) => {
                tracing::debug!(%error, "transport exchange failed");
                completion.fail(error.into());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn head(status: u16) -> ResponseHead {
        ResponseHead {
            status: StatusCode::from_u16(status).unwrap(),
            headers: HeaderMap::new(),
            url: Url::parse("http://example.com/").unwrap(),
        }
    }

    #[tokio::test]
    async fn first_delivery_wins() {
        let (completion, rx) = Completion::channel();

        completion.fail(TransportError::Other("stream error".into()));
        // a late "complete" event must be dropped
        completion.succeed(head(200), Bytes::from_static(b"late"));

        let outcome = rx.await.unwrap();
        assert_eq!(outcome.error.unwrap().to_string(), "stream error");
        assert!(outcome.response.is_none());
    }

    #[tokio::test]
    async fn is_finished_flips_after_delivery() {
        let (completion, _rx) = Completion::channel();
        assert!(!completion.is_finished());

        completion.succeed(head(204), Bytes::new());
        assert!(completion.is_finished());
    }

    #[tokio::test]
    async fn clones_share_the_single_fire_guard() {
        let (completion, rx) = Completion::channel();
        let error_path = completion.clone();
        let complete_path = completion;

        complete_path.succeed(head(200), Bytes::from_static(b"ok"));
        error_path.fail(TransportError::Other("too late".into()));

        let outcome = rx.await.unwrap();
        assert!(outcome.error.is_none());
        assert_eq!(outcome.body.as_deref(), Some(b"ok".as_slice()));
    }
}
