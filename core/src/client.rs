//! Binary POST client for qweb endpoints.
//!
//! # Design
//! `QwebClient` holds only a `base_url` and a shared `Transport`; it carries
//! no mutable state between calls. `build_post` and `classify` are the pure
//! halves of an exchange. `send` joins them through the transport on the
//! calling thread, while `post`/`post_with` move the exchange onto its own
//! thread and hand the outcome to the caller's completion handler exactly
//! once. `send_async` is the awaitable form for tokio callers.

use std::sync::Arc;
use std::thread;

use tracing::{debug, warn};

use crate::error::QwebError;
use crate::http::{HttpRequest, HttpResponse, Transport, UreqTransport, OCTET_STREAM};

/// Result of a completed exchange. Only status 200 counts as success.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostOutcome {
    Success(String),
    Failure(String),
}

impl PostOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, PostOutcome::Success(_))
    }

    pub fn body(&self) -> &str {
        match self {
            PostOutcome::Success(body) | PostOutcome::Failure(body) => body,
        }
    }

    pub fn into_body(self) -> String {
        match self {
            PostOutcome::Success(body) | PostOutcome::Failure(body) => body,
        }
    }

    /// Route the outcome to the matching callback of `callbacks`.
    pub fn dispatch(self, callbacks: Callbacks) {
        match self {
            PostOutcome::Success(body) => {
                if let Some(on_success) = callbacks.on_success {
                    on_success(body);
                }
            }
            PostOutcome::Failure(body) => {
                if let Some(on_failure) = callbacks.on_failure {
                    on_failure(body);
                }
            }
        }
    }
}

type BodyCallback = Box<dyn FnOnce(String) + Send + 'static>;

/// An optional success/failure callback pair. Missing callbacks are no-ops.
#[derive(Default)]
pub struct Callbacks {
    on_success: Option<BodyCallback>,
    on_failure: Option<BodyCallback>,
}

impl Callbacks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_success(mut self, f: impl FnOnce(String) + Send + 'static) -> Self {
        self.on_success = Some(Box::new(f));
        self
    }

    pub fn on_failure(mut self, f: impl FnOnce(String) + Send + 'static) -> Self {
        self.on_failure = Some(Box::new(f));
        self
    }
}

/// Client for a single qweb device.
///
/// Cloning is cheap: clones share the same transport.
pub struct QwebClient<T = UreqTransport> {
    base_url: String,
    transport: Arc<T>,
}

impl<T> Clone for QwebClient<T> {
    fn clone(&self) -> Self {
        Self {
            base_url: self.base_url.clone(),
            transport: Arc::clone(&self.transport),
        }
    }
}

impl QwebClient<UreqTransport> {
    pub fn new(base_url: &str) -> Self {
        Self::with_transport(base_url, UreqTransport::new())
    }
}

impl<T: Transport + 'static> QwebClient<T> {
    pub fn with_transport(base_url: &str, transport: T) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            transport: Arc::new(transport),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `path` is joined to `base_url` unless it is already an absolute
    /// `http://` or `https://` URL, which is used as is.
    pub fn build_post(&self, path: &str, payload: &[u8]) -> HttpRequest {
        let url = if is_absolute(path) {
            path.to_string()
        } else if path.starts_with('/') {
            format!("{}{path}", self.base_url)
        } else {
            format!("{}/{path}", self.base_url)
        };
        HttpRequest {
            url,
            headers: vec![("Content-type".to_string(), OCTET_STREAM.to_string())],
            body: payload.to_vec(),
        }
    }

    /// Status 200 is `Success`; every other status, 2xx included, is `Failure`.
    pub fn classify(&self, response: HttpResponse) -> PostOutcome {
        if response.status == 200 {
            PostOutcome::Success(response.body)
        } else {
            PostOutcome::Failure(response.body)
        }
    }

    /// Perform the exchange on the calling thread.
    pub fn send(&self, path: &str, payload: &[u8]) -> Result<PostOutcome, QwebError> {
        let request = self.build_post(path, payload);
        debug!(url = %request.url, bytes = request.body.len(), "POST");
        let response = self.transport.execute(request)?;
        debug!(path, status = response.status, "POST completed");
        Ok(self.classify(response))
    }

    /// Fire-and-forget POST delivering the outcome to `callbacks`.
    ///
    /// Returns immediately. At most one callback runs, on the request thread.
    pub fn post(&self, path: &str, payload: impl Into<Vec<u8>>, callbacks: Callbacks) {
        self.post_with(path, payload, move |outcome| outcome.dispatch(callbacks));
    }

    /// Fire-and-forget POST delivering the outcome to a single handler.
    ///
    /// A transport failure completes as `Failure("")`, the way a browser
    /// reports a network error as status 0 with an empty body. If the
    /// exchange never completes the handler never runs.
    pub fn post_with<F>(&self, path: &str, payload: impl Into<Vec<u8>>, handler: F)
    where
        F: FnOnce(PostOutcome) + Send + 'static,
    {
        let client = self.clone();
        let path = path.to_string();
        let payload = payload.into();
        let spawned = thread::Builder::new()
            .name("qweb-post".to_string())
            .spawn(move || match client.send(&path, &payload) {
                Ok(outcome) => handler(outcome),
                Err(err) => {
                    warn!(path = %path, error = %err, "POST ended without a response");
                    handler(PostOutcome::Failure(String::new()));
                }
            });
        if let Err(err) = spawned {
            warn!(error = %err, "could not spawn request thread");
        }
    }

    /// Awaitable POST. Must be called from within a tokio runtime.
    pub async fn send_async(
        &self,
        path: &str,
        payload: impl Into<Vec<u8>>,
    ) -> Result<PostOutcome, QwebError> {
        let client = self.clone();
        let path = path.to_string();
        let payload = payload.into();
        tokio::task::spawn_blocking(move || client.send(&path, &payload))
            .await
            .map_err(|e| QwebError::Join(e.to_string()))?
    }
}

fn is_absolute(path: &str) -> bool {
    let lower = path.get(..8).unwrap_or(path).to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}
