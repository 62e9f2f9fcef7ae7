//! Emulation of a qweb device for exercising the client over real HTTP.
//!
//! A `Device` maps exact request paths to POST handlers. Each handler sees
//! the request URI and the raw body and returns a `Reply`. As on the real
//! device, an unregistered path or an oversized body gets a 500 and any
//! method other than POST gets a 404.

use std::{collections::HashMap, sync::Arc};

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, State},
    http::{header, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    Router,
};
use tokio::net::TcpListener;
use tracing::{error, info};

pub use axum::http::StatusCode as Status;

/// Bodies of this many bytes or more are rejected.
pub const MAX_CONTENT_RECEIVE: usize = 10240;

pub const TEXT: &str = "text/plain";
pub const JSON: &str = "application/json";

/// What a POST handler sends back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub status: StatusCode,
    pub content_type: &'static str,
    pub body: Vec<u8>,
}

impl Reply {
    /// 200 OK with a text body.
    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        Self::status(StatusCode::OK, body)
    }

    /// 500 Internal Server Error with a text body.
    pub fn fail(body: impl Into<Vec<u8>>) -> Self {
        Self::status(StatusCode::INTERNAL_SERVER_ERROR, body)
    }

    pub fn status(status: StatusCode, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            content_type: TEXT,
            body: body.into(),
        }
    }

    pub fn with_type(mut self, content_type: &'static str) -> Self {
        self.content_type = content_type;
        self
    }
}

impl IntoResponse for Reply {
    fn into_response(self) -> Response {
        (
            self.status,
            [(header::CONTENT_TYPE, self.content_type)],
            self.body,
        )
            .into_response()
    }
}

pub type PostHandler = Arc<dyn Fn(&str, &[u8]) -> Reply + Send + Sync>;

/// Registry of POST handlers keyed by path.
#[derive(Clone, Default)]
pub struct Device {
    handlers: HashMap<String, PostHandler>,
}

impl Device {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_post<F>(mut self, path: &str, handler: F) -> Self
    where
        F: Fn(&str, &[u8]) -> Reply + Send + Sync + 'static,
    {
        info!(path, "registering post callback");
        self.handlers.insert(path.to_string(), Arc::new(handler));
        self
    }

    fn handle(&self, uri: &Uri, payload: &[u8]) -> Reply {
        let Some(handler) = self.handlers.get(uri.path()) else {
            error!(path = uri.path(), "no post callback registered");
            return Reply::fail("");
        };
        if payload.len() >= MAX_CONTENT_RECEIVE {
            error!(
                len = payload.len(),
                max = MAX_CONTENT_RECEIVE,
                "post body too large for receive buffer"
            );
            return Reply::fail("");
        }
        handler(&uri.to_string(), payload)
    }
}

/// Text of a null-terminated payload: everything before the first `0` byte,
/// decoded lossily.
pub fn payload_text(payload: &[u8]) -> String {
    let end = payload.iter().position(|&b| b == 0).unwrap_or(payload.len());
    String::from_utf8_lossy(&payload[..end]).into_owned()
}

/// Handlers used by the standalone binary: `/echo` returns the payload text,
/// `/fail` always fails.
pub fn demo_device() -> Device {
    Device::new()
        .on_post("/echo", |_, payload| Reply::ok(payload_text(payload)))
        .on_post("/fail", |_, _| Reply::fail("failed"))
}

/// Router that sends every request to the device. axum's body limit is
/// disabled so `MAX_CONTENT_RECEIVE` is the only size rule.
pub fn app(device: Device) -> Router {
    Router::new()
        .fallback(dispatch)
        .layer(DefaultBodyLimit::disable())
        .with_state(Arc::new(device))
}

pub async fn run(listener: TcpListener, device: Device) -> Result<(), std::io::Error> {
    axum::serve(listener, app(device)).await
}

async fn dispatch(
    State(device): State<Arc<Device>>,
    method: Method,
    uri: Uri,
    body: Bytes,
) -> Response {
    if method != Method::POST {
        return StatusCode::NOT_FOUND.into_response();
    }
    info!(%uri, len = body.len(), "POST");
    // Handlers are plain blocking functions.
    match tokio::task::spawn_blocking(move || device.handle(&uri, &body)).await {
        Ok(reply) => reply.into_response(),
        Err(err) => {
            error!(error = %err, "post callback panicked");
            Reply::fail("").into_response()
        }
    }
}
