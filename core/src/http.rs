//! HTTP exchange described as plain data, plus the transport seam.
//!
//! # Design
//! `QwebClient` builds an `HttpRequest` and classifies an `HttpResponse`
//! without touching the network. The `Transport` trait is the only place
//! bytes hit a socket, so tests and embedders can swap it out. The default
//! `UreqTransport` reports every HTTP status as data; only failures that
//! never yield a status become a `TransportError`.

use crate::error::TransportError;

/// Content type sent with every qweb POST.
pub const OCTET_STREAM: &str = "application/octet-stream";

/// A binary POST described as plain data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

/// A completed exchange: status plus the body decoded as text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

/// Executes an `HttpRequest`, blocking the current thread until a response
/// arrives or the exchange fails.
pub trait Transport: Send + Sync {
    fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// `Transport` backed by a ureq agent.
///
/// No global timeout is configured: an exchange that never completes keeps
/// its thread parked.
#[derive(Clone)]
pub struct UreqTransport {
    agent: ureq::Agent,
}

impl UreqTransport {
    pub fn new() -> Self {
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .build()
            .new_agent();
        Self { agent }
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for UreqTransport {
    fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let mut builder = self.agent.post(request.url.as_str());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        let mut response = builder.send(&request.body[..])?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let raw = response.body_mut().read_to_vec()?;

        Ok(HttpResponse {
            status,
            headers,
            body: String::from_utf8_lossy(&raw).into_owned(),
        })
    }
}

impl<T: Transport + ?Sized> Transport for std::sync::Arc<T> {
    fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        (**self).execute(request)
    }
}
