//! Client for qweb binary POST endpoints.
//!
//! # Overview
//! Sends raw byte payloads to a qweb device with `Content-type:
//! application/octet-stream` and reports the result as a `PostOutcome`:
//! `Success(body)` for status 200, `Failure(body)` for anything else.
//! Payloads are usually built with `string_to_bytes` or `json_to_bytes`,
//! which produce the null-terminated byte-per-character encoding the
//! device reads as a C string.
//!
//! # Design
//! - `QwebClient` is stateless apart from `base_url` and a shared transport.
//! - `build_post` / `classify` are pure; `Transport` performs the I/O, so
//!   request shape and outcome rules are testable without a network.
//! - Three delivery styles share one exchange: `send` (blocking `Result`),
//!   `post` / `post_with` (fire-and-forget, completion callback) and
//!   `send_async` (future).

pub mod client;
pub mod encode;
pub mod error;
pub mod http;

pub use client::{Callbacks, PostOutcome, QwebClient};
pub use encode::{json_to_bytes, string_to_bytes, JsNumberFormatter};
pub use error::{QwebError, TransportError};
pub use http::{HttpRequest, HttpResponse, Transport, UreqTransport};
