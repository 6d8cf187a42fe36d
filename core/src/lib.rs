//! Minimal WebDAV client over HTTP/1.0.
//!
//! # Overview
//! Formats WebDAV verbs (HEAD, GET, OPTIONS, POST, PUT, MOVE, COPY, MKCOL,
//! DELETE, PROPFIND, LOCK, UNLOCK) into raw request bytes, writes them over a
//! plain TCP socket, and parses the reply into a status code, a header table
//! and the raw body. XML bodies are handed back unparsed.
//!
//! # Design
//! - `WebDavClient` is stateless apart from its configuration.
//! - Each verb is split into `build_*` (pure, produces a `Request`) and an
//!   executing method (one socket per call), so the I/O boundary is explicit.
//! - Response parsing never fails: an unparseable status line yields
//!   `BAD_RESPONSE`, and `BodyEnd` says how the body drain stopped.
//! - Repeated response headers are merged into one entry joined by `"; "`.
//! - HTTP/1.1 features (keep-alive, chunked encoding, 100-continue), TLS,
//!   retries and redirects are not handled.

pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod response;
pub mod transport;
pub mod types;

pub use client::WebDavClient;
pub use config::{ClientConfig, Endpoint, Proxy};
pub use error::WebDavError;
pub use http::{Headers, Method, Request};
pub use response::{read_response, BodyEnd, ReadPolicy, Response, BAD_RESPONSE};
pub use types::{Depth, LockScope, LockType};
