//! Error types for the WebDAV client.
//!
//! # Design
//! Only transport failures are errors. Anything the server sends back, however
//! broken, is returned as a `Response` (see `response::BAD_RESPONSE` and
//! `response::BodyEnd`).

use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum WebDavError {
    /// The TCP connection could not be opened. No response exists.
    #[error("failed to connect to {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: io::Error,
    },

    /// The request bytes could not be written to the socket.
    #[error("failed to send request: {0}")]
    Send(#[source] io::Error),
}

pub type Result<T> = std::result::Result<T, WebDavError>;
