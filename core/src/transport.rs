//! One request, one socket.
//!
//! # Design
//! `exchange` takes the stream by value: it writes the request, reads the
//! head with blocking reads, switches the socket to a short read timeout for
//! the body drain, and drops the stream before returning. Every exit path
//! closes the connection.

use std::io::{BufReader, Write};
use std::net::TcpStream;

use tracing::debug;

use crate::config::Endpoint;
use crate::error::{Result, WebDavError};
use crate::http::Request;
use crate::response::{self, BodyEnd, ReadPolicy, Response};

/// Open a connection to the endpoint (or its proxy).
pub fn connect(endpoint: &Endpoint) -> Result<TcpStream> {
    let (host, port) = endpoint.connect_target();
    let stream = TcpStream::connect((host, port)).map_err(|source| WebDavError::Connect {
        addr: format!("{host}:{port}"),
        source,
    })?;
    debug!(%host, port, "connected");
    Ok(stream)
}

/// Send `request` over `stream` and read the response.
pub fn exchange(mut stream: TcpStream, request: &Request, policy: &ReadPolicy) -> Result<Response> {
    let bytes = request.to_bytes();
    stream
        .write_all(&bytes)
        .and_then(|()| stream.flush())
        .map_err(WebDavError::Send)?;
    debug!(method = %request.method, target = %request.target, sent = bytes.len(), "request sent");

    let mut reader = BufReader::new(stream);
    let head = response::read_head(&mut reader, policy);
    if !head.connected {
        return Ok(head.into_response(Vec::new(), BodyEnd::Skipped));
    }

    // A failure here only means the drain may block until the peer closes.
    if let Err(e) = reader.get_ref().set_read_timeout(Some(policy.poll_interval)) {
        debug!(error = %e, "could not set body read timeout");
    }
    let (body, body_end) = response::drain_body(&mut reader, policy);

    debug!(
        status = head.status,
        headers = head.headers.len(),
        body = body.len(),
        ?body_end,
        "response received"
    );
    Ok(head.into_response(body, body_end))
}
