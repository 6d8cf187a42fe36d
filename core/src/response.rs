//! Response reader: status line, header block, best-effort body drain.
//!
//! # Design
//! The server is not trusted to frame the body. `Content-Length` is ignored
//! and chunked encoding is not decoded. A response moves through
//!
//! ```text
//! ReadingStatusLine -> ReadingHeaders -> ReadingBody -> Done
//! ```
//!
//! and every phase falls through to `Done` on end-of-stream. Nothing in this
//! module returns an error: failures are reported through [`BAD_RESPONSE`],
//! missing headers, and [`BodyEnd`].
//!
//! The head is read with blocking reads. The body is drained with a polling
//! loop that distinguishes "bytes now" from "nothing yet"
//! (`WouldBlock`/`TimedOut`); after [`ReadPolicy::max_empty_reads`]
//! consecutive empty reads the drain gives up and returns what it has.

use std::io::{self, BufRead, ErrorKind, Read};
use std::thread;
use std::time::Duration;

use tracing::{trace, warn};

use crate::http::Headers;

/// Status reported when the first line is not an HTTP status line.
pub const BAD_RESPONSE: i32 = -2;

const CHUNK_SIZE: usize = 4096;

/// Limits and pacing for reading a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadPolicy {
    /// Maximum bytes kept per status or header line. The rest of a longer
    /// line is discarded up to and including its `\n`.
    pub line_limit: usize,
    /// Consecutive empty reads tolerated while draining the body.
    pub max_empty_reads: u32,
    /// Sleep after each empty read.
    pub pause: Duration,
    /// Socket read timeout used during the body drain. Only applied by
    /// `transport`; generic readers ignore it.
    pub poll_interval: Duration,
}

impl Default for ReadPolicy {
    fn default() -> Self {
        Self {
            line_limit: 1024,
            max_empty_reads: 10,
            pause: Duration::from_millis(2),
            poll_interval: Duration::from_millis(100),
        }
    }
}

/// Why the body drain stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyEnd {
    /// The peer closed the stream. The body is complete as far as HTTP/1.0
    /// framing can tell.
    EndOfStream,
    /// The empty-read budget ran out. The body may be truncated.
    Exhausted,
    /// A read failed with an I/O error. The body holds whatever came before.
    Failed,
    /// The status line never arrived, so no drain was attempted.
    Skipped,
}

/// Status line and headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Head {
    pub status: i32,
    pub headers: Headers,
    /// `false` when the stream ended (or failed) before a status line byte
    /// arrived; the body phase is skipped in that case.
    pub connected: bool,
}

/// A parsed response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: i32,
    pub headers: Headers,
    pub body: Vec<u8>,
    pub body_end: BodyEnd,
}

impl Head {
    fn unreadable() -> Self {
        Self {
            status: BAD_RESPONSE,
            headers: Headers::new(),
            connected: false,
        }
    }

    /// Attach a drained body. Use `BodyEnd::Skipped` with an empty body when
    /// `connected` is false.
    pub fn into_response(self, body: Vec<u8>, body_end: BodyEnd) -> Response {
        Response {
            status: self.status,
            headers: self.headers,
            body,
            body_end,
        }
    }
}

impl Response {
    pub fn is_bad_response(&self) -> bool {
        self.status == BAD_RESPONSE
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Read a full response from `reader`.
pub fn read_response<R: BufRead>(reader: &mut R, policy: &ReadPolicy) -> Response {
    let head = read_head(reader, policy);
    if !head.connected {
        return head.into_response(Vec::new(), BodyEnd::Skipped);
    }
    let (body, body_end) = drain_body(reader, policy);
    head.into_response(body, body_end)
}

/// Read the status line and the header block.
pub fn read_head<R: BufRead>(reader: &mut R, policy: &ReadPolicy) -> Head {
    let line = match read_line_bounded(reader, policy.line_limit) {
        Ok(Some(line)) => line,
        Ok(None) => {
            warn!("stream closed before status line");
            return Head::unreadable();
        }
        Err(e) => {
            warn!(error = %e, "failed to read status line");
            return Head::unreadable();
        }
    };

    let text = String::from_utf8_lossy(&line);
    let status = parse_status_line(text.trim()).unwrap_or_else(|| {
        warn!(line = %text.trim(), "unrecognized status line");
        BAD_RESPONSE
    });

    Head {
        status,
        headers: read_headers(reader, policy),
        connected: true,
    }
}

/// Parse `HTTP/<version> <3 digits>[ <reason>]`, case-insensitive on `HTTP`.
pub fn parse_status_line(line: &str) -> Option<i32> {
    let prefix = line.get(..5)?;
    if !prefix.eq_ignore_ascii_case("HTTP/") {
        return None;
    }
    let mut parts = line[5..].splitn(2, char::is_whitespace);
    let version = parts.next()?;
    if version.is_empty() {
        return None;
    }
    let rest = parts.next()?;
    let code = rest.get(..3)?;
    if !code.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    match rest[3..].chars().next() {
        None => {}
        Some(c) if c.is_whitespace() => {}
        Some(_) => return None,
    }
    code.parse().ok()
}

fn read_headers<R: BufRead>(reader: &mut R, policy: &ReadPolicy) -> Headers {
    let mut headers = Headers::new();
    loop {
        let line = match read_line_bounded(reader, policy.line_limit) {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                warn!(error = %e, "header block interrupted");
                break;
            }
        };
        let text = String::from_utf8_lossy(&line);
        let text = text.trim_end_matches(['\r', '\n']);
        if text.is_empty() {
            break;
        }
        match text.split_once(": ") {
            Some((name, value)) => headers.append_merged(name, value.trim()),
            None => warn!(line = %text, "skipping malformed header line"),
        }
    }
    headers
}

/// Read up to and including `\n`, keeping at most `limit` bytes. An
/// overlong line is truncated and its remainder skipped, so the next call
/// starts on a fresh line. `Ok(None)` means the stream was already at its end.
fn read_line_bounded<R: BufRead>(reader: &mut R, limit: usize) -> io::Result<Option<Vec<u8>>> {
    let mut line = Vec::new();
    let n = reader.by_ref().take(limit as u64).read_until(b'\n', &mut line)?;
    if n == 0 {
        return Ok(None);
    }
    if n >= limit && line.last() != Some(&b'\n') {
        let skipped = skip_line(reader)?;
        warn!(limit, skipped, "line exceeds limit, remainder discarded");
    }
    Ok(Some(line))
}

/// Consume bytes through the next `\n` (or end of stream) without keeping them.
fn skip_line<R: BufRead>(reader: &mut R) -> io::Result<usize> {
    let mut skipped = 0;
    loop {
        let (done, used) = {
            let buf = match reader.fill_buf() {
                Ok(buf) => buf,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            };
            if buf.is_empty() {
                return Ok(skipped);
            }
            match buf.iter().position(|&b| b == b'\n') {
                Some(i) => (true, i + 1),
                None => (false, buf.len()),
            }
        };
        reader.consume(used);
        skipped += used;
        if done {
            return Ok(skipped);
        }
    }
}

/// Drain whatever follows the header block.
pub fn drain_body<R: Read>(reader: &mut R, policy: &ReadPolicy) -> (Vec<u8>, BodyEnd) {
    let mut body = Vec::new();
    let mut chunk = [0u8; CHUNK_SIZE];
    let mut empty_reads = 0u32;

    let end = loop {
        match reader.read(&mut chunk) {
            Ok(0) => break BodyEnd::EndOfStream,
            Ok(n) => {
                body.extend_from_slice(&chunk[..n]);
                empty_reads = 0;
                trace!(read = n, total = body.len(), "body chunk");
            }
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                empty_reads += 1;
                trace!(empty_reads, "no body bytes available");
                if empty_reads >= policy.max_empty_reads {
                    break BodyEnd::Exhausted;
                }
                if !policy.pause.is_zero() {
                    thread::sleep(policy.pause);
                }
            }
            Err(e) => {
                warn!(error = %e, received = body.len(), "body read failed");
                break BodyEnd::Failed;
            }
        }
    };
    (body, end)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufReader, Cursor};

    fn parse(raw: &[u8]) -> Response {
        read_response(&mut Cursor::new(raw.to_vec()), &ReadPolicy::default())
    }

    fn instant() -> ReadPolicy {
        ReadPolicy {
            pause: Duration::ZERO,
            ..ReadPolicy::default()
        }
    }

    /// Yields `data` in pieces, reporting `WouldBlock` between them and
    /// forever once exhausted (a peer that never closes).
    struct Trickle {
        pieces: Vec<Vec<u8>>,
        reads: u32,
    }

    impl Read for Trickle {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.reads += 1;
            if self.reads % 2 == 1 && !self.pieces.is_empty() {
                let piece = self.pieces.remove(0);
                buf[..piece.len()].copy_from_slice(&piece);
                return Ok(piece.len());
            }
            Err(io::Error::new(ErrorKind::WouldBlock, "nothing yet"))
        }
    }

    struct Broken;

    impl Read for Broken {
        fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
            Err(io::Error::new(ErrorKind::ConnectionReset, "reset"))
        }
    }

    #[test]
    fn well_formed_multistatus() {
        let resp = parse(b"HTTP/1.1 207 Multi-Status\r\nContent-Type: text/xml\r\n\r\n<xml/>");
        assert_eq!(resp.status, 207);
        assert_eq!(resp.headers.len(), 1);
        assert_eq!(resp.header("Content-Type"), Some("text/xml"));
        assert_eq!(resp.body, b"<xml/>");
        assert_eq!(resp.body_end, BodyEnd::EndOfStream);
    }

    #[test]
    fn empty_stream_is_bad_response() {
        let resp = parse(b"");
        assert_eq!(resp.status, BAD_RESPONSE);
        assert!(resp.is_bad_response());
        assert!(resp.headers.is_empty());
        assert!(resp.body.is_empty());
        assert_eq!(resp.body_end, BodyEnd::Skipped);
    }

    #[test]
    fn garbage_status_line_still_reads_rest() {
        let resp = parse(b"SSH-2.0-OpenSSH\r\nX-Note: hi\r\n\r\nbody");
        assert_eq!(resp.status, BAD_RESPONSE);
        assert_eq!(resp.header("X-Note"), Some("hi"));
        assert_eq!(resp.body, b"body");
    }

    #[test]
    fn reset_before_status_is_bad_response() {
        let mut reader = BufReader::new(Broken);
        let resp = read_response(&mut reader, &instant());
        assert!(resp.is_bad_response());
        assert_eq!(resp.body_end, BodyEnd::Skipped);
    }

    #[test]
    fn repeated_headers_are_concatenated() {
        let resp = parse(
            b"HTTP/1.0 200 OK\r\nSet-Cookie: a=1\r\nSet-Cookie: b=2\r\nServer: x\r\n\r\n",
        );
        assert_eq!(resp.headers.len(), 2);
        assert_eq!(resp.header("Set-Cookie"), Some("a=1; b=2"));
    }

    #[test]
    fn header_values_are_trimmed() {
        let resp = parse(b"HTTP/1.0 200 OK\r\nDAV:   1, 2  \r\n\r\n");
        assert_eq!(resp.header("DAV"), Some("1, 2"));
    }

    #[test]
    fn malformed_header_is_skipped() {
        let resp = parse(b"HTTP/1.0 200 OK\r\nnot-a-header\r\nX-Ok: yes\r\n\r\nrest");
        assert_eq!(resp.headers.len(), 1);
        assert_eq!(resp.header("X-Ok"), Some("yes"));
        assert_eq!(resp.body, b"rest");
    }

    #[test]
    fn bare_lf_terminates_headers() {
        let resp = parse(b"HTTP/1.0 204 No Content\nX-A: 1\n\nz");
        assert_eq!(resp.status, 204);
        assert_eq!(resp.header("X-A"), Some("1"));
        assert_eq!(resp.body, b"z");
    }

    #[test]
    fn eof_inside_headers_finishes() {
        let resp = parse(b"HTTP/1.0 200 OK\r\nX-A: 1\r\n");
        assert_eq!(resp.status, 200);
        assert_eq!(resp.header("X-A"), Some("1"));
        assert!(resp.body.is_empty());
        assert_eq!(resp.body_end, BodyEnd::EndOfStream);
    }

    #[test]
    fn content_length_is_not_trusted() {
        let resp = parse(b"HTTP/1.0 200 OK\r\nContent-Length: 2\r\n\r\nabcdef");
        assert_eq!(resp.body, b"abcdef");
    }

    #[test]
    fn status_line_variants() {
        assert_eq!(parse_status_line("HTTP/1.0 404 Not Found"), Some(404));
        assert_eq!(parse_status_line("http/1.1 201 Created"), Some(201));
        assert_eq!(parse_status_line("HTTP/2 200"), Some(200));
        assert_eq!(parse_status_line("HTTP/1.1 20 OK"), None);
        assert_eq!(parse_status_line("HTTP/1.1 2000 OK"), None);
        assert_eq!(parse_status_line("HTTP/ 200 OK"), None);
        assert_eq!(parse_status_line("ICY 200 OK"), None);
        assert_eq!(parse_status_line(""), None);
    }

    #[test]
    fn long_status_line_is_bounded() {
        let policy = ReadPolicy {
            line_limit: 16,
            ..instant()
        };
        let mut raw = b"HTTP/1.0 200 ".to_vec();
        raw.extend(std::iter::repeat(b'x').take(40));
        raw.extend_from_slice(b"\r\n\r\n");
        let resp = read_response(&mut Cursor::new(raw), &policy);
        assert_eq!(resp.status, 200);
        assert!(resp.headers.is_empty());
        assert!(resp.body.is_empty());
    }

    #[test]
    fn head_into_response_keeps_status_and_headers() {
        let head = read_head(
            &mut Cursor::new(b"HTTP/1.0 201 Created\r\nLocation: /n\r\n\r\n".to_vec()),
            &instant(),
        );
        assert!(head.connected);
        let resp = head.into_response(b"x".to_vec(), BodyEnd::EndOfStream);
        assert_eq!(resp.status, 201);
        assert_eq!(resp.header("Location"), Some("/n"));
        assert_eq!(resp.body, b"x");
    }

    #[test]
    fn overlong_header_does_not_end_header_block() {
        let mut raw = b"HTTP/1.0 200 OK\r\nX-Long: ".to_vec();
        raw.extend(std::iter::repeat(b'a').take(1016));
        raw.extend_from_slice(b"\r\nSet-Cookie: s=1\r\n\r\nbody");
        let resp = parse(&raw);
        assert_eq!(resp.status, 200);
        assert_eq!(resp.header("X-Long").map(str::len), Some(1016));
        assert_eq!(resp.header("Set-Cookie"), Some("s=1"));
        assert_eq!(resp.body, b"body");
    }

    #[test]
    fn overlong_status_line_remainder_is_skipped() {
        let policy = ReadPolicy {
            line_limit: 10,
            ..instant()
        };
        let raw = b"HTTP/1.0 404 Not Found At All\r\nX-A: 1\r\n\r\n".to_vec();
        let resp = read_response(&mut Cursor::new(raw), &policy);
        assert_eq!(resp.status, BAD_RESPONSE);
        assert_eq!(resp.header("X-A"), Some("1"));
        assert!(resp.body.is_empty());
    }

    #[test]
    fn drain_collects_slow_body() {
        let mut reader = Trickle {
            pieces: vec![b"ab".to_vec(), b"cd".to_vec(), b"ef".to_vec()],
            reads: 0,
        };
        let (body, end) = drain_body(&mut reader, &instant());
        assert_eq!(body, b"abcdef");
        assert_eq!(end, BodyEnd::Exhausted);
    }

    #[test]
    fn drain_stops_after_empty_read_budget() {
        let mut reader = Trickle {
            pieces: Vec::new(),
            reads: 0,
        };
        let policy = ReadPolicy {
            max_empty_reads: 4,
            ..instant()
        };
        let (body, end) = drain_body(&mut reader, &policy);
        assert!(body.is_empty());
        assert_eq!(end, BodyEnd::Exhausted);
        assert_eq!(reader.reads, 4);
    }

    #[test]
    fn drain_reports_io_failure() {
        let (body, end) = drain_body(&mut Broken, &instant());
        assert!(body.is_empty());
        assert_eq!(end, BodyEnd::Failed);
    }

    #[test]
    fn body_text_is_lossy() {
        let resp = parse(b"HTTP/1.0 200 OK\r\n\r\nok\xff");
        assert_eq!(resp.body_text(), "ok\u{fffd}");
        assert!(resp.is_success());
    }
}
