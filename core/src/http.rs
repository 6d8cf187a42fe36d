//! HTTP/1.0 request types and the wire serializer.
//!
//! # Design
//! A `Request` is plain data: method, opaque target, ordered headers and an
//! optional body. `Request::to_bytes` is the only place that knows the wire
//! layout, so everything upstream (the per-verb builders in `client`) stays a
//! mechanical mapping from verb to method + headers + body.
//!
//! The target is sent exactly as given. Percent-encoding and absolute-URL
//! formatting (needed when talking through a proxy) are the caller's job.

use std::fmt;

const CRLF: &str = "\r\n";

/// The verbs this client knows how to send.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Head,
    Get,
    Options,
    Post,
    Put,
    Move,
    Copy,
    Mkcol,
    Delete,
    Propfind,
    Lock,
    Unlock,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Head => "HEAD",
            Method::Get => "GET",
            Method::Options => "OPTIONS",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Move => "MOVE",
            Method::Copy => "COPY",
            Method::Mkcol => "MKCOL",
            Method::Delete => "DELETE",
            Method::Propfind => "PROPFIND",
            Method::Lock => "LOCK",
            Method::Unlock => "UNLOCK",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered header table.
///
/// Names compare ASCII case-insensitively; the spelling of the first
/// insertion is the one kept and emitted. Two write policies exist:
///
/// - [`Headers::insert`] replaces the value of an existing name in place
///   (request side: later duplicates overwrite).
/// - [`Headers::append_merged`] concatenates onto an existing value with
///   `"; "` (response side: repeated headers such as `Set-Cookie` are all
///   kept in one entry). Values that themselves contain `"; "` cannot be
///   split back apart, which is the accepted cost of this policy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: Vec<(String, String)>,
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `name` to `value`, overwriting any existing value for that name.
    pub fn insert(&mut self, name: impl Into<String>, value: impl fmt::Display) {
        let name = name.into();
        let value = value.to_string();
        match self.position(&name) {
            Some(idx) => self.entries[idx].1 = value,
            None => self.entries.push((name, value)),
        }
    }

    /// Add `value` under `name`, joining onto an existing value with `"; "`.
    pub fn append_merged(&mut self, name: impl Into<String>, value: impl fmt::Display) {
        let name = name.into();
        let value = value.to_string();
        match self.position(&name) {
            Some(idx) => {
                let existing = &mut self.entries[idx].1;
                existing.push_str("; ");
                existing.push_str(&value);
            }
            None => self.entries.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.position(name).map(|idx| self.entries[idx].1.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.position(name).map(|idx| self.entries.remove(idx).1)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Apply every entry of `other` with [`Headers::insert`] semantics.
    pub fn extend_from(&mut self, other: &Headers) {
        for (name, value) in other.iter() {
            self.insert(name, value);
        }
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|(k, _)| k.eq_ignore_ascii_case(name))
    }
}

impl<K: Into<String>, V: fmt::Display> FromIterator<(K, V)> for Headers {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut headers = Headers::new();
        for (k, v) in iter {
            headers.insert(k, v);
        }
        headers
    }
}

/// A request described as plain data.
///
/// Built by the `WebDavClient::build_*` methods (or by hand) and turned into
/// wire bytes with [`Request::to_bytes`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: Method,
    pub target: String,
    pub headers: Headers,
    pub body: Option<Vec<u8>>,
}

impl Request {
    pub fn new(method: Method, target: impl Into<String>) -> Self {
        Self {
            method,
            target: target.into(),
            headers: Headers::new(),
            body: None,
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl fmt::Display) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// The body when present and non-empty. An empty body is never sent.
    pub fn payload(&self) -> Option<&[u8]> {
        self.body.as_deref().filter(|b| !b.is_empty())
    }

    /// Serialize to the exact bytes written on the socket.
    ///
    /// Layout: request line, `Content-Length` when a payload exists, the
    /// remaining headers in insertion order, a blank line, then the payload
    /// followed by one trailing CRLF. A caller-supplied `Content-Length` is
    /// always discarded in favor of the computed one.
    pub fn to_bytes(&self) -> Vec<u8> {
        let payload = self.payload();

        let mut head = format!("{} {} HTTP/1.0{CRLF}", self.method, self.target);
        if let Some(body) = payload {
            head.push_str(&format!("Content-Length: {}{CRLF}", body.len()));
        }
        for (name, value) in self.headers.iter() {
            if name.eq_ignore_ascii_case("content-length") {
                continue;
            }
            head.push_str(&format!("{name}: {value}{CRLF}"));
        }
        head.push_str(CRLF);

        let mut out = head.into_bytes();
        if let Some(body) = payload {
            out.extend_from_slice(body);
            out.extend_from_slice(CRLF.as_bytes());
        }
        out
    }
}
