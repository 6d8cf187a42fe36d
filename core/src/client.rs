//! Per-verb WebDAV client.
//!
//! # Design
//! `WebDavClient` holds only its `ClientConfig` and carries no mutable state
//! between calls. Each verb is split into a `build_*` method that produces a
//! `Request` without touching the network, and an executing method that
//! opens a socket, sends the request, reads the response and closes the
//! socket. Callers that do their own I/O can stop at `build_*` and feed the
//! reply to `response::read_response`.

use std::fmt;

use tracing::debug;

use crate::config::{ClientConfig, Endpoint};
use crate::error::Result;
use crate::http::{Method, Request};
use crate::response::Response;
use crate::transport;
use crate::types::{form_urlencode, lock_body, Depth, LockScope, LockType};

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Blocking HTTP/1.0 WebDAV client.
#[derive(Debug, Clone)]
pub struct WebDavClient {
    config: ClientConfig,
}

impl WebDavClient {
    pub fn new(endpoint: Endpoint) -> Self {
        Self::with_config(ClientConfig::new(endpoint))
    }

    pub fn with_config(config: ClientConfig) -> Self {
        Self { config }
    }

    /// Add a header sent with every request, e.g. a caller-built
    /// `Authorization` or `Cookie`. Verb-specific headers win on collision.
    pub fn with_header(mut self, name: impl Into<String>, value: impl fmt::Display) -> Self {
        self.config.default_headers.insert(name, value);
        self
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn request(&self, method: Method, uri: &str) -> Request {
        let mut req = Request::new(method, uri);
        req.headers.extend_from(&self.config.default_headers);
        req
    }

    pub fn build_head(&self, uri: &str) -> Request {
        self.request(Method::Head, uri)
    }

    pub fn build_get(&self, uri: &str) -> Request {
        self.request(Method::Get, uri)
    }

    pub fn build_options(&self, uri: &str) -> Request {
        self.request(Method::Options, uri)
    }

    /// Form POST. An empty `params` slice sends no body but keeps the
    /// `Content-Type` header.
    pub fn build_post<K, V>(&self, uri: &str, params: &[(K, V)]) -> Request
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        self.request(Method::Post, uri)
            .header("Content-Type", FORM_CONTENT_TYPE)
            .body(form_urlencode(params))
    }

    pub fn build_put(&self, uri: &str, content: impl Into<Vec<u8>>) -> Request {
        self.request(Method::Put, uri).body(content)
    }

    pub fn build_move(&self, src: &str, dest: &str, overwrite: bool) -> Request {
        self.relocation(Method::Move, src, dest, overwrite)
    }

    pub fn build_copy(&self, src: &str, dest: &str, overwrite: bool) -> Request {
        self.relocation(Method::Copy, src, dest, overwrite)
    }

    fn relocation(&self, method: Method, src: &str, dest: &str, overwrite: bool) -> Request {
        self.request(method, src)
            .header("Overwrite", if overwrite { "T" } else { "F" })
            .header("Destination", dest)
    }

    pub fn build_mkcol(&self, uri: &str) -> Request {
        self.request(Method::Mkcol, uri)
    }

    pub fn build_delete(&self, uri: &str) -> Request {
        self.request(Method::Delete, uri)
    }

    pub fn build_propfind(&self, uri: &str, depth: Depth) -> Request {
        self.request(Method::Propfind, uri).header("Depth", depth)
    }

    pub fn build_lock(&self, uri: &str, scope: LockScope, lock_type: LockType, owner: &str) -> Request {
        self.request(Method::Lock, uri)
            .body(lock_body(scope, lock_type, owner))
    }

    /// `token` is the bare lock token; the angle brackets are added here.
    pub fn build_unlock(&self, uri: &str, token: &str) -> Request {
        self.request(Method::Unlock, uri)
            .header("Lock-Token", format!("<{token}>"))
    }

    /// Open a connection, send `request`, and return the parsed reply.
    pub fn execute(&self, request: &Request) -> Result<Response> {
        let stream = transport::connect(&self.config.endpoint)?;
        debug!(method = %request.method, target = %request.target, "executing");
        transport::exchange(stream, request, &self.config.read)
    }

    pub fn head(&self, uri: &str) -> Result<Response> {
        self.execute(&self.build_head(uri))
    }

    pub fn get(&self, uri: &str) -> Result<Response> {
        self.execute(&self.build_get(uri))
    }

    pub fn options(&self, uri: &str) -> Result<Response> {
        self.execute(&self.build_options(uri))
    }

    pub fn post<K, V>(&self, uri: &str, params: &[(K, V)]) -> Result<Response>
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        self.execute(&self.build_post(uri, params))
    }

    /// Upload `content` verbatim. Usually answered with 201 or 204.
    pub fn put(&self, uri: &str, content: impl Into<Vec<u8>>) -> Result<Response> {
        self.execute(&self.build_put(uri, content))
    }

    /// MOVE `src` to `dest`. Named `move_resource` since `move` is reserved.
    ///
    /// Pass `overwrite: true` for the usual behavior (`Overwrite: T`); `false`
    /// asks the server to fail with 412 when `dest` exists.
    pub fn move_resource(&self, src: &str, dest: &str, overwrite: bool) -> Result<Response> {
        self.execute(&self.build_move(src, dest, overwrite))
    }

    /// COPY `src` to `dest`. `overwrite: true` is the conventional default.
    pub fn copy(&self, src: &str, dest: &str, overwrite: bool) -> Result<Response> {
        self.execute(&self.build_copy(src, dest, overwrite))
    }

    pub fn mkcol(&self, uri: &str) -> Result<Response> {
        self.execute(&self.build_mkcol(uri))
    }

    pub fn delete(&self, uri: &str) -> Result<Response> {
        self.execute(&self.build_delete(uri))
    }

    /// The multistatus XML is returned unparsed in `Response::body`.
    /// `Depth::default()` is `Depth::Zero`, the resource alone.
    pub fn propfind(&self, uri: &str, depth: Depth) -> Result<Response> {
        self.execute(&self.build_propfind(uri, depth))
    }

    pub fn lock(&self, uri: &str, scope: LockScope, lock_type: LockType, owner: &str) -> Result<Response> {
        self.execute(&self.build_lock(uri, scope, lock_type, owner))
    }

    pub fn unlock(&self, uri: &str, token: &str) -> Result<Response> {
        self.execute(&self.build_unlock(uri, token))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> WebDavClient {
        WebDavClient::new(Endpoint::new("dav.example.org"))
    }

    fn text(req: &Request) -> String {
        String::from_utf8(req.to_bytes()).unwrap()
    }

    #[test]
    fn simple_verbs_have_no_headers_or_body() {
        let c = client();
        for (req, method) in [
            (c.build_head("/a"), "HEAD"),
            (c.build_get("/a"), "GET"),
            (c.build_options("/a"), "OPTIONS"),
            (c.build_mkcol("/a"), "MKCOL"),
            (c.build_delete("/a"), "DELETE"),
        ] {
            assert!(req.headers.is_empty(), "{method}");
            assert!(req.body.is_none(), "{method}");
            assert_eq!(text(&req), format!("{method} /a HTTP/1.0\r\n\r\n"));
        }
    }

    #[test]
    fn post_encodes_form() {
        let req = client().build_post("/login", &[("login", "tiger"), ("password", "secret")]);
        assert_eq!(req.method, Method::Post);
        assert_eq!(req.body.as_deref(), Some(&b"login=tiger&password=secret"[..]));
        assert_eq!(
            req.headers.get("Content-Type"),
            Some("application/x-www-form-urlencoded")
        );
        assert_eq!(
            text(&req),
            "POST /login HTTP/1.0\r\n\
             Content-Length: 27\r\n\
             Content-Type: application/x-www-form-urlencoded\r\n\
             \r\n\
             login=tiger&password=secret\r\n"
        );
    }

    #[test]
    fn post_without_params_has_no_length() {
        let params: [(&str, &str); 0] = [];
        let out = text(&client().build_post("/ping", &params));
        assert!(out.contains("Content-Type: application/x-www-form-urlencoded\r\n"));
        assert!(!out.contains("Content-Length"));
    }

    #[test]
    fn put_sends_content_verbatim() {
        let req = client().build_put("/bin", vec![0u8, 1, 2, 255]);
        assert!(req.headers.is_empty());
        let bytes = req.to_bytes();
        assert!(bytes.ends_with(&[b'\r', b'\n', b'\r', b'\n', 0, 1, 2, 255, b'\r', b'\n']));
    }

    #[test]
    fn move_and_copy_default_to_overwrite() {
        let c = client();
        for (req, method) in [(c.build_move("/a", "/b", true), "MOVE"), (c.build_copy("/a", "/b", true), "COPY")] {
            assert_eq!(req.target, "/a");
            assert_eq!(req.headers.get("Overwrite"), Some("T"));
            assert_eq!(req.headers.get("Destination"), Some("/b"));
            assert_eq!(
                text(&req),
                format!("{method} /a HTTP/1.0\r\nOverwrite: T\r\nDestination: /b\r\n\r\n")
            );
        }
    }

    #[test]
    fn propfind_default_depth_is_zero() {
        let req = client().build_propfind("/", Depth::default());
        assert_eq!(text(&req), "PROPFIND / HTTP/1.0\r\nDepth: 0\r\n\r\n");
    }

    #[test]
    fn move_without_overwrite() {
        let req = client().build_move("/a", "/b", false);
        assert_eq!(req.headers.get("Overwrite"), Some("F"));
    }

    #[test]
    fn propfind_depths() {
        let c = client();
        assert_eq!(c.build_propfind("/", Depth::Zero).headers.get("Depth"), Some("0"));
        assert_eq!(c.build_propfind("/", Depth::One).headers.get("Depth"), Some("1"));
        assert_eq!(
            c.build_propfind("/", Depth::Infinity).headers.get("Depth"),
            Some("Infinity")
        );
    }

    #[test]
    fn lock_carries_xml_body() {
        let req = client().build_lock("/doc", LockScope::Exclusive, LockType::Write, "mailto:ada@example.org");
        assert!(req.headers.is_empty());
        let body = String::from_utf8(req.body.clone().unwrap()).unwrap();
        assert_eq!(body, lock_body(LockScope::Exclusive, LockType::Write, "mailto:ada@example.org"));
        assert!(text(&req).contains(&format!("Content-Length: {}\r\n", body.len())));
    }

    #[test]
    fn unlock_wraps_token() {
        let req = client().build_unlock("/doc", "opaquelocktoken:e71d4fae-5dec-22d6-fea5-00a0c91e6be4");
        assert_eq!(
            req.headers.get("Lock-Token"),
            Some("<opaquelocktoken:e71d4fae-5dec-22d6-fea5-00a0c91e6be4>")
        );
    }

    #[test]
    fn default_headers_come_first_and_lose_collisions() {
        let c = client()
            .with_header("Authorization", "Basic dGlnZXI6c2VjcmV0")
            .with_header("Depth", "Infinity");
        let req = c.build_propfind("/", Depth::One);
        let pairs: Vec<_> = req.headers.iter().collect();
        assert_eq!(
            pairs,
            vec![("Authorization", "Basic dGlnZXI6c2VjcmV0"), ("Depth", "1")]
        );
    }

    #[test]
    fn target_is_not_escaped() {
        let req = client().build_get("http://dav.example.org/a b?x=1");
        assert!(text(&req).starts_with("GET http://dav.example.org/a b?x=1 HTTP/1.0\r\n"));
    }
}
