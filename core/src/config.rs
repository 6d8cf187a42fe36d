//! Endpoint and client configuration.
//!
//! # Design
//! Configuration is immutable once a `WebDavClient` is built. `Endpoint` and
//! `Proxy` derive serde so callers can embed them in their own config files;
//! a missing port means 80.

use serde::{Deserialize, Serialize};

use crate::http::Headers;
use crate::response::ReadPolicy;

pub const DEFAULT_PORT: u16 = 80;

/// An HTTP proxy every request is routed through.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proxy {
    pub host: String,
    #[serde(default)]
    pub port: Option<u16>,
}

/// The server a client talks to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    pub host: String,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub proxy: Option<Proxy>,
}

impl Endpoint {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: None,
            proxy: None,
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn with_proxy(mut self, host: impl Into<String>, port: Option<u16>) -> Self {
        self.proxy = Some(Proxy {
            host: host.into(),
            port,
        });
        self
    }

    /// The `(host, port)` actually dialed: the proxy when one is configured
    /// with a non-empty host, otherwise the origin server.
    pub fn connect_target(&self) -> (&str, u16) {
        match &self.proxy {
            Some(proxy) if !proxy.host.is_empty() => {
                (proxy.host.as_str(), proxy.port.unwrap_or(DEFAULT_PORT))
            }
            _ => (self.host.as_str(), self.port.unwrap_or(DEFAULT_PORT)),
        }
    }
}

/// Everything a `WebDavClient` needs.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub endpoint: Endpoint,
    pub read: ReadPolicy,
    /// Sent with every request, before the verb's own headers.
    pub default_headers: Headers,
}

impl ClientConfig {
    pub fn new(endpoint: Endpoint) -> Self {
        Self {
            endpoint,
            read: ReadPolicy::default(),
            default_headers: Headers::new(),
        }
    }
}
