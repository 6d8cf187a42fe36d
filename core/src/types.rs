//! WebDAV-specific request vocabulary: depth, lock tokens and request bodies.
//!
//! # Design
//! Values interpolated into headers and XML are passed through verbatim. No
//! XML escaping happens in [`lock_body`]; the owner must already be a
//! well-formed href.

use std::fmt;

/// `Depth` header value for PROPFIND.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Depth {
    /// The resource itself.
    #[default]
    Zero,
    /// The resource and its direct members.
    One,
    /// The resource and every descendant.
    Infinity,
}

impl fmt::Display for Depth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Depth::Zero => "0",
            Depth::One => "1",
            Depth::Infinity => "Infinity",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockScope {
    Exclusive,
    Shared,
}

impl fmt::Display for LockScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LockScope::Exclusive => "exclusive",
            LockScope::Shared => "shared",
        })
    }
}

/// Access type of a lock. RFC 4918 only defines `write`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LockType {
    #[default]
    Write,
}

impl fmt::Display for LockType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LockType::Write => "write",
        })
    }
}

/// The `lockinfo` document sent with LOCK.
pub fn lock_body(scope: LockScope, lock_type: LockType, owner: &str) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"utf-8\" ?>\n\
         <D:lockinfo xmlns:D='DAV:'>\n\
         <D:lockscope><D:{scope}/></D:lockscope>\n\
         <D:locktype><D:{lock_type}/></D:locktype>\n\
         \t<D:owner><D:href>{owner}</D:href></D:owner>\n\
         </D:lockinfo>\n"
    )
}

/// Encode `pairs` as an `application/x-www-form-urlencoded` body.
///
/// Keys and values are percent-encoded; spaces become `+`.
pub fn form_urlencode<K, V>(pairs: &[(K, V)]) -> String
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    pairs
        .iter()
        .map(|(k, v)| format!("{}={}", form_component(k.as_ref()), form_component(v.as_ref())))
        .collect::<Vec<_>>()
        .join("&")
}

fn form_component(raw: &str) -> String {
    urlencoding::encode(raw).replace("%20", "+")
}
