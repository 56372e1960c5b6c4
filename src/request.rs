//! Incoming HTTP request type.

use std::net::SocketAddr;

use bytes::Bytes;
use http::{HeaderMap, HeaderName, HeaderValue, Method};

/// An incoming HTTP request.
///
/// The [`Server`](crate::Server) builds these from hyper requests. Hosts that
/// bring their own transport build them directly:
///
/// ```rust
/// use trellis::{Method, Request};
///
/// let req = Request::new(Method::GET, "/items")
///     .with_header("accept", "application/json")
///     .with_remote_addr("10.0.0.7:51234".parse().unwrap());
/// assert_eq!(req.path(), "/items");
/// ```
pub struct Request {
    pub(crate) method: Method,
    pub(crate) path: String,
    pub(crate) headers: HeaderMap,
    pub(crate) body: Bytes,
    pub(crate) remote_addr: Option<SocketAddr>,
}

impl Request {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: HeaderMap::new(),
            body: Bytes::new(),
            remote_addr: None,
        }
    }

    pub(crate) fn from_parts(parts: http::request::Parts, body: Bytes, remote_addr: SocketAddr) -> Self {
        Self {
            path: parts.uri.path().to_owned(),
            method: parts.method,
            headers: parts.headers,
            body,
            remote_addr: Some(remote_addr),
        }
    }

    /// Appends a header. Names or values that are not valid HTTP are skipped.
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) = (HeaderName::try_from(name), HeaderValue::try_from(value)) {
            self.headers.append(name, value);
        }
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_remote_addr(mut self, addr: SocketAddr) -> Self {
        self.remote_addr = Some(addr);
        self
    }

    pub fn method(&self) -> &Method { &self.method }
    pub fn path(&self) -> &str { &self.path }
    pub fn headers(&self) -> &HeaderMap { &self.headers }
    pub fn body(&self) -> &[u8] { &self.body }
    pub fn remote_addr(&self) -> Option<SocketAddr> { self.remote_addr }

    /// Case-insensitive header lookup. Non-UTF-8 values read as absent.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}
