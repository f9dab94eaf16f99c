//! State shared by requests and responses: protocol version, headers and
//! body.
//!
//! [`HttpMessage`] exposes it through functional updates. Implementors only
//! provide access to their [`Message`] and a way to rebuild themselves around
//! a new one; everything else has a default that can be overridden, as
//! [`Request`](crate::http::request::Request) does for `Host`.

use crate::config::config;
use crate::http::headers::{HttpHeaders, IntoHeaderValues};
use crate::http::stream::{Body, StreamError};

#[derive(Debug, Clone)]
pub struct Message {
    protocol_version: String,
    headers: HttpHeaders,
    body: Body,
}

impl Default for Message {
    fn default() -> Self {
        Self::new(HttpHeaders::new(), Body::empty(), config().protocol_version.as_str())
    }
}

impl Message {
    pub fn new(headers: HttpHeaders, body: Body, protocol_version: impl Into<String>) -> Self {
        Self {
            protocol_version: protocol_version.into(),
            headers,
            body,
        }
    }

    pub fn protocol_version(&self) -> &str {
        &self.protocol_version
    }

    pub fn headers(&self) -> &HttpHeaders {
        &self.headers
    }

    pub fn body(&self) -> &Body {
        &self.body
    }

    pub fn with_protocol_version(&self, version: &str) -> Self {
        Self {
            protocol_version: version.to_string(),
            ..self.clone()
        }
    }

    pub fn with_headers(&self, headers: HttpHeaders) -> Self {
        Self {
            headers,
            ..self.clone()
        }
    }

    pub fn with_body(&self, body: Body) -> Self {
        Self {
            body,
            ..self.clone()
        }
    }

    /// Serializes `start_line`, the headers, a blank line and the whole body.
    pub fn to_wire(&self, start_line: &str, headers: &HttpHeaders) -> Result<Vec<u8>, StreamError> {
        let mut out = Vec::new();
        out.extend_from_slice(start_line.as_bytes());
        out.extend_from_slice(b"\r\n");
        out.extend_from_slice(headers.stringify().as_bytes());
        out.extend_from_slice(b"\r\n");
        out.extend_from_slice(&self.body.contents()?);
        Ok(out)
    }
}

pub trait HttpMessage: Sized {
    fn message(&self) -> &Message;

    /// Returns a copy of `self` built around `message`.
    fn with_message(&self, message: Message) -> Self;

    fn protocol_version(&self) -> &str {
        self.message().protocol_version()
    }

    fn with_protocol_version(&self, version: &str) -> Self {
        self.with_message(self.message().with_protocol_version(version))
    }

    fn headers(&self) -> &HttpHeaders {
        self.message().headers()
    }

    fn has_header(&self, name: &str) -> bool {
        self.headers().has(name)
    }

    /// Values of `name` joined with `", "`.
    fn header(&self, name: &str) -> String {
        self.headers().get(name)
    }

    fn header_lines(&self, name: &str) -> &[String] {
        self.headers().get_all(name)
    }

    fn with_header(&self, name: &str, values: impl IntoHeaderValues) -> Self {
        let headers = self.headers().set(name, values);
        self.with_message(self.message().with_headers(headers))
    }

    fn with_added_header(&self, name: &str, values: impl IntoHeaderValues) -> Self {
        let mut current = self.header_lines(name).to_vec();
        current.extend(values.into_header_values());
        self.with_header(name, current)
    }

    fn without_header(&self, name: &str) -> Self {
        let headers = self.headers().remove(name);
        self.with_message(self.message().with_headers(headers))
    }

    fn body(&self) -> &Body {
        self.message().body()
    }

    fn with_body(&self, body: impl Into<Body>) -> Self {
        self.with_message(self.message().with_body(body.into()))
    }
}
