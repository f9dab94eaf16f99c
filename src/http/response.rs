use crate::http::headers::HttpHeaders;
use crate::http::message::{HttpMessage, Message};
use crate::http::status::reason_phrase;
use crate::http::stream::{Body, StreamError};

/// An immutable HTTP response.
#[derive(Debug, Clone)]
pub struct Response {
    status: u16,
    reason: String,
    message: Message,
}

/// Explicit reason, else the standard phrase for `status`, else empty.
fn resolve_reason(status: u16, reason: Option<&str>) -> String {
    match reason {
        Some(reason) => reason.to_string(),
        None => reason_phrase(status).unwrap_or_default().to_string(),
    }
}

impl Response {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            reason: resolve_reason(status, None),
            message: Message::default(),
        }
    }

    pub fn from_parts(
        status: u16,
        headers: HttpHeaders,
        body: impl Into<Body>,
        protocol_version: &str,
        reason: Option<&str>,
    ) -> Self {
        Self {
            status,
            reason: resolve_reason(status, reason),
            message: Message::new(headers, body.into(), protocol_version),
        }
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn reason_phrase(&self) -> &str {
        &self.reason
    }

    /// Changes the status; without an explicit reason the standard phrase
    /// of the new status is used.
    pub fn with_status(&self, status: u16, reason: Option<&str>) -> Self {
        Self {
            status,
            reason: resolve_reason(status, reason),
            message: self.message.clone(),
        }
    }

    /// `HTTP/version status reason`
    pub fn start_line(&self) -> String {
        format!("HTTP/{} {} {}", self.protocol_version(), self.status, self.reason)
    }

    pub fn to_wire(&self) -> Result<Vec<u8>, StreamError> {
        self.message.to_wire(&self.start_line(), self.headers())
    }
}

impl Default for Response {
    fn default() -> Self {
        Self::new(200)
    }
}

impl HttpMessage for Response {
    fn message(&self) -> &Message {
        &self.message
    }

    fn with_message(&self, message: Message) -> Self {
        Self {
            status: self.status,
            reason: self.reason.clone(),
            message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adds_default_reason() {
        let r = Response::new(200);
        assert_eq!(r.status(), 200);
        assert_eq!(r.reason_phrase(), "OK");
    }

    #[test]
    fn unknown_status_has_empty_reason() {
        assert_eq!(Response::new(599).reason_phrase(), "");
    }

    #[test]
    fn custom_reason_and_version() {
        let r = Response::from_parts(200, HttpHeaders::new(), Body::empty(), "1.1", Some("bar"));
        assert_eq!(r.reason_phrase(), "bar");

        let r = Response::from_parts(200, HttpHeaders::new(), Body::empty(), "1000", None);
        assert_eq!(r.protocol_version(), "1000");
        assert_eq!(r.reason_phrase(), "OK");
    }

    #[test]
    fn with_status_without_reason() {
        let r = Response::new(200);
        let r2 = r.with_status(201, None);
        assert_eq!(r.status(), 200);
        assert_eq!(r.reason_phrase(), "OK");
        assert_eq!(r2.status(), 201);
        assert_eq!(r2.reason_phrase(), "Created");
    }

    #[test]
    fn with_status_and_reason() {
        let r2 = Response::new(200).with_status(201, Some("Foo"));
        assert_eq!(r2.status(), 201);
        assert_eq!(r2.reason_phrase(), "Foo");
    }

    #[test]
    fn added_header_array() {
        let r = Response::default();
        let r2 = r.with_added_header("foo", ["baz", "bar"]);
        assert!(!r.has_header("foo"));
        assert_eq!(r2.header("foo"), "baz, bar");
    }

    #[test]
    fn removing_missing_header_is_identity() {
        let r = Response::default();
        let r2 = r.without_header("foo");
        assert!(r2.headers().ptr_eq(r.headers()));
        assert!(r2.body().ptr_eq(r.body()));
    }

    #[test]
    fn always_has_a_body() {
        assert_eq!(Response::default().body().size().unwrap(), Some(0));
    }

    #[test]
    fn header_values_are_trimmed() {
        let headers = HttpHeaders::from_pairs([("foo", vec!["baz ", " bar "])]);
        let r = Response::from_parts(200, headers, Body::empty(), "1.1", None);
        assert_eq!(r.header("foo"), "baz, bar");
        assert_eq!(r.header_lines("foo"), ["baz", "bar"]);
    }

    #[test]
    fn serializes_to_wire() {
        let r = Response::new(404).with_header("Content-Type", "text/plain").with_body("gone");
        let wire = String::from_utf8(r.to_wire().unwrap()).unwrap();
        assert_eq!(wire, "HTTP/1.1 404 Not Found\r\nContent-Type: text/plain\r\n\r\ngone");
    }
}
