//! Parser turning raw HTTP/1.x messages into [`Request`]s and [`Response`]s.
//!
//! The input is split on the first blank line into a head and an opaque
//! body. The head is made of a start line followed by `Name: value` header
//! lines. Lines end with `\r\n`, or with a bare `\n` when that is what the
//! first line uses.
//!
//! The start line decides the message kind:
//! - `HTTP/1.1 200 OK` is a status line,
//! - `GET /path HTTP/1.1` is a request line.
//!
//! For requests the full URI is rebuilt from the request target and the
//! `Host` header, wherever that header appears in the head.

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

use crate::config::config;
use crate::error::Result;
use crate::http::headers::HttpHeaders;
use crate::http::request::Request;
use crate::http::response::Response;
use crate::http::status::is_valid_status;
use crate::http::stream::Body;
use crate::http::uri::Uri;
use crate::http::validator::ValidationError;

static STATUS_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^HTTP/(\d+(?:\.\d+)?) (\d+)(?: (.*))?$").expect("status line pattern is valid")
});

static REQUEST_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([!#$%&'*+.^_`|~0-9A-Za-z\-]+) (\S+) HTTP/(\d+(?:\.\d+)?)$")
        .expect("request line pattern is valid")
});

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParserError {
    #[error("empty message")]
    Empty,

    #[error("message head is not valid UTF-8")]
    InvalidEncoding,

    #[error("invalid start line {0:?}")]
    InvalidStartLine(String),

    #[error("expected a request line, got {0:?}")]
    ExpectedRequest(String),

    #[error("expected a status line, got {0:?}")]
    ExpectedResponse(String),

    #[error("invalid status code {0}: must be between 100 and 599")]
    InvalidStatus(String),

    #[error("invalid header line {0:?}")]
    InvalidHeader(String),

    #[error("start line longer than {0} bytes")]
    StartLineTooLong(usize),

    #[error("header block larger than {0} bytes")]
    HeadersTooLarge(usize),
}

/// A message split into its three parts, before interpretation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedMessage {
    pub start_line: String,
    /// Header lines in wire order. Repeated names stay separate.
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartLine {
    Request {
        method: String,
        target: String,
        version: String,
    },
    Status {
        version: String,
        status: u16,
        reason: String,
    },
}

impl StartLine {
    pub fn parse(line: &str) -> Result<Self, ParserError> {
        if let Some(caps) = STATUS_LINE.captures(line) {
            let code = &caps[2];
            let status = code
                .parse::<u16>()
                .ok()
                .filter(|s| code.len() == 3 && is_valid_status(*s))
                .ok_or_else(|| ParserError::InvalidStatus(code.to_string()))?;

            return Ok(StartLine::Status {
                version: caps[1].to_string(),
                status,
                reason: caps.get(3).map_or("", |m| m.as_str()).to_string(),
            });
        }

        if let Some(caps) = REQUEST_LINE.captures(line) {
            return Ok(StartLine::Request {
                method: caps[1].to_string(),
                target: caps[2].to_string(),
                version: caps[3].to_string(),
            });
        }

        Err(ParserError::InvalidStartLine(line.to_string()))
    }
}

pub struct MessageParser {
    max_start_line_size: usize,
    max_header_size: usize,
}

impl Default for MessageParser {
    fn default() -> Self {
        Self::with_limits(config().max_start_line_size, config().max_header_size)
    }
}

impl MessageParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limits(max_start_line_size: usize, max_header_size: usize) -> Self {
        Self {
            max_start_line_size,
            max_header_size,
        }
    }

    /// Splits `raw` into start line, header lines and body.
    pub fn parse(&self, raw: &[u8]) -> Result<ParsedMessage, ParserError> {
        if raw.is_empty() {
            return Err(ParserError::Empty);
        }

        // Line terminator used by the first line
        let eol: &[u8] = match raw.iter().position(|&b| b == b'\n') {
            Some(i) if i > 0 && raw[i - 1] == b'\r' => b"\r\n",
            _ => b"\n",
        };
        let blank_line = [eol, eol].concat();

        let (head, body) = match find(raw, &blank_line) {
            Some(i) => (&raw[..i], &raw[i + blank_line.len()..]),
            None => (raw.strip_suffix(eol).unwrap_or(raw), &raw[raw.len()..]),
        };

        let head = std::str::from_utf8(head).map_err(|_| ParserError::InvalidEncoding)?;
        let eol = if eol == b"\r\n" { "\r\n" } else { "\n" };
        let (start_line, header_block) = head.split_once(eol).unwrap_or((head, ""));

        if start_line.len() > self.max_start_line_size {
            return Err(ParserError::StartLineTooLong(self.max_start_line_size));
        }
        if header_block.len() > self.max_header_size {
            return Err(ParserError::HeadersTooLarge(self.max_header_size));
        }
        tracing::trace!(start_line, "parsed start line");

        let mut headers = Vec::new();
        for line in header_block.split(eol).filter(|l| !l.is_empty()) {
            let (name, value) = line
                .split_once(':')
                .filter(|(name, _)| !name.trim().is_empty())
                .ok_or_else(|| ParserError::InvalidHeader(line.to_string()))?;
            headers.push((name.trim().to_string(), value.trim().to_string()));
        }

        Ok(ParsedMessage {
            start_line: start_line.to_string(),
            headers,
            body: body.to_vec(),
        })
    }

    pub fn parse_request(&self, raw: &[u8]) -> Result<Request> {
        let parsed = self.parse(raw)?;
        let StartLine::Request {
            method,
            target,
            version,
        } = StartLine::parse(&parsed.start_line)?
        else {
            return Err(ParserError::ExpectedRequest(parsed.start_line).into());
        };

        let headers = HttpHeaders::from_lines(parsed.headers);
        let uri = request_uri(&target, &headers)?;
        tracing::debug!(%method, %target, %uri, "reconstructed request");

        let request = Request::from_parts(&method, uri, headers, Body::from(parsed.body), &version)?;
        if request.request_target() == target {
            Ok(request)
        } else {
            Ok(request.with_request_target(&target)?)
        }
    }

    pub fn parse_response(&self, raw: &[u8]) -> Result<Response> {
        let parsed = self.parse(raw)?;
        let StartLine::Status {
            version,
            status,
            reason,
        } = StartLine::parse(&parsed.start_line)?
        else {
            return Err(ParserError::ExpectedResponse(parsed.start_line).into());
        };
        tracing::debug!(status, %reason, "reconstructed response");

        Ok(Response::from_parts(
            status,
            HttpHeaders::from_lines(parsed.headers),
            Body::from(parsed.body),
            &version,
            Some(&reason),
        ))
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// Full URI of a request. An absolute-form target is parsed as is. Any
/// other target only contributes path, query and fragment, resolved against
/// the `Host` header when there is one; without it the URI has no host.
fn request_uri(target: &str, headers: &HttpHeaders) -> Result<Uri, ValidationError> {
    let is_absolute = target
        .split_once("://")
        .is_some_and(|(scheme, _)| !scheme.is_empty() && !scheme.contains(['/', '?', '#']));
    if is_absolute {
        return Uri::parse(target);
    }

    let base = match headers.get_all("Host").first() {
        Some(host) => {
            let scheme = if host.ends_with(":443") { "https" } else { "http" };
            Uri::parse(&format!("{}://{}", scheme, host))?
        }
        None => Uri::new(),
    };

    let (rest, fragment) = target.split_once('#').unwrap_or((target, ""));
    let (path, query) = rest.split_once('?').unwrap_or((rest, ""));
    Ok(base.with_path(path).with_query(query).with_fragment(fragment))
}

pub fn parse_message(raw: impl AsRef<[u8]>) -> Result<ParsedMessage, ParserError> {
    MessageParser::new().parse(raw.as_ref())
}

pub fn parse_request(raw: impl AsRef<[u8]>) -> Result<Request> {
    MessageParser::new().parse_request(raw.as_ref())
}

pub fn parse_response(raw: impl AsRef<[u8]>) -> Result<Response> {
    MessageParser::new().parse_response(raw.as_ref())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::http::message::HttpMessage;

    #[test]
    fn splits_head_and_body() {
        let parsed = parse_message("GET / HTTP/1.1\r\nA: 1\r\nA: 2\r\nB:3\r\n\r\nbody\r\n\r\nmore").unwrap();
        assert_eq!(parsed.start_line, "GET / HTTP/1.1");
        assert_eq!(
            parsed.headers,
            vec![
                ("A".to_string(), "1".to_string()),
                ("A".to_string(), "2".to_string()),
                ("B".to_string(), "3".to_string()),
            ]
        );
        assert_eq!(parsed.body, b"body\r\n\r\nmore");
    }

    #[test]
    fn tolerates_bare_line_feeds() {
        let parsed = parse_message("HTTP/1.1 204 No Content\nFoo: Bar\n\nx").unwrap();
        assert_eq!(parsed.start_line, "HTTP/1.1 204 No Content");
        assert_eq!(parsed.headers, vec![("Foo".to_string(), "Bar".to_string())]);
        assert_eq!(parsed.body, b"x");
    }

    #[test]
    fn missing_blank_line_means_empty_body() {
        let parsed = parse_message("GET / HTTP/1.1\r\nHost: a\r\n").unwrap();
        assert_eq!(parsed.headers.len(), 1);
        assert!(parsed.body.is_empty());
    }

    #[test]
    fn header_value_may_contain_colons() {
        let parsed = parse_message("GET / HTTP/1.1\r\nHost: foo.com:8080\r\n\r\n").unwrap();
        assert_eq!(parsed.headers[0], ("Host".to_string(), "foo.com:8080".to_string()));
    }

    #[test]
    fn header_without_colon_is_rejected() {
        assert_eq!(
            parse_message("GET / HTTP/1.1\r\nnot a header\r\n\r\n"),
            Err(ParserError::InvalidHeader("not a header".into()))
        );
        assert!(parse_message("GET / HTTP/1.1\r\n: empty\r\n\r\n").is_err());
    }

    #[test]
    fn empty_input_is_rejected() {
        assert_eq!(parse_message(""), Err(ParserError::Empty));
    }

    #[test]
    fn head_must_be_utf8() {
        assert_eq!(
            parse_message(b"GET /\xff HTTP/1.1\r\n\r\n".as_slice()),
            Err(ParserError::InvalidEncoding)
        );
    }

    #[test]
    fn body_may_be_binary() {
        let parsed = parse_message(b"HTTP/1.1 200 OK\r\n\r\n\xff\x00".as_slice()).unwrap();
        assert_eq!(parsed.body, [0xff, 0x00]);
    }

    #[test]
    fn limits_are_enforced() {
        let parser = MessageParser::with_limits(10, 8);
        assert_eq!(
            parser.parse(b"GET /very/long/path HTTP/1.1\r\n\r\n"),
            Err(ParserError::StartLineTooLong(10))
        );

        let parser = MessageParser::with_limits(100, 8);
        assert_eq!(
            parser.parse(b"GET / HTTP/1.1\r\nX-Long: aaaaaaaa\r\n\r\n"),
            Err(ParserError::HeadersTooLarge(8))
        );
    }

    #[test]
    fn start_line_dispatch() {
        assert_eq!(
            StartLine::parse("GET /abc HTTP/1.0"),
            Ok(StartLine::Request {
                method: "GET".into(),
                target: "/abc".into(),
                version: "1.0".into(),
            })
        );
        assert_eq!(
            StartLine::parse("HTTP/1.1 404 Not Found"),
            Ok(StartLine::Status {
                version: "1.1".into(),
                status: 404,
                reason: "Not Found".into(),
            })
        );
        assert_eq!(
            StartLine::parse("HTTP/2 200"),
            Ok(StartLine::Status {
                version: "2".into(),
                status: 200,
                reason: String::new(),
            })
        );
        assert!(matches!(StartLine::parse("GET /abc"), Err(ParserError::InvalidStartLine(_))));
        assert!(matches!(StartLine::parse("G(T / HTTP/1.1"), Err(ParserError::InvalidStartLine(_))));
        assert!(matches!(StartLine::parse("HTTP/1.1 OK"), Err(ParserError::InvalidStartLine(_))));
    }

    #[test]
    fn status_code_range() {
        assert_eq!(
            StartLine::parse("HTTP/1.1 600 Nope"),
            Err(ParserError::InvalidStatus("600".into()))
        );
        assert_eq!(
            StartLine::parse("HTTP/1.1 099 Nope"),
            Err(ParserError::InvalidStatus("099".into()))
        );
        assert_eq!(
            StartLine::parse("HTTP/1.1 2000 Nope"),
            Err(ParserError::InvalidStatus("2000".into()))
        );
    }

    #[test]
    fn parses_request_messages() {
        let req = "GET /abc HTTP/1.0\r\nHost: foo.com\r\nFoo: Bar\r\nBaz: Bam\r\nBaz: Qux\r\n\r\nTest";
        let request = parse_request(req).unwrap();
        assert_eq!(request.method(), "GET");
        assert_eq!(request.request_target(), "/abc");
        assert_eq!(request.protocol_version(), "1.0");
        assert_eq!(request.header("Host"), "foo.com");
        assert_eq!(request.header("Foo"), "Bar");
        assert_eq!(request.header("Baz"), "Bam, Qux");
        assert_eq!(request.body().to_string_lossy().unwrap(), "Test");
        assert_eq!(request.uri().to_string(), "http://foo.com/abc");
        assert!(!request.has_soft_host());
    }

    #[test]
    fn parses_request_messages_with_https_scheme() {
        let request = parse_request("PUT /abc?baz=bar HTTP/1.1\r\nHost: foo.com:443\r\n\r\n").unwrap();
        assert_eq!(request.method(), "PUT");
        assert_eq!(request.request_target(), "/abc?baz=bar");
        assert_eq!(request.protocol_version(), "1.1");
        assert_eq!(request.header("Host"), "foo.com:443");
        assert_eq!(request.body().to_string_lossy().unwrap(), "");
        assert_eq!(request.uri().to_string(), "https://foo.com/abc?baz=bar");
    }

    #[test]
    fn host_need_not_come_first() {
        let request = parse_request("PUT / HTTP/1.1\r\nFoo: Bar\r\nHost: foo.com\r\n\r\n").unwrap();
        assert_eq!(request.request_target(), "/");
        assert_eq!(request.uri().to_string(), "http://foo.com/");
    }

    #[test]
    fn request_without_host_keeps_bare_target() {
        let request = parse_request("GET /abc?x=1 HTTP/1.1\r\n\r\n").unwrap();
        assert_eq!(request.uri().host(), "");
        assert_eq!(request.uri().to_string(), "/abc?x=1");
        assert!(!request.has_header("Host"));
    }

    #[test]
    fn network_path_target_without_host_gets_no_host() {
        let request = parse_request("GET //evil.com/x HTTP/1.1\r\n\r\n").unwrap();
        assert_eq!(request.uri().host(), "");
        assert_eq!(request.uri().path(), "//evil.com/x");
        assert!(!request.has_header("Host"));
        assert!(!request.has_soft_host());
        assert_eq!(request.request_target(), "//evil.com/x");
    }

    #[test]
    fn network_path_target_resolves_against_host() {
        let request = parse_request("GET //evil.com/x?y=1 HTTP/1.1\r\nHost: foo.com\r\n\r\n").unwrap();
        assert_eq!(request.uri().host(), "foo.com");
        assert_eq!(request.uri().path(), "//evil.com/x");
        assert_eq!(request.uri().query(), "y=1");
        assert_eq!(request.header("Host"), "foo.com");
        assert_eq!(request.request_target(), "//evil.com/x?y=1");
    }

    #[test]
    fn asterisk_and_absolute_targets_are_kept() {
        let request = parse_request("OPTIONS * HTTP/1.1\r\nHost: foo.com\r\n\r\n").unwrap();
        assert_eq!(request.request_target(), "*");

        let request = parse_request("GET http://bar.com/x HTTP/1.1\r\nHost: foo.com\r\n\r\n").unwrap();
        assert_eq!(request.uri().to_string(), "http://bar.com/x");
        assert_eq!(request.request_target(), "http://bar.com/x");
    }

    #[test]
    fn validates_request_messages() {
        let err = parse_request("HTTP/1.1 200 OK\r\n\r\n").unwrap_err();
        assert!(matches!(err, Error::MalformedMessage(ParserError::ExpectedRequest(_))));
    }

    #[test]
    fn parses_response_messages() {
        let res = "HTTP/1.0 200 OK\r\nFoo: Bar\r\nBaz: Bam\r\nBaz: Qux\r\n\r\nTest";
        let response = parse_response(res).unwrap();
        assert_eq!(response.status(), 200);
        assert_eq!(response.reason_phrase(), "OK");
        assert_eq!(response.protocol_version(), "1.0");
        assert_eq!(response.header("Foo"), "Bar");
        assert_eq!(response.header("Baz"), "Bam, Qux");
        assert_eq!(response.body().to_string_lossy().unwrap(), "Test");
    }

    #[test]
    fn response_reason_defaults_to_empty() {
        let response = parse_response("HTTP/1.1 200\r\n\r\n").unwrap();
        assert_eq!(response.reason_phrase(), "");
    }

    #[test]
    fn validates_response_messages() {
        let err = parse_response("GET / HTTP/1.1\r\n\r\n").unwrap_err();
        assert!(matches!(err, Error::MalformedMessage(ParserError::ExpectedResponse(_))));

        let err = parse_response("HTTP/1.1 700 Weird\r\n\r\n").unwrap_err();
        assert!(matches!(err, Error::MalformedMessage(ParserError::InvalidStatus(_))));
    }

    #[test]
    fn invalid_host_port_is_a_validation_error() {
        let err = parse_request("GET / HTTP/1.1\r\nHost: foo.com:99999\r\n\r\n").unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }
}
