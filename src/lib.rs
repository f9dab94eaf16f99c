//! Immutable HTTP/1.x messages.
//!
//! [`Request`] and [`Response`] share the [`HttpMessage`] trait for protocol
//! version, headers and body. A [`Uri`] value backs every request, and the
//! [`query`] module converts query strings to and from nested data using
//! bracket keys such as `a[b][]=c`.
//!
//! ```
//! use rustymsg::{HttpMessage, Request, parse_response};
//!
//! let request = Request::new("get", "http://example.com/search?q=rust")?
//!     .with_header("Accept", "text/html");
//! assert_eq!(request.header("Host"), "example.com");
//! assert_eq!(request.request_target(), "/search?q=rust");
//!
//! let response = parse_response("HTTP/1.1 404 Not Found\r\n\r\n")?;
//! assert_eq!(response.status(), 404);
//! # Ok::<(), rustymsg::Error>(())
//! ```

pub mod config;
pub mod error;
pub mod http;
pub mod query;

pub use config::{Config, config, set_config};
pub use error::{Error, Result};
pub use http::{
    Body, HttpHeaders, HttpMessage, Request, Response, Uri, parse_message, parse_request,
    parse_response,
};
pub use query::{ParsedQuery, QueryEncoding, QueryMap, QueryValue};
