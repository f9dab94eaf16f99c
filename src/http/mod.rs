//! HTTP message value objects.
//!
//! Every type here is immutable: `with_*` methods return an updated copy and
//! leave the receiver untouched. Copies share their header storage and body
//! until one of them is changed.

pub mod headers;
pub mod message;
pub mod parser;
pub mod request;
pub mod response;
pub mod status;
pub mod stream;
pub mod uri;
pub mod validator;

pub use headers::{HttpHeaders, IntoHeaderValues, normalize_header, parse_header};
pub use message::{HttpMessage, Message};
pub use parser::{MessageParser, ParsedMessage, ParserError, StartLine, parse_message, parse_request, parse_response};
pub use request::{Request, RequestChanges, modify_request};
pub use response::Response;
pub use status::{is_valid_status, reason_phrase};
pub use stream::{Body, BufferStream, Stream, StreamError};
pub use uri::{IntoUri, Uri};
pub use validator::{ValidationError, Validator};
