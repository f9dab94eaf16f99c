use crate::http::headers::{HttpHeaders, IntoHeaderValues};
use crate::http::message::{HttpMessage, Message};
use crate::http::stream::{Body, StreamError};
use crate::http::uri::{IntoUri, Uri};
use crate::http::validator::{ValidationError, Validator};

/// An immutable HTTP request.
///
/// When the caller does not provide a `Host` header, one is derived from the
/// URI and placed first. That header is *soft*: [`Request::with_uri`]
/// replaces it. Setting `Host` explicitly through
/// [`HttpMessage::with_header`] makes it *hard*, and later URI changes leave
/// it alone.
#[derive(Debug, Clone)]
pub struct Request {
    method: String,
    uri: Uri,
    request_target: Option<String>,
    soft_host: bool,
    message: Message,
}

impl Request {
    pub fn new(method: &str, uri: impl IntoUri) -> Result<Self, ValidationError> {
        let message = Message::default();
        Self::build(method, uri.into_uri()?, message)
    }

    pub fn from_parts(
        method: &str,
        uri: impl IntoUri,
        headers: HttpHeaders,
        body: impl Into<Body>,
        protocol_version: &str,
    ) -> Result<Self, ValidationError> {
        let message = Message::new(headers, body.into(), protocol_version);
        Self::build(method, uri.into_uri()?, message)
    }

    fn build(method: &str, uri: Uri, message: Message) -> Result<Self, ValidationError> {
        let req = Self {
            method: method.to_ascii_uppercase(),
            uri,
            request_target: None,
            soft_host: false,
            message,
        };
        Ok(req.sync_host())
    }

    /// Derives `Host` from the URI unless a hard `Host` header is present.
    fn sync_host(mut self) -> Self {
        if !self.soft_host && self.message.headers().has("Host") {
            return self;
        }
        if self.uri.host().is_empty() {
            return self;
        }

        let headers = self.message.headers().set_first("Host", self.uri.host_header());
        self.message = self.message.with_headers(headers);
        self.soft_host = true;
        self
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn with_method(&self, method: &str) -> Self {
        Self {
            method: method.to_ascii_uppercase(),
            ..self.clone()
        }
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    pub fn with_uri(&self, uri: Uri) -> Self {
        Self {
            uri,
            ..self.clone()
        }
        .sync_host()
    }

    /// Whether the current `Host` header was derived from the URI.
    pub fn has_soft_host(&self) -> bool {
        self.soft_host
    }

    /// The explicit target if one was set, else the URI path (`/` when empty)
    /// followed by its query.
    pub fn request_target(&self) -> String {
        if let Some(target) = &self.request_target {
            return target.clone();
        }

        let mut target = match self.uri.path() {
            "" => "/".to_string(),
            path => path.to_string(),
        };
        if !self.uri.query().is_empty() {
            target.push('?');
            target.push_str(self.uri.query());
        }
        target
    }

    pub fn with_request_target(&self, target: &str) -> Result<Self, ValidationError> {
        Validator::validate_request_target(target)?;
        Ok(Self {
            request_target: Some(target.to_string()),
            ..self.clone()
        })
    }

    /// `METHOD target HTTP/version`
    pub fn start_line(&self) -> String {
        format!("{} {} HTTP/{}", self.method, self.request_target(), self.protocol_version())
    }

    /// Serializes the request as it would be sent, adding a `Host` line when
    /// none is present and the URI has a host.
    pub fn to_wire(&self) -> Result<Vec<u8>, StreamError> {
        let mut headers = self.headers().clone();
        if !headers.has("Host") && !self.uri.host().is_empty() {
            headers = headers.set_first("Host", self.uri.host_header());
        }
        self.message.to_wire(&self.start_line(), &headers)
    }
}

/// A batch of changes applied by [`Request::modify`].
///
/// Header names in `set_headers` replace existing headers of the same name
/// and come first in the result. `query` is applied after `uri`.
#[derive(Debug, Clone, Default)]
pub struct RequestChanges {
    pub method: Option<String>,
    pub set_headers: Vec<(String, Vec<String>)>,
    pub remove_headers: Vec<String>,
    pub body: Option<Body>,
    pub uri: Option<Uri>,
    pub query: Option<String>,
    pub version: Option<String>,
}

impl RequestChanges {
    pub fn is_empty(&self) -> bool {
        self.method.is_none()
            && self.set_headers.is_empty()
            && self.remove_headers.is_empty()
            && self.body.is_none()
            && self.uri.is_none()
            && self.query.is_none()
            && self.version.is_none()
    }
}

impl Request {
    /// Rebuilds the request with `changes` applied.
    ///
    /// The result is a fresh request: an explicit request target is dropped,
    /// and a soft `Host` is derived again from the resulting URI unless
    /// `set_headers` provides one. Empty changes return an identical copy.
    pub fn modify(&self, changes: RequestChanges) -> Result<Self, ValidationError> {
        if changes.is_empty() {
            return Ok(self.clone());
        }

        let mut current = self.headers().clone();
        for name in &changes.remove_headers {
            current = current.remove(name);
        }
        let sets_host = changes
            .set_headers
            .iter()
            .any(|(name, _)| name.trim().eq_ignore_ascii_case("host"));
        if self.soft_host && !sets_host {
            current = current.remove("Host");
        }

        let kept: Vec<(String, Vec<String>)> = current
            .iter()
            .filter(|(name, _)| !changes.set_headers.iter().any(|(set, _)| set.trim().eq_ignore_ascii_case(name)))
            .map(|(name, values)| (name.to_string(), values.to_vec()))
            .collect();
        let headers = HttpHeaders::from_pairs(changes.set_headers.into_iter().chain(kept));

        let mut uri = changes.uri.unwrap_or_else(|| self.uri.clone());
        if let Some(query) = &changes.query {
            uri = uri.with_query(query);
        }

        tracing::debug!(method = %self.method, %uri, "rebuilding request");
        Request::from_parts(
            changes.method.as_deref().unwrap_or(&self.method),
            uri,
            headers,
            changes.body.unwrap_or_else(|| self.body().clone()),
            changes.version.as_deref().unwrap_or(self.protocol_version()),
        )
    }
}

/// Free-function form of [`Request::modify`].
pub fn modify_request(request: &Request, changes: RequestChanges) -> Result<Request, ValidationError> {
    request.modify(changes)
}

impl HttpMessage for Request {
    fn message(&self) -> &Message {
        &self.message
    }

    fn with_message(&self, message: Message) -> Self {
        Self {
            method: self.method.clone(),
            uri: self.uri.clone(),
            request_target: self.request_target.clone(),
            soft_host: self.soft_host,
            message,
        }
    }

    fn with_header(&self, name: &str, values: impl IntoHeaderValues) -> Self {
        let headers = self.headers().set(name, values);
        let mut new = self.with_message(self.message.with_headers(headers));
        if new.soft_host && name.trim().eq_ignore_ascii_case("host") {
            new.soft_host = false;
        }
        new
    }
}
